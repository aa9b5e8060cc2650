use pin_project_lite::pin_project;
use socksify_proto::Destination;
use std::{
    fmt,
    pin::Pin,
    task::{self, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite};

pin_project! {
    /// A connection which is tunneled through a proxy if one applied
    /// to its destination, and direct otherwise.
    ///
    /// Reads and writes go straight to the underlying connection
    /// in both cases: once established, a tunnel carries the bytes
    /// of the destination only.
    pub struct MaybeProxiedConnection<S> {
        #[pin]
        inner: Connection<S>,
    }
}

pin_project! {
    #[project = ConnectionProj]
    enum Connection<S> {
        Direct { #[pin] conn: S },
        Proxied { #[pin] conn: S, bound: Destination },
    }
}

impl<S> MaybeProxiedConnection<S> {
    pub(crate) fn direct(conn: S) -> Self {
        Self {
            inner: Connection::Direct { conn },
        }
    }

    pub(crate) fn proxied(conn: S, bound: Destination) -> Self {
        Self {
            inner: Connection::Proxied { conn, bound },
        }
    }

    /// Returns `true` if this connection is tunneled through a proxy.
    #[must_use]
    pub fn is_proxied(&self) -> bool {
        matches!(self.inner, Connection::Proxied { .. })
    }

    /// Address the proxy bound for the tunnel, `None` for a direct connection.
    #[must_use]
    pub fn bound_address(&self) -> Option<&Destination> {
        match &self.inner {
            Connection::Direct { .. } => None,
            Connection::Proxied { bound, .. } => Some(bound),
        }
    }

    #[must_use]
    pub fn get_ref(&self) -> &S {
        match &self.inner {
            Connection::Direct { conn } | Connection::Proxied { conn, .. } => conn,
        }
    }

    pub fn get_mut(&mut self) -> &mut S {
        match &mut self.inner {
            Connection::Direct { conn } | Connection::Proxied { conn, .. } => conn,
        }
    }

    /// Consume this wrapper, returning the underlying connection.
    pub fn into_inner(self) -> S {
        match self.inner {
            Connection::Direct { conn } | Connection::Proxied { conn, .. } => conn,
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for MaybeProxiedConnection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaybeProxiedConnection")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<S: fmt::Debug> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct { conn } => f.debug_struct("Direct").field("conn", conn).finish(),
            Self::Proxied { conn, bound } => f
                .debug_struct("Proxied")
                .field("conn", conn)
                .field("bound", bound)
                .finish(),
        }
    }
}

impl<S: AsyncWrite> AsyncWrite for MaybeProxiedConnection<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        match self.project().inner.project() {
            ConnectionProj::Direct { conn } | ConnectionProj::Proxied { conn, .. } => {
                conn.poll_write(cx, buf)
            }
        }
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        match self.project().inner.project() {
            ConnectionProj::Direct { conn } | ConnectionProj::Proxied { conn, .. } => {
                conn.poll_flush(cx)
            }
        }
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        match self.project().inner.project() {
            ConnectionProj::Direct { conn } | ConnectionProj::Proxied { conn, .. } => {
                conn.poll_shutdown(cx)
            }
        }
    }

    fn is_write_vectored(&self) -> bool {
        self.get_ref().is_write_vectored()
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
        bufs: &[std::io::IoSlice<'_>],
    ) -> Poll<Result<usize, std::io::Error>> {
        match self.project().inner.project() {
            ConnectionProj::Direct { conn } | ConnectionProj::Proxied { conn, .. } => {
                conn.poll_write_vectored(cx, bufs)
            }
        }
    }
}

impl<S: AsyncRead> AsyncRead for MaybeProxiedConnection<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.project().inner.project() {
            ConnectionProj::Direct { conn } | ConnectionProj::Proxied { conn, .. } => {
                conn.poll_read(cx, buf)
            }
        }
    }
}
