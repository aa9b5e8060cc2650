//! Opening connections, tunneled through a SOCKS proxy where configured.
//!
//! [`ConnectionOpener`] is the seam: code that needs an outbound
//! connection depends on it, and gets a direct connection from
//! [`TcpOpener`] or a transparently proxied one from [`SocksConnector`].

use crate::{
    Stream,
    client::SocksClient,
    config::{ConfigSource, ProxyConfig},
    error::{BoxError, SocksError},
};
use socksify_proto::{Destination, Host};
use std::{fmt, future::Future, sync::Arc};
use tokio::net::TcpStream;

mod connection;
pub use connection::MaybeProxiedConnection;

/// Opens a bidirectional connection to a host and port.
pub trait ConnectionOpener: Send + Sync + 'static {
    /// Connection returned on success.
    type Connection: Stream + Unpin;
    /// Error returned on failure.
    type Error: Into<BoxError> + Send + 'static;

    /// Open a connection to `host:port`.
    ///
    /// `host` is a name or a literal ip address,
    /// ipv6 literals may be enclosed in square brackets.
    fn open(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
/// [`ConnectionOpener`] for plain [`TcpStream`]s,
/// resolving names with the system resolver.
pub struct TcpOpener;

impl TcpOpener {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ConnectionOpener for TcpOpener {
    type Connection = TcpStream;
    type Error = std::io::Error;

    async fn open(&self, host: &str, port: u16) -> Result<Self::Connection, Self::Error> {
        match Host::parse(host) {
            Host::Address(ip) => TcpStream::connect((ip, port)).await,
            Host::Name(name) => TcpStream::connect((name.as_str(), port)).await,
        }
    }
}

impl<T: ConnectionOpener> ConnectionOpener for Arc<T> {
    type Connection = T::Connection;
    type Error = T::Error;

    fn open(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        (**self).open(host, port)
    }
}

/// Returns a new [`OpenerFn`] with the given closure.
///
/// This lets you build a [`ConnectionOpener`] from an async function
/// taking the host and port to connect to.
pub fn opener_fn<F>(f: F) -> OpenerFn<F> {
    OpenerFn { f }
}

/// A [`ConnectionOpener`] implemented by a closure.
///
/// See [`opener_fn`] for more details.
#[derive(Copy, Clone)]
pub struct OpenerFn<F> {
    f: F,
}

impl<F> fmt::Debug for OpenerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenerFn")
            .field("f", &format_args!("{}", std::any::type_name::<F>()))
            .finish()
    }
}

impl<F, Fut, C, E> ConnectionOpener for OpenerFn<F>
where
    F: Fn(String, u16) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, E>> + Send + 'static,
    C: Stream + Unpin,
    E: Into<BoxError> + Send + 'static,
{
    type Connection = C;
    type Error = E;

    fn open(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        (self.f)(host.to_owned(), port)
    }
}

#[derive(Debug, Clone, Default)]
/// [`ConnectionOpener`] which tunnels connections through the proxy
/// of its [`ProxyConfig`], unless there is none or the host is ignored.
///
/// The config is looked up once per connection attempt.
pub struct SocksConnector<O = TcpOpener> {
    inner: O,
    source: ConfigSource,
}

impl SocksConnector {
    /// Creates a new [`SocksConnector`] opening [`TcpStream`]s,
    /// using the ambient proxy configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<O> SocksConnector<O> {
    /// Creates a new [`SocksConnector`] using the given opener
    /// for connections to proxies and direct destinations alike.
    pub fn with_opener(inner: O) -> Self {
        Self {
            inner,
            source: ConfigSource::Ambient,
        }
    }

    /// Use a fixed [`ProxyConfig`] instead of the ambient one.
    #[must_use]
    pub fn with_config(mut self, config: impl Into<Arc<ProxyConfig>>) -> Self {
        self.source = ConfigSource::Fixed(config.into());
        self
    }

    /// Set the [`ConfigSource`].
    #[must_use]
    pub fn with_source(mut self, source: ConfigSource) -> Self {
        self.source = source;
        self
    }

    /// Reference to the inner opener.
    pub fn get_ref(&self) -> &O {
        &self.inner
    }
}

impl<O: ConnectionOpener> SocksConnector<O> {
    /// Open a connection to `host:port`, through the configured proxy if one applies.
    ///
    /// A connection to the proxy for which the handshake failed
    /// is closed before the error is returned.
    pub async fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<MaybeProxiedConnection<O::Connection>, SocksError> {
        let config = self.source.load();
        let debug = config.debug();

        let Some(proxy) = config.proxy_for(host) else {
            debug_event!(
                debug,
                %host,
                port,
                ignored = config.ignores().contains(host),
                "socksify: connecting directly"
            );
            let conn = self.inner.open(host, port).await.map_err(|err| {
                SocksError::transport(err).with_context("open direct connection")
            })?;
            return Ok(MaybeProxiedConnection::direct(conn));
        };

        debug_event!(
            debug,
            %host,
            port,
            proxy = %proxy.address(),
            version = %proxy.version(),
            "socksify: connecting through proxy"
        );

        let proxy_host = proxy.host().to_string();
        let mut conn = self
            .inner
            .open(&proxy_host, proxy.port())
            .await
            .map_err(|err| SocksError::transport(err).with_context("open proxy connection"))?;

        let destination = Destination::new(host, port);
        let bound = SocksClient::from_endpoint(proxy)
            .with_debug(debug)
            .handshake_connect(&mut conn, &destination)
            .await?;

        debug_event!(debug, %destination, %bound, "socksify: tunnel established");
        Ok(MaybeProxiedConnection::proxied(conn, bound))
    }
}

impl<O: ConnectionOpener> ConnectionOpener for SocksConnector<O> {
    type Connection = MaybeProxiedConnection<O::Connection>;
    type Error = SocksError;

    fn open(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        self.connect(host, port)
    }
}
