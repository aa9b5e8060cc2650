//! Server frames of the SOCKS5 Protocol [RFC 1928]
//!
//! [RFC 1928]: https://datatracker.ietf.org/doc/html/rfc1928

use crate::{
    Destination, ProtocolError, ProtocolVersion, ReplyKind, SocksMethod,
    UsernamePasswordSubnegotiationVersion,
    common::{host_length, read_host, write_host_to_buf},
};
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Eq)]
/// The server selects from one of the methods given in METHODS, and
/// sends a header back containing the selected METHOD and same Protocol vesion.
///
/// ```plain
/// +-----+--------+
/// | VER | METHOD |
/// +-----+--------+
/// |  1  |   1    |
/// +-----+--------+
/// ```
pub struct Header {
    pub version: ProtocolVersion,
    pub method: SocksMethod,
}

impl Header {
    /// Creates a new SOCKS5 [`Header`] selecting the given method.
    #[must_use]
    pub fn new(method: SocksMethod) -> Self {
        Self {
            version: ProtocolVersion::Socks5,
            method,
        }
    }

    /// Read the server [`Header`] from the reader.
    pub async fn read_from<R>(r: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let version: ProtocolVersion = r.read_u8().await?.into();
        if version != ProtocolVersion::Socks5 {
            return Err(ProtocolError::UnexpectedByte {
                pos: 0,
                byte: version.into(),
            });
        }

        let method: SocksMethod = r.read_u8().await?.into();

        Ok(Self { version, method })
    }

    /// Write the server [`Header`] into the writer.
    pub async fn write_to<W>(&self, w: &mut W) -> Result<(), std::io::Error>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = BytesMut::with_capacity(2);
        self.write_to_buf(&mut buf);
        w.write_all(&buf).await
    }

    /// Write the server [`Header`] into the buffer.
    pub fn write_to_buf<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.version.into());
        buf.put_u8(self.method.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Response to the username-password request sent by the client.
///
/// ```plain
/// +----+--------+
/// |VER | STATUS |
/// +----+--------+
/// | 1  |   1    |
/// +----+--------+
/// ```
///
/// A STATUS field of X'00' indicates success. If the server returns a
/// `failure' (STATUS value other than X'00') status, it MUST close the
/// connection.
///
/// Reference: <https://datatracker.ietf.org/doc/html/rfc1929#section-2>
pub struct UsernamePasswordResponse {
    pub version: UsernamePasswordSubnegotiationVersion,
    pub status: u8,
}

impl UsernamePasswordResponse {
    /// Create a new [`UsernamePasswordResponse`] to indicate success.
    #[must_use]
    pub fn new_success() -> Self {
        Self {
            version: UsernamePasswordSubnegotiationVersion::One,
            status: 0,
        }
    }

    /// Create a new failure [`UsernamePasswordResponse`] to indicate
    /// the received credentials are invalid.
    #[must_use]
    pub fn new_invalid_credentials() -> Self {
        Self {
            version: UsernamePasswordSubnegotiationVersion::One,
            status: 1,
        }
    }

    /// Indicates if the (auth) response from the server indicates success.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Read the server [`UsernamePasswordResponse`] from the reader.
    pub async fn read_from<R>(r: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let version: UsernamePasswordSubnegotiationVersion = r.read_u8().await?.into();
        if let UsernamePasswordSubnegotiationVersion::Unknown(version) = version {
            return Err(ProtocolError::UnexpectedByte {
                pos: 0,
                byte: version,
            });
        }

        let status = r.read_u8().await?;

        Ok(Self { version, status })
    }

    /// Write the server [`UsernamePasswordResponse`] into the writer.
    pub async fn write_to<W>(&self, w: &mut W) -> Result<(), std::io::Error>
    where
        W: AsyncWrite + Unpin,
    {
        w.write_all(&[self.version.into(), self.status]).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Sent by the server as a reply on an earlier client request.
///
/// ```plain
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// For a granted `RESOLVE` the bound address is the resolved address,
/// for a granted `RESOLVE_PTR` it is the resolved domain name.
pub struct Reply {
    pub version: ProtocolVersion,
    pub reply: ReplyKind,
    pub bind_address: Destination,
}

impl Reply {
    /// Creates a new [`Reply`].
    #[must_use]
    pub fn new(reply: ReplyKind, bind_address: Destination) -> Self {
        Self {
            version: ProtocolVersion::Socks5,
            reply,
            bind_address,
        }
    }

    /// Creates a new error [`Reply`], using the unspecified ipv4 address as bind address.
    #[must_use]
    pub fn error_reply(reply: ReplyKind) -> Self {
        Self::new(reply, Destination::default_ipv4(0))
    }

    /// Read the server [`Reply`] from the reader.
    pub async fn read_from<R>(r: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let version: ProtocolVersion = r.read_u8().await?.into();
        if version != ProtocolVersion::Socks5 {
            return Err(ProtocolError::UnexpectedByte {
                pos: 0,
                byte: version.into(),
            });
        }

        let reply: ReplyKind = r.read_u8().await?.into();

        let rsv = r.read_u8().await?;
        if rsv != 0 {
            return Err(ProtocolError::UnexpectedByte { pos: 2, byte: rsv });
        }

        let host = read_host(r, 3).await?;
        let port = r.read_u16().await?;

        Ok(Self {
            version,
            reply,
            bind_address: Destination { host, port },
        })
    }

    /// Write the server [`Reply`] into the writer.
    pub async fn write_to<W>(&self, w: &mut W) -> Result<(), std::io::Error>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = BytesMut::with_capacity(self.serialized_len());
        self.write_to_buf(&mut buf);
        w.write_all(&buf).await
    }

    /// Write the server [`Reply`] into the buffer.
    pub fn write_to_buf<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.version.into());
        buf.put_u8(self.reply.into());
        buf.put_u8(0 /* RSV */);
        write_host_to_buf(&self.bind_address.host, buf);
        buf.put_u16(self.bind_address.port);
    }

    fn serialized_len(&self) -> usize {
        4 + host_length(&self.bind_address.host) + 2
    }
}
