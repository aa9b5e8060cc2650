//! Client frames of the SOCKS5 Protocol [RFC 1928]
//!
//! [RFC 1928]: https://datatracker.ietf.org/doc/html/rfc1928

use crate::{
    Command, Destination, Host, ProtocolError, ProtocolVersion, SocksMethod,
    UsernamePasswordSubnegotiationVersion,
    common::{MAX_NAME_LEN, host_length, read_host, write_host_to_buf},
};
use bytes::{BufMut, BytesMut};
use smallvec::SmallVec;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Eq)]
/// The client connects to the server, and sends a header which
/// contains the protocol version desired and SOCKS methods supported by the client.
///
/// ```plain
/// +-----+----------+----------+
/// | VER | NMETHODS | METHODS  |
/// +-----+----------+----------+
/// |  1  |    1     | 1 to 255 |
/// +-----+----------+----------+
/// ```
pub struct Header {
    pub version: ProtocolVersion,
    pub methods: SmallVec<[SocksMethod; 2]>,
}

impl Header {
    /// Creates a new SOCKS5 [`Header`] offering the given methods.
    pub fn new(methods: impl Into<SmallVec<[SocksMethod; 2]>>) -> Self {
        Self {
            version: ProtocolVersion::Socks5,
            methods: methods.into(),
        }
    }

    /// Read the client [`Header`] from the reader.
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

        let number_methods = r.read_u8().await?;
        if number_methods == 0 {
            return Err(ProtocolError::UnexpectedByte { pos: 1, byte: 0 });
        }

        let mut raw = vec![0u8; number_methods as usize];
        r.read_exact(&mut raw).await?;
        let methods = raw.into_iter().map(SocksMethod::from).collect();

        Ok(Self { version, methods })
    }

    /// Write the client [`Header`] into the writer.
    pub async fn write_to<W>(&self, w: &mut W) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = BytesMut::with_capacity(self.serialized_len());
        self.write_to_buf(&mut buf)?;
        w.write_all(&buf).await?;
        Ok(())
    }

    /// Write the client [`Header`] into the buffer.
    pub fn write_to_buf<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        let number_methods = u8::try_from(self.methods.len())
            .map_err(|_err| ProtocolError::Unexpected("too many socks5 methods"))?;
        if number_methods == 0 {
            return Err(ProtocolError::Unexpected("no socks5 methods offered"));
        }

        buf.put_u8(self.version.into());
        buf.put_u8(number_methods);
        for method in self.methods.iter() {
            buf.put_u8((*method).into());
        }
        Ok(())
    }

    fn serialized_len(&self) -> usize {
        2 + self.methods.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Initial username-password negotiation starts with the client sending this request.
///
/// ```plain
/// +----+------+----------+------+----------+
/// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
/// +----+------+----------+------+----------+
/// | 1  |  1   | 1 to 255 |  1   | 0 to 255 |
/// +----+------+----------+------+----------+
/// ```
///
/// Reference: <https://datatracker.ietf.org/doc/html/rfc1929#section-2>
pub struct UsernamePasswordRequest {
    pub version: UsernamePasswordSubnegotiationVersion,
    pub username: Vec<u8>,
    pub password: Vec<u8>,
}

impl UsernamePasswordRequest {
    /// Creates a new version one [`UsernamePasswordRequest`].
    pub fn new(username: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            version: UsernamePasswordSubnegotiationVersion::One,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read the client [`UsernamePasswordRequest`] from the reader.
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

        let username_length = r.read_u8().await?;
        if username_length == 0 {
            return Err(ProtocolError::UnexpectedByte { pos: 1, byte: 0 });
        }
        let mut username = vec![0u8; username_length as usize];
        r.read_exact(&mut username).await?;

        let password_length = r.read_u8().await?;
        let mut password = vec![0u8; password_length as usize];
        r.read_exact(&mut password).await?;

        Ok(Self {
            version,
            username,
            password,
        })
    }

    /// Write the client [`UsernamePasswordRequest`] into the writer.
    pub async fn write_to<W>(&self, w: &mut W) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = BytesMut::with_capacity(self.serialized_len());
        self.write_to_buf(&mut buf)?;
        w.write_all(&buf).await?;
        Ok(())
    }

    /// Write the client [`UsernamePasswordRequest`] into the buffer.
    pub fn write_to_buf<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        if self.username.is_empty() || self.username.len() > MAX_NAME_LEN {
            return Err(ProtocolError::Unexpected("invalid socks5 username length"));
        }
        if self.password.len() > MAX_NAME_LEN {
            return Err(ProtocolError::Unexpected("invalid socks5 password length"));
        }

        buf.put_u8(self.version.into());
        buf.put_u8(self.username.len() as u8);
        buf.put_slice(&self.username);
        buf.put_u8(self.password.len() as u8);
        buf.put_slice(&self.password);
        Ok(())
    }

    fn serialized_len(&self) -> usize {
        3 + self.username.len() + self.password.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The SOCKS request is formed as follows:
///
/// ```plain
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// `RESOLVE` requests carry the name to resolve as `DOMAINNAME`,
/// `RESOLVE_PTR` requests the address to reverse resolve; both use port 0.
pub struct Request {
    pub version: ProtocolVersion,
    pub command: Command,
    pub destination: Destination,
}

impl Request {
    /// Creates a new SOCKS5 [`Request`].
    #[must_use]
    pub fn new(command: Command, destination: Destination) -> Self {
        Self {
            version: ProtocolVersion::Socks5,
            command,
            destination,
        }
    }

    /// Read the client [`Request`] from the reader.
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

        let command: Command = r.read_u8().await?.into();

        let rsv = r.read_u8().await?;
        if rsv != 0 {
            return Err(ProtocolError::UnexpectedByte { pos: 2, byte: rsv });
        }

        let host = read_host(r, 3).await?;
        let port = r.read_u16().await?;

        Ok(Self {
            version,
            command,
            destination: Destination { host, port },
        })
    }

    /// Write the client [`Request`] into the writer.
    pub async fn write_to<W>(&self, w: &mut W) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = BytesMut::with_capacity(self.serialized_len());
        self.write_to_buf(&mut buf)?;
        w.write_all(&buf).await?;
        Ok(())
    }

    /// Write the client [`Request`] into the buffer.
    ///
    /// Fails for empty domain names or names longer than 255 bytes.
    pub fn write_to_buf<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        if let Host::Name(name) = &self.destination.host
            && (name.is_empty() || name.len() > MAX_NAME_LEN)
        {
            return Err(ProtocolError::Unexpected("invalid socks5 domain name length"));
        }

        buf.put_u8(self.version.into());
        buf.put_u8(self.command.into());
        buf.put_u8(0 /* RSV */);
        write_host_to_buf(&self.destination.host, buf);
        buf.put_u16(self.destination.port);
        Ok(())
    }

    fn serialized_len(&self) -> usize {
        4 + host_length(&self.destination.host) + 2
    }
}
