//! SOCKS4 and SOCKS4a frames.
//!
//! SOCKS4 has no RFC, the de-facto references are
//! [SOCKS4](https://www.openssh.com/txt/socks4.protocol) and
//! [SOCKS4a](https://www.openssh.com/txt/socks4a.protocol).

use std::net::Ipv4Addr;

use crate::{
    ProtocolError, ProtocolVersion, Socks4Command, Socks4Status,
    common::{MAX_NAME_LEN, name_from_bytes, read_nul_terminated},
};
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// `DSTIP` used by SOCKS4a to signal that a hostname follows the user id.
///
/// Any `0.0.0.x` with `x != 0` qualifies, this crate always writes `0.0.0.1`.
pub const SOCKS4A_NAME_MARKER: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 1);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Destination as expressible in a SOCKS4(a) request.
pub enum Target {
    /// Plain SOCKS4 destination.
    Ipv4(Ipv4Addr),
    /// SOCKS4a destination, resolved by the server.
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Client request, for SOCKS4 and SOCKS4a alike.
///
/// ```plain
/// +----+-----+---------+-------+----------------+----------------------+
/// | VN | CMD | DSTPORT | DSTIP | USERID ... NUL | [HOSTNAME ... NUL]   |
/// +----+-----+---------+-------+----------------+----------------------+
/// | 1  |  1  |    2    |   4   |    variable    | variable (4a only)   |
/// +----+-----+---------+-------+----------------+----------------------+
/// ```
pub struct Request {
    pub command: Socks4Command,
    pub port: u16,
    pub target: Target,
    pub user_id: Vec<u8>,
}

impl Request {
    /// Creates a new [`Request`] without a user id.
    #[must_use]
    pub fn new(command: Socks4Command, target: Target, port: u16) -> Self {
        Self {
            command,
            port,
            target,
            user_id: Vec::new(),
        }
    }

    /// Set the USERID field of this [`Request`].
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<Vec<u8>>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Read the [`Request`], decoded from its binary format, from the reader.
    pub async fn read_from<R>(r: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let version: ProtocolVersion = r.read_u8().await?.into();
        if version != ProtocolVersion::Socks4 {
            return Err(ProtocolError::UnexpectedByte {
                pos: 0,
                byte: version.into(),
            });
        }

        let command: Socks4Command = r.read_u8().await?.into();
        let port = r.read_u16().await?;
        let mut ip = [0u8; 4];
        r.read_exact(&mut ip).await?;
        let ip = Ipv4Addr::from(ip);

        let user_id = read_nul_terminated(r, 8).await?;

        let [a, b, c, d] = ip.octets();
        let target = if a == 0 && b == 0 && c == 0 && d != 0 {
            let raw = read_nul_terminated(r, 9 + user_id.len()).await?;
            Target::Name(name_from_bytes(raw)?)
        } else {
            Target::Ipv4(ip)
        };

        Ok(Self {
            command,
            port,
            target,
            user_id,
        })
    }

    /// Write the [`Request`] in binary format into the writer.
    pub async fn write_to<W>(&self, w: &mut W) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = BytesMut::with_capacity(self.serialized_len());
        self.write_to_buf(&mut buf)?;
        w.write_all(&buf).await?;
        Ok(())
    }

    /// Write the [`Request`] in binary format into the buffer.
    ///
    /// Fails in case a variable field contains a NUL byte or is too long.
    pub fn write_to_buf<B: BufMut>(&self, buf: &mut B) -> Result<(), ProtocolError> {
        if self.user_id.contains(&0) || self.user_id.len() > MAX_NAME_LEN {
            return Err(ProtocolError::Unexpected("invalid socks4 user id"));
        }

        buf.put_u8(ProtocolVersion::Socks4.into());
        buf.put_u8(self.command.into());
        buf.put_u16(self.port);
        match &self.target {
            Target::Ipv4(ip) => {
                buf.put_slice(&ip.octets());
                buf.put_slice(&self.user_id);
                buf.put_u8(0);
            }
            Target::Name(name) => {
                if name.is_empty() || name.len() > MAX_NAME_LEN || name.as_bytes().contains(&0) {
                    return Err(ProtocolError::Unexpected("invalid socks4a hostname"));
                }
                buf.put_slice(&SOCKS4A_NAME_MARKER.octets());
                buf.put_slice(&self.user_id);
                buf.put_u8(0);
                buf.put_slice(name.as_bytes());
                buf.put_u8(0);
            }
        }
        Ok(())
    }

    fn serialized_len(&self) -> usize {
        let name_len = match &self.target {
            Target::Ipv4(_) => 0,
            Target::Name(name) => name.len() + 1,
        };
        8 + self.user_id.len() + 1 + name_len
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Server reply to a SOCKS4(a) request.
///
/// ```plain
/// +----+--------+---------+-------+---------------------------+
/// | VN | STATUS | DSTPORT | DSTIP | [HOSTNAME ... NUL]        |
/// +----+--------+---------+-------+---------------------------+
/// | 1  |   1    |    2    |   4   | variable (RESOLVE_PTR)    |
/// +----+--------+---------+-------+---------------------------+
/// ```
///
/// `VN` is the reply version and always `0x00`.
/// The trailing hostname is only present in a granted reply
/// to a [`Socks4Command::ResolvePtr`] request.
pub struct Reply {
    pub status: Socks4Status,
    pub port: u16,
    pub ip: Ipv4Addr,
    pub hostname: Option<String>,
}

impl Reply {
    /// Creates a new [`Reply`] without trailing hostname.
    #[must_use]
    pub fn new(status: Socks4Status, ip: Ipv4Addr, port: u16) -> Self {
        Self {
            status,
            port,
            ip,
            hostname: None,
        }
    }

    /// Read the fixed 8-byte [`Reply`] from the reader.
    pub async fn read_from<R>(r: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let version = r.read_u8().await?;
        if version != 0 {
            return Err(ProtocolError::UnexpectedByte {
                pos: 0,
                byte: version,
            });
        }

        let status: Socks4Status = r.read_u8().await?.into();
        let port = r.read_u16().await?;
        let mut ip = [0u8; 4];
        r.read_exact(&mut ip).await?;

        Ok(Self {
            status,
            port,
            ip: ip.into(),
            hostname: None,
        })
    }

    /// Read a [`Reply`] to a [`Socks4Command::ResolvePtr`] request,
    /// which, when granted, is followed by a NUL-terminated hostname.
    pub async fn read_with_hostname_from<R>(r: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mut reply = Self::read_from(r).await?;
        if reply.status == Socks4Status::Granted {
            let raw = read_nul_terminated(r, 8).await?;
            reply.hostname = Some(name_from_bytes(raw)?);
        }
        Ok(reply)
    }

    /// Write the [`Reply`] in binary format into the writer.
    pub async fn write_to<W>(&self, w: &mut W) -> Result<(), std::io::Error>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = BytesMut::with_capacity(self.serialized_len());
        self.write_to_buf(&mut buf);
        w.write_all(&buf).await?;
        Ok(())
    }

    /// Write the [`Reply`] in binary format into the buffer.
    pub fn write_to_buf<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(0);
        buf.put_u8(self.status.into());
        buf.put_u16(self.port);
        buf.put_slice(&self.ip.octets());
        if let Some(hostname) = &self.hostname {
            buf.put_slice(hostname.as_bytes());
            buf.put_u8(0);
        }
    }

    fn serialized_len(&self) -> usize {
        8 + self.hostname.as_ref().map(|h| h.len() + 1).unwrap_or_default()
    }
}
