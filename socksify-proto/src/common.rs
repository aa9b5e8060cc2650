use std::net::IpAddr;

use crate::{AddressType, Host, ProtocolError};
use bytes::BufMut;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Longest name that fits in a single length-prefixed (or capped NUL-terminated) field.
pub(crate) const MAX_NAME_LEN: usize = 255;

pub(crate) fn host_length(host: &Host) -> usize {
    match host {
        Host::Name(name) => 1 + name.len(),
        Host::Address(IpAddr::V4(_)) => 4,
        Host::Address(IpAddr::V6(_)) => 16,
    }
}

pub(crate) fn name_from_bytes(raw: Vec<u8>) -> Result<String, ProtocolError> {
    if raw.is_empty() {
        return Err(ProtocolError::Unexpected("empty domain name"));
    }
    String::from_utf8(raw).map_err(|_err| ProtocolError::Unexpected("domain name is not utf-8"))
}

/// Read an `ATYP | ADDR` pair, `pos` being the offset of the ATYP byte within the frame.
pub(crate) async fn read_host<R: AsyncRead + Unpin>(
    r: &mut R,
    pos: usize,
) -> Result<Host, ProtocolError> {
    let address_type: AddressType = r.read_u8().await?.into();
    let host = match address_type {
        AddressType::IpV4 => {
            let mut array = [0u8; 4];
            r.read_exact(&mut array).await?;
            Host::Address(IpAddr::from(array))
        }
        AddressType::DomainName => {
            let n = r.read_u8().await?;
            if n == 0 {
                return Err(ProtocolError::UnexpectedByte {
                    pos: pos + 1,
                    byte: n,
                });
            }
            let mut raw = vec![0u8; n as usize];
            r.read_exact(&mut raw).await?;
            Host::Name(name_from_bytes(raw)?)
        }
        AddressType::IpV6 => {
            let mut array = [0u8; 16];
            r.read_exact(&mut array).await?;
            Host::Address(IpAddr::from(array))
        }
        AddressType::Unknown(b) => {
            return Err(ProtocolError::UnexpectedByte { pos, byte: b });
        }
    };
    Ok(host)
}

pub(crate) fn write_host_to_buf<B: BufMut>(host: &Host, buf: &mut B) {
    match host {
        Host::Name(name) => {
            buf.put_u8(AddressType::DomainName.into());
            debug_assert!(name.len() <= MAX_NAME_LEN);
            buf.put_u8(name.len() as u8);
            buf.put_slice(name.as_bytes());
        }
        Host::Address(IpAddr::V4(addr)) => {
            buf.put_u8(AddressType::IpV4.into());
            buf.put_slice(&addr.octets());
        }
        Host::Address(IpAddr::V6(addr)) => {
            buf.put_u8(AddressType::IpV6.into());
            buf.put_slice(&addr.octets());
        }
    }
}

/// Read a NUL-terminated field of at most [`MAX_NAME_LEN`] bytes,
/// the terminator is consumed but not returned.
pub(crate) async fn read_nul_terminated<R: AsyncRead + Unpin>(
    r: &mut R,
    pos: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let mut raw = Vec::new();
    loop {
        let byte = r.read_u8().await?;
        if byte == 0 {
            return Ok(raw);
        }
        if raw.len() == MAX_NAME_LEN {
            return Err(ProtocolError::UnexpectedByte {
                pos: pos + raw.len(),
                byte,
            });
        }
        raw.push(byte);
    }
}
