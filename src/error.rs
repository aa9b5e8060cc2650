//! Error types returned by socksify.
//!
//! Every failure, be it a proxy reply, a malformed frame or a transport
//! fault, surfaces as a [`SocksError`]. Match on [`SocksError::kind`]
//! to find out which member of the taxonomy it is.

use socksify_proto::{ProtocolError, ReplyKind, Socks4Status};
use std::fmt;

/// Alias for a type-erased error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Classification of a [`SocksError`].
pub enum ErrorKind {
    /// Proxy-side failure with no more specific cause.
    GeneralServerFailure,
    /// The proxy ruleset denies the request,
    /// or no authentication method (or credential) was accepted.
    NotAllowed,
    NetworkUnreachable,
    /// Target unreachable, also used when a resolve command found no answer.
    HostUnreachable,
    ConnectionRefused,
    TtlExpired,
    CommandNotSupported,
    AddressTypeNotSupported,
    /// SOCKS4: the proxy could not reach the identd of the client.
    IdentdUnreachable,
    /// SOCKS4: identd reported a different user id than the one in the request.
    IdentdDiffer,
    /// Malformed or truncated reply, unexpected version byte
    /// or a method selected by the proxy that was not offered.
    ProtocolError,
    /// Reply code not known to this crate.
    UnknownError(u8),
    /// The target cannot be expressed by the selected SOCKS version,
    /// e.g. a hostname for plain SOCKS4 or a name longer than 255 bytes.
    InvalidTarget,
    /// A resolve was requested without a proxy being configured.
    NoProxyConfigured,
    /// I/O failure while opening or writing to a connection.
    Transport,
}

impl ErrorKind {
    /// Map a SOCKS5 reply onto an [`ErrorKind`],
    /// `None` in case of [`ReplyKind::Succeeded`].
    #[must_use]
    pub fn from_socks5_reply(reply: ReplyKind) -> Option<Self> {
        Some(match reply {
            ReplyKind::Succeeded => return None,
            ReplyKind::GeneralServerFailure => Self::GeneralServerFailure,
            ReplyKind::ConnectionNotAllowed => Self::NotAllowed,
            ReplyKind::NetworkUnreachable => Self::NetworkUnreachable,
            ReplyKind::HostUnreachable => Self::HostUnreachable,
            ReplyKind::ConnectionRefused => Self::ConnectionRefused,
            ReplyKind::TtlExpired => Self::TtlExpired,
            ReplyKind::CommandNotSupported => Self::CommandNotSupported,
            ReplyKind::AddressTypeNotSupported => Self::AddressTypeNotSupported,
            ReplyKind::Unknown(code) => Self::UnknownError(code),
        })
    }

    /// Map a SOCKS4 reply status onto an [`ErrorKind`],
    /// `None` in case of [`Socks4Status::Granted`].
    #[must_use]
    pub fn from_socks4_status(status: Socks4Status) -> Option<Self> {
        Some(match status {
            Socks4Status::Granted => return None,
            Socks4Status::Rejected => Self::NotAllowed,
            Socks4Status::IdentdUnreachable => Self::IdentdUnreachable,
            Socks4Status::IdentdDiffer => Self::IdentdDiffer,
            Socks4Status::Unknown(code) => Self::UnknownError(code),
        })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeneralServerFailure => f.write_str("general SOCKS server failure"),
            Self::NotAllowed => f.write_str("connection not allowed by ruleset"),
            Self::NetworkUnreachable => f.write_str("network unreachable"),
            Self::HostUnreachable => f.write_str("host unreachable"),
            Self::ConnectionRefused => f.write_str("connection refused"),
            Self::TtlExpired => f.write_str("TTL expired"),
            Self::CommandNotSupported => f.write_str("command not supported"),
            Self::AddressTypeNotSupported => f.write_str("address type not supported"),
            Self::IdentdUnreachable => f.write_str("identd unreachable"),
            Self::IdentdDiffer => f.write_str("identd reported a different user id"),
            Self::ProtocolError => f.write_str("protocol error"),
            Self::UnknownError(code) => write!(f, "unknown reply code x'{code:x}'"),
            Self::InvalidTarget => f.write_str("invalid target for socks version"),
            Self::NoProxyConfigured => f.write_str("no proxy configured"),
            Self::Transport => f.write_str("transport error"),
        }
    }
}

/// Error returned by the handshake engine, the connector and the resolver.
pub struct SocksError {
    kind: ErrorKind,
    context: Option<&'static str>,
    source: Option<BoxError>,
}

impl SocksError {
    /// Creates a new [`SocksError`] of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
            source: None,
        }
    }

    pub(crate) fn transport(err: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Transport).with_source(err)
    }

    /// Error for a frame that could not be read from the proxy.
    pub(crate) fn read(err: ProtocolError) -> Self {
        Self::new(ErrorKind::ProtocolError).with_source(err)
    }

    /// Error for a frame that could not be written to the proxy:
    /// an I/O failure is a transport fault, anything else
    /// means the frame could not be encoded for this target.
    pub(crate) fn write(err: ProtocolError) -> Self {
        let kind = match err {
            ProtocolError::IO(_) => ErrorKind::Transport,
            ProtocolError::UnexpectedByte { .. } | ProtocolError::Unexpected(_) => {
                ErrorKind::InvalidTarget
            }
        };
        Self::new(kind).with_source(err)
    }

    #[must_use]
    pub(crate) fn with_context(mut self, context: &'static str) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub(crate) fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The [`ErrorKind`] of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Static description of the step that failed, if known.
    #[must_use]
    pub fn context(&self) -> Option<&'static str> {
        self.context
    }

    /// Returns `true` in case the proxy reported the target as unreachable
    /// (or unresolvable).
    #[must_use]
    pub fn is_host_unreachable(&self) -> bool {
        self.kind == ErrorKind::HostUnreachable
    }

    /// Returns `true` in case the proxy (ruleset) denied the request.
    #[must_use]
    pub fn is_not_allowed(&self) -> bool {
        self.kind == ErrorKind::NotAllowed
    }
}

impl fmt::Debug for SocksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocksError")
            .field("kind", &self.kind)
            .field("context", &self.context)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for SocksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = self.context.unwrap_or("no context");
        match &self.source {
            Some(source) => write!(f, "socks error: {}: {source} ({context})", self.kind),
            None => write!(f, "socks error: {} ({context})", self.kind),
        }
    }
}

impl std::error::Error for SocksError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<ErrorKind> for SocksError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_socks5_reply_mapping() {
        assert_eq!(ErrorKind::from_socks5_reply(ReplyKind::Succeeded), None);
        for (code, kind) in [
            (0x01, ErrorKind::GeneralServerFailure),
            (0x02, ErrorKind::NotAllowed),
            (0x03, ErrorKind::NetworkUnreachable),
            (0x04, ErrorKind::HostUnreachable),
            (0x05, ErrorKind::ConnectionRefused),
            (0x06, ErrorKind::TtlExpired),
            (0x07, ErrorKind::CommandNotSupported),
            (0x08, ErrorKind::AddressTypeNotSupported),
            (0x09, ErrorKind::UnknownError(0x09)),
            (0xff, ErrorKind::UnknownError(0xff)),
        ] {
            assert_eq!(
                ErrorKind::from_socks5_reply(ReplyKind::from(code)),
                Some(kind),
                "code: {code:#04x}"
            );
        }
    }

    #[test]
    fn test_socks4_status_mapping() {
        assert_eq!(ErrorKind::from_socks4_status(Socks4Status::Granted), None);
        assert_eq!(
            ErrorKind::from_socks4_status(Socks4Status::from(0x5B)),
            Some(ErrorKind::NotAllowed)
        );
        assert_eq!(
            ErrorKind::from_socks4_status(Socks4Status::from(0x5C)),
            Some(ErrorKind::IdentdUnreachable)
        );
        assert_eq!(
            ErrorKind::from_socks4_status(Socks4Status::from(0x5D)),
            Some(ErrorKind::IdentdDiffer)
        );
        assert_eq!(
            ErrorKind::from_socks4_status(Socks4Status::from(0x00)),
            Some(ErrorKind::UnknownError(0x00))
        );
    }

    #[test]
    fn test_write_error_classification() {
        let err = SocksError::write(ProtocolError::IO(std::io::ErrorKind::BrokenPipe.into()));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.source().is_some());

        let err = SocksError::write(ProtocolError::Unexpected("invalid socks4a hostname"));
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
    }

    #[test]
    fn test_display() {
        let err = SocksError::new(ErrorKind::NotAllowed).with_context("read socks4 reply");
        assert_eq!(
            err.to_string(),
            "socks error: connection not allowed by ruleset (read socks4 reply)"
        );
        assert!(err.is_not_allowed());
        assert!(!err.is_host_unreachable());
    }
}
