use std::fmt;

#[derive(Debug)]
/// Error returned when a frame could not be read or written.
pub enum ProtocolError {
    /// An I/O Error during reading or writing of data from I/O.
    IO(std::io::Error),
    /// Unexpected byte at the paired position
    UnexpectedByte { pos: usize, byte: u8 },
    /// Frame was well-formed on the byte level but not acceptable otherwise.
    Unexpected(&'static str),
}

impl ProtocolError {
    /// Returns `true` in case the peer closed the stream before the frame was complete.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::IO(err) if err.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IO(error) => write!(f, "protocol error: I/O: {error}"),
            Self::UnexpectedByte { pos, byte } => {
                write!(
                    f,
                    "protocol error: unexpected byte x'{byte:x}' at position {pos}"
                )
            }
            Self::Unexpected(msg) => {
                write!(f, "protocol error: unexpected: {msg}")
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IO(err) => Some(err as &(dyn std::error::Error + 'static)),
            Self::UnexpectedByte { .. } | Self::Unexpected(_) => None,
        }
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(value: std::io::Error) -> Self {
        Self::IO(value)
    }
}
