use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
};

/// Host part of a SOCKS destination.
///
/// A literal IP address is always represented as [`Host::Address`],
/// any other (non-empty) string is kept verbatim as [`Host::Name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    /// A hostname, to be resolved by whoever ends up connecting to it.
    Name(String),
    /// A literal IPv4 or IPv6 address.
    Address(IpAddr),
}

impl Host {
    /// Parse a host as supplied by a caller.
    ///
    /// IPv6 literals may be enclosed in square brackets.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let unbracketed = s
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(s);
        match unbracketed.parse::<IpAddr>() {
            Ok(ip) => Self::Address(ip),
            Err(_) => Self::Name(s.to_owned()),
        }
    }

    /// Returns the hostname in case this is a [`Host::Name`].
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name.as_str()),
            Self::Address(_) => None,
        }
    }

    /// Returns the ip address in case this is a [`Host::Address`].
    #[must_use]
    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            Self::Name(_) => None,
            Self::Address(ip) => Some(*ip),
        }
    }

    /// Returns the IPv4 address in case this is a literal IPv4 [`Host::Address`].
    #[must_use]
    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            Self::Address(IpAddr::V4(ip)) => Some(*ip),
            Self::Address(IpAddr::V6(_)) | Self::Name(_) => None,
        }
    }
}

impl From<IpAddr> for Host {
    fn from(ip: IpAddr) -> Self {
        Self::Address(ip)
    }
}

impl From<Ipv4Addr> for Host {
    fn from(ip: Ipv4Addr) -> Self {
        Self::Address(ip.into())
    }
}

impl From<Ipv6Addr> for Host {
    fn from(ip: Ipv6Addr) -> Self {
        Self::Address(ip.into())
    }
}

impl From<&str> for Host {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Host {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => name.fmt(f),
            Self::Address(ip) => ip.fmt(f),
        }
    }
}

/// A [`Host`] with an associated port,
/// the target of a SOCKS request or the bound address of its reply.
///
/// ## Examples
///
/// - `example.com:80`
/// - `127.0.0.1:80`
/// - `[::1]:80`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub host: Host,
    pub port: u16,
}

impl Destination {
    /// Creates a new [`Destination`].
    #[must_use]
    pub fn new(host: impl Into<Host>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Creates the unspecified `0.0.0.0` IPv4 [`Destination`] for the given port.
    #[must_use]
    pub const fn default_ipv4(port: u16) -> Self {
        Self {
            host: Host::Address(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port,
        }
    }

    /// Creates the loopback `127.0.0.1` [`Destination`] for the given port.
    #[must_use]
    pub const fn local_ipv4(port: u16) -> Self {
        Self {
            host: Host::Address(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port,
        }
    }

    /// Creates the loopback `::1` [`Destination`] for the given port.
    #[must_use]
    pub const fn local_ipv6(port: u16) -> Self {
        Self {
            host: Host::Address(IpAddr::V6(Ipv6Addr::LOCALHOST)),
            port,
        }
    }
}

impl From<SocketAddr> for Destination {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl From<(Host, u16)> for Destination {
    fn from((host, port): (Host, u16)) -> Self {
        Self { host, port }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Host::Address(IpAddr::V6(ip)) => write!(f, "[{ip}]:{}", self.port),
            host => write!(f, "{host}:{}", self.port),
        }
    }
}
