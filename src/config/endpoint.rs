use socksify_proto::{Destination, Host, SocksMethod};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
/// SOCKS protocol version spoken with a proxy.
pub enum SocksVersion {
    /// SOCKS4, which can only connect to IPv4 literals.
    V4,
    /// SOCKS4a, which can pass hostnames on to the proxy.
    V4A,
    #[default]
    /// SOCKS5 ([RFC 1928](https://datatracker.ietf.org/doc/html/rfc1928)).
    V5,
}

impl SocksVersion {
    /// Returns `true` if destinations can be given by name,
    /// leaving resolution to the proxy.
    #[must_use]
    pub fn supports_hostnames(self) -> bool {
        !matches!(self, Self::V4)
    }

    /// URI scheme for this version.
    #[must_use]
    pub fn scheme(self) -> &'static str {
        match self {
            Self::V4 => "socks4",
            Self::V4A => "socks4a",
            Self::V5 => "socks5",
        }
    }

    fn from_scheme(scheme: &str) -> Option<Self> {
        if scheme.eq_ignore_ascii_case("socks4") {
            Some(Self::V4)
        } else if scheme.eq_ignore_ascii_case("socks4a") {
            Some(Self::V4A)
        } else if scheme.eq_ignore_ascii_case("socks5") || scheme.eq_ignore_ascii_case("socks5h")
        {
            Some(Self::V5)
        } else {
            None
        }
    }
}

impl fmt::Display for SocksVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

#[derive(Clone, PartialEq, Eq)]
/// Credentials presented to the proxy.
pub enum SocksAuth {
    /// Username/Password Authentication for SOCKS V5.
    ///
    /// SOCKS4 has no authentication, there only the username
    /// is sent as the `USERID` field.
    ///
    /// Reference: [RFC 1929](https://datatracker.ietf.org/doc/html/rfc1929)
    UsernamePassword { username: String, password: String },
}

impl SocksAuth {
    /// Use Username/Password authentication.
    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UsernamePassword {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Username of the credential.
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::UsernamePassword { username, .. } => username,
        }
    }

    /// Return the [`SocksMethod`] linked to this authentication type.
    #[must_use]
    pub fn socks5_method(&self) -> SocksMethod {
        match self {
            Self::UsernamePassword { .. } => SocksMethod::UsernamePassword,
        }
    }
}

impl fmt::Debug for SocksAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Error returned for an invalid [`ProxyEndpoint`].
pub enum ConfigError {
    /// The host part is empty.
    EmptyHost,
    /// No port was given.
    MissingPort,
    /// The port is not a number in `[1, 65535]`.
    InvalidPort(String),
    /// The scheme does not name a supported SOCKS version.
    UnknownScheme(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHost => f.write_str("proxy endpoint: empty host"),
            Self::MissingPort => f.write_str("proxy endpoint: port is required"),
            Self::InvalidPort(port) => write!(f, "proxy endpoint: invalid port '{port}'"),
            Self::UnknownScheme(scheme) => {
                write!(f, "proxy endpoint: unsupported scheme '{scheme}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Address of a SOCKS proxy, with the version to speak and optional credentials.
///
/// Parsed from and rendered as `[scheme://][user[:pass]@]host:port`,
/// where the scheme is one of `socks4`, `socks4a`, `socks5` or `socks5h`.
/// Without scheme SOCKS5 is assumed.
pub struct ProxyEndpoint {
    address: Destination,
    version: SocksVersion,
    auth: Option<SocksAuth>,
}

impl ProxyEndpoint {
    /// Creates a new SOCKS5 [`ProxyEndpoint`] without credentials.
    pub fn new(host: impl AsRef<str>, port: u16) -> Result<Self, ConfigError> {
        let host = host.as_ref();
        if host.is_empty() || host == "[]" {
            return Err(ConfigError::EmptyHost);
        }
        if port == 0 {
            return Err(ConfigError::InvalidPort(port.to_string()));
        }
        Ok(Self {
            address: Destination::new(Host::parse(host), port),
            version: SocksVersion::default(),
            auth: None,
        })
    }

    /// Set the [`SocksVersion`] to speak with this proxy.
    #[must_use]
    pub fn with_version(mut self, version: SocksVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the [`SocksAuth`] credentials presented to this proxy.
    #[must_use]
    pub fn with_auth(mut self, auth: SocksAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Host and port of the proxy.
    #[must_use]
    pub fn address(&self) -> &Destination {
        &self.address
    }

    #[must_use]
    pub fn host(&self) -> &Host {
        &self.address.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.address.port
    }

    #[must_use]
    pub fn version(&self) -> SocksVersion {
        self.version
    }

    #[must_use]
    pub fn auth(&self) -> Option<&SocksAuth> {
        self.auth.as_ref()
    }
}

impl TryFrom<&str> for ProxyEndpoint {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (version, rest) = match value.split_once("://") {
            Some((scheme, rest)) => (
                SocksVersion::from_scheme(scheme)
                    .ok_or_else(|| ConfigError::UnknownScheme(scheme.to_owned()))?,
                rest,
            ),
            None => (SocksVersion::default(), value),
        };

        let (auth, address) = match rest.rsplit_once('@') {
            Some((user_info, address)) => {
                let (username, password) = user_info.split_once(':').unwrap_or((user_info, ""));
                (Some(SocksAuth::username_password(username, password)), address)
            }
            None => (None, rest),
        };

        let (host, port) = split_host_port(address)?;
        let Ok(port) = port.parse::<u16>() else {
            return Err(ConfigError::InvalidPort(port.to_owned()));
        };

        let endpoint = Self::new(host, port)?.with_version(version);
        Ok(match auth {
            Some(auth) => endpoint.with_auth(auth),
            None => endpoint,
        })
    }
}

fn split_host_port(address: &str) -> Result<(&str, &str), ConfigError> {
    if address.starts_with('[') {
        // bracketed ipv6 literal
        let end = address.find(']').ok_or(ConfigError::MissingPort)?;
        let port = address[end + 1..]
            .strip_prefix(':')
            .ok_or(ConfigError::MissingPort)?;
        return Ok((&address[..=end], port));
    }
    address.rsplit_once(':').ok_or(ConfigError::MissingPort)
}

impl TryFrom<String> for ProxyEndpoint {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.as_str().try_into()
    }
}

impl FromStr for ProxyEndpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.try_into()
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.version)?;
        if let Some(SocksAuth::UsernamePassword { username, password }) = &self.auth {
            if password.is_empty() {
                write!(f, "{username}@")?;
            } else {
                write!(f, "{username}:{password}@")?;
            }
        }
        self.address.fmt(f)
    }
}

impl serde::Serialize for ProxyEndpoint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for ProxyEndpoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
