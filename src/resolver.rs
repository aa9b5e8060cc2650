//! Name resolution performed by the proxy.
//!
//! Every lookup opens a dedicated connection to the proxy, runs a single
//! `RESOLVE` or `RESOLVE_PTR` handshake on it and closes it again.

use crate::{
    client::SocksClient,
    config::{ConfigSource, ProxyConfig, ProxyEndpoint},
    connector::{ConnectionOpener, TcpOpener},
    error::{ErrorKind, SocksError},
};
use socksify_proto::Host;
use std::{fmt, net::IpAddr, sync::Arc};
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Answer of [`Resolver::resolve`].
pub enum Resolved {
    /// Address of a resolved name.
    Address(IpAddr),
    /// Name of a reverse resolved address.
    Name(String),
}

impl Resolved {
    /// Returns the address in case a name was resolved.
    #[must_use]
    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            Self::Address(ip) => Some(*ip),
            Self::Name(_) => None,
        }
    }

    /// Returns the name in case an address was reverse resolved.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Address(_) => None,
            Self::Name(name) => Some(name),
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(ip) => ip.fmt(f),
            Self::Name(name) => name.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Resolves names and addresses through the proxy of its [`ProxyConfig`].
///
/// Unlike connections, lookups are never done locally: without a proxy
/// they fail with [`ErrorKind::NoProxyConfigured`]. The ignore set
/// does not apply to them.
pub struct Resolver<O = TcpOpener> {
    inner: O,
    source: ConfigSource,
}

impl Resolver {
    /// Creates a new [`Resolver`] connecting to the proxy over TCP,
    /// using the ambient proxy configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<O> Resolver<O> {
    /// Creates a new [`Resolver`] using the given opener to connect to the proxy.
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
}

impl<O: ConnectionOpener> Resolver<O> {
    /// Resolve `host` on the proxy.
    ///
    /// A literal ip address (ipv6 optionally in square brackets) is reverse
    /// resolved into [`Resolved::Name`], any other host is resolved
    /// into [`Resolved::Address`]. Both go through the proxy.
    pub async fn resolve(&self, host: &str) -> Result<Resolved, SocksError> {
        match Host::parse(host) {
            Host::Address(ip) => self.resolve_reverse(ip).await.map(Resolved::Name),
            Host::Name(name) => self.resolve_name(&name).await.map(Resolved::Address),
        }
    }

    /// Resolve `name` into an address on the proxy.
    ///
    /// The name is sent as is, even if it is an ip literal.
    pub async fn resolve_name(&self, name: &str) -> Result<IpAddr, SocksError> {
        let config = self.source.load();
        let proxy = proxy_of(&config)?;
        let client = SocksClient::from_endpoint(proxy).with_debug(config.debug());

        let mut conn = self.open_proxy(proxy).await?;
        let result = client.handshake_resolve(&mut conn, name).await;
        close(conn, config.debug()).await;

        debug_event!(config.debug(), %name, ?result, "socksify: resolved through proxy");
        result
    }

    /// Resolve `ip` into a name on the proxy.
    pub async fn resolve_reverse(&self, ip: IpAddr) -> Result<String, SocksError> {
        let config = self.source.load();
        let proxy = proxy_of(&config)?;
        let client = SocksClient::from_endpoint(proxy).with_debug(config.debug());

        let mut conn = self.open_proxy(proxy).await?;
        let result = client.handshake_resolve_ptr(&mut conn, ip).await;
        close(conn, config.debug()).await;

        debug_event!(config.debug(), %ip, ?result, "socksify: reverse resolved through proxy");
        result
    }

    async fn open_proxy(&self, proxy: &ProxyEndpoint) -> Result<O::Connection, SocksError> {
        self.inner
            .open(&proxy.host().to_string(), proxy.port())
            .await
            .map_err(|err| SocksError::transport(err).with_context("open proxy connection"))
    }
}

fn proxy_of(config: &ProxyConfig) -> Result<&ProxyEndpoint, SocksError> {
    config.proxy().ok_or_else(|| {
        SocksError::new(ErrorKind::NoProxyConfigured).with_context("resolve through proxy")
    })
}

async fn close<S: AsyncWrite + Unpin>(mut conn: S, debug: bool) {
    if let Err(err) = conn.shutdown().await {
        debug_event!(debug, %err, "socksify: failed to shut down proxy connection");
    }
}
