//! Proxy configuration: which proxy to use, which hosts bypass it,
//! and whether diagnostics are emitted.
//!
//! A [`ProxyConfig`] is a plain value. It can be handed to a connector
//! or resolver explicitly ([`ConfigSource::Fixed`]), or looked up at call
//! time from the process-wide state and task scopes ([`ConfigSource::Ambient`]),
//! see the [`ambient`] module.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

mod endpoint;
pub use endpoint::{ConfigError, ProxyEndpoint, SocksAuth, SocksVersion};

mod ignore;
pub use ignore::IgnoreSet;

pub mod ambient;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Snapshot of the proxy settings used for a connection or resolution.
///
/// The default value has no proxy, an empty ignore set and debug disabled.
pub struct ProxyConfig {
    proxy: Option<ProxyEndpoint>,
    ignores: IgnoreSet,
    debug: bool,
}

impl ProxyConfig {
    /// Creates a new [`ProxyConfig`] without proxy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the proxy to tunnel through.
    #[must_use]
    pub fn with_proxy(mut self, endpoint: ProxyEndpoint) -> Self {
        self.proxy = Some(endpoint);
        self
    }

    /// Set or clear the proxy to tunnel through.
    pub fn set_proxy(&mut self, endpoint: Option<ProxyEndpoint>) -> &mut Self {
        self.proxy = endpoint;
        self
    }

    /// Add a host that bypasses the proxy.
    #[must_use]
    pub fn with_ignore(mut self, host: impl Into<String>) -> Self {
        self.ignores.insert(host);
        self
    }

    /// Replace the [`IgnoreSet`].
    #[must_use]
    pub fn with_ignores(mut self, ignores: IgnoreSet) -> Self {
        self.ignores = ignores;
        self
    }

    /// Enable or disable debug events.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable or disable debug events.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&ProxyEndpoint> {
        self.proxy.as_ref()
    }

    #[must_use]
    pub fn ignores(&self) -> &IgnoreSet {
        &self.ignores
    }

    pub fn ignores_mut(&mut self) -> &mut IgnoreSet {
        &mut self.ignores
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The proxy a connection to `host` has to go through,
    /// `None` if there is no proxy or `host` is ignored.
    #[must_use]
    pub fn proxy_for(&self, host: &str) -> Option<&ProxyEndpoint> {
        self.proxy
            .as_ref()
            .filter(|_| !self.ignores.contains(host))
    }
}

#[derive(Debug, Clone, Default)]
/// Where a connector or resolver takes its [`ProxyConfig`] from.
pub enum ConfigSource {
    #[default]
    /// Look up [`ambient::current`] at the start of every operation.
    Ambient,
    /// Always use this config.
    Fixed(Arc<ProxyConfig>),
}

impl ConfigSource {
    /// The [`ProxyConfig`] to use for an operation starting now.
    #[must_use]
    pub fn load(&self) -> Arc<ProxyConfig> {
        match self {
            Self::Ambient => ambient::current(),
            Self::Fixed(config) => config.clone(),
        }
    }
}

impl From<ProxyConfig> for ConfigSource {
    fn from(config: ProxyConfig) -> Self {
        Self::Fixed(Arc::new(config))
    }
}

impl From<Arc<ProxyConfig>> for ConfigSource {
    fn from(config: Arc<ProxyConfig>) -> Self {
        Self::Fixed(config)
    }
}
