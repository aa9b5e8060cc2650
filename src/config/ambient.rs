//! Process-wide proxy configuration and its scoped overrides.
//!
//! There are two ways to override the proxy for a piece of code:
//!
//! - [`with_scope`] / [`with_scope_sync`] (or a [`ProxyScope`] guard) swap the
//!   process-wide proxy and restore the previous one once the body ends,
//!   however it ends: by returning, by failing, by panicking or, for a
//!   future, by being dropped. The override is visible to every task in the
//!   process, so concurrent global scopes race: the last one entered wins
//!   until it is left, and scopes that are left out of order restore
//!   each other's proxy.
//! - [`with_task_scope`] / [`with_task_proxy`] install a [`ProxyConfig`] for
//!   one future only, using a tokio task-local. Other tasks are unaffected,
//!   and the override is not inherited by tasks spawned from within the body.
//!
//! Lookups go through [`current`]: the innermost task scope if there is one,
//! the process-wide config otherwise. Only the proxy is restored by a global
//! scope, changes to the ignore set or debug flag made within it persist.
//!
//! The ignore set helpers ([`add_ignore_host`], [`remove_ignore_host`],
//! [`is_ignored`] and [`ignored_hosts`]) all work on the process-wide set,
//! also from within a task scope. Connections made in a task scope
//! consult the ignore set of that scope's config instead.

use super::{ProxyConfig, ProxyEndpoint};
use parking_lot::RwLock;
use std::{
    future::Future,
    sync::{Arc, OnceLock},
};

fn global() -> &'static RwLock<Arc<ProxyConfig>> {
    static GLOBAL: OnceLock<RwLock<Arc<ProxyConfig>>> = OnceLock::new();
    GLOBAL.get_or_init(Default::default)
}

tokio::task_local! {
    static TASK_CONFIG: Arc<ProxyConfig>;
}

/// The [`ProxyConfig`] in effect for the caller.
#[must_use]
pub fn current() -> Arc<ProxyConfig> {
    TASK_CONFIG
        .try_with(Arc::clone)
        .unwrap_or_else(|_| snapshot())
}

/// The process-wide [`ProxyConfig`], ignoring task scopes.
#[must_use]
pub fn snapshot() -> Arc<ProxyConfig> {
    global().read().clone()
}

/// Modify the process-wide [`ProxyConfig`] in place.
pub fn update<R>(f: impl FnOnce(&mut ProxyConfig) -> R) -> R {
    let mut config = global().write();
    f(Arc::make_mut(&mut config))
}

/// Replace the process-wide [`ProxyConfig`], returning the previous one.
pub fn replace(config: ProxyConfig) -> Arc<ProxyConfig> {
    std::mem::replace(&mut *global().write(), Arc::new(config))
}

/// Install the process-wide proxy, returning the previous one.
pub fn set_proxy(endpoint: ProxyEndpoint) -> Option<ProxyEndpoint> {
    let address = endpoint.address().clone();
    let version = endpoint.version();
    let (previous, debug) = update(|config| (config.proxy.replace(endpoint), config.debug));
    debug_event!(debug, proxy = %address, %version, "socksify: proxy set");
    previous
}

/// Remove the process-wide proxy, returning the previous one.
pub fn clear_proxy() -> Option<ProxyEndpoint> {
    let (previous, debug) = update(|config| (config.proxy.take(), config.debug));
    debug_event!(debug, "socksify: proxy cleared");
    previous
}

/// The proxy in effect for the caller, if any.
#[must_use]
pub fn get_proxy() -> Option<ProxyEndpoint> {
    current().proxy().cloned()
}

/// Let connections to `host` bypass the process-wide proxy.
///
/// Returns `false` if `host` was already ignored.
/// Task scopes entered before the call do not see the change.
pub fn add_ignore_host(host: impl Into<String>) -> bool {
    update(|config| config.ignores.insert(host))
}

/// Returns `false` if `host` was not ignored.
pub fn remove_ignore_host(host: &str) -> bool {
    update(|config| config.ignores.remove(host))
}

/// Returns `true` if `host` is in the process-wide ignore set.
#[must_use]
pub fn is_ignored(host: &str) -> bool {
    snapshot().ignores().contains(host)
}

/// Hosts in the process-wide ignore set, in no particular order.
#[must_use]
pub fn ignored_hosts() -> Vec<String> {
    snapshot().ignores().iter().map(ToOwned::to_owned).collect()
}

/// Toggle the process-wide debug events.
pub fn set_debug(debug: bool) {
    update(|config| config.debug = debug);
}

/// Returns `true` if debug events are enabled for the caller.
#[must_use]
pub fn debug() -> bool {
    current().debug()
}

#[derive(Debug)]
#[must_use = "the previous proxy is restored as soon as the scope is dropped"]
/// Guard of a process-wide proxy override.
///
/// The proxy in effect before [`ProxyScope::enter`] is restored on drop.
pub struct ProxyScope {
    previous: Option<ProxyEndpoint>,
}

impl ProxyScope {
    /// Install `endpoint` (or no proxy at all) as the process-wide proxy.
    pub fn enter(endpoint: Option<ProxyEndpoint>) -> Self {
        let (previous, debug) = update(|config| {
            (
                std::mem::replace(&mut config.proxy, endpoint),
                config.debug,
            )
        });
        debug_event!(
            debug,
            previous = ?previous.as_ref().map(ProxyEndpoint::address),
            "socksify: proxy scope entered"
        );
        Self { previous }
    }
}

impl Drop for ProxyScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let debug = update(|config| {
            config.proxy = previous;
            config.debug
        });
        debug_event!(debug, "socksify: proxy scope left");
    }
}

/// Run `body` with `endpoint` as the process-wide proxy.
///
/// The scope starts when the returned future is first polled
/// and ends when it completes or is dropped.
pub async fn with_scope<F: Future>(endpoint: ProxyEndpoint, body: F) -> F::Output {
    let _scope = ProxyScope::enter(Some(endpoint));
    body.await
}

/// Run `body` with `endpoint` as the process-wide proxy.
pub fn with_scope_sync<R>(endpoint: ProxyEndpoint, body: impl FnOnce() -> R) -> R {
    let _scope = ProxyScope::enter(Some(endpoint));
    body()
}

/// Run `body` with `config` in effect for ambient lookups made by it,
/// without touching the process-wide state.
pub async fn with_task_scope<F: Future>(config: ProxyConfig, body: F) -> F::Output {
    TASK_CONFIG.scope(Arc::new(config), body).await
}

/// Like [`with_task_scope`], using the [`current`] config
/// with its proxy replaced by `endpoint`.
pub async fn with_task_proxy<F: Future>(endpoint: ProxyEndpoint, body: F) -> F::Output {
    let mut config = ProxyConfig::clone(&current());
    config.set_proxy(Some(endpoint));
    with_task_scope(config, body).await
}

#[cfg(test)]
static TEST_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Serialises unit tests that touch the process-wide state,
/// resetting it to the default config.
#[cfg(test)]
pub(crate) async fn test_guard() -> tokio::sync::MutexGuard<'static, ()> {
    let guard = TEST_LOCK.lock().await;
    replace(ProxyConfig::default());
    guard
}

#[cfg(test)]
fn blocking_test_guard() -> tokio::sync::MutexGuard<'static, ()> {
    let guard = TEST_LOCK.blocking_lock();
    replace(ProxyConfig::default());
    guard
}
