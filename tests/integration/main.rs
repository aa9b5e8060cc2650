//! End-to-end tests against a SOCKS proxy listening on loopback.

use socksify::{ProxyConfig, ProxyEndpoint, SocksVersion, config::ambient};
use tokio::sync::{Mutex, MutexGuard};

mod proxy;

mod connect;
mod resolve;
mod scope;

static AMBIENT: Mutex<()> = Mutex::const_new(());

/// Serialises tests touching the process-wide config,
/// starting each of them from the default config.
async fn ambient_guard() -> MutexGuard<'static, ()> {
    let guard = AMBIENT.lock().await;
    ambient::replace(ProxyConfig::default());
    guard
}

fn endpoint(port: u16, version: SocksVersion) -> ProxyEndpoint {
    ProxyEndpoint::new("127.0.0.1", port)
        .unwrap()
        .with_version(version)
}
