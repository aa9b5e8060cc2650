//! 🧦 socksify: transparent SOCKS4, SOCKS4a and SOCKS5 client for tokio.
//!
//! Connections and name lookups are tunneled through a SOCKS proxy,
//! with control over when proxying applies:
//!
//! - a process-wide proxy, see [`set_proxy`] and [`clear_proxy`];
//! - scoped overrides that are always undone, see [`with_scope`]
//!   and, isolated per task, [`with_task_scope`];
//! - hosts that bypass the proxy, see [`add_ignore_host`];
//! - explicit per-connector configuration, see [`SocksConnector::with_config`].
//!
//! ```no_run
//! # async fn run() -> Result<(), socksify::SocksError> {
//! use socksify::{ProxyEndpoint, SocksVersion};
//! use tokio::io::AsyncWriteExt;
//!
//! socksify::set_proxy(
//!     ProxyEndpoint::new("127.0.0.1", 9050)
//!         .expect("valid proxy endpoint")
//!         .with_version(SocksVersion::V5),
//! );
//! socksify::add_ignore_host("localhost");
//!
//! let mut conn = socksify::connect("example.com", 80).await?;
//! assert!(conn.is_proxied());
//! conn.write_all(b"GET / HTTP/1.0\r\n\r\n").await.ok();
//!
//! let ip = socksify::resolve_name("example.com").await?;
//! let name = socksify::resolve_reverse(ip).await?;
//!
//! // a literal address is reverse resolved
//! let answer = socksify::resolve("93.184.216.34").await?;
//! assert_eq!(answer.as_name(), Some(name.as_str()));
//! # Ok(())
//! # }
//! ```
//!
//! Besides `CONNECT`, the `RESOLVE` and `RESOLVE_PTR` extensions
//! (popularised by Tor) are supported for both SOCKS4a and SOCKS5.
//! The wire frames themselves live in the `socksify-proto` crate.
//!
//! Debug events are emitted using [`tracing`], only when enabled
//! with [`set_debug`] (or [`ProxyConfig::with_debug`]). Credentials are never logged.

#![warn(
    clippy::all,
    clippy::todo,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::mem_forget,
    clippy::unused_self,
    clippy::needless_continue,
    clippy::needless_borrow,
    clippy::match_wildcard_for_single_variants,
    clippy::if_let_mutex,
    clippy::await_holding_lock,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::fn_params_excessive_bools,
    clippy::exit,
    clippy::inefficient_to_string,
    clippy::macro_use_imports,
    clippy::option_option,
    clippy::unnested_or_patterns,
    clippy::str_to_string,
    rust_2018_idioms,
    future_incompatible,
    nonstandard_style,
    missing_debug_implementations
)]
#![deny(unreachable_pub)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

use std::net::IpAddr;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

/// Emit a [`tracing::debug!`] event if the debug flag is set.
macro_rules! debug_event {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::debug!($($arg)+);
        }
    };
}

pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod resolver;

#[doc(inline)]
pub use client::SocksClient;
#[doc(inline)]
pub use config::{
    ConfigError, ConfigSource, IgnoreSet, ProxyConfig, ProxyEndpoint, SocksAuth, SocksVersion,
    ambient::{
        ProxyScope, add_ignore_host, clear_proxy, get_proxy, is_ignored, remove_ignore_host,
        set_debug, set_proxy, with_scope, with_scope_sync, with_task_proxy, with_task_scope,
    },
};
#[doc(inline)]
pub use connector::{
    ConnectionOpener, MaybeProxiedConnection, OpenerFn, SocksConnector, TcpOpener, opener_fn,
};
#[doc(inline)]
pub use error::{BoxError, ErrorKind, SocksError};
#[doc(inline)]
pub use resolver::{Resolved, Resolver};

pub use socksify_proto::{Destination, Host};

/// A stream is a type that implements `AsyncRead`, `AsyncWrite` and `Send`.
pub trait Stream: AsyncRead + AsyncWrite + Send + 'static {}

impl<T> Stream for T where T: AsyncRead + AsyncWrite + Send + 'static {}

/// Open a TCP connection to `host:port`, through the ambient proxy if one applies.
///
/// See [`SocksConnector::connect`].
pub async fn connect(
    host: &str,
    port: u16,
) -> Result<MaybeProxiedConnection<TcpStream>, SocksError> {
    SocksConnector::new().connect(host, port).await
}

/// Resolve `host` through the ambient proxy: a name into an address,
/// a literal address into a name.
///
/// See [`Resolver::resolve`].
pub async fn resolve(host: &str) -> Result<Resolved, SocksError> {
    Resolver::new().resolve(host).await
}

/// Resolve `name` into an address through the ambient proxy.
///
/// See [`Resolver::resolve_name`].
pub async fn resolve_name(name: &str) -> Result<IpAddr, SocksError> {
    Resolver::new().resolve_name(name).await
}

/// Reverse resolve `ip` through the ambient proxy.
///
/// See [`Resolver::resolve_reverse`].
pub async fn resolve_reverse(ip: IpAddr) -> Result<String, SocksError> {
    Resolver::new().resolve_reverse(ip).await
}
