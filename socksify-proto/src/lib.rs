//! SOCKS wire protocol building blocks for socksify.
//!
//! This crate contains no I/O policy of its own: every frame knows how
//! to write itself into a buffer or writer, and how to read itself from
//! an async reader, consuming exactly its framed length.
//!
//! - [`v4`]: SOCKS4 and SOCKS4a, including the `RESOLVE` (`0xF0`) and
//!   `RESOLVE_PTR` (`0xF1`) extensions;
//! - [`v5`]: SOCKS5 as defined by [RFC 1928] and [RFC 1929],
//!   including the same resolve extensions.
//!
//! The `socksify` crate drives these frames as a client. Server-side
//! frames can also be written, which is what test proxies use.
//!
//! [RFC 1928]: https://datatracker.ietf.org/doc/html/rfc1928
//! [RFC 1929]: https://datatracker.ietf.org/doc/html/rfc1929

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod v4;
pub mod v5;

mod address;
pub use address::{Destination, Host};

mod enums;
pub use enums::{
    AddressType, Command, ProtocolVersion, ReplyKind, Socks4Command, Socks4Status, SocksMethod,
    UsernamePasswordSubnegotiationVersion,
};

mod error;
pub use error::ProtocolError;

mod common;
