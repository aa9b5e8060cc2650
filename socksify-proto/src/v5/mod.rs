//! SOCKS5 frames as defined by [RFC 1928] and [RFC 1929].
//!
//! [RFC 1928]: https://datatracker.ietf.org/doc/html/rfc1928
//! [RFC 1929]: https://datatracker.ietf.org/doc/html/rfc1929

pub mod client;
pub mod server;
