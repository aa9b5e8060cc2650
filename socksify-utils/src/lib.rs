//! utilities crate for socksify
//!
//! `socksify-utils` contains the macros shared by the protocol
//! codec (`socksify-proto`) and the `socksify` client crate.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

#[doc(hidden)]
#[macro_use]
pub mod macros;
