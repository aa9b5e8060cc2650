//! hidden socksify macros

#[doc(hidden)]
#[macro_use]
pub mod enums;
