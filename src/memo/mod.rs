//! Memoization Module
//!
//! Key derivation strategies and the wrapper that memoizes asynchronous
//! operations on top of the shared cache store.

mod key;
mod memoize;

pub use key::{
    argument_list, ArgPath, CacheKeySpec, KeyDeriver, KeyGenerator, DEFAULT_TTL, KEY_DELIMITER,
};
pub use memoize::Memoized;
