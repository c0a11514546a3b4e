#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::todo)]
#![warn(clippy::unimplemented)]
#![warn(clippy::unwrap_used)]

//! # Overview
//!
//! `mediasort_cache` memoizes the expensive, per-file `FileInfo`
//! computation (frame decode + hashing + metadata read) behind a
//! content-hash key, with per-key single-flight locking
//! ([`single_flight`]) and invalidation keyed on a config fingerprint
//! rather than mtime ([`cache_layer`]). Storage is abstracted behind
//! [`driver::CacheDriver`], concretely backed by `sled`
//! ([`driver::SledCacheDriver`]).

mod cache_layer;
mod driver;
mod error;
mod single_flight;

pub use cache_layer::{CacheLayer, Compute};
pub use driver::{CacheDriver, SledCacheDriver};
pub use error::{CacheError, CacheResult};
