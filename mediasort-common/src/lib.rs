#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::todo)]
#![warn(clippy::unimplemented)]
#![warn(clippy::unwrap_used)]

//! # Overview
//!
//! `mediasort_common` holds the data model shared by every other
//! mediasort crate: the bit-vector perceptual hash ([`BitHash`]), the
//! per-frame/per-media hash records ([`FrameInfo`], [`MediaInfo`]), the
//! cached-file record ([`FileInfo`]), and the tunable thresholds that
//! drive similarity scoring and clustering ([`SimilarityConfig`]).
//!
//! Nothing in this crate performs I/O or decodes media; it only defines
//! the shapes that `mediasort-core` computes over and `mediasort-cache`
//! persists.

mod bithash;
mod config;
mod error;
mod fileinfo;
mod frame;

pub use bithash::BitHash;
pub use config::SimilarityConfig;
pub use error::{CoreError, CoreResult};
pub use fileinfo::{FileInfo, FileStats, Metadata};
pub use frame::{FrameInfo, MediaInfo};
