use std::path::PathBuf;

use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

/// Mirrors the teacher's per-crate `FsCacheErrorKind`
/// (`vid_dup_finder_app/src/video_hash_filesystem_cache/generic_filesystem_cache/errors.rs`),
/// generalized to an embedded-KV-store backend instead of a single
/// bincode file.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("error opening cache store at {path}: {source}")]
    Open { source: sled::Error, path: PathBuf },

    #[error("error accessing cache tree: {0}")]
    Storage(#[from] sled::Error),

    #[error("failed to serialize cache entry: {0}")]
    Serialization(String),

    #[error("failed to deserialize cache entry: {0}")]
    Deserialization(String),

    #[error("cache store transaction failed: {0}")]
    Transaction(String),

    #[error("compute job failed for {path}: {source}")]
    Compute {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
