use std::path::PathBuf;

use thiserror::Error;

/// Top-level application error (mirrors `vid_dup_finder_app::app::errors::AppError`'s
/// split between argument/filesystem/cache-origin failures). `run()` reports
/// this and maps it to exit code 1; an interrupt exits 130 without reaching here.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("source path not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("source and destination are the same path: {0}")]
    SourceIsDestination(PathBuf),

    #[error("failed to open cache store at {path}")]
    CacheOpen { path: PathBuf, #[source] source: mediasort_cache::CacheError },

    #[error("failed to copy {src} to {dst}")]
    Transfer { src: PathBuf, dst: PathBuf, #[source] source: std::io::Error },

    #[error("config error: {0}")]
    Config(String),
}

pub type AppResult<T> = Result<T, AppError>;
