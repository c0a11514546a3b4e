use std::path::Path;

use async_trait::async_trait;
use mediasort_common::{CoreResult, FileStats, FrameInfo, MediaInfo, Metadata, SimilarityConfig};

use crate::frame_hasher::hash_frame;

/// Frame decoding and extraction (spec.md §6, "Frame supplier"). The one
/// genuinely out-of-scope piece of the engine: turning file bytes into
/// raw grayscale samples needs a real image/video decoder, which
/// `mediasort-app` supplies via the `image` crate and the teacher's
/// vendored `ffmpeg_cmdline_utils`. Must be deterministic per
/// `(path, config)` — the cache layer relies on that to memoize safely.
#[async_trait]
pub trait FrameSupplier: Send + Sync {
    /// `(duration, frames)`: `duration` is `0.0` for still images; each
    /// frame is `(timestamp, R*R grayscale samples)` with
    /// `R = cfg.hash_resolution`.
    async fn frames(&self, path: &Path, cfg: &SimilarityConfig) -> CoreResult<(f64, Vec<(f64, Vec<u8>)>)>;
}

/// EXIF-like metadata extraction (spec.md §6, "Metadata supplier").
#[async_trait]
pub trait MetadataSupplier: Send + Sync {
    async fn metadata(&self, path: &Path) -> CoreResult<Metadata>;
}

/// Filesystem stat + content fingerprint (spec.md §6, "File-stat
/// supplier"). `content_hash` is the cache key, distinct from the
/// perceptual hash carried in `MediaInfo`.
#[async_trait]
pub trait FileStatSupplier: Send + Sync {
    async fn stat(&self, path: &Path) -> CoreResult<FileStats>;
}

/// Turns a [`FrameSupplier`]'s raw frames into a [`MediaInfo`] by hashing
/// each one (spec.md §4.2). This is the one place raw samples cross into
/// `BitHash`es, so every `FrameSupplier` implementation — real or a test
/// fixture — goes through it rather than constructing `MediaInfo` by hand.
pub async fn fingerprint_media(
    supplier: &dyn FrameSupplier,
    path: &Path,
    cfg: &SimilarityConfig,
) -> CoreResult<MediaInfo> {
    let (duration, raw_frames) = supplier.frames(path, cfg).await?;
    let mut frames = Vec::with_capacity(raw_frames.len());
    for (timestamp, samples) in raw_frames {
        let hash = hash_frame(&samples, cfg.hash_resolution)?;
        frames.push(FrameInfo::new(hash, timestamp));
    }
    Ok(MediaInfo::new(duration, frames))
}
