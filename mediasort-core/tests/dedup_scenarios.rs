//! End-to-end coverage of the dedup scenarios (spec.md §8) through the
//! whole `Engine`, not just the component each one stresses hardest.
//! S1 (exact duplicates), S4 (distinct media), and S6 (cross-batch merge)
//! already have inline coverage next to the code they exercise
//! (`engine.rs`, `dbscan.rs`); this file fills the gaps: S2 (image
//! near-duplicate), S3 end-to-end (image-video live-photo pair), and S5
//! end-to-end (video windowed match) — mirroring the teacher's own
//! `tests/test_find_all.rs`, which drives whole-corpus scenarios through
//! the public API rather than an internal module.

use std::sync::Arc;
use std::time::SystemTime;

use mediasort_common::{BitHash, FileInfo, FileStats, FrameInfo, MediaInfo, Metadata, SimilarityConfig};
use mediasort_core::Engine;

fn file_stats() -> FileStats {
    FileStats { size: 1_000_000, mtime: SystemTime::UNIX_EPOCH, ctime: SystemTime::UNIX_EPOCH, content_hash: [0; 16] }
}

fn still_image(path: &str, hash: BitHash, metadata: Metadata) -> Arc<FileInfo> {
    Arc::new(FileInfo {
        path: path.into(),
        file_stats: file_stats(),
        metadata,
        media: MediaInfo::new(0.0, vec![FrameInfo::new(hash, 0.0)]),
    })
}

fn video(path: &str, duration: f64, frames: Vec<(f64, BitHash)>) -> Arc<FileInfo> {
    Arc::new(FileInfo {
        path: path.into(),
        file_stats: file_stats(),
        metadata: Metadata::default(),
        media: MediaInfo::new(duration, frames.into_iter().map(|(t, h)| FrameInfo::new(h, t)).collect()),
    })
}

/// An all-ones 64-bit hash with `flip` bit positions toggled off, giving
/// an exact, reproducible Hamming distance from an otherwise-identical
/// all-ones hash (`flip.len()` bits).
fn hash_flipped(flip: &[usize]) -> BitHash {
    BitHash::from_bits(64, |i| !flip.contains(&i))
}

#[tokio::test]
async fn s2_image_near_duplicate_clusters_together() {
    // A.jpg and a re-encoded A2.jpg whose hash differs by 3 of 64 bits,
    // well inside `(1 - imageSimilarityThreshold) * bitlen` = 0.10 * 64 = 6.4.
    let a = still_image("A.jpg", hash_flipped(&[]), Metadata::default());
    let a2 = still_image("A2.jpg", hash_flipped(&[0, 1, 2]), Metadata::default());

    let engine = Engine::new(SimilarityConfig::default());
    let result = engine.run(vec![a, a2]).await;

    assert!(result.unique_files.is_empty(), "near-duplicate pair should not be unique: {result:?}");
    assert_eq!(result.duplicate_sets.len(), 1);
    let set = &result.duplicate_sets[0];
    assert_eq!(set.representatives.len() + set.duplicates.len(), 2);
}

#[tokio::test]
async fn s3_image_video_live_photo_pair_through_engine() {
    // photo.heic and a 3-frame photo.mov whose first frame matches the
    // still within `imageVideoSimilarityThreshold`; the still is at least
    // as high-resolution as the video and equally (un)dated, so it
    // qualifies as a "potential capture" and survives as a co-representative.
    let shared_metadata = Metadata { width: Some(100), height: Some(100), ..Metadata::default() };
    let still_hash = hash_flipped(&[]);
    let still = still_image("photo.heic", still_hash.clone(), shared_metadata.clone());

    let matching_frame = hash_flipped(&[0, 1]);
    let unrelated_frame = hash_flipped(&(0..32).collect::<Vec<_>>());
    let clip = video(
        "photo.mov",
        3.0,
        vec![(0.0, matching_frame), (1.0, unrelated_frame.clone()), (2.0, unrelated_frame)],
    );

    let engine = Engine::new(SimilarityConfig::default());
    let result = engine.run(vec![still, clip]).await;

    assert!(result.unique_files.is_empty());
    assert_eq!(result.duplicate_sets.len(), 1);
    let set = &result.duplicate_sets[0];
    assert_eq!(set.best_file, std::path::PathBuf::from("photo.mov"), "video wins on duration bonus");
    assert!(
        set.representatives.contains(&std::path::PathBuf::from("photo.heic")),
        "still qualifies as a potential capture, not a plain duplicate: {set:?}"
    );
}

#[tokio::test]
async fn s5_video_windowed_match_through_engine() {
    // A 30-second video V and a 10-second clip C extracted from
    // V[10..20]: C's frames are bit-identical to V's frames over that
    // window, everywhere else V uses an unrelated pattern, so the
    // windowed search should only align well at offset ~10s.
    let base = hash_flipped(&[]);
    let window_pattern = hash_flipped(&(0..32).collect::<Vec<_>>());

    let v_frames: Vec<(f64, BitHash)> = (0..30)
        .map(|t| {
            let hash = if (10..20).contains(&t) { window_pattern.clone() } else { base.clone() };
            (t as f64, hash)
        })
        .collect();
    let v = video("V.mp4", 29.0, v_frames);

    let c_frames: Vec<(f64, BitHash)> = (0..10).map(|t| (t as f64, window_pattern.clone())).collect();
    let c = video("C.mp4", 9.0, c_frames);

    let engine = Engine::new(SimilarityConfig::default());
    let result = engine.run(vec![v, c]).await;

    assert!(result.unique_files.is_empty(), "windowed match should cluster V and C: {result:?}");
    assert_eq!(result.duplicate_sets.len(), 1);
    let set = &result.duplicate_sets[0];
    assert_eq!(set.best_file, std::path::PathBuf::from("V.mp4"), "longer video wins on duration bonus");
}
