use log::warn;
use mediasort_common::{FrameInfo, MediaInfo, SimilarityConfig};

/// Which flavour of comparison applies to a media pair, used both to pick
/// the right similarity function and to pick the adaptive per-pair
/// threshold (spec.md §4.3, "Adaptive threshold").
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MediaKind {
    ImageImage,
    ImageVideo,
    VideoVideo,
}

#[must_use]
pub fn media_kind(a: &MediaInfo, b: &MediaInfo) -> MediaKind {
    match (a.is_video(), b.is_video()) {
        (false, false) => MediaKind::ImageImage,
        (true, true) => MediaKind::VideoVideo,
        _ => MediaKind::ImageVideo,
    }
}

/// The per-pair acceptance threshold for a media pair, per spec.md §4.3.
#[must_use]
pub fn adaptive_threshold(a: &MediaInfo, b: &MediaInfo, cfg: &SimilarityConfig) -> f64 {
    match media_kind(a, b) {
        MediaKind::ImageImage => cfg.image_similarity_threshold,
        MediaKind::ImageVideo => cfg.image_video_similarity_threshold,
        MediaKind::VideoVideo => cfg.video_similarity_threshold,
    }
}

/// Top-level similarity dispatch (spec.md §4.3). Returns a value in
/// `[0, 1]`; `1.0` means identical, `0.0` means maximally different (or
/// one side has no frames at all).
#[must_use]
pub fn similarity(m1: &MediaInfo, m2: &MediaInfo, cfg: &SimilarityConfig) -> f64 {
    match media_kind(m1, m2) {
        MediaKind::ImageImage => match (m1.frames.first(), m2.frames.first()) {
            (Some(a), Some(b)) => image_sim(a, b),
            _ => 0.0,
        },
        MediaKind::ImageVideo => {
            let (image, video) = if m1.is_video() { (m2, m1) } else { (m1, m2) };
            image_video_sim(image, video, cfg.image_video_similarity_threshold)
        }
        MediaKind::VideoVideo => video_sim(m1, m2, cfg),
    }
}

/// `1 - hamming(a, b) / bitlen` (spec.md §4.3). Hashes must share a
/// bit length; that invariant is upheld upstream by `FrameHasher` always
/// using the configured `hashResolution`, so a mismatch here indicates a
/// programmer error and is treated as "no similarity" rather than
/// propagated, matching spec.md §7's `BitlenMismatch` being fatal only at
/// the point it is first detected (hash construction), not at every
/// comparison site.
#[must_use]
pub fn image_sim(a: &FrameInfo, b: &FrameInfo) -> f64 {
    match a.hash.normalized_distance(&b.hash) {
        Ok(d) => {
            let raw = 1.0 - d;
            if !(0.0..=1.0).contains(&raw) {
                warn!("image_sim produced {raw} outside [0, 1], clamping (normalized distance {d})");
            }
            raw.clamp(0.0, 1.0)
        }
        Err(_) => 0.0,
    }
}

/// Maximum `image_sim` between a still image and any frame of a video,
/// terminating early once the running max meets `threshold`
/// (spec.md §4.3).
#[must_use]
pub fn image_video_sim(image: &MediaInfo, video: &MediaInfo, threshold: f64) -> f64 {
    let Some(image_frame) = image.frames.first() else {
        return 0.0;
    };
    if video.frames.is_empty() {
        return 0.0;
    }

    let mut best = 0.0f64;
    for frame in &video.frames {
        let sim = image_sim(image_frame, frame);
        if sim > best {
            best = sim;
        }
        if best >= threshold {
            break;
        }
    }
    best
}

/// Video-video similarity: slide the shorter media's duration as a window
/// across the longer media, compute DTW sequence similarity at each
/// offset, and return the maximum (spec.md §4.3).
#[must_use]
pub fn video_sim(a: &MediaInfo, b: &MediaInfo, cfg: &SimilarityConfig) -> f64 {
    let (shorter, longer) = if a.duration <= b.duration { (a, b) } else { (b, a) };

    if shorter.frames.is_empty() || longer.frames.is_empty() {
        return 0.0;
    }

    let window = shorter.duration;
    let threshold = cfg.video_similarity_threshold;

    if longer.duration <= window {
        // Same-length (or longer is actually the shorter due to a tie):
        // a single comparison over the whole thing.
        return dtw_similarity(&shorter.frames, &longer.frames);
    }

    let mut best = 0.0f64;
    let mut start = 0.0f64;
    while start <= longer.duration - window {
        let windowed = longer.frames_in_window(start, window);
        let windowed_owned: Vec<FrameInfo> = windowed.into_iter().cloned().collect();
        let sim = dtw_similarity(&shorter.frames, &windowed_owned);
        if sim > best {
            best = sim;
        }
        if best >= threshold {
            break;
        }
        start += cfg.step_size;
    }
    best
}

/// Dynamic-time-warping sequence similarity between two frame sequences
/// (spec.md §4.3). Uses a rolling single-row cost array rather than a
/// full `m x n` matrix, which keeps this allocation-light inside a batch
/// worker — the same reason the teacher's `Search::search_one` avoids
/// building intermediate collections in its own hot inner loop
/// (`vid_dup_finder_lib/src/video_hashing/search_algorithm.rs`).
#[must_use]
pub fn dtw_similarity(s1: &[FrameInfo], s2: &[FrameInfo]) -> f64 {
    let (m, n) = (s1.len(), s2.len());
    if m == 0 || n == 0 {
        return 0.0;
    }

    let mut row = vec![f64::INFINITY; n + 1];
    row[0] = 0.0;

    for i in 1..=m {
        let mut prev = row[0];
        row[0] = f64::INFINITY;
        for j in 1..=n {
            let saved = row[j];
            let cost = 1.0 - image_sim(&s1[i - 1], &s2[j - 1]);
            row[j] = cost + prev.min(row[j]).min(row[j - 1]);
            prev = saved;
        }
    }

    let denom = m.max(n) as f64;
    let raw = 1.0 - row[n] / denom;
    if !(0.0..=1.0).contains(&raw) {
        warn!("dtw_similarity produced {raw} outside [0, 1], clamping (cost {}, denom {denom})", row[n]);
    }
    raw.clamp(0.0, 1.0)
}
