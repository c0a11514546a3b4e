use serde::{Deserialize, Serialize};

use crate::bithash::BitHash;

/// One hashed frame, at a point in time. Still images have exactly one
/// frame with `timestamp == 0.0` (spec.md §3).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct FrameInfo {
    pub hash: BitHash,
    pub timestamp: f64,
}

impl FrameInfo {
    pub fn new(hash: BitHash, timestamp: f64) -> Self {
        debug_assert!(timestamp >= 0.0, "frame timestamps are non-negative");
        Self { hash, timestamp }
    }
}

/// The hashed form of a single photo or video: its duration (0 for
/// images) and its ordered frame sequence (never empty for valid media;
/// an empty sequence is represented by `MediaFingerprint`/`CoreError::EmptyFrames`
/// at the boundary where it is produced, not by a type invariant here, since
/// the similarity kernel must still be able to score against a stale or
/// partially-failed fingerprint per spec.md §7).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration: f64,
    pub frames: Vec<FrameInfo>,
}

impl MediaInfo {
    pub fn new(duration: f64, frames: Vec<FrameInfo>) -> Self {
        Self { duration, frames }
    }

    #[must_use]
    pub const fn is_video(&self) -> bool {
        self.duration > 0.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames whose timestamp falls within `[start, start + window]`,
    /// inclusive, in original order. Used by the sliding-window step of
    /// `videoSim` (spec.md §4.3).
    #[must_use]
    pub fn frames_in_window(&self, start: f64, window: f64) -> Vec<&FrameInfo> {
        self.frames
            .iter()
            .filter(|f| f.timestamp >= start && f.timestamp <= start + window)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bithash::BitHash;

    #[test]
    fn frames_in_window_is_inclusive_on_both_ends() {
        let frames = (0..10)
            .map(|i| FrameInfo::new(BitHash::zero(64), f64::from(i)))
            .collect();
        let media = MediaInfo::new(9.0, frames);
        let windowed = media.frames_in_window(2.0, 4.0);
        let timestamps: Vec<_> = windowed.iter().map(|f| f.timestamp).collect();
        assert_eq!(timestamps, vec![2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn image_media_is_not_a_video() {
        let media = MediaInfo::new(0.0, vec![FrameInfo::new(BitHash::zero(64), 0.0)]);
        assert!(!media.is_video());
    }
}
