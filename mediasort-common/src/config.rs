use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Tunables for frame hashing, similarity scoring, and clustering
/// (spec.md §3). Every threshold is a fraction in `[0, 1]`.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct SimilarityConfig {
    pub image_similarity_threshold: f64,
    pub image_video_similarity_threshold: f64,
    pub video_similarity_threshold: f64,
    pub step_size: f64,
    pub window_size: f64,
    pub hash_resolution: u32,
    pub scene_change_threshold: f64,
    pub target_fps: f64,
    pub min_frames: u32,
    pub max_scene_frames: u32,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            image_similarity_threshold: 0.90,
            image_video_similarity_threshold: 0.88,
            video_similarity_threshold: 0.85,
            step_size: 1.0,
            window_size: 10.0,
            hash_resolution: 8,
            scene_change_threshold: 0.3,
            target_fps: 1.0,
            min_frames: 5,
            max_scene_frames: 64,
        }
    }
}

impl SimilarityConfig {
    /// The three configured thresholds, for code that needs "all of them"
    /// (e.g. deriving the DBSCAN `eps`, spec.md §4.5).
    #[must_use]
    pub fn thresholds(&self) -> [f64; 3] {
        [
            self.image_similarity_threshold,
            self.image_video_similarity_threshold,
            self.video_similarity_threshold,
        ]
    }

    #[must_use]
    pub fn min_threshold(&self) -> f64 {
        self.thresholds().into_iter().fold(f64::INFINITY, f64::min)
    }

    /// DBSCAN's `eps`, the widest net across all three thresholds
    /// (spec.md §4.3, "Adaptive threshold").
    #[must_use]
    pub fn dbscan_eps(&self) -> f64 {
        1.0 - self.min_threshold()
    }

    /// A canonical, field-order-independent string encoding of this
    /// config, used both as the cache-invalidation fingerprint and for
    /// by-value config comparison.
    ///
    /// Resolves spec.md §9's open question ("field ordering must be
    /// canonical across runs or invalidation will be spuriously
    /// triggered"): each field is written into a `BTreeMap<&str, String>`
    /// keyed by field name, so the map serializes in sorted-key order
    /// regardless of struct declaration order. This generalizes the
    /// teacher's `VdfCacheMetadata::to_disk_fmt`, which joins fields into
    /// one positional string by hand — acceptable there because that
    /// struct never grows, but spec.md's `SimilarityConfig` is exactly the
    /// kind of struct a future change would extend, so the encoding here
    /// is keyed rather than positional.
    pub fn canonical_fingerprint(&self) -> CoreResult<String> {
        let mut fields = BTreeMap::new();
        fields.insert("image_similarity_threshold", fmt_f64(self.image_similarity_threshold)?);
        fields.insert(
            "image_video_similarity_threshold",
            fmt_f64(self.image_video_similarity_threshold)?,
        );
        fields.insert("video_similarity_threshold", fmt_f64(self.video_similarity_threshold)?);
        fields.insert("step_size", fmt_f64(self.step_size)?);
        fields.insert("window_size", fmt_f64(self.window_size)?);
        fields.insert("hash_resolution", self.hash_resolution.to_string());
        fields.insert("scene_change_threshold", fmt_f64(self.scene_change_threshold)?);
        fields.insert("target_fps", fmt_f64(self.target_fps)?);
        fields.insert("min_frames", self.min_frames.to_string());
        fields.insert("max_scene_frames", self.max_scene_frames.to_string());

        serde_json::to_string(&fields).map_err(|e| CoreError::ConfigEncoding {
            field: "<all>",
            reason: e.to_string(),
        })
    }
}

fn fmt_f64(v: f64) -> CoreResult<String> {
    if !v.is_finite() {
        return Err(CoreError::ConfigEncoding {
            field: "<f64 field>",
            reason: format!("{v} is not finite"),
        });
    }
    // Fixed precision so that e.g. 0.9 and 0.90000000000000002 (a common
    // artifact of round-tripping through a CLI arg parser) fingerprint
    // identically.
    Ok(format!("{v:.9}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_across_identical_configs() {
        let a = SimilarityConfig::default();
        let b = SimilarityConfig::default();
        assert_eq!(a.canonical_fingerprint().unwrap(), b.canonical_fingerprint().unwrap());
    }

    #[test]
    fn fingerprint_changes_when_any_field_changes() {
        let a = SimilarityConfig::default();
        let mut b = a;
        b.hash_resolution += 1;
        assert_ne!(a.canonical_fingerprint().unwrap(), b.canonical_fingerprint().unwrap());
    }

    #[test]
    fn dbscan_eps_uses_widest_threshold() {
        let mut cfg = SimilarityConfig::default();
        cfg.image_similarity_threshold = 0.9;
        cfg.image_video_similarity_threshold = 0.7;
        cfg.video_similarity_threshold = 0.8;
        assert!((cfg.dbscan_eps() - 0.3).abs() < 1e-9);
    }
}
