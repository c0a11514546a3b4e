use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::frame::MediaInfo;

/// Cheap, externally-supplied filesystem facts about a file (spec.md §6,
/// "File-stat supplier"). `content_hash` is a short byte-level fingerprint
/// distinct from the perceptual hash carried in `media`; it is what keys
/// the cache layer.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FileStats {
    pub size: u64,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub content_hash: [u8; 16],
}

/// Optional EXIF-like metadata (spec.md §6, "Metadata supplier").
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub image_date: Option<SystemTime>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub camera_model: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Metadata {
    #[must_use]
    pub const fn has_gps(&self) -> bool {
        self.gps_lat.is_some() && self.gps_lon.is_some()
    }

    #[must_use]
    pub const fn has_dimensions(&self) -> bool {
        self.width.is_some() && self.height.is_some()
    }

    #[must_use]
    pub fn pixel_count(&self) -> Option<u64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(u64::from(w) * u64::from(h)),
            _ => None,
        }
    }
}

/// A single cached, never-mutated result of processing one source file
/// (spec.md §3). `path` is relative to whichever source directory it was
/// discovered under.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_stats: FileStats,
    pub metadata: Metadata,
    pub media: MediaInfo,
}

impl FileInfo {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
