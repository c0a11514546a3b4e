use std::path::PathBuf;

use clap::Parser;
use mediasort_common::SimilarityConfig;

/// How noisy stderr logging is (mirrors `vid_dup_finder_app::app::app_cfg::ReportVerbosity`).
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Default,
    Verbose,
}

/// Finds duplicate photos and videos under `source` and copies the unique
/// survivors into `destination` following `--path-template` (spec.md §6,
/// "CLI surface"). Options below govern `SimilarityConfig`; see each flag's
/// help text for the spec.md §4 component it tunes.
#[derive(Parser, Debug)]
#[command(name = "mediasort", version, about)]
pub struct Cli {
    /// Directory tree to scan for photos and videos.
    pub source: PathBuf,

    /// Directory unique/representative files are copied into.
    pub destination: PathBuf,

    /// Hamming similarity required for two still images to match, in [0, 1].
    #[arg(long, default_value_t = SimilarityConfig::default().image_similarity_threshold)]
    pub image_similarity_threshold: f64,

    /// Similarity required for a still image to match a video's frame.
    #[arg(long, default_value_t = SimilarityConfig::default().image_video_similarity_threshold)]
    pub image_video_similarity_threshold: f64,

    /// Similarity required for two videos to match within a sliding window.
    #[arg(long, default_value_t = SimilarityConfig::default().video_similarity_threshold)]
    pub video_similarity_threshold: f64,

    /// Seconds between successive windows in the video sliding-window scan.
    #[arg(long, default_value_t = SimilarityConfig::default().step_size)]
    pub step_size: f64,

    /// Width in seconds of each video comparison window.
    #[arg(long, default_value_t = SimilarityConfig::default().window_size)]
    pub window_size: f64,

    /// Side length of the square grayscale frame each hash is computed over.
    #[arg(long, default_value_t = SimilarityConfig::default().hash_resolution)]
    pub hash_resolution: u32,

    /// Minimum relative brightness delta between frames to call a scene change.
    #[arg(long, default_value_t = SimilarityConfig::default().scene_change_threshold)]
    pub scene_change_threshold: f64,

    /// Frames per second sampled from video when extracting the hash sequence.
    #[arg(long, default_value_t = SimilarityConfig::default().target_fps)]
    pub target_fps: f64,

    /// Minimum number of frames a video must yield to be fingerprinted.
    #[arg(long, default_value_t = SimilarityConfig::default().min_frames)]
    pub min_frames: u32,

    /// Maximum number of frames retained per video fingerprint.
    #[arg(long, default_value_t = SimilarityConfig::default().max_scene_frames)]
    pub max_scene_frames: u32,

    /// Destination path template. Placeholders: {year} {month} {day} {stem}
    /// {ext} {filename} {kind} {camera} {geo} {rand}.
    #[arg(long, default_value = "{year}/{month}/{kind}/{filename}")]
    pub path_template: String,

    /// Directory the fingerprint cache is stored in. Defaults to a
    /// `.mediasort-cache` directory under `destination`.
    #[arg(long)]
    pub cache_path: Option<PathBuf>,

    /// File extensions to skip (without the leading dot).
    #[arg(long, value_delimiter = ',')]
    pub exclude_extensions: Vec<String>,

    /// Number of files processed concurrently. Defaults to cores - 1.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// DBSCAN batch size (spec.md §4.5).
    #[arg(long, default_value_t = 2048)]
    pub batch_size: usize,

    /// Byte threshold above which content hashing samples head+tail instead
    /// of the whole file (spec.md §6).
    #[arg(long, default_value_t = 8 * 1024 * 1024)]
    pub max_chunk_size: u64,

    #[arg(long, value_enum, default_value_t = Verbosity::Default)]
    pub verbosity: Verbosity,
}

impl Cli {
    #[must_use]
    pub fn similarity_config(&self) -> SimilarityConfig {
        SimilarityConfig {
            image_similarity_threshold: self.image_similarity_threshold,
            image_video_similarity_threshold: self.image_video_similarity_threshold,
            video_similarity_threshold: self.video_similarity_threshold,
            step_size: self.step_size,
            window_size: self.window_size,
            hash_resolution: self.hash_resolution,
            scene_change_threshold: self.scene_change_threshold,
            target_fps: self.target_fps,
            min_frames: self.min_frames,
            max_scene_frames: self.max_scene_frames,
        }
    }
}
