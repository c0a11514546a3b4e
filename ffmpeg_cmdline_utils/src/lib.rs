mod ffmpeg_error_kind;
mod ffmpeg_ops;
mod ffmpeg_stats;

pub use ffmpeg_error_kind::FfmpegError;
pub use ffmpeg_ops::{
    get_video_stats, FfmpegFrameIter, FfmpegFrameIterGray, FfmpegFrameIterRgb, FfmpegFrameReaderBuilder,
};
pub use ffmpeg_stats::{VideoInfo, VideoInfoError};
