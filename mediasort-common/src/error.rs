use thiserror::Error;

/// Error kinds shared by every mediasort crate.
///
/// Mirrors spec.md §7: most of these are local to a single file or pair of
/// files and never abort the whole run; `BitlenMismatch` is the one
/// programmer-error variant that is fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("bit hashes have different lengths: {lhs} bits vs {rhs} bits")]
    BitlenMismatch { lhs: usize, rhs: usize },

    /// spec.md §7 `UnreadableInput`: missing file, permission denied, or a
    /// decoder refusal from a collaborator (`FrameSupplier`,
    /// `MetadataSupplier`, `FileStatSupplier`). Localized to the one file;
    /// never aborts the run.
    #[error("could not read {path}: {reason}")]
    Unreadable { path: std::path::PathBuf, reason: String },

    #[error("frame buffer is empty, cannot derive a hash")]
    EmptyFrames,

    #[error("config field {field} could not be canonically encoded: {reason}")]
    ConfigEncoding { field: &'static str, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
