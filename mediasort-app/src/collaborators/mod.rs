mod compute;
mod file_stat_supplier;
mod frame_supplier;
mod metadata_supplier;

pub use compute::FileInfoCompute;
pub use file_stat_supplier::RealFileStatSupplier;
pub use frame_supplier::RealFrameSupplier;
pub use metadata_supplier::RealMetadataSupplier;
