use std::path::Path;

use async_trait::async_trait;
use mediasort_cache::{CacheError, CacheResult, Compute};
use mediasort_common::{FileInfo, SimilarityConfig};
use mediasort_core::{fingerprint_media, FileStatSupplier, FrameSupplier, MetadataSupplier};

/// The single `Compute` the cache layer memoizes: assemble a [`FileInfo`]
/// from the three external collaborators (spec.md §9, "Polymorphism ...
/// collapses to a single generic `CachedJob<Config, Result>`").
pub struct FileInfoCompute<F, M, S> {
    pub frame_supplier: F,
    pub metadata_supplier: M,
    pub stat_supplier: S,
    pub config: SimilarityConfig,
}

#[async_trait]
impl<F, M, S> Compute for FileInfoCompute<F, M, S>
where
    F: FrameSupplier,
    M: MetadataSupplier,
    S: FileStatSupplier,
{
    type Output = FileInfo;

    async fn compute(&self, path: &Path) -> CacheResult<FileInfo> {
        let file_stats = self
            .stat_supplier
            .stat(path)
            .await
            .map_err(|e| CacheError::Compute { path: path.to_path_buf(), source: Box::new(e) })?;

        let metadata = self
            .metadata_supplier
            .metadata(path)
            .await
            .map_err(|e| CacheError::Compute { path: path.to_path_buf(), source: Box::new(e) })?;

        let media = fingerprint_media(&self.frame_supplier, path, &self.config)
            .await
            .map_err(|e| CacheError::Compute { path: path.to_path_buf(), source: Box::new(e) })?;

        Ok(FileInfo { path: path.to_path_buf(), file_stats, metadata, media })
    }
}
