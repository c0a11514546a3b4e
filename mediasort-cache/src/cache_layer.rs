use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, trace};
use serde::{de::DeserializeOwned, Serialize};

use crate::driver::CacheDriver;
use crate::error::{CacheError, CacheResult};
use crate::single_flight::SingleFlight;

/// The plug-in computation a [`CacheLayer`] memoizes (spec.md §9:
/// "Polymorphism between `BaseFileInfoJob` subclasses ... collapses to a
/// single generic `CachedJob<Config, Result>`"). One `Compute`
/// implementation per kind of expensive per-file work (here, just
/// "build a `FileInfo`", but the shape supports more).
#[async_trait]
pub trait Compute: Send + Sync {
    type Output: Serialize + DeserializeOwned + Clone + Send + Sync;

    async fn compute(&self, path: &Path) -> CacheResult<Self::Output>;
}

/// Content-keyed memoization with per-key single-flight and
/// config-fingerprint invalidation (spec.md §4.6).
///
/// `process(path)` is keyed by `content_hash`, not `path`: a renamed but
/// byte-identical file still hits the cache, and a path reused for
/// different bytes correctly misses. Each stored entry also records the
/// config fingerprint active when it was produced; on lookup, a mismatch
/// against the live config is treated exactly like a cache miss, mirroring
/// `ProcessingFsCache::get_update_action`'s `UpdateAction::Update` path
/// but comparing config identity instead of mtime.
pub struct CacheLayer<D, C> {
    driver: D,
    compute: C,
    config_fingerprint: String,
    in_flight: SingleFlight<[u8; 16]>,
}

impl<D, C> CacheLayer<D, C>
where
    D: CacheDriver,
    C: Compute,
{
    pub fn new(driver: D, compute: C, config_fingerprint: String) -> Self {
        Self { driver, compute, config_fingerprint, in_flight: SingleFlight::default() }
    }

    /// Memoized `process(path) -> Output` (spec.md §4.6). `content_hash`
    /// is supplied by the caller (produced by the file-stat supplier,
    /// spec.md §6) since computing it is itself I/O this layer doesn't
    /// perform.
    pub async fn process(&self, path: &Path, content_hash: [u8; 16]) -> CacheResult<C::Output> {
        let lock = self.in_flight.lock_for(&content_hash);
        let _guard = lock.lock().await;

        if let Some(hit) = self.lookup(&content_hash)? {
            trace!(target: "mediasort_cache", "cache hit for {}", path.display());
            return Ok(hit);
        }

        debug!(target: "mediasort_cache", "cache miss for {}, recomputing", path.display());
        let value = self.compute.compute(path).await.map_err(|e| CacheError::Compute {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        self.store(&content_hash, &value)?;
        Ok(value)
    }

    fn lookup(&self, key: &[u8; 16]) -> CacheResult<Option<C::Output>> {
        let Some(stored_fingerprint) = self.driver.get_config(key)? else {
            return Ok(None);
        };
        let stored_fingerprint =
            String::from_utf8(stored_fingerprint).map_err(|e| CacheError::Deserialization(e.to_string()))?;
        if stored_fingerprint != self.config_fingerprint {
            return Ok(None);
        }

        let Some(bytes) = self.driver.get_data(key)? else {
            return Ok(None);
        };
        let value = bincode::deserialize(&bytes).map_err(|e| CacheError::Deserialization(e.to_string()))?;
        Ok(Some(value))
    }

    fn store(&self, key: &[u8; 16], value: &C::Output) -> CacheResult<()> {
        let bytes = bincode::serialize(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.driver.put(key, &bytes, self.config_fingerprint.as_bytes())
    }
}

impl<D, C> CacheLayer<D, C>
where
    D: CacheDriver,
    C: Compute,
    C::Output: 'static,
{
    /// Convenience for callers that want an `Arc` out rather than an
    /// owned clone (the engine holds many `Arc<FileInfo>` around
    /// concurrently and wants to avoid re-cloning large fingerprints).
    pub async fn process_shared(&self, path: &Path, content_hash: [u8; 16]) -> CacheResult<Arc<C::Output>> {
        self.process(path, content_hash).await.map(Arc::new)
    }
}
