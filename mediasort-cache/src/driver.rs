use std::path::{Path, PathBuf};

use log::{info, trace};
use sled::Transactional;

use crate::error::{CacheError, CacheResult};

/// The storage abstraction `CacheLayer` is built against (spec.md §4.6:
/// "the abstraction exposes two logical stores per job (`data` and
/// `config`) sharing the same key space"). Kept as a trait so tests can
/// swap in an in-memory fake rather than touch disk, the same reason the
/// teacher's `BaseFsCache` takes its serialization backend as a
/// compile-time enum rather than hardcoding bincode everywhere.
pub trait CacheDriver: Send + Sync {
    fn get_data(&self, key: &[u8]) -> CacheResult<Option<Vec<u8>>>;
    fn get_config(&self, key: &[u8]) -> CacheResult<Option<Vec<u8>>>;
    /// Writes `data` and `config` under `key` in both stores atomically:
    /// a reader must never observe one written without the other.
    fn put(&self, key: &[u8], data: &[u8], config: &[u8]) -> CacheResult<()>;
    fn remove(&self, key: &[u8]) -> CacheResult<()>;
}

impl<T: CacheDriver + ?Sized> CacheDriver for &T {
    fn get_data(&self, key: &[u8]) -> CacheResult<Option<Vec<u8>>> {
        (**self).get_data(key)
    }

    fn get_config(&self, key: &[u8]) -> CacheResult<Option<Vec<u8>>> {
        (**self).get_config(key)
    }

    fn put(&self, key: &[u8], data: &[u8], config: &[u8]) -> CacheResult<()> {
        (**self).put(key, data, config)
    }

    fn remove(&self, key: &[u8]) -> CacheResult<()> {
        (**self).remove(key)
    }
}

/// `sled`-backed [`CacheDriver`]: an embedded, ordered key-value store.
/// Chosen over the teacher's own bincode-on-disk `HashMap` (`BaseFsCache`)
/// because spec.md §4.6 asks for two logical stores sharing one key
/// space with crash-safe durability, which sled's tree model and
/// transactions express directly rather than hand-rolling the
/// tmp-file-rename dance `BaseFsCache::save_inner` performs.
pub struct SledCacheDriver {
    data: sled::Tree,
    config: sled::Tree,
}

impl SledCacheDriver {
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        info!(target: "mediasort_cache", "opening cache store at {}", path.display());
        let db = sled::open(&path).map_err(|source| CacheError::Open { source, path: path.clone() })?;
        let data = db.open_tree("data").map_err(CacheError::Storage)?;
        let config = db.open_tree("config").map_err(CacheError::Storage)?;
        Ok(Self { data, config })
    }
}

impl CacheDriver for SledCacheDriver {
    fn get_data(&self, key: &[u8]) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.data.get(key)?.map(|v| v.to_vec()))
    }

    fn get_config(&self, key: &[u8]) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.config.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], data: &[u8], config: &[u8]) -> CacheResult<()> {
        trace!(target: "mediasort_cache", "writing {} data bytes, {} config bytes", data.len(), config.len());
        (&self.data, &self.config)
            .transaction(|(data_tx, config_tx)| {
                data_tx.insert(key, data)?;
                config_tx.insert(key, config)?;
                Ok::<_, sled::transaction::ConflictableTransactionError<()>>(())
            })
            .map_err(|e| CacheError::Transaction(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> CacheResult<()> {
        self.data.remove(key)?;
        self.config.remove(key)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::{CacheDriver, CacheResult};
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct InMemoryCacheDriver {
        data: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
        config: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    }

    impl CacheDriver for InMemoryCacheDriver {
        fn get_data(&self, key: &[u8]) -> CacheResult<Option<Vec<u8>>> {
            Ok(self.data.lock().get(key).cloned())
        }

        fn get_config(&self, key: &[u8]) -> CacheResult<Option<Vec<u8>>> {
            Ok(self.config.lock().get(key).cloned())
        }

        fn put(&self, key: &[u8], data: &[u8], config: &[u8]) -> CacheResult<()> {
            self.data.lock().insert(key.to_vec(), data.to_vec());
            self.config.lock().insert(key.to_vec(), config.to_vec());
            Ok(())
        }

        fn remove(&self, key: &[u8]) -> CacheResult<()> {
            self.data.lock().remove(key);
            self.config.lock().remove(key);
            Ok(())
        }
    }
}
