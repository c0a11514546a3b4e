use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use mediasort_common::{FileInfo, SimilarityConfig};

use crate::dbscan::{self, PairValidator, DEFAULT_BATCH_SIZE};
use crate::selector::{self, DedupEngine, Selection};
use crate::similarity::{adaptive_threshold, similarity};
use crate::vptree::{Metric, VpTree};

/// `{ bestFile, representatives, duplicates }` for one resolved cluster
/// (spec.md §3, §4.7). `representatives ∪ duplicates` partitions the
/// cluster and `bestFile ∈ representatives`.
#[derive(Debug, Clone)]
pub struct DuplicateSet {
    pub best_file: PathBuf,
    pub representatives: BTreeSet<PathBuf>,
    pub duplicates: BTreeSet<PathBuf>,
}

/// The output of one dedup run (spec.md §3, §2's data flow). `unique_files`
/// and the union of every `duplicate_sets[i].representatives ∪
/// duplicate_sets[i].duplicates` partition the input file set (spec.md §8
/// invariant 4).
#[derive(Debug, Clone, Default)]
pub struct DeduplicationResult {
    pub unique_files: BTreeSet<PathBuf>,
    pub duplicate_sets: Vec<DuplicateSet>,
}

/// Distance between two files' `MediaInfo`, looked up by path in an
/// immutable snapshot captured at tree-build time (spec.md §4.4, Design
/// Note §9). `1 - similarity`, so closer means more similar.
struct FingerprintMetric {
    snapshot: Arc<HashMap<PathBuf, Arc<FileInfo>>>,
    config: SimilarityConfig,
}

#[async_trait]
impl Metric<PathBuf> for FingerprintMetric {
    async fn distance(&self, a: &PathBuf, b: &PathBuf) -> f64 {
        let fa = &self.snapshot[a];
        let fb = &self.snapshot[b];
        1.0 - similarity(&fa.media, &fb.media, &self.config)
    }
}

/// Tightens a VP-tree hit (found within the widest-net `eps`) against the
/// adaptive, pair-specific threshold (spec.md §4.3, §4.5). The tree
/// distance already *is* `1 - similarity(a, b)` (computed once by
/// [`FingerprintMetric`]), so this only needs to compare it against the
/// pair's own threshold rather than recomputing the similarity.
struct AdaptiveValidator {
    snapshot: Arc<HashMap<PathBuf, Arc<FileInfo>>>,
    config: SimilarityConfig,
}

#[async_trait]
impl PairValidator<PathBuf> for AdaptiveValidator {
    async fn is_valid_neighbor(&self, a: &PathBuf, b: &PathBuf, tree_distance: f64) -> bool {
        let fa = &self.snapshot[a];
        let fb = &self.snapshot[b];
        let threshold = adaptive_threshold(&fa.media, &fb.media, &self.config);
        tree_distance <= 1.0 - threshold
    }
}

/// Wires `SimilarityKernel` + `VpTree` + `DbscanEngine` +
/// `RepresentativeSelector` into the end-to-end dedup pipeline (spec.md
/// §2's data flow). Implements [`DedupEngine`] itself so the selector's
/// "potential capture" recursion (spec.md §4.7) re-enters the whole
/// pipeline, not just the scoring step.
pub struct Engine {
    pub config: SimilarityConfig,
    pub batch_size: usize,
}

impl Engine {
    #[must_use]
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config, batch_size: DEFAULT_BATCH_SIZE }
    }

    /// Runs the full pipeline over `files` (spec.md §2). Files are
    /// identified by `path`; callers are responsible for every entry
    /// being distinct and already fingerprinted (the cache layer's job,
    /// not this engine's).
    pub async fn run(&self, files: Vec<Arc<FileInfo>>) -> DeduplicationResult {
        if files.is_empty() {
            return DeduplicationResult::default();
        }

        let snapshot: Arc<HashMap<PathBuf, Arc<FileInfo>>> =
            Arc::new(files.iter().map(|f| (f.path.clone(), Arc::clone(f))).collect());
        let points: Vec<PathBuf> = snapshot.keys().cloned().collect();

        let metric: Arc<dyn Metric<PathBuf> + Send + Sync> =
            Arc::new(FingerprintMetric { snapshot: Arc::clone(&snapshot), config: self.config.clone() });
        let validator: Arc<dyn PairValidator<PathBuf> + Send + Sync> =
            Arc::new(AdaptiveValidator { snapshot: Arc::clone(&snapshot), config: self.config.clone() });

        let tree = Arc::new(VpTree::build(points.clone(), &*metric).await);
        let eps = self.config.dbscan_eps();

        let clusters = dbscan::cluster(points, tree, metric, validator, eps, self.batch_size).await;

        let mut unique_files = BTreeSet::new();
        let mut duplicate_sets = Vec::new();

        for cluster in clusters {
            if cluster.len() <= 1 {
                unique_files.extend(cluster);
                continue;
            }

            let members: Vec<Arc<FileInfo>> = cluster.iter().map(|p| Arc::clone(&snapshot[p])).collect();
            let Selection { representatives, duplicates } = selector::select(&members, self).await;

            let best_file = representatives
                .first()
                .expect("select() always returns at least one representative")
                .path
                .clone();
            duplicate_sets.push(DuplicateSet {
                best_file,
                representatives: representatives.into_iter().map(|f| f.path.clone()).collect(),
                duplicates: duplicates.into_iter().map(|f| f.path.clone()).collect(),
            });
        }

        DeduplicationResult { unique_files, duplicate_sets }
    }
}

#[async_trait]
impl DedupEngine for Engine {
    async fn unique_subset(&self, candidates: &[Arc<FileInfo>]) -> Vec<Arc<FileInfo>> {
        if candidates.len() <= 1 {
            return candidates.to_vec();
        }

        let by_path: HashMap<PathBuf, Arc<FileInfo>> =
            candidates.iter().map(|f| (f.path.clone(), Arc::clone(f))).collect();
        let result = self.run(candidates.to_vec()).await;

        let mut out = Vec::new();
        for path in &result.unique_files {
            if let Some(f) = by_path.get(path) {
                out.push(Arc::clone(f));
            }
        }
        for set in &result.duplicate_sets {
            for path in &set.representatives {
                if let Some(f) = by_path.get(path) {
                    out.push(Arc::clone(f));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediasort_common::{BitHash, FileStats, FrameInfo, MediaInfo, Metadata};
    use std::time::SystemTime;

    fn still(path: &str, bits: bool) -> Arc<FileInfo> {
        Arc::new(FileInfo {
            path: path.into(),
            file_stats: FileStats { size: 1000, mtime: SystemTime::UNIX_EPOCH, ctime: SystemTime::UNIX_EPOCH, content_hash: [0; 16] },
            metadata: Metadata::default(),
            media: MediaInfo::new(0.0, vec![FrameInfo::new(BitHash::from_bits(64, |_| bits), 0.0)]),
        })
    }

    #[tokio::test]
    async fn disjoint_images_are_all_unique() {
        let files = vec![still("a.jpg", true), still("b.jpg", false)];
        let engine = Engine::new(SimilarityConfig::default());
        let result = engine.run(files).await;
        assert_eq!(result.unique_files.len(), 2);
        assert!(result.duplicate_sets.is_empty());
    }

    #[tokio::test]
    async fn exact_duplicate_images_form_one_duplicate_set() {
        // S1: two bit-identical images.
        let files = vec![still("A.jpg", true), still("A_copy.jpg", true)];
        let engine = Engine::new(SimilarityConfig::default());
        let result = engine.run(files).await;

        assert!(result.unique_files.is_empty());
        assert_eq!(result.duplicate_sets.len(), 1);
        let set = &result.duplicate_sets[0];
        assert_eq!(set.representatives.len(), 1);
        assert_eq!(set.duplicates.len(), 1);
        assert!(set.representatives.contains(&set.best_file));
    }

    #[tokio::test]
    async fn single_file_is_unique() {
        let files = vec![still("only.jpg", true)];
        let engine = Engine::new(SimilarityConfig::default());
        let result = engine.run(files).await;
        assert_eq!(result.unique_files.len(), 1);
        assert!(result.duplicate_sets.is_empty());
    }
}
