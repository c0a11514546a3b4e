use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, trace};

use crate::vptree::{SearchOptions, VpTree};

/// `minPts` for density clustering is fixed at 2 (spec.md §4.5): a point
/// with a single validated neighbor is already "dense enough" to seed a
/// duplicate group.
pub const MIN_PTS: usize = 2;

/// Default batch size for parallel DBSCAN scanning (spec.md §4.5,
/// "partitioned into batches of ~2048").
pub const DEFAULT_BATCH_SIZE: usize = 2048;

/// Decides whether a candidate within `eps` of a point is also a valid
/// neighbor under the *adaptive*, pair-specific threshold (spec.md §4.3,
/// §4.5). The VP-tree's `eps` is deliberately the widest net across all
/// three similarity thresholds; this trait tightens each individual pair.
#[async_trait]
pub trait PairValidator<T>: Send + Sync {
    async fn is_valid_neighbor(&self, a: &T, b: &T, tree_distance: f64) -> bool;
}

pub type Cluster<T> = BTreeSet<T>;

/// A single batch's local DBSCAN scan: finds core points among `batch`'s
/// own members (using a local `visited` set), expands their neighborhoods
/// via the shared tree, and returns every resulting cluster *including
/// singletons*, exactly as spec.md §4.5 describes. Two different batches
/// may return overlapping clusters if a point is reachable from more than
/// one batch's seeds (spec.md §8 scenario S6); that is resolved by
/// [`merge_overlaps`], not here.
async fn scan_batch<T>(
    batch: &[T],
    tree: &VpTree<T>,
    metric: &(dyn crate::vptree::Metric<T> + Send + Sync),
    validator: &(dyn PairValidator<T> + Send + Sync),
    eps: f64,
) -> Vec<Cluster<T>>
where
    T: Clone + Eq + Hash + Ord + Send + Sync,
{
    let mut visited: HashMap<T, ()> = HashMap::new();
    let mut clusters = Vec::new();

    for p in batch {
        if visited.contains_key(p) {
            continue;
        }
        visited.insert(p.clone(), ());

        let neighbors = validated_neighbors(p, tree, metric, validator, eps).await;
        if neighbors.len() < MIN_PTS {
            clusters.push(BTreeSet::from([p.clone()]));
            continue;
        }

        let mut cluster = BTreeSet::new();
        cluster.insert(p.clone());
        let mut stack: Vec<T> = neighbors;

        while let Some(q) = stack.pop() {
            if !visited.contains_key(&q) {
                visited.insert(q.clone(), ());
                let q_neighbors = validated_neighbors(&q, tree, metric, validator, eps).await;
                if q_neighbors.len() >= MIN_PTS {
                    for n in q_neighbors {
                        if !visited.contains_key(&n) {
                            stack.push(n);
                        }
                    }
                }
            }
            cluster.insert(q);
        }
        clusters.push(cluster);
    }

    clusters
}

async fn validated_neighbors<T>(
    p: &T,
    tree: &VpTree<T>,
    metric: &(dyn crate::vptree::Metric<T> + Send + Sync),
    validator: &(dyn PairValidator<T> + Send + Sync),
    eps: f64,
) -> Vec<T>
where
    T: Clone + Eq + Send + Sync,
{
    let opts = SearchOptions { max_distance: eps, sort: false };
    let hits = tree.search(p, &opts, metric).await;

    let mut out = Vec::with_capacity(hits.len());
    for hit in hits {
        if &hit.point == p {
            continue;
        }
        if validator.is_valid_neighbor(p, &hit.point, hit.distance).await {
            out.push(hit.point);
        }
    }
    out
}

/// Run batched, parallel DBSCAN over `points` and merge the resulting
/// (possibly overlapping) clusters into a final partition (spec.md §4.5).
///
/// Batches run as independent `tokio` tasks over the shared, immutable
/// `tree`/`metric`/`validator`, matching spec.md §5: CPU/metric work
/// parallelizes across batches, and a single batch's failure (tracked via
/// `JoinSet`'s `Result`) aborts only that batch — the merge stage still
/// runs over every batch that did complete (spec.md §7).
pub async fn cluster<T>(
    points: Vec<T>,
    tree: Arc<VpTree<T>>,
    metric: Arc<dyn crate::vptree::Metric<T> + Send + Sync>,
    validator: Arc<dyn PairValidator<T> + Send + Sync>,
    eps: f64,
    batch_size: usize,
) -> Vec<Cluster<T>>
where
    T: Clone + Eq + Hash + Ord + Send + Sync + 'static,
{
    let batch_size = batch_size.max(1);
    let batches: Vec<Vec<T>> = points.chunks(batch_size).map(<[T]>::to_vec).collect();
    debug!(
        target: "mediasort_dbscan",
        "clustering {} points in {} batches of up to {batch_size}", points.len(), batches.len()
    );

    let mut join_set = tokio::task::JoinSet::new();
    for batch in batches {
        let tree = Arc::clone(&tree);
        let metric = Arc::clone(&metric);
        let validator = Arc::clone(&validator);
        join_set.spawn(async move { scan_batch(&batch, &tree, &*metric, &*validator, eps).await });
    }

    let mut raw_clusters = Vec::new();
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(clusters) => raw_clusters.extend(clusters),
            Err(e) => {
                // A batch task panicked; spec.md §7 says this aborts only
                // that batch. The other batches' results are unaffected
                // because they're tracked independently in the JoinSet.
                log::warn!(target: "mediasort_dbscan", "a clustering batch failed: {e}");
            }
        }
    }

    trace!(target: "mediasort_dbscan", "{} raw clusters before overlap merge", raw_clusters.len());
    merge_overlaps(raw_clusters)
}

/// Reconciles clusters produced independently by different DBSCAN
/// batches, which may share points (spec.md §4.5, §8 invariant 6).
///
/// This generalizes the teacher's `vid_dup_finder_app::app::disjoint_set::DisjointSet`
/// from "merge on a single incoming pair" to "merge on a whole incoming
/// cluster": for each incoming cluster, collect every already-installed
/// cluster that shares an element with it, union them all together, and
/// reinstall. Unlike `DisjointSet`, this merge never needs to *remove* an
/// individual element from a cluster once installed (overlap-merge is a
/// one-shot reconciliation pass over the batches' output, not an
/// incrementally-maintained index), so the index-remap-on-removal
/// machinery the teacher needed for its interactive resolution workflow
/// is intentionally not carried over; see `DESIGN.md`.
pub fn merge_overlaps<T>(incoming: Vec<Cluster<T>>) -> Vec<Cluster<T>>
where
    T: Ord + Clone + Hash,
{
    let mut element_to_cluster: BTreeMap<T, usize> = BTreeMap::new();
    let mut clusters: Vec<Option<Cluster<T>>> = Vec::new();

    for cluster in incoming {
        if cluster.is_empty() {
            continue;
        }

        let touched: BTreeSet<usize> = cluster
            .iter()
            .filter_map(|item| element_to_cluster.get(item).copied())
            .collect();

        if touched.is_empty() {
            let idx = clusters.len();
            for item in &cluster {
                element_to_cluster.insert(item.clone(), idx);
            }
            clusters.push(Some(cluster));
            continue;
        }

        let mut touched_iter = touched.into_iter();
        let keep_idx = touched_iter.next().expect("touched is non-empty");
        let mut merged = clusters[keep_idx].take().expect("touched index must still be installed");

        for other_idx in touched_iter {
            if let Some(other) = clusters[other_idx].take() {
                for item in other {
                    element_to_cluster.insert(item.clone(), keep_idx);
                    merged.insert(item);
                }
            }
        }

        for item in cluster {
            element_to_cluster.insert(item.clone(), keep_idx);
            merged.insert(item);
        }
        clusters[keep_idx] = Some(merged);
    }

    clusters.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_clusters_pass_through_unchanged() {
        let input = vec![
            Cluster::from(["a".to_string(), "b".to_string()]),
            Cluster::from(["c".to_string(), "d".to_string()]),
        ];
        let merged = merge_overlaps(input.clone());
        assert_eq!(merged.len(), 2);
        for c in &input {
            assert!(merged.contains(c));
        }
    }

    #[test]
    fn overlapping_clusters_are_merged_transitively() {
        // S6: A~B and B~C produced by different batches as {A,B} and {B,C}.
        let input = vec![
            Cluster::from(["A".to_string(), "B".to_string()]),
            Cluster::from(["B".to_string(), "C".to_string()]),
        ];
        let merged = merge_overlaps(input);
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0],
            Cluster::from(["A".to_string(), "B".to_string(), "C".to_string()])
        );
    }

    #[test]
    fn merge_is_idempotent() {
        let input = vec![
            Cluster::from(["A".to_string(), "B".to_string()]),
            Cluster::from(["B".to_string(), "C".to_string()]),
            Cluster::from(["D".to_string()]),
        ];
        let once = merge_overlaps(input);
        let twice = merge_overlaps(once.clone());

        let mut once_sorted = once;
        once_sorted.sort();
        let mut twice_sorted = twice;
        twice_sorted.sort();
        assert_eq!(once_sorted, twice_sorted);
    }

    #[test]
    fn merge_unions_three_way_overlap_in_one_incoming_cluster() {
        let input = vec![
            Cluster::from(["A".to_string(), "B".to_string()]),
            Cluster::from(["C".to_string(), "D".to_string()]),
            // Touches both prior clusters at once.
            Cluster::from(["B".to_string(), "C".to_string()]),
        ];
        let merged = merge_overlaps(input);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].len(), 4);
    }
}
