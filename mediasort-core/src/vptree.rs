use async_trait::async_trait;

/// An asynchronous, symmetric distance function over `T`.
///
/// Async because in `mediasort-app` the points are file paths and the
/// metric must look up each path's `MediaFingerprint` through the cache
/// layer, which is itself async I/O (spec.md §4.4, §9: "the metric
/// closes over an immutable cache snapshot captured at tree-build time").
/// The implementation does not verify the triangle inequality; similarity-
/// derived distances may mildly violate it, which spec.md §4.4 accepts as
/// an approximation.
#[async_trait]
pub trait Metric<T>: Send + Sync {
    async fn distance(&self, a: &T, b: &T) -> f64;
}

struct VpNode<T> {
    vantage: T,
    /// Unused on leaves (no children to prune).
    threshold: f64,
    left: Option<Box<VpNode<T>>>,
    right: Option<Box<VpNode<T>>>,
}

/// A vantage-point tree over an arbitrary async metric (spec.md §4.4).
/// Immutable once built; a non-recursive-triangle-inequality-respecting
/// metric only mildly degrades pruning, never correctness, because the
/// pruning rule is derived straight from the triangle inequality's
/// contrapositive and recomputes from live points rather than caching
/// transitive bounds.
pub struct VpTree<T> {
    root: Option<VpNode<T>>,
}

/// A single hit from [`VpTree::search`]: the matched point and its
/// distance from the query.
pub struct Hit<T> {
    pub point: T,
    pub distance: f64,
}

pub struct SearchOptions {
    pub max_distance: f64,
    pub sort: bool,
}

impl<T> VpTree<T>
where
    T: Clone + Send + Sync,
{
    /// Build a tree over `points` using `metric`. The first element of
    /// each subtree's point list is always chosen as its vantage point —
    /// per spec.md §4.4 this choice only affects balance, never
    /// correctness, exactly as the teacher's own design note about
    /// "choice does not affect correctness" for its (much simpler)
    /// duration-bucketed search structure.
    pub async fn build(points: Vec<T>, metric: &(dyn Metric<T>)) -> Self {
        let root = if points.is_empty() {
            None
        } else {
            Some(build_node(points, metric).await)
        };
        Self { root }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// All points within `opts.max_distance` of `query` (spec.md §4.4).
    /// Completeness (never misses an in-range point) is independent of
    /// how balanced the tree happens to be; see
    /// `search_matches_brute_force_across_random_sets` below.
    pub async fn search(&self, query: &T, opts: &SearchOptions, metric: &(dyn Metric<T>)) -> Vec<Hit<T>> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            search_node(root, query, opts.max_distance, metric, &mut out).await;
        }
        if opts.sort {
            out.sort_by(|a, b| a.distance.partial_cmp(&b.distance).expect("distances are finite"));
        }
        out
    }
}

fn build_node<'a, T>(
    mut points: Vec<T>,
    metric: &'a (dyn Metric<T> + 'a),
) -> futures::future::BoxFuture<'a, VpNode<T>>
where
    T: Clone + Send + Sync + 'a,
{
    Box::pin(async move {
        if points.len() == 1 {
            let vantage = points.remove(0);
            return VpNode {
                vantage,
                threshold: 0.0,
                left: None,
                right: None,
            };
        }

        let vantage = points.remove(0);

        let mut dist_points = Vec::with_capacity(points.len());
        for p in points {
            let d = metric.distance(&vantage, &p).await;
            dist_points.push((d, p));
        }
        dist_points.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("distances are finite"));

        let median_idx = dist_points.len() / 2;
        let threshold = dist_points[median_idx].0;

        let mut left_points = Vec::new();
        let mut right_points = Vec::new();
        for (d, p) in dist_points {
            if d < threshold {
                left_points.push(p);
            } else {
                right_points.push(p);
            }
        }

        let left = if left_points.is_empty() {
            None
        } else {
            Some(Box::new(build_node(left_points, metric).await))
        };
        let right = if right_points.is_empty() {
            None
        } else {
            Some(Box::new(build_node(right_points, metric).await))
        };

        VpNode {
            vantage,
            threshold,
            left,
            right,
        }
    })
}

fn search_node<'a, T>(
    node: &'a VpNode<T>,
    query: &'a T,
    eps: f64,
    metric: &'a (dyn Metric<T> + 'a),
    out: &'a mut Vec<Hit<T>>,
) -> futures::future::BoxFuture<'a, ()>
where
    T: Clone + Send + Sync,
{
    Box::pin(async move {
        let d = metric.distance(query, &node.vantage).await;
        if d <= eps {
            out.push(Hit {
                point: node.vantage.clone(),
                distance: d,
            });
        }

        if let Some(left) = &node.left {
            if d - eps < node.threshold {
                search_node(left, query, eps, metric, out).await;
            }
        }
        if let Some(right) = &node.right {
            if d + eps >= node.threshold {
                search_node(right, query, eps, metric, out).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    struct Euclidean1d;

    #[async_trait]
    impl Metric<f64> for Euclidean1d {
        async fn distance(&self, a: &f64, b: &f64) -> f64 {
            (a - b).abs()
        }
    }

    fn brute_force(points: &[f64], query: f64, eps: f64) -> Vec<f64> {
        let mut v: Vec<f64> = points.iter().copied().filter(|p| (p - query).abs() <= eps).collect();
        v.sort_by(|a, b| a.partial_cmp(b).unwrap());
        v
    }

    #[tokio::test]
    async fn search_matches_brute_force_across_random_sets() {
        let metric = Euclidean1d;
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let n = rng.gen_range(1..=256);
            let points: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1000.0)).collect();
            let tree = VpTree::build(points.clone(), &metric).await;

            let query = rng.gen_range(0.0..1000.0);
            let eps = rng.gen_range(0.0..50.0);

            let opts = SearchOptions { max_distance: eps, sort: true };
            let mut got: Vec<f64> = tree.search(&query, &opts, &metric).await.into_iter().map(|h| h.point).collect();
            got.sort_by(|a, b| a.partial_cmp(b).unwrap());

            let expected = brute_force(&points, query, eps);
            assert_eq!(got, expected, "n={n} query={query} eps={eps}");
        }
    }

    #[tokio::test]
    async fn empty_tree_returns_no_hits() {
        let metric = Euclidean1d;
        let tree = VpTree::<f64>::build(vec![], &metric).await;
        let opts = SearchOptions { max_distance: 10.0, sort: false };
        assert!(tree.search(&0.0, &opts, &metric).await.is_empty());
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn single_point_tree_matches_itself() {
        let metric = Euclidean1d;
        let tree = VpTree::build(vec![42.0], &metric).await;
        let opts = SearchOptions { max_distance: 0.0, sort: false };
        let hits = tree.search(&42.0, &opts, &metric).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].point, 42.0);
    }
}
