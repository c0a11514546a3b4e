use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use mediasort_common::FileInfo;

/// Resolves "potential capture" still images within a cluster back down
/// to their own unique subset (spec.md §4.7). In `mediasort-app` this is
/// satisfied by the same dedup pipeline (`similarity` + `VpTree` +
/// `DbscanEngine` + `select`) run over the subset, which is what makes
/// the recursion in [`select`] a recursion into the *whole engine*, not
/// just this module. Bounded because each call receives a strict subset
/// of its caller's cluster.
#[async_trait]
pub trait DedupEngine: Send + Sync {
    async fn unique_subset(&self, candidates: &[Arc<FileInfo>]) -> Vec<Arc<FileInfo>>;
}

/// The outcome of resolving one duplicate cluster (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct Selection {
    pub representatives: Vec<Arc<FileInfo>>,
    pub duplicates: Vec<Arc<FileInfo>>,
}

/// Scores a `FileInfo` for representative selection (spec.md §4.7's exact
/// formula). Higher is better. `fileSize` is floored at 1 byte so `ln`
/// never sees zero or a negative argument.
#[must_use]
pub fn score(file: &FileInfo) -> f64 {
    let duration = file.media.duration;
    let mut s = if duration > 0.0 { 10000.0 } else { 0.0 };
    s += 100.0 * (duration + 1.0).ln();
    if file.metadata.image_date.is_some() {
        s += 2000.0;
    }
    if file.metadata.has_gps() {
        s += 300.0;
    }
    if file.metadata.camera_model.is_some() {
        s += 200.0;
    }
    if let Some(pixels) = file.metadata.pixel_count() {
        s += (pixels as f64).sqrt();
    }
    s += 5.0 * (file.file_stats.size.max(1) as f64).ln();
    s
}

/// A still image from `cluster` is a "potential capture" of the video
/// `best` when it's at least as high-resolution and at least as
/// well-dated (spec.md §4.7). A missing pixel count on `best` itself
/// can't bound anything, so any candidate with known dimensions passes
/// that half of the test.
fn is_potential_capture(candidate: &FileInfo, best: &FileInfo) -> bool {
    if candidate.media.duration > 0.0 {
        return false;
    }
    let meets_resolution = match candidate.metadata.pixel_count() {
        Some(pixels) => best.metadata.pixel_count().map_or(true, |best_pixels| pixels >= best_pixels),
        None => false,
    };
    let meets_date = best.metadata.image_date.is_none() || candidate.metadata.image_date.is_some();
    meets_resolution && meets_date
}

/// Resolves one duplicate cluster into representatives and duplicates
/// (spec.md §4.7). `cluster` must be non-empty; ties in score are broken
/// by original position in `cluster` ("insertion order").
pub async fn select(cluster: &[Arc<FileInfo>], engine: &dyn DedupEngine) -> Selection {
    if cluster.len() == 1 {
        return Selection {
            representatives: vec![Arc::clone(&cluster[0])],
            duplicates: vec![],
        };
    }

    let mut order: Vec<usize> = (0..cluster.len()).collect();
    order.sort_by(|&ia, &ib| {
        let (a, b) = (&cluster[ia], &cluster[ib]);
        score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal).then(ia.cmp(&ib))
    });
    let best_idx = order[0];
    let best = Arc::clone(&cluster[best_idx]);

    if best.media.duration <= 0.0 {
        let duplicates = cluster.iter().enumerate().filter(|(i, _)| *i != best_idx).map(|(_, f)| Arc::clone(f)).collect();
        return Selection { representatives: vec![best], duplicates };
    }

    let mut potential_captures = Vec::new();
    let mut duplicates = Vec::new();
    for (i, f) in cluster.iter().enumerate() {
        if i == best_idx {
            continue;
        }
        if is_potential_capture(f, &best) {
            potential_captures.push(Arc::clone(f));
        } else {
            duplicates.push(Arc::clone(f));
        }
    }

    let mut representatives = vec![best];
    if !potential_captures.is_empty() {
        let unique = engine.unique_subset(&potential_captures).await;
        let unique_ptrs: HashSet<*const FileInfo> = unique.iter().map(|a| Arc::as_ptr(a)).collect();
        for candidate in potential_captures {
            if unique_ptrs.contains(&Arc::as_ptr(&candidate)) {
                representatives.push(candidate);
            } else {
                duplicates.push(candidate);
            }
        }
    }

    Selection { representatives, duplicates }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediasort_common::{FileStats, MediaInfo, Metadata};
    use std::time::SystemTime;

    struct NoCaptures;

    #[async_trait]
    impl DedupEngine for NoCaptures {
        async fn unique_subset(&self, candidates: &[Arc<FileInfo>]) -> Vec<Arc<FileInfo>> {
            candidates.to_vec()
        }
    }

    fn file(duration: f64, size: u64, width: Option<u32>, height: Option<u32>, image_date: bool) -> Arc<FileInfo> {
        Arc::new(FileInfo {
            path: "x".into(),
            file_stats: FileStats { size, mtime: SystemTime::UNIX_EPOCH, ctime: SystemTime::UNIX_EPOCH, content_hash: [0; 16] },
            metadata: Metadata {
                image_date: if image_date { Some(SystemTime::UNIX_EPOCH) } else { None },
                width,
                height,
                ..Metadata::default()
            },
            media: MediaInfo::new(duration, vec![]),
        })
    }

    #[tokio::test]
    async fn single_member_cluster_is_its_own_representative() {
        let a = file(0.0, 100, Some(10), Some(10), false);
        let sel = select(&[Arc::clone(&a)], &NoCaptures).await;
        assert_eq!(sel.representatives.len(), 1);
        assert!(sel.duplicates.is_empty());
    }

    #[tokio::test]
    async fn still_image_best_has_no_co_representatives() {
        let best = file(0.0, 5_000_000, Some(4000), Some(3000), true);
        let worse = file(0.0, 100, Some(10), Some(10), false);
        let sel = select(&[Arc::clone(&worse), Arc::clone(&best)], &NoCaptures).await;
        assert_eq!(sel.representatives.len(), 1);
        assert!(Arc::ptr_eq(&sel.representatives[0], &best));
        assert_eq!(sel.duplicates.len(), 1);
    }

    #[tokio::test]
    async fn video_best_admits_higher_res_dated_still_as_potential_capture() {
        // S3: video wins on the duration bonus; still is a potential
        // capture (>= resolution, has an imageDate the video lacks).
        let video = file(3.0, 2_000_000, Some(1920), Some(1080), false);
        let still = file(0.0, 2_000_000, Some(4000), Some(3000), true);
        let sel = select(&[Arc::clone(&still), Arc::clone(&video)], &NoCaptures).await;

        assert!(score(&video) > score(&still));
        assert_eq!(sel.representatives.len(), 2);
        assert!(sel.duplicates.is_empty());
    }

    #[tokio::test]
    async fn potential_capture_excluded_by_dedup_engine_becomes_a_duplicate() {
        struct RejectAll;
        #[async_trait]
        impl DedupEngine for RejectAll {
            async fn unique_subset(&self, _candidates: &[Arc<FileInfo>]) -> Vec<Arc<FileInfo>> {
                vec![]
            }
        }

        let video = file(3.0, 2_000_000, Some(1920), Some(1080), false);
        let still = file(0.0, 2_000_000, Some(4000), Some(3000), true);
        let sel = select(&[Arc::clone(&still), Arc::clone(&video)], &RejectAll).await;

        assert_eq!(sel.representatives.len(), 1);
        assert_eq!(sel.duplicates.len(), 1);
    }

    #[tokio::test]
    async fn low_resolution_still_is_not_a_potential_capture() {
        let video = file(3.0, 2_000_000, Some(1920), Some(1080), false);
        let tiny_still = file(0.0, 2_000_000, Some(100), Some(100), true);
        let sel = select(&[Arc::clone(&tiny_still), Arc::clone(&video)], &NoCaptures).await;

        assert_eq!(sel.representatives.len(), 1);
        assert_eq!(sel.duplicates.len(), 1);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let a = file(0.0, 100, Some(10), Some(10), false);
        let b = file(0.0, 100, Some(10), Some(10), false);
        assert_eq!(score(&a), score(&b));
    }
}
