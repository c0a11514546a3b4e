use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use futures::stream::{self, StreamExt};
use log::{error, info, warn};
use mediasort_cache::{CacheLayer, SledCacheDriver};
use mediasort_common::FileInfo;
use mediasort_core::Engine;

use crate::app::cli::Cli;
use crate::app::{AppError, AppResult};
use crate::app::logging::configure_logs;
use crate::collaborators::{FileInfoCompute, RealFileStatSupplier, RealFrameSupplier, RealMetadataSupplier};
use crate::{gather, path_template, transfer};

/// `main`'s entry point (mirrors the teacher's `app::run_app`): parse
/// args, configure logging, run, and translate the outcome into a process
/// exit code. 0 success, 1 fatal error, 130 interrupted (spec.md §7).
pub fn run_app() -> i32 {
    let cli = Cli::parse();
    configure_logs(cli.verbosity);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to start async runtime: {e}");
            return 1;
        }
    };

    match runtime.block_on(run_app_inner(cli)) {
        Ok(RunOutcome::Completed) => 0,
        Ok(RunOutcome::Interrupted) => 130,
        Err(fatal) => {
            error!("{fatal}");
            1
        }
    }
}

enum RunOutcome {
    Completed,
    Interrupted,
}

async fn run_app_inner(cli: Cli) -> AppResult<RunOutcome> {
    validate_paths(&cli.source, &cli.destination)?;
    std::fs::create_dir_all(&cli.destination)
        .map_err(|e| AppError::Transfer { src: cli.source.clone(), dst: cli.destination.clone(), source: e })?;

    let cache_path = cli.cache_path.clone().unwrap_or_else(|| cli.destination.join(".mediasort-cache"));
    let driver = SledCacheDriver::open(&cache_path)
        .map_err(|source| AppError::CacheOpen { path: cache_path.clone(), source })?;

    let config = cli.similarity_config();
    let config_fingerprint =
        config.canonical_fingerprint().map_err(|e| AppError::Config(e.to_string()))?;

    let compute = FileInfoCompute {
        frame_supplier: RealFrameSupplier,
        metadata_supplier: RealMetadataSupplier,
        stat_supplier: RealFileStatSupplier { max_chunk_size: cli.max_chunk_size },
        config,
    };
    let cache = Arc::new(CacheLayer::new(driver, compute, config_fingerprint));
    let stat_supplier = RealFileStatSupplier { max_chunk_size: cli.max_chunk_size };

    let paths = gather::gather_files(&cli.source, &cli.exclude_extensions);
    info!("found {} candidate files under {}", paths.len(), cli.source.display());

    let interrupted = Arc::new(AtomicBool::new(false));
    spawn_interrupt_watcher(Arc::clone(&interrupted));

    let concurrency = cli.concurrency.unwrap_or_else(default_concurrency);
    let (files, errors) = fingerprint_all(&cache, &stat_supplier, paths, concurrency, &interrupted).await;
    if !errors.is_empty() {
        warn!("{} file(s) could not be read and were excluded from this run", errors.len());
    }

    if interrupted.load(Ordering::SeqCst) {
        warn!("interrupted, cache is durable so partial work is preserved");
        return Ok(RunOutcome::Interrupted);
    }

    info!("fingerprinted {} files, running dedup engine", files.len());
    let mut engine = Engine::new(config);
    engine.batch_size = cli.batch_size;
    let result = engine.run(files.clone()).await;

    let by_path: std::collections::HashMap<PathBuf, Arc<FileInfo>> =
        files.into_iter().map(|f| (f.path.clone(), f)).collect();

    let mut placed = 0usize;
    for path in result.unique_files.iter().chain(result.duplicate_sets.iter().flat_map(|s| s.representatives.iter())) {
        let Some(file) = by_path.get(path) else { continue };
        let target = path_template::render(&cli.path_template, file);
        transfer::place_file(&file.path, &cli.destination, &target)?;
        placed += 1;
    }

    info!(
        "placed {placed} files ({} duplicate sets, {} exact unique)",
        result.duplicate_sets.len(),
        result.unique_files.len()
    );

    Ok(RunOutcome::Completed)
}

fn validate_paths(source: &std::path::Path, destination: &std::path::Path) -> AppResult<()> {
    if !source.exists() {
        return Err(AppError::SourceNotFound(source.to_path_buf()));
    }
    if source == destination {
        return Err(AppError::SourceIsDestination(source.to_path_buf()));
    }
    Ok(())
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism().map(|n| n.get().saturating_sub(1).max(1)).unwrap_or(1)
}

fn spawn_interrupt_watcher(flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight work before stopping");
            flag.store(true, Ordering::SeqCst);
        }
    });
}

/// Fingerprints every path through the cache layer, up to `concurrency`
/// files in flight at once (spec.md §5). A single file's
/// `CoreError::Unreadable` is logged, collected, and the file dropped
/// from the run — never aborting the whole batch (spec.md §7's
/// propagation policy: per-file errors collect into a list rather than
/// abort). Once `interrupted` flips, in-flight work is allowed to finish
/// its current step but no new work starts.
async fn fingerprint_all(
    cache: &Arc<CacheLayer<SledCacheDriver, FileInfoCompute<RealFrameSupplier, RealMetadataSupplier, RealFileStatSupplier>>>,
    stat_supplier: &RealFileStatSupplier,
    paths: Vec<PathBuf>,
    concurrency: usize,
    interrupted: &Arc<AtomicBool>,
) -> (Vec<Arc<FileInfo>>, Vec<(PathBuf, String)>) {
    use mediasort_core::FileStatSupplier;

    let results = stream::iter(paths)
        .map(|path| {
            let cache = Arc::clone(cache);
            let interrupted = Arc::clone(interrupted);
            async move {
                if interrupted.load(Ordering::SeqCst) {
                    return Err((path, "interrupted".to_string()));
                }
                let stats = match stat_supplier.stat(&path).await {
                    Ok(stats) => stats,
                    Err(e) => return Err((path, e.to_string())),
                };
                match cache.process_shared(&path, stats.content_hash).await {
                    Ok(info) => Ok(info),
                    Err(e) => Err((path, e.to_string())),
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut files = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(info) => files.push(info),
            Err((path, reason)) => {
                warn!("skipping {}: {reason}", path.display());
                errors.push((path, reason));
            }
        }
    }
    (files, errors)
}
