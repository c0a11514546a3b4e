use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use crate::app::cli::Verbosity;

/// Mirrors `vid_dup_finder_app::app::app_fns::configure_logs`: a single
/// `TermLogger` on stderr, verbosity-gated.
pub fn configure_logs(verbosity: Verbosity) {
    let mut cfg = ConfigBuilder::new();
    cfg.add_filter_ignore("mediasort_cache_single_flight".to_string());

    let min_loglevel = match verbosity {
        Verbosity::Quiet => LevelFilter::Warn,
        Verbosity::Default => LevelFilter::Info,
        Verbosity::Verbose => LevelFilter::Trace,
    };

    TermLogger::init(min_loglevel, cfg.build(), TerminalMode::Stderr, ColorChoice::Auto)
        .expect("TermLogger failed to initialize");
}
