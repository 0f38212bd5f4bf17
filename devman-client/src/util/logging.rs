use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Pick the log filter. With `force_level` (set by `--verbose`) `level` wins over `RUST_LOG`;
/// otherwise `RUST_LOG` wins and `level` is the fallback.
fn build_filter(level: &str, force_level: bool) -> EnvFilter {
    let forced = if force_level {
        EnvFilter::try_new(level).ok()
    } else {
        None
    };

    forced
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install the global subscriber. Logs go to stderr so stdout only carries command output.
pub fn init_tracing(level: &str, force_level: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    // a subscriber may already be installed when embedded in tests
    let _ = tracing_subscriber::registry()
        .with(build_filter(level, force_level))
        .with(fmt_layer)
        .try_init();
}
