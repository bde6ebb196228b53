use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Pick the log level: `-v` flags win over the configured level, default warn.
pub fn resolve_level(verbosity: u8, configured: Option<&str>) -> Level {
    match verbosity {
        0 => configured
            .and_then(|level| level.trim().parse().ok())
            .unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Diagnostics go to stderr so they never mix
/// with rendered results on stdout.
pub fn init(verbosity: u8, configured: Option<&str>) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(resolve_level(verbosity, configured))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}
