use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `magick_toolkit=debug`.
pub const LOG_ENV: &str = "MAGICK_TOOLKIT_LOG";

/// Sends log output to stderr, filtered by [`LOG_ENV`]. Warnings only by default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // a subscriber may already be installed when embedded in a larger program
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
