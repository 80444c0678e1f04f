use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid. Keeps stderr quiet so the
/// report on stdout is the only output of a normal run.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the global `tracing` subscriber, logging to stderr.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}
