use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout belongs to the status display.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_level(true)
        .try_init();
}
