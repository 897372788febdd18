use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber. Events go to stderr so command output on
/// stdout stays machine-readable. Safe to call more than once; later calls
/// are no-ops (tests share one process).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
