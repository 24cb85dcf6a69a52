use tracing_subscriber::EnvFilter;

/// This function configures the logging format. The loglevel is also
/// processed here i.e `RUST_LOG=block_provider=trace` will print every
/// spawned command and json-rpc exchange. Messages go to stderr, leaving
/// stdout to command output.
pub fn init(level: &str) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true);

    match EnvFilter::try_from_default_env() {
        Ok(filter) => builder.with_env_filter(filter).init(),
        Err(_) => builder.with_env_filter(level).init(),
    }
}
