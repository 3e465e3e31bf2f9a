use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global subscriber. `BILLING_DASH_LOG` (or `RUST_LOG`) wins over
/// the defaults. Full-screen mode defaults to no output at all, since anything
/// written to stderr would tear the terminal UI.
pub fn init_logging(verbose: bool, fullscreen: bool) {
    let filter = std::env::var("BILLING_DASH_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| EnvFilter::new(default_directive(verbose, fullscreen)),
            |value| EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new("info")),
        );

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}

fn default_directive(verbose: bool, fullscreen: bool) -> &'static str {
    match (verbose, fullscreen) {
        (_, true) => "off",
        (true, false) => "debug",
        (false, false) => "info",
    }
}
