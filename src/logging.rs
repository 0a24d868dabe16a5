use tracing_subscriber::EnvFilter;

/// Initialize tracing output. `RUST_LOG` wins over the verbosity flag.
pub fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "paperchat=warn",
        1 => "paperchat=info",
        _ => "paperchat=debug",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
