use clap::Parser;
use paperchat::{cli::Cli, config::RunConfig, logging, pipeline};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let base = cli
        .base_dir
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    let mut config = RunConfig::from_env(base);
    if let Some(count) = cli.count {
        config.max_docs = count;
    }
    if cli.headless {
        config.headless = true;
    }
    config.variant = cli.variant;
    config.attach_files = !cli.no_attach;
    config.debug_raw = config.debug_raw || cli.debug_raw;

    if let Err(err) = pipeline::run(config).await {
        error!(error = %err, "run failed");
        std::process::exit(1);
    }
}
