// repeat-chat
// Main entry point for the repeat-chat binary

use clap::Parser;
use repeat_chat::cli::Cli;
use repeat_chat::config::Config;
use repeat_chat::handlers::{failure_hint, handle_session};
use repeat_chat::shutdown::{install_signal_handler, ShutdownSignal};
use repeat_chat::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    if let Err(err) = run(&cli).await {
        eprintln!("Error: {:#}", err);
        if let Some(hint) = failure_hint(&err) {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load_or_create()?;

    // RUST_LOG still wins over the configured level
    init_telemetry_with_level(&config.core.log_level);

    tracing::info!("repeat-chat v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = ShutdownSignal::new();
    let _signals = install_signal_handler(shutdown.clone());

    handle_session(cli.topic(), &config, shutdown).await
}
