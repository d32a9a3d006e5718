use agentj_stream::cli::{parse_args, run_cli_command};
use agentj_stream::config::StreamConfig;

use color_eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let command = parse_args(std::env::args());
    let config = StreamConfig::from_env();
    debug!(?config, "Loaded configuration");

    let signal = CancellationToken::new();
    let interrupt = signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, closing stream");
            interrupt.cancel();
        }
    });

    run_cli_command(command, &config, &signal).await
}

/// Logs go to stderr so stdout carries only stream output.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentj_stream=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
