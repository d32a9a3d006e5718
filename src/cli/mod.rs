//! CLI module for agentj-stream.
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing
//! - Version display
//! - Streaming chat replies, task progress and event-source endpoints
//!
//! # Usage
//!
//! ```ignore
//! use agentj_stream::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args());
//! run_cli_command(command, &StreamConfig::from_env(), &CancellationToken::new()).await?;
//! ```

pub mod args;
pub mod commands;
pub mod render;
pub mod version;

pub use args::{parse_args, CliCommand, USAGE};
pub use commands::{stream_post, subscribe};
pub use version::{handle_version_command, VERSION};

use std::sync::Arc;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use tokio_util::sync::CancellationToken;

use crate::adapters::ReqwestHttpClient;
use crate::config::StreamConfig;
use crate::sse::{ChatRequest, TaskStreamRequest};

/// Run a parsed CLI command to completion.
///
/// Cancelling `signal` (Ctrl-C in the binary) ends any running stream
/// cleanly; that is not reported as an error.
pub async fn run_cli_command(
    command: CliCommand,
    config: &StreamConfig,
    signal: &CancellationToken,
) -> Result<()> {
    match command {
        CliCommand::Version => {
            handle_version_command();
            Ok(())
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        CliCommand::Invalid(reason) => Err(eyre!("{}\n\n{}", reason, USAGE)),
        CliCommand::Chat {
            prompt,
            conversation,
            retry,
        } => {
            let mut request = ChatRequest::new(prompt);
            if let Some(id) = conversation {
                request = request.with_conversation(id);
            }
            let client = Arc::new(ReqwestHttpClient::from_config(config)?);
            stream_post(
                client,
                config,
                &config.chat_url(),
                &request,
                retry,
                signal,
                std::io::stdout(),
            )
            .await?
            .into_result()?;
            Ok(())
        }
        CliCommand::Task { plan_id, retry } => {
            let client = Arc::new(ReqwestHttpClient::from_config(config)?);
            stream_post(
                client,
                config,
                &config.task_stream_url(),
                &TaskStreamRequest::new(plan_id),
                retry,
                signal,
                std::io::stdout(),
            )
            .await?
            .into_result()?;
            Ok(())
        }
        CliCommand::Subscribe { url } => subscribe(config, &url, signal, std::io::stdout()).await,
    }
}
