//! Subcommand: `lowbot run` -- chat with the bot in the terminal.
//!
//! Each line read from stdin is dispatched on its own task; replies are
//! written by the terminal adapter as they complete.  Other configured
//! adapters stay connected for the life of the session.

use std::path::Path;

use anyhow::{Context, Result, bail};
use futures::future::join_all;
use tracing::{info, warn};

use lowbot_adapters::{TERMINAL_ADAPTER, TerminalInput};
use lowbot_kernel::{DispatchOutcome, ProcessEnv};

use crate::config::LowbotConfig;
use crate::helpers::build_bot;

/// Run the interactive session until `quit`, end of input, or Ctrl+C.
pub async fn cmd_run(
    config: LowbotConfig,
    base: &Path,
    channel: String,
    author: String,
    locale: Option<String>,
) -> Result<()> {
    let bot = build_bot(&config, base, &ProcessEnv).await?;
    let dispatcher = bot.dispatcher;

    if !dispatcher.adapters().contains(TERMINAL_ADAPTER) {
        bail!("the `{TERMINAL_ADAPTER}` adapter is not configured");
    }

    println!();
    println!("  LowBot v{}", env!("CARGO_PKG_VERSION"));
    println!("  Intents: {}", bot.classifier.intent_names().join(", "));
    println!("  Skills: {}", dispatcher.registry().names().join(", "));
    println!("  Adapters: {}", dispatcher.adapters().names().join(", "));
    println!("  Type a message, or 'quit' to exit.");
    println!();

    let mut input = TerminalInput::stdin(channel, author);
    let mut pending = Vec::new();

    loop {
        let next = tokio::select! {
            next = input.next_utterance() => next.context("failed to read from the terminal")?,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n  Interrupted.");
                None
            }
        };
        let Some(mut utterance) = next else {
            break;
        };
        if let Some(locale) = &locale {
            utterance = utterance.with_locale(locale.clone());
        }

        pending.retain(|handle: &tokio::task::JoinHandle<_>| !handle.is_finished());
        pending.push(dispatcher.spawn(utterance));
    }

    info!(pending = pending.len(), "draining in-flight messages");
    for result in join_all(pending).await {
        match result {
            Ok(report) => {
                if let DispatchOutcome::Recovered { kind, failed_at, .. } = &report.outcome {
                    warn!(id = %report.id, kind = %kind, stage = %failed_at, "dispatch recovered");
                }
            }
            Err(e) => warn!(error = %e, "dispatch task failed"),
        }
    }

    println!("  Goodbye!");
    Ok(())
}
