//! CLI entry point for LowBot.
//!
//! This binary provides the `lowbot` command with subcommands for chatting
//! with the bot, validating a configuration, and classifying text.

mod cli;
mod config;
mod helpers;
mod repl;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use lowbot_kernel::{AdapterConf, ProcessEnv, Skill};

use crate::cli::{Cli, Commands, DEFAULT_CONFIG};
use crate::config::LowbotConfig;
use crate::helpers::{build_bot, build_classifier, build_skills, init_tracing};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Run { .. } => "info",
        Commands::Check | Commands::Classify { .. } => "warn",
    };
    init_tracing(default_level, cli.json_logs);

    let explicit = cli.config != Path::new(DEFAULT_CONFIG);
    let config = LowbotConfig::load(&cli.config, explicit)?;
    let base = config_base(&cli.config);

    match cli.command {
        Commands::Run {
            channel,
            author,
            locale,
        } => repl::cmd_run(config, &base, channel, author, locale).await,
        Commands::Check => cmd_check(&cli.config, &config, &base).await,
        Commands::Classify { text, json } => cmd_classify(&config, &text.join(" "), json),
    }
}

/// Directory relative paths in the configuration resolve against.
fn config_base(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Subcommand: check
// ---------------------------------------------------------------------------

async fn cmd_check(path: &Path, config: &LowbotConfig, base: &Path) -> Result<()> {
    println!();
    println!("  LowBot v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("  Config: {}", path.display());
    println!(
        "  min_score: {}  max_in_flight: {}  stage_timeout_ms: {}",
        config.bot.min_score, config.bot.max_in_flight, config.bot.stage_timeout_ms
    );

    println!();
    println!("  Intents:");
    for intent in &config.intents {
        println!(
            "    {:<16} {} phrases, {} patterns",
            intent.name,
            intent.phrases.len(),
            intent.patterns.len()
        );
    }

    println!();
    println!("  Skills (in match order):");
    for (position, skill) in build_skills(config, base)?.iter().enumerate() {
        println!("    {}. {}", position + 1, skill.info().name);
    }

    println!();
    println!("  Adapters:");
    let mut missing_any = false;
    for (name, settings) in &config.adapters {
        let conf = AdapterConf::resolve(name.clone(), &settings.vars, &ProcessEnv);
        let default_marker = if *name == config.bot.default_adapter {
            " (default)"
        } else {
            ""
        };
        println!("    {name}{default_marker}");
        for (key, env_var) in conf.missing() {
            missing_any = true;
            println!("      missing {key}: set {env_var}");
        }
    }

    println!();
    if missing_any {
        println!("  Some adapter variables are unset; `lowbot run` will fail.");
        println!();
        return Ok(());
    }

    build_bot(config, base, &ProcessEnv).await?;
    println!("  Configuration OK.");
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: classify
// ---------------------------------------------------------------------------

fn cmd_classify(config: &LowbotConfig, text: &str, as_json: bool) -> Result<()> {
    let classifier = build_classifier(config)?;
    let best = classifier.classify_text(text);
    let ranking = classifier.rank(text);
    let slots = classifier.extract_slots(text, &best.intent_name);
    let resolved = best.is_resolved(config.bot.min_score);

    if as_json {
        let output = json!({
            "text": text,
            "intent": best,
            "resolved": resolved,
            "slots": slots,
            "ranking": ranking,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("failed to encode result")?
        );
        return Ok(());
    }

    println!();
    println!(
        "  Intent: {} (score {:.2}, {})",
        best.intent_name,
        best.score,
        if resolved { "resolved" } else { "below threshold" }
    );
    if let Some(slots) = slots.filter(|s| !s.is_empty()) {
        let mut slots: Vec<_> = slots.into_iter().collect();
        slots.sort();
        for (name, value) in slots {
            println!("    {name} = {value}");
        }
    }
    if !ranking.is_empty() {
        println!();
        println!("  Ranking:");
        for candidate in &ranking {
            println!("    {:<16} {:.2}", candidate.intent_name, candidate.score);
        }
    }
    println!();
    Ok(())
}

