// SPF Command Gate - Main Entry Point
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// CLI over a JSON command manifest. Every command routes through the dispatcher.
// Usage:
//   spf-command-gate run <manifest> [-g perm]... [--sender name] <tokens>...   # Dispatch one command
//   spf-command-gate complete <manifest> [-g perm]... <tokens>...              # Suggest next token
//   spf-command-gate export <manifest>                                         # Dump the routing trie
//   spf-command-gate check <manifest>                                          # Validate a manifest
//   spf-command-gate init-config <file>                                        # Write default config

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spf_command_gate::{
    config::RouterConfig, dispatcher::Dispatcher, manifest::Manifest, sender::ConsoleSender,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "spf-command-gate")]
#[command(author = "Joseph Stone")]
#[command(version = "1.0.0")]
#[command(about = "SPF Command Gate - declarative command routing with permission gating")]
struct Cli {
    /// Router config (JSON). Defaults are used when the file is absent.
    #[arg(short, long, global = true, default_value = "router.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch one command, print sender messages and the report
    Run {
        /// Command manifest (JSON)
        manifest: PathBuf,

        /// Permission granted to the sender (repeatable)
        #[arg(short, long = "grant")]
        grant: Vec<String>,

        /// Sender name
        #[arg(long, default_value = "console")]
        sender: String,

        /// Command tokens
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },

    /// Suggestions for the last token
    Complete {
        /// Command manifest (JSON)
        manifest: PathBuf,

        /// Permission granted to the sender (repeatable)
        #[arg(short, long = "grant")]
        grant: Vec<String>,

        /// Tokens typed so far; pass "" to complete a fresh token
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },

    /// Print every route as JSON
    Export {
        manifest: PathBuf,
    },

    /// Build the dispatcher and report problems
    Check {
        manifest: PathBuf,
    },

    /// Write the default router config
    InitConfig {
        file: PathBuf,
    },
}

fn build(manifest: &Path, config: RouterConfig) -> Result<Dispatcher> {
    let manifest = Manifest::load(manifest)?;
    let dispatcher = manifest
        .into_builder(config)
        .build()
        .context("Failed to build dispatcher")?;
    Ok(dispatcher)
}

fn main() -> Result<()> {
    // Initialize logging (safe if already init)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();

    let cli = Cli::parse();

    if let Commands::InitConfig { file } = &cli.command {
        RouterConfig::default()
            .save(file)
            .with_context(|| format!("Failed to write config to {:?}", file))?;
        println!("Default config written to {:?}", file);
        return Ok(());
    }

    let config = RouterConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    match &cli.command {
        Commands::Run { manifest, grant, sender, tokens } => {
            let dispatcher = build(manifest, config)?;
            let sender = ConsoleSender::new(sender, grant.iter().cloned());

            let report = dispatcher.dispatch(&sender, tokens);

            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.success {
                std::process::exit(1);
            }
        }

        Commands::Complete { manifest, grant, tokens } => {
            let dispatcher = build(manifest, config)?;
            let sender = ConsoleSender::new("console", grant.iter().cloned());

            let suggestions = dispatcher.complete(&sender, tokens);

            println!("{}", serde_json::to_string_pretty(&suggestions)?);

            if suggestions.is_none() {
                std::process::exit(1);
            }
        }

        Commands::Export { manifest } => {
            let dispatcher = build(manifest, config)?;
            println!("{}", serde_json::to_string_pretty(&dispatcher.export())?);
        }

        Commands::Check { manifest } => {
            let dispatcher = build(manifest, config)?;
            let export = dispatcher.export();
            println!("SPF Command Gate - '{}' OK", dispatcher.name());
            println!("  Main command: {}", if export.main.is_some() { "yes" } else { "no" });
            println!("  Roots: {}", dispatcher.root_keys().join(", "));
            println!("  Handler classes: {}", dispatcher.registry().len());
        }

        Commands::InitConfig { .. } => {}
    }

    Ok(())
}
