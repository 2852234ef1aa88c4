// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Millwright - an AI assistant for factory operations.
//!
//! Binary entry point: `serve` runs the gateway, `ask` streams one question
//! through a running gateway, `config` prints the effective configuration.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod ask;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use millwright_config::model::MillwrightConfig;
use millwright_config::{ConfigError, render_errors};

/// Millwright - an AI assistant for factory operations.
#[derive(Parser, Debug)]
#[command(name = "millwright", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Ask one question through a running gateway and stream the answer.
    Ask {
        /// The question.
        message: String,
        /// Gateway base URL. Defaults to the configured host and port.
        #[arg(long)]
        url: Option<String>,
    },
    /// Validate and print the effective configuration.
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<MillwrightConfig, Vec<ConfigError>> {
    match path {
        Some(path) => millwright_config::load_and_validate_path(path),
        None => millwright_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Ask { message, url } => ask::run_ask(&config, message, url).await,
        Commands::Config => print_config(&config),
    };

    if let Err(e) = result {
        eprintln!("millwright: {e}");
        std::process::exit(1);
    }
}

/// Prints the merged configuration as TOML. The API key is masked.
fn print_config(config: &MillwrightConfig) -> Result<(), millwright_core::MillwrightError> {
    let mut shown = config.clone();
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some("********".to_string());
    }
    let rendered = toml::to_string_pretty(&shown)
        .map_err(|e| millwright_core::MillwrightError::Config(format!("cannot render config: {e}")))?;
    println!("{rendered}");
    Ok(())
}
