//! hamald — the hamal daemon.
//!
//! Single binary that assembles the rollout coordinator:
//! - Project store (in memory)
//! - Orchestrator client (Swan HTTP, or an in-process simulation)
//! - Rollout driver
//! - REST API
//!
//! # Usage
//!
//! ```text
//! hamald serve --config /etc/hamal/hamald.toml
//! hamald serve --listen 0.0.0.0:5099 --orchestrator http://swan:9999
//! hamald default-config > hamald.toml
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hamal_core::HamalConfig;
use hamal_core::config::LogConfig;
use tracing_subscriber::EnvFilter;

mod server;

#[derive(Parser)]
#[command(name = "hamald", about = "hamal staged rollout coordinator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server.
    Serve {
        /// Path to hamald.toml. Defaults apply when omitted.
        #[arg(short, long, env = "HAMALD_CONFIG")]
        config: Option<PathBuf>,

        /// Listen address, overrides the config file.
        #[arg(long)]
        listen: Option<String>,

        /// Orchestrator base URL, overrides the config file.
        #[arg(long)]
        orchestrator: Option<String>,
    },
    /// Print a config file with every default filled in.
    DefaultConfig,
}

fn init_tracing(log: &LogConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.filter)
            .with_context(|| format!("invalid log filter {:?}", log.filter))?,
    };
    if log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            listen,
            orchestrator,
        } => {
            let mut config = HamalConfig::load(config.as_deref())
                .context("failed to load hamald config")?;
            if let Some(listen) = listen {
                config.listen = listen;
            }
            if let Some(address) = orchestrator {
                config.orchestrator.address = address;
            }
            init_tracing(&config.log)?;
            server::run(config).await
        }
        Command::DefaultConfig => {
            print!("{}", HamalConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}
