use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod client;
mod commands;

use client::ApiClient;

#[derive(Parser)]
#[command(
    name = "hamal",
    about = "hamal — staged canary rollouts",
    version,
    propagate_version = true,
)]
struct Cli {
    /// hamald base URL
    #[arg(
        long,
        global = true,
        env = "HAMAL_SERVER",
        default_value = "http://127.0.0.1:5099"
    )]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a rollout plan and advance every application one stage.
    ///
    /// A project that already exists keeps its registered plan unless
    /// --replace is given.
    Deploy {
        /// Plan file (JSON)
        #[arg(short, long)]
        file: PathBuf,
        /// Replace the registered plan if the project exists
        #[arg(long)]
        replace: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List projects with their live status
    List,
    /// Show one project's stages and history
    Status { name: String },
    /// Advance one application to its next stage
    Advance {
        name: String,
        #[arg(short, long)]
        app: String,
    },
    /// Roll one application back by one stage
    Rollback {
        name: String,
        #[arg(short, long)]
        app: String,
    },
    /// Delete a project (orchestrator state is left untouched)
    Delete { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hamal=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.server)?;

    match cli.command {
        Commands::Deploy { file, replace, yes } => {
            commands::deploy::deploy(&client, &file, replace, yes).await
        }
        Commands::List => commands::project::list(&client).await,
        Commands::Status { name } => commands::project::status(&client, &name).await,
        Commands::Advance { name, app } => commands::rollout::advance(&client, &name, &app).await,
        Commands::Rollback { name, app } => {
            commands::rollout::rollback(&client, &name, &app).await
        }
        Commands::Delete { name } => commands::project::delete(&client, &name).await,
    }
}
