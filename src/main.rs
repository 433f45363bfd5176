mod cli;
mod config;
mod error;
mod keywords;
mod llm;
mod metadata;
mod parser;
mod pipeline;
mod summarize;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing - only show warnings by default, use RUST_LOG=info for more detail
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cli::commands::init::run(force).await?;
        }
        Commands::Extract {
            paths,
            provider,
            model,
            mode,
            chunk_size,
            max_chunks,
            format,
            show_text,
            save,
        } => {
            cli::commands::extract::run(
                paths, provider, model, mode, chunk_size, max_chunks, format, show_text, save,
            )
            .await?;
        }
        Commands::Serve {
            host,
            port,
            provider,
            model,
        } => {
            cli::commands::serve::run(host, port, provider, model).await?;
        }
        Commands::Doctor => {
            cli::commands::doctor::run().await?;
        }
    }

    Ok(())
}
