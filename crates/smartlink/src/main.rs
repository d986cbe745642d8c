//! smartlink - SmartLink command line
//!
//! Resolves SmartLinks for a simulated request, inspects entity data and
//! manages the configuration cache.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays pipeable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("smartlink=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Url(cmd) => commands::url::execute(cmd, &cli.global).await,
        Commands::Fetch(cmd) => commands::fetch::execute(cmd, &cli.global).await,
        Commands::Entity(cmd) => commands::entity::execute(cmd, &cli.global).await,
        Commands::Invalidate(cmd) => commands::invalidate::execute(cmd, &cli.global).await,
        Commands::Config(cmd) => commands::config::execute(cmd, &cli.global),
        Commands::Version => {
            println!("smartlink {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
