//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod migrate;
pub mod serve;

/// Ticketwire - equipment complaint tickets with live admin views
#[derive(Parser)]
#[command(name = "ticketwire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve(serve::ServeArgs),

    /// Create or upgrade the database schema
    Migrate(migrate::MigrateArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => serve::execute(args).await,
            Commands::Migrate(args) => migrate::execute(args),
        }
    }
}
