//! Schema migration command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct MigrateArgs {
    /// SQLite database file
    #[arg(long, env = "TICKETWIRE_DB", default_value = "ticketwire.db")]
    pub db: PathBuf,
}

pub fn execute(args: MigrateArgs) -> Result<()> {
    ticketwire_db::init_pool(&args.db)?;
    tracing::info!(path = %args.db.display(), "Schema is up to date");
    println!("  {} {}", "Migrated".green().bold(), args.db.display());
    Ok(())
}
