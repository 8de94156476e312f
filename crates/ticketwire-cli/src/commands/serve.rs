//! Web server command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use ticketwire_core::{
    Hub, HubConfig, MemoryTicketStore, SqliteTicketStore, TicketGateway, TicketStore,
};
use ticketwire_web::ServerConfig;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "TICKETWIRE_PORT", default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, env = "TICKETWIRE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// SQLite database file
    #[arg(long, env = "TICKETWIRE_DB", default_value = "ticketwire.db")]
    pub db: PathBuf,

    /// Keep tickets in memory instead of SQLite (ignores --db)
    #[arg(long)]
    pub in_memory: bool,

    /// Directory served at `/`
    #[arg(long, env = "TICKETWIRE_STATIC", default_value = "static")]
    pub static_dir: PathBuf,

    /// Per-session send timeout for broadcasts, in milliseconds
    #[arg(long, env = "TICKETWIRE_SEND_TIMEOUT_MS", default_value = "5000")]
    pub send_timeout_ms: u64,

    /// Sessions written to in parallel per broadcast
    #[arg(long, env = "TICKETWIRE_FANOUT_CONCURRENCY", default_value = "32")]
    pub fanout_concurrency: usize,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file path (implies --log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl ServeArgs {
    /// Where to write logs, if file logging is enabled.
    pub fn log_path(&self) -> Option<PathBuf> {
        match (&self.log_file, self.log) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => Some(PathBuf::from("ticketwire.log")),
            (None, false) => None,
        }
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            fanout_concurrency: self.fanout_concurrency,
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            static_dir: self.static_dir.clone(),
        }
    }
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let store: Arc<dyn TicketStore> = if args.in_memory {
        tracing::warn!("Using in-memory store; tickets are lost on exit");
        Arc::new(MemoryTicketStore::new())
    } else {
        let pool = Arc::new(ticketwire_db::init_pool(&args.db)?);
        Arc::new(SqliteTicketStore::new(pool))
    };

    let hub_config = args.hub_config();
    tracing::debug!(
        send_timeout_ms = args.send_timeout_ms,
        fanout_concurrency = hub_config.fanout_concurrency,
        "Hub configured"
    );
    let gateway = TicketGateway::new(store, Arc::new(Hub::new(hub_config)));

    println!();
    println!("  {} {}", "Ticketwire".cyan().bold(), "Web Server".bold());
    println!();
    println!("  {}  http://{}:{}", "Frontend".green(), args.host, args.port);
    println!("  {}       http://{}:{}/api/tickets", "API".green(), args.host, args.port);
    println!("  {}  ws://{}:{}/ws/admin", "Admin WS".green(), args.host, args.port);
    if args.in_memory {
        println!("  {}   {}", "Storage".green(), "in-memory".yellow());
    } else {
        println!("  {}   {}", "Storage".green(), args.db.display());
    }
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    ticketwire_web::run_server(gateway, args.server_config()).await?;

    Ok(())
}
