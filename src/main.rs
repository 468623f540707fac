use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dataserver::{app, config};

#[derive(Parser, Debug)]
#[command(version, about = "Live AMM pool reserve tracker and Jito tip cache")]
struct Args {
    /// Path to config file (optional)
    #[arg(long)]
    config: Option<String>,

    /// RPC endpoint URL (overrides config)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Pubsub endpoint URL; derived from the RPC url when unset
    #[arg(long)]
    ws_url: Option<String>,

    /// HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// SQLite wallet database
    #[arg(long)]
    database: Option<String>,

    /// Pool to track from startup
    #[arg(long)]
    pool_id: Option<String>,

    /// Log filter, e.g. `info` or `dataserver=debug` (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Priority: CLI args > config file > defaults
    let mut cfg = match &args.config {
        Some(path) => config::Config::from_file(path)?,
        None => config::Config::default(),
    };

    if let Some(rpc_url) = args.rpc_url {
        cfg.rpc.url = Some(rpc_url);
    }
    if let Some(ws_url) = args.ws_url {
        cfg.rpc.ws_url = Some(ws_url);
    }
    if let Some(bind) = args.bind {
        cfg.server.bind = Some(bind);
    }
    if let Some(database) = args.database {
        cfg.database.path = Some(database);
    }
    if let Some(pool_id) = args.pool_id {
        cfg.pool.pool_id = Some(pool_id);
    }

    let app_cfg = app::AppCfg::from_config(cfg)?;
    app::run(app_cfg).await
}
