use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;

use gator::commands::{Command, CommandRouter, State};
use gator::config::Config;
use gator::feed::build_client;
use gator::storage::Database;

#[derive(Parser, Debug)]
#[command(
    name = "gator",
    version,
    about = "Blog aggregator: follow RSS feeds and browse their posts",
    after_help = "Commands: register, login, users, reset, addfeed, feeds, follow, unfollow, following, agg, browse"
)]
struct Args {
    /// Config file (default: ~/.gatorconfig.json)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Command to run
    command: String,

    /// Arguments passed to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gator=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;

    // Failing to reach the store is the one fatal startup error
    let db = Database::open(&config.db_url)
        .await
        .with_context(|| format!("Failed to open database '{}'", config.db_url))?;
    let client = build_client().context("Failed to build HTTP client")?;

    let (shutdown_tx, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                // dropping the sender would stop the scheduler
                std::future::pending::<()>().await;
            }
        }
    });

    let mut state = State {
        db: db.clone(),
        config,
        config_path,
        client,
        shutdown,
        out: Box::new(std::io::stdout()),
    };

    let router = CommandRouter::with_default_commands();
    let command = Command::new(args.command, args.args);
    let result = router.run(&mut state, &command).await;

    db.close().await;
    result.map_err(Into::into)
}
