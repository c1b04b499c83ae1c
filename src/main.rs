mod cache;
mod commands;
mod config;
mod logging;
mod model;
mod remote;
mod store;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::debug;

use cache::{LocalCache, SqliteStorage};
use commands::{Command, ListArgs};
use remote::RemoteClient;
use store::Coordinator;

#[derive(Parser, Debug)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications, online or offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/jobtrack/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Use the local cache only, even if a remote API is configured
  #[arg(long)]
  offline: bool,

  /// Log to stderr instead of the log file
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.verbose)?;

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if args.offline {
    config.storage.remote_enabled = false;
  }
  debug!("Storage configuration: {:?}", config.storage);

  let storage = SqliteStorage::open(&config.cache_path()?)?;
  let remote = RemoteClient::new(&config.storage)?;
  let store = Coordinator::new(config.storage, remote, LocalCache::new(storage));

  let command = args
    .command
    .unwrap_or_else(|| Command::List(ListArgs::default()));
  commands::execute(command, &store, &mut std::io::stdout().lock()).await?;

  Ok(())
}
