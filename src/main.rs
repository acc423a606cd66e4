use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use peerstore::config::Config;
use peerstore::logging;
use peerstore::store::{HybridStore, Storage, StorageError};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "peerstore")]
#[command(about = "Inspect and edit a peer node's key-value store")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/peerstore/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Database file to open
  #[arg(short, long)]
  path: Option<PathBuf>,

  /// Maximum resident cache entries
  #[arg(long)]
  cache_size: Option<usize>,

  /// Cache freshness window in milliseconds
  #[arg(long)]
  ttl_ms: Option<u64>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the value stored under a key
  Get { key: String },
  /// Store a value (parsed as JSON, otherwise stored as a string)
  Put { key: String, value: String },
  /// Remove a key
  Delete { key: String },
  /// Report whether a key exists
  Has { key: String },
  /// List all stored keys
  Keys,
  /// Show a key's value and when it was last written
  Inspect { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  let mut options = config.store_options()?;
  if let Some(path) = args.path {
    options.path = Some(path);
  }
  if let Some(cache_size) = args.cache_size {
    options.cache_size = cache_size;
  }
  if let Some(ttl_ms) = args.ttl_ms {
    options.ttl = Duration::from_millis(ttl_ms);
  }

  let store = HybridStore::open(options)?;
  let outcome = run(&store, args.command).await;
  store.close().await?;
  outcome
}

async fn run(store: &HybridStore, command: Command) -> Result<()> {
  match command {
    Command::Get { key } => {
      let value = store.get(&key).await?;
      println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Command::Put { key, value } => {
      let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
      store.put(&key, value).await?;
    }
    Command::Delete { key } => {
      store.delete(&key).await?;
    }
    Command::Has { key } => {
      println!("{}", store.has(&key).await?);
    }
    Command::Keys => {
      for key in store.keys().await? {
        println!("{}", key);
      }
    }
    Command::Inspect { key } => {
      let value = store.get(&key).await?;
      let updated_at = store
        .engine()
        .updated_at(&key)
        .await
        .map_err(|e| StorageError::io("inspect", &key, e))?
        .ok_or_else(|| eyre!("Key {} disappeared while inspecting", key))?;
      println!("key:        {}", key);
      println!("updated_at: {}", updated_at.to_rfc3339());
      println!("value:      {}", serde_json::to_string_pretty(&value)?);
    }
  }

  Ok(())
}
