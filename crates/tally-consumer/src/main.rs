//! tally-consumer binary.
//!
//! Reads `tally.toml` (or the path specified with `--config`), opens the
//! SQLite projection store, and feeds newline-delimited message envelopes
//! through the transaction consumer.
//!
//! ```sh
//! echo '{"topic":"when-purchase-created","payload":{...}}' \
//!   | cargo run -p tally-consumer -- consume
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tally_consumer::{
  CONSUMER_GROUP_ENV, ConsumerConfig, Envelope, TransactionConsumer,
};
use tally_store_sqlite::SqliteStore;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tally transaction projection consumer")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tally.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the store and its schema, then exit.
  Migrate,
  /// Process newline-delimited `{"topic", "payload"}` envelopes.
  Consume {
    /// Read envelopes from this file instead of stdin.
    #[arg(short, long)]
    input: Option<PathBuf>,
  },
  /// Print every topic the consumer group subscribes to.
  Topics,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TALLY"))
    .build()
    .context("failed to read config file")?;

  let consumer_cfg: ConsumerConfig = settings
    .try_deserialize::<ConsumerConfig>()
    .context("failed to deserialise ConsumerConfig")?
    .with_group_override(std::env::var(CONSUMER_GROUP_ENV).ok());

  let phasers = consumer_cfg
    .phasers()
    .context("invalid `kinds` in configuration")?;

  let store_path = expand_tilde(&consumer_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let consumer = TransactionConsumer::new(
    Arc::new(store),
    phasers,
    consumer_cfg.consumer_group.clone(),
  );

  match cli.command {
    Command::Migrate => {
      let version = consumer
        .service()
        .store()
        .schema_version()
        .await
        .context("failed to read schema version")?;
      tracing::info!("store at {store_path:?} is at schema version {version}");
    }
    Command::Topics => {
      for topic in consumer.subscriptions() {
        println!("{topic}");
      }
    }
    Command::Consume { input } => match input {
      Some(path) => {
        let file = tokio::fs::File::open(&path)
          .await
          .with_context(|| format!("failed to open {path:?}"))?;
        consume(&consumer, BufReader::new(file)).await?;
      }
      None => consume(&consumer, BufReader::new(tokio::io::stdin())).await?,
    },
  }

  Ok(())
}

/// Dispatch each envelope in order, stopping at the first failed message.
async fn consume(
  consumer: &TransactionConsumer<SqliteStore>,
  reader: impl AsyncBufRead + Unpin,
) -> anyhow::Result<()> {
  tracing::info!(group = consumer.group(), "consuming");

  let mut lines = reader.lines();
  let mut processed = 0usize;
  let mut line_no = 0usize;
  while let Some(line) =
    lines.next_line().await.context("failed to read input")?
  {
    line_no += 1;
    if line.trim().is_empty() {
      continue;
    }

    let envelope: Envelope = serde_json::from_str(&line)
      .with_context(|| format!("line {line_no}: malformed envelope"))?;
    consumer
      .handle(&envelope.topic, &envelope.payload)
      .await
      .with_context(|| format!("line {line_no}: {} failed", envelope.topic))?;
    processed += 1;
  }

  tracing::info!(processed, "input exhausted");
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
