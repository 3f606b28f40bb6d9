//! Message-bus consumer for the Tally projection pipeline.
//!
//! Turns change notifications for business documents into relational
//! projections: phase the document, upsert its primary projection through
//! the idempotency gate, then fan out to the stock, ledger, and payment
//! projections the document affects. Storage is any
//! [`ProjectionStore`](tally_core::store::ProjectionStore).

pub mod consumer;
pub mod diff;
pub mod error;
pub mod service;

pub use consumer::{Processed, TransactionConsumer};
pub use error::{Error, Result};
pub use service::{ConsumerService, UpsertOutcome};

use std::{path::PathBuf, str::FromStr};

use serde::Deserialize;
use strum::IntoEnumIterator;
use tally_core::{TransactionKind, phase::PhaserRegistry};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Environment variable that overrides the configured consumer group.
pub const CONSUMER_GROUP_ENV: &str = "TRANSACTION_CONSUMER_GROUP";

pub const DEFAULT_CONSUMER_GROUP: &str = "transaction-consumer-group-01";

/// Runtime configuration, deserialised from `tally.toml` and `TALLY_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ConsumerConfig {
  #[serde(default = "default_store_path")]
  pub store_path:     PathBuf,
  #[serde(default = "default_consumer_group")]
  pub consumer_group: String,
  /// Kind slugs to register. Empty means every kind.
  #[serde(default)]
  pub kinds:          Vec<String>,
}

fn default_store_path() -> PathBuf { PathBuf::from("tally.db") }

fn default_consumer_group() -> String { DEFAULT_CONSUMER_GROUP.to_owned() }

impl Default for ConsumerConfig {
  fn default() -> Self {
    Self {
      store_path:     default_store_path(),
      consumer_group: default_consumer_group(),
      kinds:          Vec::new(),
    }
  }
}

impl ConsumerConfig {
  /// Replace the consumer group when an override is present and non-empty.
  pub fn with_group_override(mut self, group: Option<String>) -> Self {
    if let Some(group) = group.filter(|g| !g.trim().is_empty()) {
      self.consumer_group = group;
    }
    self
  }

  /// The configured kinds, or every kind when none are listed.
  pub fn kinds(&self) -> Result<Vec<TransactionKind>> {
    if self.kinds.is_empty() {
      return Ok(TransactionKind::iter().collect());
    }
    self
      .kinds
      .iter()
      .map(|slug| {
        TransactionKind::from_str(slug.trim()).map_err(|_| {
          Error::from(tally_core::Error::UnknownTransactionKind(slug.clone()))
        })
      })
      .collect()
  }

  /// The standard phasers, restricted to the configured kinds.
  pub fn phasers(&self) -> Result<PhaserRegistry> {
    let mut registry = PhaserRegistry::standard();
    registry.retain(&self.kinds()?);
    Ok(registry)
  }
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// One delivered message as read by the `consume` command: the topic it
/// arrived on and its JSON payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
  pub topic:   String,
  pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests;
