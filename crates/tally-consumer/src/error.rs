//! Error type for `tally-consumer`.

use strum::Display;
use tally_core::{TransactionKind, model::DocKey};
use thiserror::Error;

/// The derived projection a fan-out step was writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FanoutStage {
  Stock,
  Ledger,
  Payment,
}

#[derive(Debug, Error)]
pub enum Error {
  /// Undecodable documents, unknown topics, unregistered kinds.
  #[error(transparent)]
  Core(#[from] tally_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The primary projection is committed but a derived step failed; the
  /// two are inconsistent until the message is redelivered.
  #[error("{kind} {key}: {stage} fan-out failed after the primary write: {source}")]
  PartialFanout {
    kind:   TransactionKind,
    key:    DocKey,
    stage:  FanoutStage,
    #[source]
    source: Box<Error>,
  },
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn is_decode(&self) -> bool {
    matches!(self, Self::Core(tally_core::Error::Decode { .. }))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
