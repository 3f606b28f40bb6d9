//! Error types for `tally-core`.

use thiserror::Error;

use crate::kind::TransactionKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot decode {kind} document: {reason}")]
  Decode {
    kind:   TransactionKind,
    reason: String,
  },

  #[error("{kind} documents have no {effect} effect")]
  NoEffect {
    kind:   TransactionKind,
    effect: &'static str,
  },

  #[error("unknown topic: {0:?}")]
  UnknownTopic(String),

  #[error("unknown transaction kind: {0:?}")]
  UnknownTransactionKind(String),
}

impl Error {
  pub fn decode(kind: TransactionKind, reason: impl ToString) -> Self {
    Self::Decode {
      kind,
      reason: reason.to_string(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
