//! Error type for `tally-store-sqlite`.

use tally_core::model::DocKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// An update addressed a header row that does not exist.
  #[error("{table}: no row for {key}")]
  NotFound {
    table: &'static str,
    key:   DocKey,
  },

  #[error("{table}: a row for {key} already exists")]
  DuplicateKey {
    table: &'static str,
    key:   DocKey,
  },
}

impl Error {
  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
