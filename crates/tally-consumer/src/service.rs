//! The consumer service: idempotent upsert and unconditional delete over a
//! [`ProjectionStore`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tally_core::{
  model::DocKey,
  projection::Projection,
  store::{ProjectionStore, Reconciliation, TableSet},
};

use crate::{
  Error, Result,
  diff::{self, Plan},
};

/// What an upsert did.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
  Created,
  Updated(Reconciliation),
  Unchanged,
  Stale {
    stored:   DateTime<Utc>,
    incoming: DateTime<Utc>,
  },
}

impl UpsertOutcome {
  /// Whether the store was written to.
  pub fn wrote(&self) -> bool {
    matches!(self, Self::Created | Self::Updated(_))
  }
}

pub struct ConsumerService<S> {
  store: Arc<S>,
}

impl<S> Clone for ConsumerService<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}

impl<S: ProjectionStore> ConsumerService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  /// Create, update, or skip `projection` depending on what is stored under
  /// its key.
  pub async fn upsert<P: Projection>(
    &self,
    projection: P,
  ) -> Result<UpsertOutcome> {
    let stored: Option<P> = self
      .store
      .get(projection.tables(), projection.key())
      .await
      .map_err(Error::store)?;

    match diff::plan(projection, stored.as_ref()) {
      Plan::Create(p) => {
        self.store.create(p).await.map_err(Error::store)?;
        Ok(UpsertOutcome::Created)
      }
      Plan::Update(p) => {
        let reconciliation =
          self.store.update(p).await.map_err(Error::store)?;
        Ok(UpsertOutcome::Updated(reconciliation))
      }
      Plan::Unchanged => Ok(UpsertOutcome::Unchanged),
      Plan::Stale { stored, incoming } => {
        Ok(UpsertOutcome::Stale { stored, incoming })
      }
    }
  }

  /// Delete the projection under `key`. A missing row is not an error.
  pub async fn delete(&self, tables: TableSet, key: DocKey) -> Result<bool> {
    self.store.delete(tables, key).await.map_err(Error::store)
  }
}
