//! The `ProjectionStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! The consumer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use strum::IntoEnumIterator;

use crate::{
  kind::TransactionKind,
  model::{DocKey, LedgerSide},
  projection::{PAYMENT_EFFECT_TABLES, Projection, STOCK_TABLES},
};

// ─── Tables ──────────────────────────────────────────────────────────────────

/// The header table and detail table a projection kind lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableSet {
  pub header: &'static str,
  pub detail: &'static str,
}

impl TableSet {
  pub const fn new(header: &'static str, detail: &'static str) -> Self {
    Self { header, detail }
  }
}

/// Every table set the pipeline writes to: one per transaction kind plus the
/// derived stock, ledger, and payment tables.
pub fn all_tables() -> Vec<TableSet> {
  TransactionKind::iter()
    .map(TransactionKind::tables)
    .chain([
      STOCK_TABLES,
      LedgerSide::Creditor.tables(),
      LedgerSide::Debtor.tables(),
      PAYMENT_EFFECT_TABLES,
    ])
    .collect()
}

// ─── Reconciliation report ───────────────────────────────────────────────────

/// What an update did to the stored detail lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
  /// Surrogate ids of stored lines that were physically deleted.
  pub deleted:  Vec<i64>,
  /// Surrogate ids assigned to lines that were inserted.
  pub inserted: Vec<i64>,
  /// Surrogate ids of stored lines that were replaced in place.
  pub replaced: Vec<i64>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a relational projection store.
///
/// Every projection kind is stored as a header row keyed by
/// `(shop_id, doc_no)` plus detail rows keyed by a surrogate id. Each call is
/// atomic on its own; nothing spans two calls.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait ProjectionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Load a projection and its lines. Returns `None` if no header exists.
  fn get<P: Projection>(
    &self,
    tables: TableSet,
    key: DocKey,
  ) -> impl Future<Output = Result<Option<P>, Self::Error>> + Send + '_;

  /// Insert a header and all of its lines. Fails if the key already exists.
  /// Returns the projection with surrogate ids assigned.
  fn create<P: Projection>(
    &self,
    projection: P,
  ) -> impl Future<Output = Result<P, Self::Error>> + Send + '_;

  /// Replace the header and reconcile the lines against the stored ones.
  ///
  /// Stored lines whose id is not carried by any incoming line are deleted.
  /// Incoming lines with a known id replace the stored row; all others are
  /// inserted. Fails with a not-found error if no header exists.
  fn update<P: Projection>(
    &self,
    projection: P,
  ) -> impl Future<Output = Result<Reconciliation, Self::Error>> + Send + '_;

  /// Delete a header and all of its lines. Returns whether a header existed.
  fn delete(
    &self,
    tables: TableSet,
    key: DocKey,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All projections of one tenant, ordered by document date then number.
  fn list<P: Projection>(
    &self,
    tables: TableSet,
    shop_id: String,
  ) -> impl Future<Output = Result<Vec<P>, Self::Error>> + Send + '_;
}
