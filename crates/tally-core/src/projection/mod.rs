//! Relational projections and the trait every projection kind implements.
//!
//! A projection is a header plus an ordered collection of lines. Storage
//! backends persist any [`Projection`] generically: the header's typed
//! columns come from [`Projection::header`], each line's from
//! [`ProjectionLine::columns`], and the full shape round-trips through serde.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::{model::DocKey, store::TableSet};

pub mod ledger;
pub mod payment;
pub mod payment_effect;
pub mod stock;
pub mod transaction;

pub use ledger::LedgerProjection;
pub use payment::{PaymentProjection, SettlementDetail};
pub use payment_effect::{
  PAYMENT_EFFECT_TABLES, PaymentEffectLine, PaymentEffectProjection,
};
pub use stock::{STOCK_TABLES, StockLine, StockProjection};
pub use transaction::{DetailLine, ItemSnapshot, Placement, TransactionProjection};

// ─── Reporting columns ───────────────────────────────────────────────────────

/// The typed header columns a backend stores next to the serialised body.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderColumns {
  pub shop_id:           String,
  pub doc_no:            String,
  pub doc_date:          DateTime<Utc>,
  pub trans_flag:        i16,
  pub inquiry_type:      i32,
  pub party_code:        Option<String>,
  pub total_amount:      f64,
  pub is_cancel:         bool,
  pub source_updated_at: Option<DateTime<Utc>>,
}

/// The typed line columns a backend stores next to the serialised body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineColumns {
  pub line_number: i32,
  pub barcode:     Option<String>,
  pub qty:         f64,
  pub amount:      f64,
  pub wh_code:     Option<String>,
  pub calc_flag:   Option<i8>,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

pub trait ProjectionLine:
  Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
  /// The id assigned by the store on first insert; `None` until then.
  fn surrogate_id(&self) -> Option<i64>;

  fn set_surrogate_id(&mut self, id: Option<i64>);

  /// Stable line number supplied by the source document.
  fn line_number(&self) -> i32;

  fn columns(&self) -> LineColumns;
}

pub trait Projection:
  Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
  type Line: ProjectionLine;

  fn tables(&self) -> TableSet;

  fn header(&self) -> HeaderColumns;

  fn key(&self) -> DocKey;

  fn lines(&self) -> &[Self::Line];

  fn lines_mut(&mut self) -> &mut Vec<Self::Line>;

  fn source_updated_at(&self) -> Option<DateTime<Utc>>;

  /// Copy every field that the store owns (rather than the source
  /// document) from `stored` into `self`.
  fn carry_store_owned(&mut self, _stored: &Self) {}

  /// Reset store-owned fields to their initial values.
  fn clear_store_owned(&mut self) {}

  /// Structural equality ignoring surrogate ids and store-owned fields.
  /// Lines are compared in line-number order; lines sharing a number keep
  /// their relative order.
  fn same_content(&self, other: &Self) -> bool {
    comparable(self) == comparable(other)
  }
}

fn comparable<P: Projection>(projection: &P) -> P {
  let mut p = projection.clone();
  p.clear_store_owned();
  let lines = p.lines_mut();
  lines.sort_by_key(|line| line.line_number());
  for line in lines {
    line.set_surrogate_id(None);
  }
  p
}

/// Implements the boilerplate accessors shared by every projection whose
/// lines live in a `details` field and whose key is `shop_id` + `doc_no`.
macro_rules! projection_accessors {
  ($line:ty) => {
    type Line = $line;

    fn key(&self) -> $crate::model::DocKey {
      $crate::model::DocKey::new(self.shop_id.clone(), self.doc_no.clone())
    }

    fn lines(&self) -> &[$line] { &self.details }

    fn lines_mut(&mut self) -> &mut Vec<$line> { &mut self.details }

    fn source_updated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
      self.source_updated_at
    }
  };
}

/// Implements the id and line-number accessors for a line struct with
/// `id: Option<i64>` and `line_number: i32` fields.
macro_rules! line_accessors {
  () => {
    fn surrogate_id(&self) -> Option<i64> { self.id }

    fn set_surrogate_id(&mut self, id: Option<i64>) { self.id = id; }

    fn line_number(&self) -> i32 { self.line_number }
  };
}

pub(crate) use line_accessors;
pub(crate) use projection_accessors;

fn non_empty(s: &str) -> Option<String> {
  (!s.is_empty()).then(|| s.to_owned())
}
