//! Value types shared by every projection.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::store::TableSet;

// ─── Keys ────────────────────────────────────────────────────────────────────

/// The natural key of a projection: one live row per tenant and document
/// number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocKey {
  pub shop_id: String,
  pub doc_no:  String,
}

impl DocKey {
  pub fn new(shop_id: impl Into<String>, doc_no: impl Into<String>) -> Self {
    Self {
      shop_id: shop_id.into(),
      doc_no:  doc_no.into(),
    }
  }
}

impl fmt::Display for DocKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.shop_id, self.doc_no)
  }
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

/// A name in one language, e.g. `{ code: "th", name: "สินค้า" }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocaleName {
  pub code: String,
  pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branch {
  pub code:  String,
  pub names: Vec<LocaleName>,
}

/// Snapshot of the counterparty at the time the document was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
  pub side:  LedgerSide,
  pub code:  String,
  pub names: Vec<LocaleName>,
}

// ─── Amounts ─────────────────────────────────────────────────────────────────

/// Header-level monetary totals, copied from the source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
  pub value:         f64,
  pub discount_word: String,
  pub discount:      f64,
  pub before_vat:    f64,
  pub vat_value:     f64,
  pub except_vat:    f64,
  pub after_vat:     f64,
  pub amount:        f64,
}

/// How a document was settled, summed per channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentTotals {
  pub cash:        f64,
  pub credit_card: f64,
  pub transfer:    f64,
}

impl PaymentTotals {
  pub fn total(&self) -> f64 { self.cash + self.credit_card + self.transfer }

  /// Channels with a non-zero amount, in a fixed order.
  pub fn channels(&self) -> Vec<(PaymentChannel, f64)> {
    [
      (PaymentChannel::Cash, self.cash),
      (PaymentChannel::CreditCard, self.credit_card),
      (PaymentChannel::Transfer, self.transfer),
    ]
    .into_iter()
    .filter(|(_, amount)| *amount != 0.0)
    .collect()
  }
}

// ─── Discriminants ───────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LedgerSide {
  Creditor,
  Debtor,
}

impl LedgerSide {
  pub fn tables(self) -> TableSet {
    match self {
      Self::Creditor => {
        TableSet::new("creditor_transaction", "creditor_transaction_detail")
      }
      Self::Debtor => {
        TableSet::new("debtor_transaction", "debtor_transaction_detail")
      }
    }
  }
}

/// The stock direction of a line: `+1` in, `-1` out, `0` no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum CalcFlag {
  Increase,
  Neutral,
  Decrease,
}

impl CalcFlag {
  pub fn value(self) -> i8 {
    match self {
      Self::Increase => 1,
      Self::Neutral => 0,
      Self::Decrease => -1,
    }
  }

  /// Flag for a signed quantity.
  pub fn of_quantity(qty: f64) -> Self {
    if qty > 0.0 {
      Self::Increase
    } else if qty < 0.0 {
      Self::Decrease
    } else {
      Self::Neutral
    }
  }
}

impl From<CalcFlag> for i8 {
  fn from(flag: CalcFlag) -> Self { flag.value() }
}

impl TryFrom<i8> for CalcFlag {
  type Error = String;

  fn try_from(value: i8) -> Result<Self, Self::Error> {
    match value {
      1 => Ok(Self::Increase),
      0 => Ok(Self::Neutral),
      -1 => Ok(Self::Decrease),
      other => Err(format!("calc flag out of range: {other}")),
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CashDirection {
  Receive,
  Disburse,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentChannel {
  Cash,
  CreditCard,
  Transfer,
}

/// Settlement state of an open item.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LedgerStatus {
  Open,
  PartiallyPaid,
  Settled,
}

impl LedgerStatus {
  pub fn for_amounts(total: f64, paid: f64) -> Self {
    if paid <= 0.0 {
      Self::Open
    } else if paid < total {
      Self::PartiallyPaid
    } else {
      Self::Settled
    }
  }
}
