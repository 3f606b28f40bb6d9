//! Fan-out predicates.
//!
//! Whether a document produces a stock, ledger, or payment projection is a
//! pure function of its kind and inquiry type. The consumer evaluates these;
//! the phasers never do.

use crate::{kind::TransactionKind, model::LedgerSide};

/// The derived projections a document fans out to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
  pub stock:   bool,
  pub ledger:  Option<LedgerSide>,
  pub payment: bool,
}

impl Effects {
  pub const NONE: Self = Self {
    stock:   false,
    ledger:  None,
    payment: false,
  };

  const fn new(stock: bool, ledger: Option<LedgerSide>, payment: bool) -> Self {
    Self {
      stock,
      ledger,
      payment,
    }
  }

  pub fn has_stock_effect(&self) -> bool { self.stock }

  pub fn has_ledger_effect(&self) -> bool { self.ledger.is_some() }

  pub fn has_payment_effect(&self) -> bool { self.payment }
}

/// Evaluate the effect matrix for one document.
///
/// Trading kinds read the inquiry type: `0` goods on credit, `1` goods for
/// cash, `2` services or price adjustment on credit, `3` the same for cash.
/// Only cash sales and purchases (`1`) record a payment; returns record one
/// for `2` and `3`. Sale invoices always move stock. Any other inquiry type
/// on a purchase or return has no effect at all.
pub fn effects(kind: TransactionKind, inquiry_type: i32) -> Effects {
  use TransactionKind as K;

  let side = kind.party_side();
  match kind {
    K::Purchase => match inquiry_type {
      0 => Effects::new(true, side, false),
      1 => Effects::new(true, None, true),
      2 => Effects::new(false, side, false),
      _ => Effects::NONE,
    },
    K::SaleInvoice => match inquiry_type {
      0 | 2 => Effects::new(true, side, false),
      1 => Effects::new(true, None, true),
      _ => Effects::new(true, None, false),
    },
    K::PurchaseReturn | K::SaleInvoiceReturn => match inquiry_type {
      0 => Effects::new(true, side, false),
      1 => Effects::new(false, side, false),
      2 => Effects::new(true, None, true),
      3 => Effects::new(false, None, true),
      _ => Effects::NONE,
    },
    K::CreditorPayment | K::DebtorPayment => Effects::new(false, None, true),
    K::StockPickup
    | K::StockReturn
    | K::StockReceive
    | K::StockAdjustment
    | K::StockTransfer => Effects::new(true, None, false),
  }
}

/// Every derived projection `kind` can produce under some inquiry type.
/// Deletes cascade to all of these, whatever the deleted document says.
pub fn possible_effects(kind: TransactionKind) -> Effects {
  (0..=3).map(|inquiry| effects(kind, inquiry)).fold(
    Effects::NONE,
    |acc, e| Effects {
      stock:   acc.stock || e.stock,
      ledger:  acc.ledger.or(e.ledger),
      payment: acc.payment || e.payment,
    },
  )
}
