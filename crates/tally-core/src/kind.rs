//! Transaction kinds and the constants attached to each of them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
  model::{CalcFlag, CashDirection, LedgerSide},
  store::TableSet,
};

/// Every business-document kind the pipeline projects.
///
/// The kebab-case form (`purchase-return`) is the slug used in topic names
/// and configuration.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TransactionKind {
  Purchase,
  PurchaseReturn,
  CreditorPayment,
  SaleInvoice,
  SaleInvoiceReturn,
  DebtorPayment,
  StockPickup,
  StockReturn,
  StockReceive,
  StockAdjustment,
  StockTransfer,
}

/// The line shape of a kind's source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
  /// Item lines: goods moving in or out, with quantities and prices.
  Items,
  /// Settlement lines: previously issued documents being paid off.
  Settlements,
}

/// How stock lines get their calc flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockRule {
  /// Every line carries the same flag.
  Fixed(CalcFlag),
  /// The flag follows the sign of each line's quantity.
  SignOfQuantity,
  /// Each line leaves its source warehouse and enters its destination.
  Transfer,
}

impl TransactionKind {
  pub fn slug(self) -> &'static str { self.into() }

  /// The transaction-flag discriminator stamped on every row of this kind.
  pub fn trans_flag(self) -> i16 {
    match self {
      Self::Purchase => 12,
      Self::PurchaseReturn => 16,
      Self::CreditorPayment => 19,
      Self::SaleInvoice => 44,
      Self::SaleInvoiceReturn => 48,
      Self::DebtorPayment => 50,
      Self::StockPickup => 56,
      Self::StockReturn => 58,
      Self::StockReceive => 60,
      Self::StockAdjustment => 66,
      Self::StockTransfer => 72,
    }
  }

  pub fn shape(self) -> DocumentShape {
    match self {
      Self::CreditorPayment | Self::DebtorPayment => DocumentShape::Settlements,
      _ => DocumentShape::Items,
    }
  }

  /// Which open-item ledger the document's counterparty lives in, if any.
  pub fn party_side(self) -> Option<LedgerSide> {
    match self {
      Self::Purchase | Self::PurchaseReturn | Self::CreditorPayment => {
        Some(LedgerSide::Creditor)
      }
      Self::SaleInvoice | Self::SaleInvoiceReturn | Self::DebtorPayment => {
        Some(LedgerSide::Debtor)
      }
      _ => None,
    }
  }

  /// `None` for kinds that never move stock.
  pub fn stock_rule(self) -> Option<StockRule> {
    match self {
      Self::Purchase
      | Self::SaleInvoiceReturn
      | Self::StockReceive
      | Self::StockReturn => Some(StockRule::Fixed(CalcFlag::Increase)),
      Self::PurchaseReturn | Self::SaleInvoice | Self::StockPickup => {
        Some(StockRule::Fixed(CalcFlag::Decrease))
      }
      Self::StockAdjustment => Some(StockRule::SignOfQuantity),
      Self::StockTransfer => Some(StockRule::Transfer),
      Self::CreditorPayment | Self::DebtorPayment => None,
    }
  }

  /// Whether money settled against this kind comes in or goes out.
  pub fn cash_direction(self) -> CashDirection {
    match self {
      Self::Purchase | Self::SaleInvoiceReturn | Self::CreditorPayment => {
        CashDirection::Disburse
      }
      _ => CashDirection::Receive,
    }
  }

  /// The header and detail tables of this kind's primary projection.
  pub fn tables(self) -> TableSet {
    match self {
      Self::Purchase => {
        TableSet::new("purchase_transaction", "purchase_transaction_detail")
      }
      Self::PurchaseReturn => TableSet::new(
        "purchase_return_transaction",
        "purchase_return_transaction_detail",
      ),
      Self::CreditorPayment => TableSet::new(
        "creditor_payment_transaction",
        "creditor_payment_transaction_detail",
      ),
      Self::SaleInvoice => TableSet::new(
        "sale_invoice_transaction",
        "sale_invoice_transaction_detail",
      ),
      Self::SaleInvoiceReturn => TableSet::new(
        "sale_invoice_return_transaction",
        "sale_invoice_return_transaction_detail",
      ),
      Self::DebtorPayment => TableSet::new(
        "debtor_payment_transaction",
        "debtor_payment_transaction_detail",
      ),
      Self::StockPickup => TableSet::new(
        "stock_pickup_transaction",
        "stock_pickup_transaction_detail",
      ),
      Self::StockReturn => TableSet::new(
        "stock_return_transaction",
        "stock_return_transaction_detail",
      ),
      Self::StockReceive => TableSet::new(
        "stock_receive_transaction",
        "stock_receive_transaction_detail",
      ),
      Self::StockAdjustment => TableSet::new(
        "stock_adjustment_transaction",
        "stock_adjustment_transaction_detail",
      ),
      Self::StockTransfer => TableSet::new(
        "stock_transfer_transaction",
        "stock_transfer_transaction_detail",
      ),
    }
  }
}
