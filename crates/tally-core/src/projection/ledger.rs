//! The creditor/debtor-effect projection: an open item on the counterparty
//! ledger, settled later by payments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
  HeaderColumns, Projection, projection_accessors, transaction::DetailLine,
};
use crate::{
  kind::TransactionKind,
  model::{Branch, LedgerSide, LedgerStatus, Party, Totals},
  store::TableSet,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerProjection {
  pub side:              LedgerSide,
  pub origin_kind:       TransactionKind,
  pub shop_id:           String,
  pub doc_no:            String,
  pub doc_date:          DateTime<Utc>,
  pub trans_flag:        i16,
  pub inquiry_type:      i32,
  pub guid_fixed:        String,
  pub branch:            Branch,
  pub party:             Party,
  pub tax_doc_no:        String,
  pub doc_ref_no:        String,
  pub totals:            Totals,
  /// Owned by the settlement flow.
  pub paid_amount:       f64,
  /// Owned by the settlement flow; `totals.amount - paid_amount`.
  pub balance:           f64,
  /// Owned by the settlement flow; derived from `paid_amount` on update.
  pub status:            LedgerStatus,
  pub is_cancel:         bool,
  pub source_updated_at: Option<DateTime<Utc>>,
  pub details:           Vec<DetailLine>,
}

impl Projection for LedgerProjection {
  projection_accessors!(DetailLine);

  fn tables(&self) -> TableSet { self.side.tables() }

  fn header(&self) -> HeaderColumns {
    HeaderColumns {
      shop_id:           self.shop_id.clone(),
      doc_no:            self.doc_no.clone(),
      doc_date:          self.doc_date,
      trans_flag:        self.trans_flag,
      inquiry_type:      self.inquiry_type,
      party_code:        Some(self.party.code.clone()),
      total_amount:      self.totals.amount,
      is_cancel:         self.is_cancel,
      source_updated_at: self.source_updated_at,
    }
  }

  /// Settlement progress survives; balance and status follow the new total.
  fn carry_store_owned(&mut self, stored: &Self) {
    self.paid_amount = stored.paid_amount;
    self.balance = self.totals.amount - stored.paid_amount;
    self.status =
      LedgerStatus::for_amounts(self.totals.amount, self.paid_amount);
  }

  fn clear_store_owned(&mut self) {
    self.paid_amount = 0.0;
    self.balance = 0.0;
    self.status = LedgerStatus::Open;
  }
}
