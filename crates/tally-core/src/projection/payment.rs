//! The primary projection of creditor and debtor payments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
  HeaderColumns, LineColumns, Projection, ProjectionLine, line_accessors,
  projection_accessors,
};
use crate::{
  kind::TransactionKind,
  model::{Branch, Party, PaymentTotals},
  store::TableSet,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProjection {
  pub kind:                 TransactionKind,
  pub shop_id:              String,
  pub doc_no:               String,
  pub doc_date:             DateTime<Utc>,
  pub trans_flag:           i16,
  pub guid_fixed:           String,
  pub branch:               Branch,
  pub party:                Party,
  pub description:          String,
  pub sale_code:            String,
  pub sale_name:            String,
  pub total_amount:         f64,
  pub total_value:          f64,
  pub total_balance:        f64,
  pub total_payment_amount: f64,
  pub payment:              PaymentTotals,
  pub is_cancel:            bool,
  pub status:               i16,
  pub source_updated_at:    Option<DateTime<Utc>>,
  pub details:              Vec<SettlementDetail>,
}

/// One earlier document settled by this payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementDetail {
  #[serde(skip)]
  pub id:             Option<i64>,
  pub shop_id:        String,
  pub doc_no:         String,
  pub line_number:    i32,
  pub billing_no:     String,
  pub bill_type:      i16,
  pub billing_date:   Option<DateTime<Utc>>,
  pub bill_amount:    f64,
  pub balance_amount: f64,
  pub pay_amount:     f64,
}

impl ProjectionLine for SettlementDetail {
  line_accessors!();

  fn columns(&self) -> LineColumns {
    LineColumns {
      line_number: self.line_number,
      amount: self.pay_amount,
      ..LineColumns::default()
    }
  }
}

impl Projection for PaymentProjection {
  projection_accessors!(SettlementDetail);

  fn tables(&self) -> TableSet { self.kind.tables() }

  fn header(&self) -> HeaderColumns {
    HeaderColumns {
      shop_id:           self.shop_id.clone(),
      doc_no:            self.doc_no.clone(),
      doc_date:          self.doc_date,
      trans_flag:        self.trans_flag,
      inquiry_type:      0,
      party_code:        Some(self.party.code.clone()),
      total_amount:      self.total_amount,
      is_cancel:         self.is_cancel,
      source_updated_at: self.source_updated_at,
    }
  }
}
