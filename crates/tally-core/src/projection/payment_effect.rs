//! The payment-effect projection: money moved by a document, one line per
//! settlement channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
  HeaderColumns, LineColumns, Projection, ProjectionLine, line_accessors,
  projection_accessors,
};
use crate::{
  kind::TransactionKind,
  model::{CashDirection, PaymentChannel},
  store::TableSet,
};

pub const PAYMENT_EFFECT_TABLES: TableSet =
  TableSet::new("payment_transaction", "payment_transaction_detail");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEffectProjection {
  pub origin_kind:       TransactionKind,
  pub shop_id:           String,
  pub doc_no:            String,
  pub doc_date:          DateTime<Utc>,
  pub trans_flag:        i16,
  pub inquiry_type:      i32,
  pub direction:         CashDirection,
  pub party_code:        Option<String>,
  pub branch_code:       String,
  pub total_amount:      f64,
  pub is_cancel:         bool,
  pub source_updated_at: Option<DateTime<Utc>>,
  pub details:           Vec<PaymentEffectLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEffectLine {
  #[serde(skip)]
  pub id:          Option<i64>,
  pub shop_id:     String,
  pub doc_no:      String,
  pub line_number: i32,
  pub channel:     PaymentChannel,
  pub amount:      f64,
}

impl ProjectionLine for PaymentEffectLine {
  line_accessors!();

  fn columns(&self) -> LineColumns {
    LineColumns {
      line_number: self.line_number,
      amount: self.amount,
      ..LineColumns::default()
    }
  }
}

impl Projection for PaymentEffectProjection {
  projection_accessors!(PaymentEffectLine);

  fn tables(&self) -> TableSet { PAYMENT_EFFECT_TABLES }

  fn header(&self) -> HeaderColumns {
    HeaderColumns {
      shop_id:           self.shop_id.clone(),
      doc_no:            self.doc_no.clone(),
      doc_date:          self.doc_date,
      trans_flag:        self.trans_flag,
      inquiry_type:      self.inquiry_type,
      party_code:        self.party_code.clone(),
      total_amount:      self.total_amount,
      is_cancel:         self.is_cancel,
      source_updated_at: self.source_updated_at,
    }
  }
}
