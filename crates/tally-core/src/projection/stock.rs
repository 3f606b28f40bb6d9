//! The stock-effect projection: a document's lines reshaped into signed
//! movements on the stock ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
  HeaderColumns, LineColumns, Projection, ProjectionLine, line_accessors,
  non_empty, projection_accessors,
  transaction::{ItemSnapshot, Placement},
};
use crate::{
  kind::TransactionKind,
  model::{Branch, CalcFlag},
  store::TableSet,
};

pub const STOCK_TABLES: TableSet =
  TableSet::new("stock_transaction", "stock_transaction_detail");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockProjection {
  pub origin_kind:       TransactionKind,
  pub shop_id:           String,
  pub doc_no:            String,
  pub origin_doc_no:     String,
  pub doc_date:          DateTime<Utc>,
  pub trans_flag:        i16,
  pub inquiry_type:      i32,
  pub guid_fixed:        String,
  pub guid_ref:          String,
  pub branch:            Branch,
  pub doc_ref_no:        String,
  pub vat_type:          i16,
  pub vat_rate:          f64,
  pub total_amount:      f64,
  /// Valued by the costing flow, never by the source document.
  pub total_cost:        f64,
  pub is_cancel:         bool,
  pub source_updated_at: Option<DateTime<Utc>>,
  pub details:           Vec<StockLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLine {
  #[serde(skip)]
  pub id:              Option<i64>,
  pub shop_id:         String,
  pub doc_no:          String,
  pub origin_doc_no:   String,
  pub line_number:     i32,
  pub item:            ItemSnapshot,
  /// Always a magnitude; the direction lives in `calc_flag`.
  pub qty:             f64,
  pub price:           f64,
  pub discount_amount: f64,
  pub sum_amount:      f64,
  pub stand_value:     f64,
  pub divide_value:    f64,
  pub calc_flag:       CalcFlag,
  pub placement:       Placement,
  pub cost_per_unit:   f64,
  pub total_cost:      f64,
}

impl ProjectionLine for StockLine {
  line_accessors!();

  fn columns(&self) -> LineColumns {
    LineColumns {
      line_number: self.line_number,
      barcode:     non_empty(&self.item.barcode),
      qty:         self.qty,
      amount:      self.sum_amount,
      wh_code:     non_empty(&self.placement.wh_code),
      calc_flag:   Some(self.calc_flag.value()),
    }
  }
}

impl Projection for StockProjection {
  projection_accessors!(StockLine);

  fn tables(&self) -> TableSet { STOCK_TABLES }

  fn header(&self) -> HeaderColumns {
    HeaderColumns {
      shop_id:           self.shop_id.clone(),
      doc_no:            self.doc_no.clone(),
      doc_date:          self.doc_date,
      trans_flag:        self.trans_flag,
      inquiry_type:      self.inquiry_type,
      party_code:        None,
      total_amount:      self.total_amount,
      is_cancel:         self.is_cancel,
      source_updated_at: self.source_updated_at,
    }
  }

  fn carry_store_owned(&mut self, stored: &Self) {
    self.total_cost = stored.total_cost;
    for line in &mut self.details {
      let Some(id) = line.id else { continue };
      if let Some(prev) = stored.details.iter().find(|s| s.id == Some(id)) {
        line.cost_per_unit = prev.cost_per_unit;
        line.total_cost = prev.total_cost;
      }
    }
  }

  fn clear_store_owned(&mut self) {
    self.total_cost = 0.0;
    for line in &mut self.details {
      line.cost_per_unit = 0.0;
      line.total_cost = 0.0;
    }
  }
}
