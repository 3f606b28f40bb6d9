//! The primary projection of item documents: purchases, sales, their
//! returns, and stock movements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
  HeaderColumns, LineColumns, Projection, ProjectionLine, line_accessors,
  non_empty, projection_accessors,
};
use crate::{
  kind::TransactionKind,
  model::{Branch, LocaleName, Party, PaymentTotals, Totals},
  store::TableSet,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocReference {
  pub ref_type: i16,
  pub no:       String,
  pub date:     Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxDocument {
  pub no:   String,
  pub date: Option<DateTime<Utc>>,
}

/// Salesperson fields, present on sales kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaleInfo {
  pub code:   String,
  pub name:   String,
  pub is_pos: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionProjection {
  pub kind:              TransactionKind,
  pub shop_id:           String,
  pub doc_no:            String,
  pub doc_date:          DateTime<Utc>,
  pub trans_flag:        i16,
  pub inquiry_type:      i32,
  pub guid_fixed:        String,
  pub guid_ref:          String,
  pub doc_ref:           DocReference,
  pub tax_doc:           TaxDocument,
  pub branch:            Branch,
  pub description:       String,
  pub vat_type:          i16,
  pub vat_rate:          f64,
  pub totals:            Totals,
  pub payment:           PaymentTotals,
  pub party:             Option<Party>,
  pub sale:              Option<SaleInfo>,
  pub is_cancel:         bool,
  pub status:            i16,
  pub source_updated_at: Option<DateTime<Utc>>,
  pub details:           Vec<DetailLine>,
}

// ─── Lines ───────────────────────────────────────────────────────────────────

/// Item identity and naming at the time the document was issued.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
  pub barcode:            String,
  pub item_code:          String,
  pub item_guid:          String,
  pub item_type:          i16,
  pub names:              Vec<LocaleName>,
  pub unit_code:          String,
  pub unit_names:         Vec<LocaleName>,
  pub group_code:         String,
  pub group_names:        Vec<LocaleName>,
  pub manufacturer_code:  String,
  pub manufacturer_names: Vec<LocaleName>,
}

/// A warehouse and shelf location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
  pub wh_code:        String,
  pub wh_names:       Vec<LocaleName>,
  pub location_code:  String,
  pub location_names: Vec<LocaleName>,
}

impl Placement {
  pub fn is_empty(&self) -> bool {
    self.wh_code.is_empty() && self.location_code.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailLine {
  #[serde(skip)]
  pub id:                     Option<i64>,
  pub shop_id:                String,
  pub doc_no:                 String,
  pub line_number:            i32,
  pub doc_ref:                String,
  pub doc_ref_date:           Option<DateTime<Utc>>,
  pub item:                   ItemSnapshot,
  pub qty:                    f64,
  pub price:                  f64,
  pub price_exclude_vat:      f64,
  pub discount:               String,
  pub discount_amount:        f64,
  pub sum_amount:             f64,
  pub sum_amount_exclude_vat: f64,
  pub total_value_vat:        f64,
  pub vat_type:               i16,
  pub tax_type:               i16,
  pub vat_cal:                i16,
  pub stand_value:            f64,
  pub divide_value:           f64,
  /// The leg direction a source line carries itself (transfers only).
  pub calc_flag:              i8,
  pub placement:              Placement,
  /// Destination of a stock transfer.
  pub destination:            Option<Placement>,
  pub remark:                 String,
}

impl ProjectionLine for DetailLine {
  line_accessors!();

  fn columns(&self) -> LineColumns {
    LineColumns {
      line_number: self.line_number,
      barcode:     non_empty(&self.item.barcode),
      qty:         self.qty,
      amount:      self.sum_amount,
      wh_code:     non_empty(&self.placement.wh_code),
      calc_flag:   None,
    }
  }
}

impl Projection for TransactionProjection {
  projection_accessors!(DetailLine);

  fn tables(&self) -> TableSet { self.kind.tables() }

  fn header(&self) -> HeaderColumns {
    HeaderColumns {
      shop_id:           self.shop_id.clone(),
      doc_no:            self.doc_no.clone(),
      doc_date:          self.doc_date,
      trans_flag:        self.trans_flag,
      inquiry_type:      self.inquiry_type,
      party_code:        self.party.as_ref().map(|p| p.code.clone()),
      total_amount:      self.totals.amount,
      is_cancel:         self.is_cancel,
      source_updated_at: self.source_updated_at,
    }
  }
}
