//! Source documents as published on the message bus.
//!
//! Field names follow the authoring service's lowercase JSON. Every field is
//! optional on the wire: numbers default to zero, strings to empty, and name
//! arrays to empty. Only the document key and date are required, and
//! [`ItemDocument::validate`] / [`PaymentDocument::validate`] enforce that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};

use crate::{
  Error, Result,
  kind::TransactionKind,
  model::{Branch, LocaleName, PaymentTotals},
};

/// Accept `null` wherever an array is expected.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ─── Shared pieces ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceName {
  pub code: String,
  pub name: String,
}

impl From<SourceName> for LocaleName {
  fn from(n: SourceName) -> Self {
    Self {
      code: n.code,
      name: n.name,
    }
  }
}

pub(crate) fn names(raw: Vec<SourceName>) -> Vec<LocaleName> {
  raw.into_iter().map(LocaleName::from).collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceBranch {
  pub code:  String,
  #[serde(deserialize_with = "null_as_empty")]
  pub names: Vec<SourceName>,
}

impl From<SourceBranch> for Branch {
  fn from(b: SourceBranch) -> Self {
    Self {
      code:  b.code,
      names: names(b.names),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceAmount {
  pub amount: f64,
}

/// How the document was paid. Card and transfer entries are itemised on the
/// wire and summed into [`PaymentTotals`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcePaymentDetail {
  #[serde(rename = "cashamount")]
  pub cash_amount:  f64,
  #[serde(rename = "paymentcreditcards", deserialize_with = "null_as_empty")]
  pub credit_cards: Vec<SourceAmount>,
  #[serde(rename = "paymenttransfers", deserialize_with = "null_as_empty")]
  pub transfers:    Vec<SourceAmount>,
}

impl SourcePaymentDetail {
  pub fn totals(&self) -> PaymentTotals {
    PaymentTotals {
      cash:        self.cash_amount,
      credit_card: self.credit_cards.iter().map(|c| c.amount).sum(),
      transfer:    self.transfers.iter().map(|t| t.amount).sum(),
    }
  }
}

// ─── Item documents ──────────────────────────────────────────────────────────

/// A purchase, sale, return, or stock movement.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemDocument {
  #[serde(rename = "shopid")]
  pub shop_id:           String,
  #[serde(rename = "guidfixed")]
  pub guid_fixed:        String,
  #[serde(rename = "guidref")]
  pub guid_ref:          String,
  #[serde(rename = "docno")]
  pub doc_no:            String,
  #[serde(rename = "docdatetime")]
  pub doc_date:          Option<DateTime<Utc>>,
  #[serde(rename = "updatedat")]
  pub updated_at:        Option<DateTime<Utc>>,
  #[serde(rename = "transflag")]
  pub trans_flag:        i16,
  #[serde(rename = "inquirytype")]
  pub inquiry_type:      i32,
  #[serde(rename = "docreftype")]
  pub doc_ref_type:      i16,
  #[serde(rename = "docrefno")]
  pub doc_ref_no:        String,
  #[serde(rename = "docrefdate")]
  pub doc_ref_date:      Option<DateTime<Utc>>,
  #[serde(rename = "taxdocno")]
  pub tax_doc_no:        String,
  #[serde(rename = "taxdocdate")]
  pub tax_doc_date:      Option<DateTime<Utc>>,
  #[serde(rename = "vattype")]
  pub vat_type:          i16,
  #[serde(rename = "vatrate")]
  pub vat_rate:          f64,
  #[serde(rename = "custcode")]
  pub cust_code:         String,
  #[serde(rename = "custnames", deserialize_with = "null_as_empty")]
  pub cust_names:        Vec<SourceName>,
  pub description:       String,
  #[serde(rename = "discountword")]
  pub discount_word:     String,
  #[serde(rename = "totaldiscount")]
  pub total_discount:    f64,
  #[serde(rename = "totalvalue")]
  pub total_value:       f64,
  #[serde(rename = "totalexceptvat")]
  pub total_except_vat:  f64,
  #[serde(rename = "totalaftervat")]
  pub total_after_vat:   f64,
  #[serde(rename = "totalbeforevat")]
  pub total_before_vat:  f64,
  #[serde(rename = "totalvatvalue")]
  pub total_vat_value:   f64,
  #[serde(rename = "totalamount")]
  pub total_amount:      f64,
  #[serde(rename = "salecode")]
  pub sale_code:         String,
  #[serde(rename = "salename")]
  pub sale_name:         String,
  #[serde(rename = "ispos")]
  pub is_pos:            bool,
  #[serde(rename = "iscancel")]
  pub is_cancel:         bool,
  pub status:            i16,
  pub branch:            SourceBranch,
  #[serde(deserialize_with = "null_as_empty")]
  pub details:           Vec<ItemLine>,
  #[serde(rename = "paymentdetail")]
  pub payment_detail:    SourcePaymentDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemLine {
  #[serde(rename = "linenumber")]
  pub line_number:            i32,
  #[serde(rename = "docref")]
  pub doc_ref:                String,
  #[serde(rename = "docrefdatetime")]
  pub doc_ref_date:           Option<DateTime<Utc>>,
  pub barcode:                String,
  #[serde(rename = "itemcode")]
  pub item_code:              String,
  #[serde(rename = "itemguid")]
  pub item_guid:              String,
  #[serde(rename = "itemtype")]
  pub item_type:              i16,
  #[serde(rename = "itemnames", deserialize_with = "null_as_empty")]
  pub item_names:             Vec<SourceName>,
  #[serde(rename = "unitcode")]
  pub unit_code:              String,
  #[serde(rename = "unitnames", deserialize_with = "null_as_empty")]
  pub unit_names:             Vec<SourceName>,
  #[serde(rename = "groupcode")]
  pub group_code:             String,
  #[serde(rename = "groupnames", deserialize_with = "null_as_empty")]
  pub group_names:            Vec<SourceName>,
  #[serde(rename = "manufacturercode")]
  pub manufacturer_code:      String,
  #[serde(rename = "manufacturernames", deserialize_with = "null_as_empty")]
  pub manufacturer_names:     Vec<SourceName>,
  pub qty:                    f64,
  pub price:                  f64,
  #[serde(rename = "priceexcludevat")]
  pub price_exclude_vat:      f64,
  pub discount:               String,
  #[serde(rename = "discountamount")]
  pub discount_amount:        f64,
  #[serde(rename = "sumamount")]
  pub sum_amount:             f64,
  #[serde(rename = "sumamountexcludevat")]
  pub sum_amount_exclude_vat: f64,
  #[serde(rename = "totalvaluevat")]
  pub total_value_vat:        f64,
  #[serde(rename = "vattype")]
  pub vat_type:               i16,
  #[serde(rename = "taxtype")]
  pub tax_type:               i16,
  #[serde(rename = "vatcal")]
  pub vat_cal:                i16,
  #[serde(rename = "standvalue")]
  pub stand_value:            f64,
  #[serde(rename = "dividevalue")]
  pub divide_value:           f64,
  #[serde(rename = "calcflag")]
  pub calc_flag:              i8,
  #[serde(rename = "whcode")]
  pub wh_code:                String,
  #[serde(rename = "whnames", deserialize_with = "null_as_empty")]
  pub wh_names:               Vec<SourceName>,
  #[serde(rename = "locationcode")]
  pub location_code:          String,
  #[serde(rename = "locationnames", deserialize_with = "null_as_empty")]
  pub location_names:         Vec<SourceName>,
  #[serde(rename = "towhcode")]
  pub to_wh_code:             String,
  #[serde(rename = "towhnames", deserialize_with = "null_as_empty")]
  pub to_wh_names:            Vec<SourceName>,
  #[serde(rename = "tolocationcode")]
  pub to_location_code:       String,
  #[serde(rename = "tolocationnames", deserialize_with = "null_as_empty")]
  pub to_location_names:      Vec<SourceName>,
  pub remark:                 String,
}

// ─── Payment documents ───────────────────────────────────────────────────────

/// A creditor or debtor payment settling earlier documents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaymentDocument {
  #[serde(rename = "shopid")]
  pub shop_id:              String,
  #[serde(rename = "guidfixed")]
  pub guid_fixed:           String,
  #[serde(rename = "docno")]
  pub doc_no:               String,
  #[serde(rename = "docdatetime")]
  pub doc_date:             Option<DateTime<Utc>>,
  #[serde(rename = "updatedat")]
  pub updated_at:           Option<DateTime<Utc>>,
  #[serde(rename = "transflag")]
  pub trans_flag:           i16,
  #[serde(rename = "custcode")]
  pub cust_code:            String,
  #[serde(rename = "custnames", deserialize_with = "null_as_empty")]
  pub cust_names:           Vec<SourceName>,
  pub description:          String,
  #[serde(rename = "salecode")]
  pub sale_code:            String,
  #[serde(rename = "salename")]
  pub sale_name:            String,
  #[serde(rename = "totalamount")]
  pub total_amount:         f64,
  #[serde(rename = "totalvalue")]
  pub total_value:          f64,
  #[serde(rename = "totalbalance")]
  pub total_balance:        f64,
  #[serde(rename = "totalpaymentamount")]
  pub total_payment_amount: f64,
  #[serde(rename = "iscancel")]
  pub is_cancel:            bool,
  pub status:               i16,
  pub branch:               SourceBranch,
  #[serde(deserialize_with = "null_as_empty")]
  pub details:              Vec<SettlementLine>,
  #[serde(rename = "paymentdetail")]
  pub payment_detail:       SourcePaymentDetail,
}

/// One earlier document being paid off.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettlementLine {
  #[serde(rename = "docno")]
  pub doc_no:         String,
  #[serde(rename = "docdatetime")]
  pub doc_date:       Option<DateTime<Utc>>,
  #[serde(rename = "transflag")]
  pub trans_flag:     i16,
  pub value:          f64,
  pub balance:        f64,
  #[serde(rename = "paymentamount")]
  pub payment_amount: f64,
}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Decode one document of `kind` from a JSON value and check its key.
pub trait SourceDocument: DeserializeOwned {
  /// Check the key fields and hand back the document date they guarantee.
  fn validate(&self, kind: TransactionKind) -> Result<DateTime<Utc>>;

  fn decode(kind: TransactionKind, payload: &serde_json::Value) -> Result<Self> {
    let doc =
      Self::deserialize(payload).map_err(|e| Error::decode(kind, e))?;
    doc.validate(kind)?;
    Ok(doc)
  }
}

fn require_key(
  kind: TransactionKind,
  shop_id: &str,
  doc_no: &str,
  doc_date: Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>> {
  if shop_id.trim().is_empty() {
    return Err(Error::decode(kind, "missing shopid"));
  }
  if doc_no.trim().is_empty() {
    return Err(Error::decode(kind, "missing docno"));
  }
  doc_date.ok_or_else(|| Error::decode(kind, "missing docdatetime"))
}

impl SourceDocument for ItemDocument {
  fn validate(&self, kind: TransactionKind) -> Result<DateTime<Utc>> {
    require_key(kind, &self.shop_id, &self.doc_no, self.doc_date)
  }
}

impl SourceDocument for PaymentDocument {
  fn validate(&self, kind: TransactionKind) -> Result<DateTime<Utc>> {
    require_key(kind, &self.shop_id, &self.doc_no, self.doc_date)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn absent_and_null_arrays_decode_as_empty() {
    let payload = json!({
      "shopid": "s1",
      "docno": "PO-1",
      "docdatetime": "2024-03-01T08:00:00Z",
      "custnames": null,
      "details": [{ "linenumber": 0, "itemnames": null }],
    });
    let doc = ItemDocument::decode(TransactionKind::Purchase, &payload).unwrap();
    assert!(doc.cust_names.is_empty());
    assert_eq!(doc.details.len(), 1);
    assert!(doc.details[0].item_names.is_empty());
    assert!(doc.details[0].unit_names.is_empty());
    assert!(doc.branch.names.is_empty());
  }

  #[test]
  fn missing_doc_no_is_a_decode_error() {
    let payload = json!({ "shopid": "s1", "docdatetime": "2024-03-01T08:00:00Z" });
    let err = ItemDocument::decode(TransactionKind::Purchase, &payload)
      .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }), "{err}");
  }

  #[test]
  fn bad_date_is_a_decode_error() {
    let payload =
      json!({ "shopid": "s1", "docno": "PO-1", "docdatetime": "yesterday" });
    let err = ItemDocument::decode(TransactionKind::Purchase, &payload)
      .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
  }

  #[test]
  fn wrong_shape_is_a_decode_error() {
    let err = ItemDocument::decode(TransactionKind::Purchase, &json!([1, 2]))
      .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
  }

  #[test]
  fn payment_channels_are_summed() {
    let payload = json!({
      "cashamount": 10.0,
      "paymentcreditcards": [{ "amount": 5.0 }, { "amount": 2.5 }],
      "paymenttransfers": [{ "amount": 1.0 }],
    });
    let detail = SourcePaymentDetail::deserialize(&payload).unwrap();
    let totals = detail.totals();
    assert_eq!(totals.cash, 10.0);
    assert_eq!(totals.credit_card, 7.5);
    assert_eq!(totals.transfer, 1.0);
    assert_eq!(totals.total(), 18.5);
  }
}
