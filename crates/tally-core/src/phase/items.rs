//! Phaser for item documents.

use serde_json::Value;

use super::{Phaser, PrimaryProjection};
use crate::{
  Result,
  kind::TransactionKind,
  model::{Party, Totals},
  projection::{DetailLine, ItemSnapshot, Placement, TransactionProjection},
  projection::transaction::{DocReference, SaleInfo, TaxDocument},
  source::{ItemDocument, ItemLine, SourceDocument, names},
};

/// Maps purchases, sales, their returns, and stock movements.
pub struct ItemDocumentPhaser {
  kind: TransactionKind,
}

impl ItemDocumentPhaser {
  pub fn new(kind: TransactionKind) -> Self { Self { kind } }

  /// Map an already-decoded document.
  pub fn project(&self, doc: ItemDocument) -> Result<TransactionProjection> {
    let kind = self.kind;
    let doc_date = doc.validate(kind)?;

    let party = kind.party_side().map(|side| Party {
      side,
      code: doc.cust_code.clone(),
      names: names(doc.cust_names.clone()),
    });
    let sale = matches!(
      kind,
      TransactionKind::SaleInvoice | TransactionKind::SaleInvoiceReturn
    )
    .then(|| SaleInfo {
      code:   doc.sale_code.clone(),
      name:   doc.sale_name.clone(),
      is_pos: doc.is_pos,
    });

    let details = doc
      .details
      .into_iter()
      .map(|line| detail_line(kind, &doc.shop_id, &doc.doc_no, line))
      .collect();

    Ok(TransactionProjection {
      kind,
      trans_flag: kind.trans_flag(),
      inquiry_type: doc.inquiry_type,
      guid_fixed: doc.guid_fixed,
      guid_ref: doc.guid_ref,
      doc_ref: DocReference {
        ref_type: doc.doc_ref_type,
        no:       doc.doc_ref_no,
        date:     doc.doc_ref_date,
      },
      tax_doc: TaxDocument {
        no:   doc.tax_doc_no,
        date: doc.tax_doc_date,
      },
      branch: doc.branch.into(),
      description: doc.description,
      vat_type: doc.vat_type,
      vat_rate: doc.vat_rate,
      totals: Totals {
        value:         doc.total_value,
        discount_word: doc.discount_word,
        discount:      doc.total_discount,
        before_vat:    doc.total_before_vat,
        vat_value:     doc.total_vat_value,
        except_vat:    doc.total_except_vat,
        after_vat:     doc.total_after_vat,
        amount:        doc.total_amount,
      },
      payment: doc.payment_detail.totals(),
      party,
      sale,
      is_cancel: doc.is_cancel,
      status: doc.status,
      source_updated_at: doc.updated_at,
      doc_date,
      shop_id: doc.shop_id,
      doc_no: doc.doc_no,
      details,
    })
  }
}

fn detail_line(
  kind: TransactionKind,
  shop_id: &str,
  doc_no: &str,
  line: ItemLine,
) -> DetailLine {
  let destination = (kind == TransactionKind::StockTransfer
    && !(line.to_wh_code.is_empty() && line.to_location_code.is_empty()))
  .then(|| Placement {
    wh_code:        line.to_wh_code,
    wh_names:       names(line.to_wh_names),
    location_code:  line.to_location_code,
    location_names: names(line.to_location_names),
  });

  DetailLine {
    id: None,
    shop_id: shop_id.to_owned(),
    doc_no: doc_no.to_owned(),
    line_number: line.line_number,
    doc_ref: line.doc_ref,
    doc_ref_date: line.doc_ref_date,
    item: ItemSnapshot {
      barcode:            line.barcode,
      item_code:          line.item_code,
      item_guid:          line.item_guid,
      item_type:          line.item_type,
      names:              names(line.item_names),
      unit_code:          line.unit_code,
      unit_names:         names(line.unit_names),
      group_code:         line.group_code,
      group_names:        names(line.group_names),
      manufacturer_code:  line.manufacturer_code,
      manufacturer_names: names(line.manufacturer_names),
    },
    qty: line.qty,
    price: line.price,
    price_exclude_vat: line.price_exclude_vat,
    discount: line.discount,
    discount_amount: line.discount_amount,
    sum_amount: line.sum_amount,
    sum_amount_exclude_vat: line.sum_amount_exclude_vat,
    total_value_vat: line.total_value_vat,
    vat_type: line.vat_type,
    tax_type: line.tax_type,
    vat_cal: line.vat_cal,
    stand_value: line.stand_value,
    divide_value: line.divide_value,
    calc_flag: line.calc_flag,
    placement: Placement {
      wh_code:        line.wh_code,
      wh_names:       names(line.wh_names),
      location_code:  line.location_code,
      location_names: names(line.location_names),
    },
    destination,
    remark: line.remark,
  }
}

impl Phaser for ItemDocumentPhaser {
  fn kind(&self) -> TransactionKind { self.kind }

  fn phase(&self, payload: &Value) -> Result<PrimaryProjection> {
    let doc = ItemDocument::decode(self.kind, payload)?;
    self.project(doc).map(PrimaryProjection::Transaction)
  }
}
