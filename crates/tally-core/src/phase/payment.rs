//! Phaser for creditor and debtor payments.

use serde_json::Value;

use super::{Phaser, PrimaryProjection, line_number};
use crate::{
  Result,
  kind::TransactionKind,
  model::{LedgerSide, Party},
  projection::{PaymentProjection, SettlementDetail},
  source::{PaymentDocument, SourceDocument, names},
};

pub struct PaymentDocumentPhaser {
  kind: TransactionKind,
}

impl PaymentDocumentPhaser {
  pub fn new(kind: TransactionKind) -> Self { Self { kind } }

  pub fn project(&self, doc: PaymentDocument) -> Result<PaymentProjection> {
    let kind = self.kind;
    let doc_date = doc.validate(kind)?;
    let side = kind.party_side().unwrap_or(LedgerSide::Debtor);

    let details = doc
      .details
      .into_iter()
      .enumerate()
      .map(|(index, line)| {
        Ok(SettlementDetail {
          id:             None,
          shop_id:        doc.shop_id.clone(),
          doc_no:         doc.doc_no.clone(),
          line_number:    line_number(kind, index)?,
          billing_no:     line.doc_no,
          bill_type:      line.trans_flag,
          billing_date:   line.doc_date,
          bill_amount:    line.value,
          balance_amount: line.balance,
          pay_amount:     line.payment_amount,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(PaymentProjection {
      kind,
      doc_date,
      trans_flag: kind.trans_flag(),
      guid_fixed: doc.guid_fixed,
      branch: doc.branch.into(),
      party: Party {
        side,
        code: doc.cust_code,
        names: names(doc.cust_names),
      },
      description: doc.description,
      sale_code: doc.sale_code,
      sale_name: doc.sale_name,
      total_amount: doc.total_amount,
      total_value: doc.total_value,
      total_balance: doc.total_balance,
      total_payment_amount: doc.total_payment_amount,
      payment: doc.payment_detail.totals(),
      is_cancel: doc.is_cancel,
      status: doc.status,
      source_updated_at: doc.updated_at,
      shop_id: doc.shop_id,
      doc_no: doc.doc_no,
      details,
    })
  }
}

impl Phaser for PaymentDocumentPhaser {
  fn kind(&self) -> TransactionKind { self.kind }

  fn phase(&self, payload: &Value) -> Result<PrimaryProjection> {
    let doc = PaymentDocument::decode(self.kind, payload)?;
    self.project(doc).map(PrimaryProjection::Payment)
  }
}
