//! Derived-projection phasers.
//!
//! Each takes an already-phased primary projection, never the raw source.
//! Callers decide whether the effect applies (see [`crate::effect`]); asking
//! for an effect a kind can never have is an error.

use super::{PrimaryProjection, line_number};
use crate::{
  Error, Result,
  kind::StockRule,
  model::{CalcFlag, LedgerStatus},
  projection::{
    DetailLine, LedgerProjection, PaymentEffectLine, PaymentEffectProjection,
    Placement, StockLine, StockProjection, TransactionProjection,
  },
};

// ─── Stock ───────────────────────────────────────────────────────────────────

/// Reshape item lines into signed stock movements.
pub fn phase_stock_effect(
  primary: &TransactionProjection,
) -> Result<StockProjection> {
  let Some(rule) = primary.kind.stock_rule() else {
    return Err(Error::NoEffect {
      kind:   primary.kind,
      effect: "stock",
    });
  };

  let details = primary
    .details
    .iter()
    .flat_map(|line| stock_legs(rule, line))
    .map(|(flag, qty, placement, line)| StockLine {
      id: None,
      shop_id: line.shop_id.clone(),
      doc_no: line.doc_no.clone(),
      origin_doc_no: primary.doc_no.clone(),
      line_number: line.line_number,
      item: line.item.clone(),
      qty,
      price: line.price,
      discount_amount: line.discount_amount,
      sum_amount: line.sum_amount,
      stand_value: line.stand_value,
      divide_value: line.divide_value,
      calc_flag: flag,
      placement,
      cost_per_unit: 0.0,
      total_cost: 0.0,
    })
    .collect();

  Ok(StockProjection {
    origin_kind: primary.kind,
    shop_id: primary.shop_id.clone(),
    doc_no: primary.doc_no.clone(),
    origin_doc_no: primary.doc_no.clone(),
    doc_date: primary.doc_date,
    trans_flag: primary.trans_flag,
    inquiry_type: primary.inquiry_type,
    guid_fixed: primary.guid_fixed.clone(),
    guid_ref: primary.guid_ref.clone(),
    branch: primary.branch.clone(),
    doc_ref_no: primary.doc_ref.no.clone(),
    vat_type: primary.vat_type,
    vat_rate: primary.vat_rate,
    total_amount: primary.totals.amount,
    total_cost: 0.0,
    is_cancel: primary.is_cancel,
    source_updated_at: primary.source_updated_at,
    details,
  })
}

/// The `(flag, magnitude, placement)` legs one item line contributes.
fn stock_legs(
  rule: StockRule,
  line: &DetailLine,
) -> Vec<(CalcFlag, f64, Placement, &DetailLine)> {
  match rule {
    StockRule::Fixed(flag) => {
      vec![(flag, line.qty, line.placement.clone(), line)]
    }
    StockRule::SignOfQuantity => vec![(
      CalcFlag::of_quantity(line.qty),
      line.qty.abs(),
      line.placement.clone(),
      line,
    )],
    StockRule::Transfer => {
      match (CalcFlag::try_from(line.calc_flag), &line.destination) {
        (Ok(flag @ (CalcFlag::Increase | CalcFlag::Decrease)), _) => {
          vec![(flag, line.qty, line.placement.clone(), line)]
        }
        (_, Some(destination)) => vec![
          (CalcFlag::Decrease, line.qty, line.placement.clone(), line),
          (CalcFlag::Increase, line.qty, destination.clone(), line),
        ],
        (_, None) => {
          vec![(CalcFlag::Decrease, line.qty, line.placement.clone(), line)]
        }
      }
    }
  }
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// Open an item on the counterparty's ledger for the full amount.
pub fn phase_ledger_effect(
  primary: &TransactionProjection,
) -> Result<LedgerProjection> {
  let Some(party) = primary.party.clone() else {
    return Err(Error::NoEffect {
      kind:   primary.kind,
      effect: "ledger",
    });
  };

  Ok(LedgerProjection {
    side: party.side,
    origin_kind: primary.kind,
    shop_id: primary.shop_id.clone(),
    doc_no: primary.doc_no.clone(),
    doc_date: primary.doc_date,
    trans_flag: primary.trans_flag,
    inquiry_type: primary.inquiry_type,
    guid_fixed: primary.guid_fixed.clone(),
    branch: primary.branch.clone(),
    party,
    tax_doc_no: primary.tax_doc.no.clone(),
    doc_ref_no: primary.doc_ref.no.clone(),
    totals: primary.totals.clone(),
    paid_amount: 0.0,
    balance: primary.totals.amount,
    status: LedgerStatus::Open,
    is_cancel: primary.is_cancel,
    source_updated_at: primary.source_updated_at,
    details: primary
      .details
      .iter()
      .map(|line| DetailLine {
        id: None,
        ..line.clone()
      })
      .collect(),
  })
}

// ─── Payment ─────────────────────────────────────────────────────────────────

/// One line per settlement channel that moved money.
pub fn phase_payment_effect(
  primary: &PrimaryProjection,
) -> Result<PaymentEffectProjection> {
  let kind = primary.kind();
  let key = primary.key();

  let (doc_date, trans_flag, party_code, branch_code, is_cancel, updated_at, payment) =
    match primary {
      PrimaryProjection::Transaction(t) => (
        t.doc_date,
        t.trans_flag,
        t.party.as_ref().map(|p| p.code.clone()),
        t.branch.code.clone(),
        t.is_cancel,
        t.source_updated_at,
        &t.payment,
      ),
      PrimaryProjection::Payment(p) => (
        p.doc_date,
        p.trans_flag,
        Some(p.party.code.clone()),
        p.branch.code.clone(),
        p.is_cancel,
        p.source_updated_at,
        &p.payment,
      ),
    };

  let details = payment
    .channels()
    .into_iter()
    .enumerate()
    .map(|(index, (channel, amount))| {
      Ok(PaymentEffectLine {
        id: None,
        shop_id: key.shop_id.clone(),
        doc_no: key.doc_no.clone(),
        line_number: line_number(kind, index)?,
        channel,
        amount,
      })
    })
    .collect::<Result<Vec<_>>>()?;

  Ok(PaymentEffectProjection {
    origin_kind: kind,
    shop_id: key.shop_id,
    doc_no: key.doc_no,
    doc_date,
    trans_flag,
    inquiry_type: primary.inquiry_type(),
    direction: kind.cash_direction(),
    party_code,
    branch_code,
    total_amount: payment.total(),
    is_cancel,
    source_updated_at: updated_at,
    details,
  })
}
