//! Encoding between projections and the rows stored in SQLite.
//!
//! A header row holds the typed reporting columns plus `body_json`, the
//! projection serialised without its lines. A detail row does the same for
//! one line. The JSON bodies are authoritative when reading back; the typed
//! columns exist for SQL reporting. Timestamps are RFC 3339 strings.

use chrono::{DateTime, Utc};
use tally_core::projection::{Projection, ProjectionLine};

use crate::Result;

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Owned header values, ready to move into a connection closure.
pub struct EncodedHeader {
  pub shop_id:           String,
  pub doc_no:            String,
  pub doc_date:          String,
  pub trans_flag:        i16,
  pub inquiry_type:      i32,
  pub party_code:        Option<String>,
  pub total_amount:      f64,
  pub is_cancel:         bool,
  pub source_updated_at: Option<String>,
  pub body_json:         String,
}

/// Owned line values, ready to move into a connection closure.
pub struct EncodedLine {
  pub id:          Option<i64>,
  pub line_number: i32,
  pub barcode:     Option<String>,
  pub qty:         f64,
  pub amount:      f64,
  pub wh_code:     Option<String>,
  pub calc_flag:   Option<i8>,
  pub body_json:   String,
}

pub struct EncodedProjection {
  pub header: EncodedHeader,
  pub lines:  Vec<EncodedLine>,
}

pub fn encode_projection<P: Projection>(projection: &P) -> Result<EncodedProjection> {
  let mut bare = projection.clone();
  bare.lines_mut().clear();
  let columns = projection.header();

  let header = EncodedHeader {
    shop_id:           columns.shop_id,
    doc_no:            columns.doc_no,
    doc_date:          encode_dt(columns.doc_date),
    trans_flag:        columns.trans_flag,
    inquiry_type:      columns.inquiry_type,
    party_code:        columns.party_code,
    total_amount:      columns.total_amount,
    is_cancel:         columns.is_cancel,
    source_updated_at: columns.source_updated_at.map(encode_dt),
    body_json:         serde_json::to_string(&bare)?,
  };

  let lines = projection
    .lines()
    .iter()
    .map(encode_line)
    .collect::<Result<Vec<_>>>()?;

  Ok(EncodedProjection { header, lines })
}

fn encode_line<L: ProjectionLine>(line: &L) -> Result<EncodedLine> {
  let columns = line.columns();
  Ok(EncodedLine {
    id:          line.surrogate_id(),
    line_number: columns.line_number,
    barcode:     columns.barcode,
    qty:         columns.qty,
    amount:      columns.amount,
    wh_code:     columns.wh_code,
    calc_flag:   columns.calc_flag,
    body_json:   serde_json::to_string(line)?,
  })
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Raw values read from one detail row.
pub struct RawLine {
  pub id:        i64,
  pub body_json: String,
}

/// Raw values read from one header row and its detail rows.
pub struct RawProjection {
  pub body_json: String,
  pub lines:     Vec<RawLine>,
}

impl RawProjection {
  pub fn into_projection<P: Projection>(self) -> Result<P> {
    let mut projection: P = serde_json::from_str(&self.body_json)?;
    let lines = self
      .lines
      .into_iter()
      .map(|raw| {
        let mut line: P::Line = serde_json::from_str(&raw.body_json)?;
        line.set_surrogate_id(Some(raw.id));
        Ok(line)
      })
      .collect::<Result<Vec<_>>>()?;
    *projection.lines_mut() = lines;
    Ok(projection)
  }
}
