//! SQL schema for the Tally SQLite store.
//!
//! Every projection kind gets the same pair of tables: a header keyed by
//! `(shop_id, doc_no)` and a detail table keyed by a surrogate id. Executed
//! once at connection startup; idempotent thanks to `IF NOT EXISTS`.

use tally_core::store::{TableSet, all_tables};

pub const SCHEMA_VERSION: i64 = 1;

const PRELUDE: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

fn table_pair(t: TableSet) -> String {
  let (header, detail) = (t.header, t.detail);
  format!(
    "
CREATE TABLE IF NOT EXISTS {header} (
    shop_id           TEXT    NOT NULL,
    doc_no            TEXT    NOT NULL,
    doc_date          TEXT    NOT NULL,   -- RFC 3339 UTC
    trans_flag        INTEGER NOT NULL,
    inquiry_type      INTEGER NOT NULL,
    party_code        TEXT,
    total_amount      REAL    NOT NULL,
    is_cancel         INTEGER NOT NULL,
    source_updated_at TEXT,               -- RFC 3339 UTC or NULL
    body_json         TEXT    NOT NULL,   -- header without lines
    UNIQUE (shop_id, doc_no)
);

-- Lines are matched by surrogate id only; line_number is reporting data.
CREATE TABLE IF NOT EXISTS {detail} (
    id          INTEGER PRIMARY KEY,
    shop_id     TEXT    NOT NULL,
    doc_no      TEXT    NOT NULL,
    line_number INTEGER NOT NULL,
    barcode     TEXT,
    qty         REAL    NOT NULL,
    amount      REAL    NOT NULL,
    wh_code     TEXT,
    calc_flag   INTEGER,
    body_json   TEXT    NOT NULL,
    FOREIGN KEY (shop_id, doc_no) REFERENCES {header}(shop_id, doc_no)
);

CREATE INDEX IF NOT EXISTS {detail}_doc_idx ON {detail}(shop_id, doc_no);
CREATE INDEX IF NOT EXISTS {header}_date_idx ON {header}(shop_id, doc_date);
"
  )
}

/// Full schema DDL for every table set the pipeline writes to.
pub fn schema() -> String {
  let mut sql = String::from(PRELUDE);
  for tables in all_tables() {
    sql.push_str(&table_pair(tables));
  }
  sql.push_str(&format!("\nPRAGMA user_version = {SCHEMA_VERSION};\n"));
  sql
}
