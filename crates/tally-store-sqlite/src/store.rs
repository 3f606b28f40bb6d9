//! [`SqliteStore`]: the SQLite implementation of [`ProjectionStore`].

use std::{collections::BTreeSet, path::Path};

use rusqlite::OptionalExtension as _;
use tally_core::{
  model::DocKey,
  projection::{Projection, ProjectionLine},
  store::{ProjectionStore, Reconciliation, TableSet},
};

use crate::{
  Error, Result,
  encode::{
    EncodedHeader, EncodedLine, RawLine, RawProjection, encode_projection,
  },
  schema::schema,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A projection store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let sql = schema();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The `user_version` recorded by schema initialisation.
  pub async fn schema_version(&self) -> Result<i64> {
    let version = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
      })
      .await?;
    Ok(version)
  }

  /// Rows inserted, updated, or deleted since the store was opened.
  pub async fn total_changes(&self) -> Result<i64> {
    let changes = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT total_changes()", [], |row| row.get(0))?)
      })
      .await?;
    Ok(changes)
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn insert_header(
  conn: &rusqlite::Connection,
  table: &str,
  h: &EncodedHeader,
) -> rusqlite::Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO {table} (
         shop_id, doc_no, doc_date, trans_flag, inquiry_type, party_code,
         total_amount, is_cancel, source_updated_at, body_json
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
    ),
    rusqlite::params![
      h.shop_id,
      h.doc_no,
      h.doc_date,
      h.trans_flag,
      h.inquiry_type,
      h.party_code,
      h.total_amount,
      h.is_cancel,
      h.source_updated_at,
      h.body_json,
    ],
  )?;
  Ok(())
}

/// Returns the number of header rows touched: 0 or 1.
fn update_header(
  conn: &rusqlite::Connection,
  table: &str,
  h: &EncodedHeader,
) -> rusqlite::Result<usize> {
  conn.execute(
    &format!(
      "UPDATE {table} SET
         doc_date = ?3, trans_flag = ?4, inquiry_type = ?5, party_code = ?6,
         total_amount = ?7, is_cancel = ?8, source_updated_at = ?9,
         body_json = ?10
       WHERE shop_id = ?1 AND doc_no = ?2"
    ),
    rusqlite::params![
      h.shop_id,
      h.doc_no,
      h.doc_date,
      h.trans_flag,
      h.inquiry_type,
      h.party_code,
      h.total_amount,
      h.is_cancel,
      h.source_updated_at,
      h.body_json,
    ],
  )
}

/// Insert a line, or replace the row with the same id when `id` is given.
/// Returns the row's id.
fn upsert_line(
  conn: &rusqlite::Connection,
  table: &str,
  h: &EncodedHeader,
  id: Option<i64>,
  line: &EncodedLine,
) -> rusqlite::Result<i64> {
  conn.execute(
    &format!(
      "INSERT INTO {table} (
         id, shop_id, doc_no, line_number, barcode, qty, amount, wh_code,
         calc_flag, body_json
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
       ON CONFLICT(id) DO UPDATE SET
         shop_id = excluded.shop_id,
         doc_no = excluded.doc_no,
         line_number = excluded.line_number,
         barcode = excluded.barcode,
         qty = excluded.qty,
         amount = excluded.amount,
         wh_code = excluded.wh_code,
         calc_flag = excluded.calc_flag,
         body_json = excluded.body_json"
    ),
    rusqlite::params![
      id,
      h.shop_id,
      h.doc_no,
      line.line_number,
      line.barcode,
      line.qty,
      line.amount,
      line.wh_code,
      line.calc_flag,
      line.body_json,
    ],
  )?;
  Ok(id.unwrap_or_else(|| conn.last_insert_rowid()))
}

fn stored_line_ids(
  conn: &rusqlite::Connection,
  table: &str,
  key: &DocKey,
) -> rusqlite::Result<BTreeSet<i64>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT id FROM {table} WHERE shop_id = ?1 AND doc_no = ?2"
  ))?;
  stmt
    .query_map(rusqlite::params![key.shop_id, key.doc_no], |row| row.get(0))?
    .collect()
}

fn load_lines(
  conn: &rusqlite::Connection,
  table: &str,
  key: &DocKey,
) -> rusqlite::Result<Vec<RawLine>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT id, body_json FROM {table}
     WHERE shop_id = ?1 AND doc_no = ?2
     ORDER BY line_number, id"
  ))?;
  stmt
    .query_map(rusqlite::params![key.shop_id, key.doc_no], |row| {
      Ok(RawLine {
        id:        row.get(0)?,
        body_json: row.get(1)?,
      })
    })?
    .collect()
}

fn is_constraint_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── ProjectionStore impl ────────────────────────────────────────────────────

impl ProjectionStore for SqliteStore {
  type Error = Error;

  async fn get<P: Projection>(
    &self,
    tables: TableSet,
    key: DocKey,
  ) -> Result<Option<P>> {
    let raw: Option<RawProjection> = self
      .conn
      .call(move |conn| {
        let body: Option<String> = conn
          .query_row(
            &format!(
              "SELECT body_json FROM {} WHERE shop_id = ?1 AND doc_no = ?2",
              tables.header
            ),
            rusqlite::params![key.shop_id, key.doc_no],
            |row| row.get(0),
          )
          .optional()?;

        let Some(body_json) = body else {
          return Ok(None);
        };
        let lines = load_lines(conn, tables.detail, &key)?;
        Ok(Some(RawProjection { body_json, lines }))
      })
      .await?;

    raw.map(RawProjection::into_projection).transpose()
  }

  async fn create<P: Projection>(&self, projection: P) -> Result<P> {
    let tables = projection.tables();
    let key = projection.key();
    let encoded = encode_projection(&projection)?;

    let ids: Vec<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        insert_header(&tx, tables.header, &encoded.header)?;
        let mut ids = Vec::with_capacity(encoded.lines.len());
        for line in &encoded.lines {
          ids.push(upsert_line(&tx, tables.detail, &encoded.header, None, line)?);
        }
        tx.commit()?;
        Ok(ids)
      })
      .await
      .map_err(|e| {
        if is_constraint_violation(&e) {
          Error::DuplicateKey {
            table: tables.header,
            key:   key.clone(),
          }
        } else {
          Error::Database(e)
        }
      })?;

    let mut projection = projection;
    for (line, id) in projection.lines_mut().iter_mut().zip(ids) {
      line.set_surrogate_id(Some(id));
    }
    Ok(projection)
  }

  async fn update<P: Projection>(&self, projection: P) -> Result<Reconciliation> {
    let tables = projection.tables();
    let key = projection.key();
    let encoded = encode_projection(&projection)?;
    let lookup = key.clone();

    let report: Option<Reconciliation> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if update_header(&tx, tables.header, &encoded.header)? == 0 {
          // Dropping `tx` rolls back.
          return Ok(None);
        }

        let stored = stored_line_ids(&tx, tables.detail, &lookup)?;

        // An incoming id survives only if it is stored under this key and
        // not already claimed by an earlier incoming line.
        let mut kept = BTreeSet::new();
        let claims: Vec<Option<i64>> = encoded
          .lines
          .iter()
          .map(|line| {
            line
              .id
              .filter(|id| stored.contains(id) && kept.insert(*id))
          })
          .collect();

        let mut report = Reconciliation::default();
        for id in stored.difference(&kept) {
          tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", tables.detail),
            rusqlite::params![id],
          )?;
          report.deleted.push(*id);
        }

        for (line, claim) in encoded.lines.iter().zip(claims) {
          let id =
            upsert_line(&tx, tables.detail, &encoded.header, claim, line)?;
          match claim {
            Some(_) => report.replaced.push(id),
            None => report.inserted.push(id),
          }
        }

        tx.commit()?;
        Ok(Some(report))
      })
      .await?;

    report.ok_or(Error::NotFound {
      table: tables.header,
      key,
    })
  }

  async fn delete(&self, tables: TableSet, key: DocKey) -> Result<bool> {
    let existed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          &format!(
            "DELETE FROM {} WHERE shop_id = ?1 AND doc_no = ?2",
            tables.detail
          ),
          rusqlite::params![key.shop_id, key.doc_no],
        )?;
        let removed = tx.execute(
          &format!(
            "DELETE FROM {} WHERE shop_id = ?1 AND doc_no = ?2",
            tables.header
          ),
          rusqlite::params![key.shop_id, key.doc_no],
        )?;
        tx.commit()?;
        Ok(removed > 0)
      })
      .await?;
    Ok(existed)
  }

  async fn list<P: Projection>(
    &self,
    tables: TableSet,
    shop_id: String,
  ) -> Result<Vec<P>> {
    let raws: Vec<RawProjection> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT doc_no, body_json FROM {} WHERE shop_id = ?1
           ORDER BY doc_date, doc_no",
          tables.header
        ))?;
        let headers = stmt
          .query_map(rusqlite::params![shop_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut raws = Vec::with_capacity(headers.len());
        for (doc_no, body_json) in headers {
          let key = DocKey::new(shop_id.clone(), doc_no);
          let lines = load_lines(conn, tables.detail, &key)?;
          raws.push(RawProjection { body_json, lines });
        }
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawProjection::into_projection).collect()
  }
}
