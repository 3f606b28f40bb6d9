//! End-to-end tests: messages through `TransactionConsumer` into an
//! in-memory `SqliteStore`.

use std::sync::Arc;

use serde_json::{Value, json};
use tally_core::{
  TransactionKind,
  model::{DocKey, LedgerSide, LedgerStatus},
  phase::PhaserRegistry,
  projection::{
    LedgerProjection, PAYMENT_EFFECT_TABLES, PaymentEffectProjection,
    PaymentProjection, Projection, STOCK_TABLES, StockProjection,
    TransactionProjection,
  },
  store::{ProjectionStore, Reconciliation, TableSet},
};
use tally_store_sqlite::SqliteStore;

use crate::{
  ConsumerConfig, Error, Processed, TransactionConsumer, UpsertOutcome,
  consumer::SyncReport, error::FanoutStage,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

async fn consumer() -> TransactionConsumer<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  TransactionConsumer::new(
    Arc::new(store),
    PhaserRegistry::standard(),
    "test-group",
  )
}

fn purchase(doc_no: &str, inquiry_type: i32, quantities: &[f64]) -> Value {
  let details: Vec<Value> = quantities
    .iter()
    .enumerate()
    .map(|(i, qty)| {
      json!({
        "linenumber": i,
        "barcode": format!("BC-{i}"),
        "itemcode": format!("IT-{i}"),
        "qty": qty,
        "price": 5.0,
        "sumamount": qty * 5.0,
        "whcode": "WH1",
      })
    })
    .collect();
  json!({
    "shopid": "shop-1",
    "docno": doc_no,
    "docdatetime": "2024-05-01T09:30:00Z",
    "updatedat": "2024-05-01T09:31:00Z",
    "inquirytype": inquiry_type,
    "custcode": "CR-01",
    "totalvalue": 50.0,
    "totalamount": 48.0,
    "details": details,
  })
}

fn key(doc_no: &str) -> DocKey { DocKey::new("shop-1", doc_no) }

fn synced(mut processed: Vec<Processed>) -> SyncReport {
  assert_eq!(processed.len(), 1);
  match processed.remove(0) {
    Processed::Synced(report) => report,
    other => panic!("expected a sync report, got {other:?}"),
  }
}

async fn stored<P: Projection>(
  consumer: &TransactionConsumer<SqliteStore>,
  tables: TableSet,
  doc_no: &str,
) -> Option<P> {
  consumer
    .service()
    .store()
    .get(tables, key(doc_no))
    .await
    .unwrap()
}

// ─── Create / update ─────────────────────────────────────────────────────────

#[tokio::test]
async fn created_purchase_fans_out_to_stock_and_creditor() {
  let consumer = consumer().await;
  let report = synced(
    consumer
      .handle("when-purchase-created", &purchase("PO-1", 0, &[10.0]))
      .await
      .unwrap(),
  );

  assert_eq!(report.primary, UpsertOutcome::Created);
  assert_eq!(report.stock, Some(UpsertOutcome::Created));
  assert_eq!(report.ledger, Some(UpsertOutcome::Created));
  assert_eq!(report.payment, None);

  let ledger: LedgerProjection =
    stored(&consumer, LedgerSide::Creditor.tables(), "PO-1")
      .await
      .unwrap();
  assert_eq!(ledger.balance, 48.0);
  assert_eq!(ledger.status, LedgerStatus::Open);
}

#[tokio::test]
async fn replaying_a_document_writes_nothing() {
  let consumer = consumer().await;
  let payload = purchase("PO-1", 0, &[10.0, 3.0]);
  consumer
    .handle("when-purchase-created", &payload)
    .await
    .unwrap();
  let before = consumer.service().store().total_changes().await.unwrap();

  let report = synced(
    consumer
      .handle("when-purchase-updated", &payload)
      .await
      .unwrap(),
  );

  assert_eq!(report.primary, UpsertOutcome::Unchanged);
  assert_eq!(report.stock, Some(UpsertOutcome::Unchanged));
  assert_eq!(report.ledger, Some(UpsertOutcome::Unchanged));
  let after = consumer.service().store().total_changes().await.unwrap();
  assert_eq!(before, after);
}

#[tokio::test]
async fn replay_ignores_the_order_lines_arrive_in() {
  let consumer = consumer().await;
  let mut payload = purchase("PO-1", 0, &[10.0, 3.0]);
  payload["details"][0]["linenumber"] = json!(1);
  payload["details"][1]["linenumber"] = json!(0);
  consumer
    .handle("when-purchase-created", &payload)
    .await
    .unwrap();
  let before = consumer.service().store().total_changes().await.unwrap();

  let report = synced(
    consumer
      .handle("when-purchase-updated", &payload)
      .await
      .unwrap(),
  );

  assert_eq!(report.primary, UpsertOutcome::Unchanged);
  assert_eq!(report.stock, Some(UpsertOutcome::Unchanged));
  assert_eq!(report.ledger, Some(UpsertOutcome::Unchanged));
  let after = consumer.service().store().total_changes().await.unwrap();
  assert_eq!(before, after);
}

#[tokio::test]
async fn replaying_a_split_transfer_writes_nothing() {
  let consumer = consumer().await;
  let mut payload = purchase("TR-1", 0, &[]);
  payload["details"] = json!([
    { "linenumber": 0, "itemcode": "IT-0", "qty": 5.0, "whcode": "00000", "towhcode": "00001" },
    { "linenumber": 1, "itemcode": "IT-1", "qty": 2.0, "whcode": "00000", "towhcode": "00002" },
  ]);
  let created = synced(
    consumer
      .handle("when-stock-transfer-created", &payload)
      .await
      .unwrap(),
  );
  assert_eq!(created.stock, Some(UpsertOutcome::Created));
  let stock: StockProjection =
    stored(&consumer, STOCK_TABLES, "TR-1").await.unwrap();
  assert_eq!(stock.details.len(), 4);
  let before = consumer.service().store().total_changes().await.unwrap();

  let report = synced(
    consumer
      .handle("when-stock-transfer-updated", &payload)
      .await
      .unwrap(),
  );

  assert_eq!(report.primary, UpsertOutcome::Unchanged);
  assert_eq!(report.stock, Some(UpsertOutcome::Unchanged));
  assert_eq!(report.ledger, None);
  let after = consumer.service().store().total_changes().await.unwrap();
  assert_eq!(before, after);
}

#[tokio::test]
async fn update_reconciles_lines_by_line_number() {
  let consumer = consumer().await;
  consumer
    .handle("when-purchase-created", &purchase("PO-1", 0, &[10.0, 3.0]))
    .await
    .unwrap();
  let original: TransactionProjection =
    stored(&consumer, TransactionKind::Purchase.tables(), "PO-1")
      .await
      .unwrap();
  let kept_id = original.details[0].id.unwrap();
  let dropped_id = original.details[1].id.unwrap();

  // Line 1 vanishes, line 2 appears.
  let mut payload = purchase("PO-1", 0, &[10.0]);
  payload["details"]
    .as_array_mut()
    .unwrap()
    .push(json!({ "linenumber": 2, "barcode": "BC-2", "qty": 7.0 }));
  let report = synced(
    consumer
      .handle("when-purchase-updated", &payload)
      .await
      .unwrap(),
  );

  let UpsertOutcome::Updated(Reconciliation {
    deleted,
    inserted,
    replaced,
  }) = report.primary
  else {
    panic!("expected an update, got {:?}", report.primary);
  };
  assert_eq!(deleted, vec![dropped_id]);
  assert_eq!(replaced, vec![kept_id]);
  assert_eq!(inserted.len(), 1);

  let current: TransactionProjection =
    stored(&consumer, TransactionKind::Purchase.tables(), "PO-1")
      .await
      .unwrap();
  let lines: Vec<_> = current.details.iter().map(|l| l.line_number).collect();
  assert_eq!(lines, vec![0, 2]);
}

#[tokio::test]
async fn purchased_services_never_touch_stock() {
  let consumer = consumer().await;
  let report = synced(
    consumer
      .handle("when-purchase-created", &purchase("PO-1", 2, &[1.0]))
      .await
      .unwrap(),
  );
  assert_eq!(report.stock, None);
  assert_eq!(report.ledger, Some(UpsertOutcome::Created));

  // A changed primary still leaves stock alone.
  synced(
    consumer
      .handle("when-purchase-updated", &purchase("PO-1", 2, &[4.0]))
      .await
      .unwrap(),
  );
  let stock: Option<StockProjection> =
    stored(&consumer, STOCK_TABLES, "PO-1").await;
  assert!(stock.is_none());
}

#[tokio::test]
async fn only_cash_purchases_record_a_payment() {
  let consumer = consumer().await;
  let cash = synced(
    consumer
      .handle("when-purchase-created", &purchase("PO-1", 1, &[1.0]))
      .await
      .unwrap(),
  );
  assert_eq!(cash.stock, Some(UpsertOutcome::Created));
  assert_eq!(cash.payment, Some(UpsertOutcome::Created));

  let other = synced(
    consumer
      .handle("when-purchase-created", &purchase("PO-2", 3, &[1.0]))
      .await
      .unwrap(),
  );
  assert_eq!(other.primary, UpsertOutcome::Created);
  assert_eq!(other.stock, None);
  assert_eq!(other.ledger, None);
  assert_eq!(other.payment, None);
}

#[tokio::test]
async fn sale_invoices_move_stock_for_every_inquiry_type() {
  let consumer = consumer().await;
  let report = synced(
    consumer
      .handle("when-sale-invoice-created", &purchase("SI-1", 2, &[1.0]))
      .await
      .unwrap(),
  );
  assert_eq!(report.stock, Some(UpsertOutcome::Created));
  assert_eq!(report.payment, None);
}

#[tokio::test]
async fn cancelled_documents_are_stored_with_the_flag() {
  let consumer = consumer().await;
  let mut payload = purchase("PO-1", 0, &[10.0]);
  payload["iscancel"] = json!(true);
  consumer
    .handle("when-purchase-created", &payload)
    .await
    .unwrap();

  let primary: TransactionProjection =
    stored(&consumer, TransactionKind::Purchase.tables(), "PO-1")
      .await
      .unwrap();
  assert!(primary.is_cancel);
  assert_eq!(primary.details.len(), 1);
}

#[tokio::test]
async fn older_versions_are_fenced_off() {
  let consumer = consumer().await;
  consumer
    .handle("when-purchase-created", &purchase("PO-1", 0, &[10.0]))
    .await
    .unwrap();

  let mut older = purchase("PO-1", 0, &[99.0]);
  older["updatedat"] = json!("2024-05-01T09:00:00Z");
  let report = synced(
    consumer
      .handle("when-purchase-updated", &older)
      .await
      .unwrap(),
  );
  assert!(matches!(report.primary, UpsertOutcome::Stale { .. }));

  let primary: TransactionProjection =
    stored(&consumer, TransactionKind::Purchase.tables(), "PO-1")
      .await
      .unwrap();
  assert_eq!(primary.details[0].qty, 10.0);
}

#[tokio::test]
async fn settlement_progress_survives_redelivery() {
  let consumer = consumer().await;
  consumer
    .handle("when-purchase-created", &purchase("PO-1", 0, &[10.0]))
    .await
    .unwrap();

  // Another flow records a partial payment.
  let mut ledger: LedgerProjection =
    stored(&consumer, LedgerSide::Creditor.tables(), "PO-1")
      .await
      .unwrap();
  ledger.paid_amount = 20.0;
  ledger.balance = 28.0;
  ledger.status = LedgerStatus::PartiallyPaid;
  consumer.service().store().update(ledger).await.unwrap();

  let replay = synced(
    consumer
      .handle("when-purchase-updated", &purchase("PO-1", 0, &[10.0]))
      .await
      .unwrap(),
  );
  assert_eq!(replay.ledger, Some(UpsertOutcome::Unchanged));

  let mut changed = purchase("PO-1", 0, &[10.0]);
  changed["totalamount"] = json!(60.0);
  let report = synced(
    consumer
      .handle("when-purchase-updated", &changed)
      .await
      .unwrap(),
  );
  assert!(matches!(report.ledger, Some(UpsertOutcome::Updated(_))));

  let ledger: LedgerProjection =
    stored(&consumer, LedgerSide::Creditor.tables(), "PO-1")
      .await
      .unwrap();
  assert_eq!(ledger.paid_amount, 20.0);
  assert_eq!(ledger.balance, 40.0);
  assert_eq!(ledger.status, LedgerStatus::PartiallyPaid);
}

#[tokio::test]
async fn debtor_payment_records_the_money_movement() {
  let consumer = consumer().await;
  let payload = json!({
    "shopid": "shop-1",
    "docno": "RC-1",
    "docdatetime": "2024-05-02T00:00:00Z",
    "custcode": "DB-01",
    "totalamount": 150.0,
    "details": [{ "docno": "SI-1", "transflag": 44, "value": 150.0, "paymentamount": 150.0 }],
    "paymentdetail": { "cashamount": 150.0 },
  });
  let report = synced(
    consumer
      .handle("when-debtor-payment-created", &payload)
      .await
      .unwrap(),
  );
  assert_eq!(report.stock, None);
  assert_eq!(report.ledger, None);
  assert_eq!(report.payment, Some(UpsertOutcome::Created));

  let primary: PaymentProjection =
    stored(&consumer, TransactionKind::DebtorPayment.tables(), "RC-1")
      .await
      .unwrap();
  assert_eq!(primary.details.len(), 1);
  let effect: PaymentEffectProjection =
    stored(&consumer, PAYMENT_EFFECT_TABLES, "RC-1").await.unwrap();
  assert_eq!(effect.total_amount, 150.0);
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_cascades_and_repeats_cleanly() {
  let consumer = consumer().await;
  let payload = purchase("PO-1", 0, &[10.0]);
  consumer
    .handle("when-purchase-created", &payload)
    .await
    .unwrap();

  let first = consumer
    .on_delete(TransactionKind::Purchase, &payload)
    .await
    .unwrap();
  assert!(first.primary);
  assert_eq!(first.stock, Some(true));
  assert_eq!(first.ledger, Some(true));
  assert_eq!(first.payment, Some(false));

  let stock: Option<StockProjection> =
    stored(&consumer, STOCK_TABLES, "PO-1").await;
  assert!(stock.is_none());

  let processed = consumer
    .handle("when-purchase-deleted", &payload)
    .await
    .unwrap();
  let [Processed::Deleted(again)] = processed.as_slice() else {
    panic!("expected one delete report");
  };
  assert!(!again.primary);
  assert_eq!(again.stock, Some(false));
  assert_eq!(again.ledger, Some(false));
}

#[tokio::test]
async fn stock_kinds_do_not_touch_ledgers_on_delete() {
  let consumer = consumer().await;
  let payload = json!({
    "shopid": "shop-1",
    "docno": "ADJ-1",
    "docdatetime": "2024-05-01T00:00:00Z",
    "details": [{ "linenumber": 0, "barcode": "BC-0", "qty": -2.0 }],
  });
  let report = consumer
    .on_delete(TransactionKind::StockAdjustment, &payload)
    .await
    .unwrap();
  assert_eq!(report.stock, Some(false));
  assert_eq!(report.ledger, None);
  assert_eq!(report.payment, None);
}

// ─── Bulk ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_stops_at_the_first_bad_document() {
  let consumer = consumer().await;
  let batch = json!([
    purchase("PO-1", 0, &[1.0]),
    { "shopid": 7 },
    purchase("PO-3", 0, &[3.0]),
  ]);

  let err = consumer
    .handle("when-purchase-bulk-created", &batch)
    .await
    .unwrap_err();
  assert!(err.is_decode(), "{err}");

  let first: Option<TransactionProjection> =
    stored(&consumer, TransactionKind::Purchase.tables(), "PO-1").await;
  let third: Option<TransactionProjection> =
    stored(&consumer, TransactionKind::Purchase.tables(), "PO-3").await;
  assert!(first.is_some());
  assert!(third.is_none());
}

#[tokio::test]
async fn bulk_payload_must_be_an_array() {
  let consumer = consumer().await;
  let err = consumer
    .handle("when-purchase-bulk-updated", &purchase("PO-1", 0, &[1.0]))
    .await
    .unwrap_err();
  assert!(err.is_decode());
}

#[tokio::test]
async fn bulk_delete_processes_every_element() {
  let consumer = consumer().await;
  let batch = json!([purchase("PO-1", 0, &[1.0]), purchase("PO-2", 0, &[2.0])]);
  consumer
    .handle("when-purchase-bulk-created", &batch)
    .await
    .unwrap();

  let processed = consumer
    .handle("when-purchase-bulk-deleted", &batch)
    .await
    .unwrap();
  assert_eq!(processed.len(), 2);
  assert!(
    processed
      .iter()
      .all(|p| matches!(p, Processed::Deleted(r) if r.primary))
  );
}

// ─── Topics ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_topics_are_rejected() {
  let consumer = consumer().await;
  let err = consumer
    .handle("when-invoice-printed", &json!({}))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(tally_core::Error::UnknownTopic(_))));
}

#[tokio::test]
async fn topics_of_unregistered_kinds_are_rejected() {
  let mut phasers = PhaserRegistry::standard();
  phasers.retain(&[TransactionKind::Purchase]);
  let store = SqliteStore::open_in_memory().await.unwrap();
  let consumer = TransactionConsumer::new(Arc::new(store), phasers, "g");

  let err = consumer
    .handle("when-sale-invoice-created", &purchase("SI-1", 0, &[1.0]))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(tally_core::Error::UnknownTopic(_))));

  let topics: Vec<String> =
    consumer.subscriptions().iter().map(ToString::to_string).collect();
  assert_eq!(topics.len(), 6);
  assert!(topics.contains(&"when-purchase-bulk-deleted".to_owned()));
}

// ─── Partial fan-out ─────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum FlakyError {
  #[error("injected failure on {0}")]
  Injected(&'static str),
  #[error(transparent)]
  Store(#[from] tally_store_sqlite::Error),
}

/// Delegates to SQLite but refuses every write to one table set.
struct FlakyStore {
  inner:   SqliteStore,
  failing: TableSet,
}

impl FlakyStore {
  fn check(&self, tables: TableSet) -> Result<(), FlakyError> {
    if tables == self.failing {
      return Err(FlakyError::Injected(tables.header));
    }
    Ok(())
  }
}

impl ProjectionStore for FlakyStore {
  type Error = FlakyError;

  async fn get<P: Projection>(
    &self,
    tables: TableSet,
    key: DocKey,
  ) -> Result<Option<P>, FlakyError> {
    Ok(self.inner.get(tables, key).await?)
  }

  async fn create<P: Projection>(&self, projection: P) -> Result<P, FlakyError> {
    self.check(projection.tables())?;
    Ok(self.inner.create(projection).await?)
  }

  async fn update<P: Projection>(
    &self,
    projection: P,
  ) -> Result<Reconciliation, FlakyError> {
    self.check(projection.tables())?;
    Ok(self.inner.update(projection).await?)
  }

  async fn delete(&self, tables: TableSet, key: DocKey) -> Result<bool, FlakyError> {
    self.check(tables)?;
    Ok(self.inner.delete(tables, key).await?)
  }

  async fn list<P: Projection>(
    &self,
    tables: TableSet,
    shop_id: String,
  ) -> Result<Vec<P>, FlakyError> {
    Ok(self.inner.list(tables, shop_id).await?)
  }
}

#[tokio::test]
async fn derived_failure_after_primary_is_a_partial_fanout() {
  let store = Arc::new(FlakyStore {
    inner:   SqliteStore::open_in_memory().await.unwrap(),
    failing: STOCK_TABLES,
  });
  let consumer = TransactionConsumer::new(
    Arc::clone(&store),
    PhaserRegistry::standard(),
    "g",
  );

  let err = consumer
    .handle("when-purchase-created", &purchase("PO-1", 0, &[1.0]))
    .await
    .unwrap_err();
  match err {
    Error::PartialFanout {
      kind,
      key: failed,
      stage,
      ..
    } => {
      assert_eq!(kind, TransactionKind::Purchase);
      assert_eq!(failed, key("PO-1"));
      assert_eq!(stage, FanoutStage::Stock);
    }
    other => panic!("expected a partial fan-out, got {other}"),
  }

  // The primary stays committed; the ledger step was never reached.
  let primary: Option<TransactionProjection> = store
    .inner
    .get(TransactionKind::Purchase.tables(), key("PO-1"))
    .await
    .unwrap();
  assert!(primary.is_some());
  let ledger: Option<LedgerProjection> = store
    .inner
    .get(LedgerSide::Creditor.tables(), key("PO-1"))
    .await
    .unwrap();
  assert!(ledger.is_none());
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[test]
fn empty_kind_list_registers_every_kind() {
  let cfg = ConsumerConfig::default();
  assert_eq!(cfg.phasers().unwrap().kinds().len(), 11);
}

#[test]
fn kind_list_restricts_the_registry() {
  let cfg = ConsumerConfig {
    kinds: vec!["purchase".into(), " stock-transfer ".into()],
    ..ConsumerConfig::default()
  };
  assert_eq!(cfg.phasers().unwrap().kinds(), vec![
    TransactionKind::Purchase,
    TransactionKind::StockTransfer,
  ]);
}

#[test]
fn unknown_kind_in_config_is_an_error() {
  let cfg = ConsumerConfig {
    kinds: vec!["refund".into()],
    ..ConsumerConfig::default()
  };
  assert!(matches!(
    cfg.kinds(),
    Err(Error::Core(tally_core::Error::UnknownTransactionKind(_)))
  ));
}

#[test]
fn group_override_ignores_blank_values() {
  let cfg = ConsumerConfig::default().with_group_override(Some("  ".into()));
  assert_eq!(cfg.consumer_group, crate::DEFAULT_CONSUMER_GROUP);

  let cfg = cfg.with_group_override(Some("group-02".into()));
  assert_eq!(cfg.consumer_group, "group-02");
}
