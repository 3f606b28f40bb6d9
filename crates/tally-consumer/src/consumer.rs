//! Per-message orchestration.
//!
//! A message is phased into its primary projection, the primary is upserted,
//! and then each derived projection the effect table asks for is phased from
//! the primary and upserted in turn. Steps run strictly in order and the first
//! error aborts the rest; the caller owns redelivery.

use std::{future::Future, sync::Arc};

use serde_json::Value;
use tally_core::{
  TransactionKind,
  effect,
  model::DocKey,
  phase::{
    PhaserRegistry, PrimaryProjection, phase_ledger_effect,
    phase_payment_effect, phase_stock_effect,
  },
  projection::{PAYMENT_EFFECT_TABLES, STOCK_TABLES},
  store::ProjectionStore,
  topic::{Topic, TopicEvent},
};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
  Error, Result,
  error::FanoutStage,
  service::{ConsumerService, UpsertOutcome},
};

// ─── Reports ─────────────────────────────────────────────────────────────────

/// The result of syncing one document.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
  pub kind:    TransactionKind,
  pub key:     DocKey,
  pub primary: UpsertOutcome,
  /// `None` when the document has no such effect.
  pub stock:   Option<UpsertOutcome>,
  pub ledger:  Option<UpsertOutcome>,
  pub payment: Option<UpsertOutcome>,
}

/// The result of deleting one document. Derived fields are `None` when the
/// kind can never produce that projection, otherwise whether a row existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
  pub kind:    TransactionKind,
  pub key:     DocKey,
  pub primary: bool,
  pub stock:   Option<bool>,
  pub ledger:  Option<bool>,
  pub payment: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
  Synced(SyncReport),
  Deleted(DeleteReport),
}

// ─── Consumer ────────────────────────────────────────────────────────────────

pub struct TransactionConsumer<S> {
  service: ConsumerService<S>,
  phasers: PhaserRegistry,
  group:   String,
}

impl<S: ProjectionStore> TransactionConsumer<S> {
  pub fn new(
    store: Arc<S>,
    phasers: PhaserRegistry,
    group: impl Into<String>,
  ) -> Self {
    Self {
      service: ConsumerService::new(store),
      phasers,
      group: group.into(),
    }
  }

  pub fn group(&self) -> &str { &self.group }

  pub fn service(&self) -> &ConsumerService<S> { &self.service }

  /// Every topic this consumer group subscribes to, six per registered kind.
  pub fn subscriptions(&self) -> Vec<Topic> {
    self
      .phasers
      .kinds()
      .into_iter()
      .flat_map(Topic::all_for)
      .collect()
  }

  /// Process one message delivered on `topic`.
  pub async fn handle(
    &self,
    topic: &str,
    payload: &Value,
  ) -> Result<Vec<Processed>> {
    let span = tracing::info_span!(
      "message",
      topic,
      group = %self.group,
      message_id = %Uuid::new_v4()
    );

    async {
      let result = self.dispatch(topic, payload).await;
      if let Err(e) = &result {
        tracing::error!(error = %e, "message failed");
      }
      result
    }
    .instrument(span)
    .await
  }

  async fn dispatch(
    &self,
    topic: &str,
    payload: &Value,
  ) -> Result<Vec<Processed>> {
    let parsed: Topic = topic.parse()?;
    if self.phasers.get(parsed.kind).is_err() {
      return Err(tally_core::Error::UnknownTopic(topic.to_owned()).into());
    }

    let kind = parsed.kind;
    match parsed.event {
      TopicEvent::Created | TopicEvent::Updated => {
        let report = self.on_create_or_update(kind, payload).await?;
        Ok(vec![Processed::Synced(report)])
      }
      TopicEvent::Deleted => {
        let report = self.on_delete(kind, payload).await?;
        Ok(vec![Processed::Deleted(report)])
      }
      TopicEvent::BulkCreated | TopicEvent::BulkUpdated => Ok(
        self
          .on_bulk_create_or_update(kind, payload)
          .await?
          .into_iter()
          .map(Processed::Synced)
          .collect(),
      ),
      TopicEvent::BulkDeleted => Ok(
        self
          .on_bulk_delete(kind, payload)
          .await?
          .into_iter()
          .map(Processed::Deleted)
          .collect(),
      ),
    }
  }

  // ─── Single document ───────────────────────────────────────────────────────

  pub async fn on_create_or_update(
    &self,
    kind: TransactionKind,
    payload: &Value,
  ) -> Result<SyncReport> {
    let primary = self.phasers.phase(kind, payload)?;
    let key = primary.key();
    let effects = primary.effects();

    let primary_outcome = match &primary {
      PrimaryProjection::Transaction(t) => self.service.upsert(t.clone()).await?,
      PrimaryProjection::Payment(p) => self.service.upsert(p.clone()).await?,
    };
    log_outcome(kind, &key, "primary", &primary_outcome);

    let transaction = match &primary {
      PrimaryProjection::Transaction(t) => Some(t),
      PrimaryProjection::Payment(_) => None,
    };

    let mut stock = None;
    if effects.has_stock_effect()
      && let Some(t) = transaction
    {
      let outcome = self
        .fan_out(kind, &key, FanoutStage::Stock, async {
          self.service.upsert(phase_stock_effect(t)?).await
        })
        .await?;
      log_outcome(kind, &key, "stock", &outcome);
      stock = Some(outcome);
    }

    let mut ledger = None;
    if effects.has_ledger_effect()
      && let Some(t) = transaction
    {
      let outcome = self
        .fan_out(kind, &key, FanoutStage::Ledger, async {
          self.service.upsert(phase_ledger_effect(t)?).await
        })
        .await?;
      log_outcome(kind, &key, "ledger", &outcome);
      ledger = Some(outcome);
    }

    let mut payment = None;
    if effects.has_payment_effect() {
      let outcome = self
        .fan_out(kind, &key, FanoutStage::Payment, async {
          self.service.upsert(phase_payment_effect(&primary)?).await
        })
        .await?;
      log_outcome(kind, &key, "payment", &outcome);
      payment = Some(outcome);
    }

    Ok(SyncReport {
      kind,
      key,
      primary: primary_outcome,
      stock,
      ledger,
      payment,
    })
  }

  /// Delete the primary projection and every derived projection the kind
  /// could have produced. Missing rows are not errors.
  pub async fn on_delete(
    &self,
    kind: TransactionKind,
    payload: &Value,
  ) -> Result<DeleteReport> {
    let key = self.phasers.phase(kind, payload)?.key();
    let possible = effect::possible_effects(kind);

    let primary = self.service.delete(kind.tables(), key.clone()).await?;

    let mut stock = None;
    if possible.has_stock_effect() {
      stock = Some(
        self
          .fan_out(kind, &key, FanoutStage::Stock, async {
            self.service.delete(STOCK_TABLES, key.clone()).await
          })
          .await?,
      );
    }

    let mut ledger = None;
    if let Some(side) = possible.ledger {
      ledger = Some(
        self
          .fan_out(kind, &key, FanoutStage::Ledger, async {
            self.service.delete(side.tables(), key.clone()).await
          })
          .await?,
      );
    }

    let mut payment = None;
    if possible.has_payment_effect() {
      payment = Some(
        self
          .fan_out(kind, &key, FanoutStage::Payment, async {
            self.service.delete(PAYMENT_EFFECT_TABLES, key.clone()).await
          })
          .await?,
      );
    }

    tracing::info!(%kind, %key, existed = primary, "deleted");

    Ok(DeleteReport {
      kind,
      key,
      primary,
      stock,
      ledger,
      payment,
    })
  }

  // ─── Bulk ──────────────────────────────────────────────────────────────────

  /// Sync each element in order. The first failure stops the batch; earlier
  /// elements stay applied.
  pub async fn on_bulk_create_or_update(
    &self,
    kind: TransactionKind,
    payload: &Value,
  ) -> Result<Vec<SyncReport>> {
    let mut reports = Vec::new();
    for document in bulk_documents(kind, payload)? {
      reports.push(self.on_create_or_update(kind, document).await?);
    }
    Ok(reports)
  }

  pub async fn on_bulk_delete(
    &self,
    kind: TransactionKind,
    payload: &Value,
  ) -> Result<Vec<DeleteReport>> {
    let mut reports = Vec::new();
    for document in bulk_documents(kind, payload)? {
      reports.push(self.on_delete(kind, document).await?);
    }
    Ok(reports)
  }

  // ─── Helpers ───────────────────────────────────────────────────────────────

  /// Run a derived step, tagging any failure as a partial fan-out since the
  /// primary is already committed.
  async fn fan_out<T>(
    &self,
    kind: TransactionKind,
    key: &DocKey,
    stage: FanoutStage,
    step: impl Future<Output = Result<T>>,
  ) -> Result<T> {
    step.await.map_err(|source| Error::PartialFanout {
      kind,
      key: key.clone(),
      stage,
      source: Box::new(source),
    })
  }
}

fn bulk_documents(kind: TransactionKind, payload: &Value) -> Result<&[Value]> {
  payload.as_array().map(Vec::as_slice).ok_or_else(|| {
    tally_core::Error::decode(kind, "bulk payload is not a JSON array").into()
  })
}

fn log_outcome(
  kind: TransactionKind,
  key: &DocKey,
  projection: &'static str,
  outcome: &UpsertOutcome,
) {
  match outcome {
    UpsertOutcome::Created => {
      tracing::info!(%kind, %key, projection, "created");
    }
    UpsertOutcome::Updated(r) => tracing::info!(
      %kind,
      %key,
      projection,
      inserted = r.inserted.len(),
      replaced = r.replaced.len(),
      deleted = r.deleted.len(),
      "updated"
    ),
    UpsertOutcome::Unchanged => {
      tracing::debug!(%kind, %key, projection, "unchanged, skipped");
    }
    UpsertOutcome::Stale { stored, incoming } => tracing::warn!(
      %kind,
      %key,
      projection,
      %stored,
      %incoming,
      "older than the stored version, skipped"
    ),
  }
}
