//! Phasers: pure transforms from a source document to projections.
//!
//! Each transaction kind registers one [`Phaser`] in a [`PhaserRegistry`].
//! The primary phaser decodes the raw document; the derived phasers in
//! [`derived`] reshape an already-phased primary projection. None of them
//! perform I/O or decide whether a derived projection applies.

use std::collections::HashMap;

use serde_json::Value;
use strum::IntoEnumIterator;

use crate::{
  Error, Result,
  effect::{self, Effects},
  kind::{DocumentShape, TransactionKind},
  model::DocKey,
  projection::{PaymentProjection, Projection, TransactionProjection},
  store::TableSet,
};

pub mod derived;
mod items;
mod payment;

pub use derived::{phase_ledger_effect, phase_payment_effect, phase_stock_effect};
pub use items::ItemDocumentPhaser;
pub use payment::PaymentDocumentPhaser;

// ─── Primary projection ──────────────────────────────────────────────────────

/// The projection a document produces in its own right.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryProjection {
  Transaction(TransactionProjection),
  Payment(PaymentProjection),
}

impl PrimaryProjection {
  pub fn kind(&self) -> TransactionKind {
    match self {
      Self::Transaction(t) => t.kind,
      Self::Payment(p) => p.kind,
    }
  }

  pub fn key(&self) -> DocKey {
    match self {
      Self::Transaction(t) => t.key(),
      Self::Payment(p) => p.key(),
    }
  }

  pub fn tables(&self) -> TableSet {
    match self {
      Self::Transaction(t) => t.tables(),
      Self::Payment(p) => p.tables(),
    }
  }

  pub fn inquiry_type(&self) -> i32 {
    match self {
      Self::Transaction(t) => t.inquiry_type,
      Self::Payment(_) => 0,
    }
  }

  /// The derived projections this document fans out to.
  pub fn effects(&self) -> Effects {
    effect::effects(self.kind(), self.inquiry_type())
  }

  pub fn has_stock_effect(&self) -> bool { self.effects().has_stock_effect() }

  pub fn has_ledger_effect(&self) -> bool {
    self.effects().has_ledger_effect()
  }

  pub fn has_payment_effect(&self) -> bool {
    self.effects().has_payment_effect()
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Turns one decoded source document into its primary projection.
pub trait Phaser: Send + Sync {
  fn kind(&self) -> TransactionKind;

  /// Decode `payload` and map it field by field.
  fn phase(&self, payload: &Value) -> Result<PrimaryProjection>;
}

/// Lookup table from transaction kind to its phaser.
#[derive(Default)]
pub struct PhaserRegistry {
  phasers: HashMap<TransactionKind, Box<dyn Phaser>>,
}

impl PhaserRegistry {
  pub fn new() -> Self { Self::default() }

  /// A registry with the built-in phaser for every kind.
  pub fn standard() -> Self {
    let mut registry = Self::new();
    for kind in TransactionKind::iter() {
      match kind.shape() {
        DocumentShape::Items => {
          registry.register(Box::new(ItemDocumentPhaser::new(kind)))
        }
        DocumentShape::Settlements => {
          registry.register(Box::new(PaymentDocumentPhaser::new(kind)))
        }
      }
    }
    registry
  }

  /// Register `phaser` for its kind, replacing any earlier one.
  pub fn register(&mut self, phaser: Box<dyn Phaser>) {
    self.phasers.insert(phaser.kind(), phaser);
  }

  /// Keep only the phasers for `kinds`.
  pub fn retain(&mut self, kinds: &[TransactionKind]) {
    self.phasers.retain(|kind, _| kinds.contains(kind));
  }

  pub fn get(&self, kind: TransactionKind) -> Result<&dyn Phaser> {
    self
      .phasers
      .get(&kind)
      .map(|p| p.as_ref())
      .ok_or_else(|| Error::UnknownTransactionKind(kind.to_string()))
  }

  /// Registered kinds in declaration order.
  pub fn kinds(&self) -> Vec<TransactionKind> {
    let mut kinds: Vec<_> = self.phasers.keys().copied().collect();
    kinds.sort();
    kinds
  }

  pub fn phase(
    &self,
    kind: TransactionKind,
    payload: &Value,
  ) -> Result<PrimaryProjection> {
    self.get(kind)?.phase(payload)
  }
}

/// Positional line number for lines the source does not number itself.
fn line_number(kind: TransactionKind, index: usize) -> Result<i32> {
  i32::try_from(index)
    .map_err(|_| Error::decode(kind, format!("line {index} out of range")))
}
