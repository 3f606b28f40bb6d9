//! Idempotency gate: incoming projection + stored state → one store action.
//!
//! Pure; the caller performs the write. Surrogate ids and store-owned fields
//! are carried from the stored row before comparing, so a replay of the same
//! document compares equal and a changed document keeps what the store owns.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use tally_core::projection::{Projection, ProjectionLine};

/// What to do with an incoming projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan<P> {
  /// Nothing stored under the key.
  Create(P),
  /// Stored content differs; `P` carries adopted ids and store-owned fields.
  Update(P),
  /// Stored content is structurally identical.
  Unchanged,
  /// Incoming is strictly older than what is stored.
  Stale {
    stored:   DateTime<Utc>,
    incoming: DateTime<Utc>,
  },
}

/// Decide how `incoming` should be applied on top of `stored`.
pub fn plan<P: Projection>(mut incoming: P, stored: Option<&P>) -> Plan<P> {
  let Some(stored) = stored else {
    return Plan::Create(incoming);
  };

  if let (Some(stored_at), Some(incoming_at)) =
    (stored.source_updated_at(), incoming.source_updated_at())
    && incoming_at < stored_at
  {
    return Plan::Stale {
      stored:   stored_at,
      incoming: incoming_at,
    };
  }

  adopt_surrogate_ids(&mut incoming, stored);
  incoming.carry_store_owned(stored);

  if incoming.same_content(stored) {
    Plan::Unchanged
  } else {
    Plan::Update(incoming)
  }
}

/// Give each incoming line the id of the stored line with the same line
/// number, pairing repeated line numbers in order of appearance. Incoming
/// lines with no counterpart get no id and will be inserted.
pub fn adopt_surrogate_ids<P: Projection>(incoming: &mut P, stored: &P) {
  let mut ids: HashMap<i32, VecDeque<i64>> = HashMap::new();
  for line in stored.lines() {
    if let Some(id) = line.surrogate_id() {
      ids.entry(line.line_number()).or_default().push_back(id);
    }
  }

  for line in incoming.lines_mut() {
    let id = ids
      .get_mut(&line.line_number())
      .and_then(VecDeque::pop_front);
    line.set_surrogate_id(id);
  }
}
