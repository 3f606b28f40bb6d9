//! Message-bus topic names.
//!
//! Every kind subscribes to six topics named
//! `when-<slug>-{created|updated|deleted|bulk-created|bulk-updated|bulk-deleted}`.

use std::{fmt, str::FromStr};

use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::{Error, Result, kind::TransactionKind};

const PREFIX: &str = "when-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum TopicEvent {
  Created,
  Updated,
  Deleted,
  BulkCreated,
  BulkUpdated,
  BulkDeleted,
}

impl TopicEvent {
  pub fn is_bulk(self) -> bool {
    matches!(self, Self::BulkCreated | Self::BulkUpdated | Self::BulkDeleted)
  }

  pub fn is_delete(self) -> bool {
    matches!(self, Self::Deleted | Self::BulkDeleted)
  }
}

/// A parsed topic: which kind and which event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topic {
  pub kind:  TransactionKind,
  pub event: TopicEvent,
}

impl Topic {
  pub fn new(kind: TransactionKind, event: TopicEvent) -> Self {
    Self { kind, event }
  }

  /// All six topics of one kind.
  pub fn all_for(kind: TransactionKind) -> impl Iterator<Item = Topic> {
    TopicEvent::iter().map(move |event| Topic::new(kind, event))
  }
}

impl fmt::Display for Topic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let event: &'static str = self.event.into();
    write!(f, "{PREFIX}{}-{event}", self.kind.slug())
  }
}

impl FromStr for Topic {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let unknown = || Error::UnknownTopic(s.to_owned());
    let rest = s.strip_prefix(PREFIX).ok_or_else(unknown)?;

    // Bulk events share a suffix with their single counterparts, so the
    // longest suffix has to win.
    let mut events: Vec<TopicEvent> = TopicEvent::iter().collect();
    events.sort_by_key(|e| std::cmp::Reverse(<&str>::from(*e).len()));

    for event in events {
      let suffix: &'static str = event.into();
      let Some(slug) = rest
        .strip_suffix(suffix)
        .and_then(|head| head.strip_suffix('-'))
      else {
        continue;
      };
      let kind = TransactionKind::from_str(slug).map_err(|_| unknown())?;
      return Ok(Topic::new(kind, event));
    }
    Err(unknown())
  }
}
