//! Change detection between the current observation and the stored snapshot.
//!
//! Comparison is on the canonical encoding only, so once a record set has
//! been persisted, observing it again produces no notification. Record order
//! is part of the encoding: the same records in a different order count as a
//! change.

use crate::models::{AvailabilityRecord, Snapshot, any_free};

/// Outcome of comparing one observation with the stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Encoding of the current record set
    pub current: Snapshot,
    /// Current encoding differs from the stored one (or nothing was stored)
    pub changed: bool,
    /// At least one current record is free
    pub has_free: bool,
}

/// What the run should do with a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing changed: no message, no write
    Unchanged,
    /// Send an alert, then persist
    Notify,
    /// Persist without sending
    Suppress,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Unchanged => "unchanged",
            Decision::Notify => "notify",
            Decision::Suppress => "suppressed",
        }
    }
}

impl Detection {
    /// Apply the notification policy.
    pub fn decide(&self, only_notify_when_free: bool) -> Decision {
        if !self.changed {
            Decision::Unchanged
        } else if self.has_free || !only_notify_when_free {
            Decision::Notify
        } else {
            Decision::Suppress
        }
    }
}

/// Compare current records with the previously persisted snapshot.
pub fn detect_change(records: &[AvailabilityRecord], previous: Option<&Snapshot>) -> Detection {
    let current = Snapshot::encode(records);
    let changed = previous.is_none_or(|prev| *prev != current);
    Detection {
        current,
        changed,
        has_free: any_free(records),
    }
}
