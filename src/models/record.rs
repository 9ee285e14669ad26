//! Availability record data structure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bookability of a single observed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// The entry indicates bookable capacity
    Free,
    /// Explicitly (or by default) no capacity
    Unavailable,
    /// Ambiguous text; never produced by the built-in extraction tiers
    Unknown,
}

impl SlotStatus {
    /// Stable lowercase name used in snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Free => "free",
            SlotStatus::Unavailable => "unavailable",
            SlotStatus::Unknown => "unknown",
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, SlotStatus::Free)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One observed calendar entry, or the page-level fallback entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    /// Free-text date/day label (empty for the page-level fallback)
    #[serde(rename = "date")]
    pub date_label: String,

    /// Per-slot time label, when the markup exposes one
    #[serde(rename = "time", default)]
    pub time_label: Option<String>,

    /// Derived bookability
    pub status: SlotStatus,
}

impl AvailabilityRecord {
    pub fn new(date_label: impl Into<String>, status: SlotStatus) -> Self {
        Self {
            date_label: date_label.into(),
            time_label: None,
            status,
        }
    }

    /// Attach a time label.
    pub fn with_time(mut self, time_label: impl Into<String>) -> Self {
        self.time_label = Some(time_label.into());
        self
    }

    pub fn is_free(&self) -> bool {
        self.status.is_free()
    }

    /// Date label followed by the time label, if any.
    pub fn display_label(&self) -> String {
        match self.time_label.as_deref().map(str::trim) {
            Some(time) if !time.is_empty() => {
                format!("{} {}", self.date_label.trim(), time).trim().to_string()
            }
            _ => self.date_label.trim().to_string(),
        }
    }
}

/// Records in document order, as encountered during extraction.
pub type RecordSet = Vec<AvailabilityRecord>;

/// True if any record in the set is free.
pub fn any_free(records: &[AvailabilityRecord]) -> bool {
    records.iter().any(AvailabilityRecord::is_free)
}
