//! Canonical snapshot encoding of a record set.
//!
//! A snapshot is compact JSON: an array of objects whose keys are emitted in
//! sorted order (`date`, `status`, `time`). The encoding depends only on the
//! ordered record contents, so it is stable across runs and restarts.

use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::AvailabilityRecord;

/// Canonical, persistable form of a record set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snapshot(String);

impl Snapshot {
    /// Encode records in order.
    pub fn encode(records: &[AvailabilityRecord]) -> Self {
        let items = records.iter().map(record_value).collect();
        Self(Value::Array(items).to_string())
    }

    /// Wrap a previously persisted blob without inspecting it.
    pub fn from_persisted(blob: impl Into<String>) -> Self {
        Self(blob.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the blob back into records.
    pub fn decode(&self) -> Result<Vec<AvailabilityRecord>> {
        Ok(serde_json::from_str(&self.0)?)
    }

    /// Short SHA-256 digest for log lines.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(digest)[..12].to_string()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// serde_json's default map is ordered by key, so field order is fixed.
fn record_value(record: &AvailabilityRecord) -> Value {
    let mut map = Map::new();
    map.insert("time".into(), record.time_label.clone().map_or(Value::Null, Value::String));
    map.insert("status".into(), Value::String(record.status.as_str().into()));
    map.insert("date".into(), Value::String(record.date_label.clone()));
    Value::Object(map)
}
