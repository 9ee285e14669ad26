// src/models/mod.rs

//! Domain models for the slot watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod record;
mod snapshot;

// Re-export all public types
pub use config::{
    AlertConfig, Config, CrawlerConfig, DiagnosticsConfig, ExtractionConfig, FallbackMode,
    LoggingConfig, PolicyConfig, S3StateConfig, StateConfig, TargetConfig, TelegramConfig,
    parse_flag,
};
pub use record::{AvailabilityRecord, RecordSet, SlotStatus, any_free};
pub use snapshot::Snapshot;
