// src/pipeline/run.rs

//! One monitoring run: acquire, extract, detect, notify and persist.
//!
//! Only acquisition, state loading and unexpected faults fail a run. Delivery
//! and persistence failures are logged and reported in the [`RunReport`];
//! the new snapshot is still written after a failed delivery so a lost alert
//! never turns into an alert loop.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Config, RecordSet};
use crate::pipeline::diagnostics::DiagnosticsWriter;
use crate::pipeline::diff::{Decision, Detection, detect_change};
use crate::services::{NotificationFormatter, Notifier, OutboundMessage, PageSource, RecordExtractor};
use crate::storage::StateStore;
use crate::utils::log as report;

/// What happened to the alert of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing to send: unchanged or suppressed by policy
    NotAttempted,
    /// A message was due but no transport is configured
    NoNotifier,
    Sent,
    /// Delivery failed; the run continued
    Failed(String),
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub records: RecordSet,
    pub detection: Detection,
    pub decision: Decision,
    pub dispatch: DispatchOutcome,
    /// The new snapshot was written; false when unchanged or the write failed
    pub persisted: bool,
}

impl RunReport {
    pub fn changed(&self) -> bool {
        self.detection.changed
    }

    pub fn has_free(&self) -> bool {
        self.detection.has_free
    }

    pub fn free_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_free()).count()
    }

    pub fn fingerprint(&self) -> String {
        self.detection.current.fingerprint()
    }
}

/// Orchestrates a single run against explicit collaborators.
pub struct Monitor<'a> {
    config: &'a Config,
    source: &'a dyn PageSource,
    store: &'a dyn StateStore,
    notifier: Option<&'a dyn Notifier>,
    extractor: RecordExtractor,
    formatter: NotificationFormatter,
    diagnostics: DiagnosticsWriter,
}

impl<'a> Monitor<'a> {
    pub fn new(
        config: &'a Config,
        source: &'a dyn PageSource,
        store: &'a dyn StateStore,
        notifier: Option<&'a dyn Notifier>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            source,
            store,
            notifier,
            extractor: RecordExtractor::new(&config.extraction)?,
            formatter: NotificationFormatter::new(config.alert.clone()),
            diagnostics: DiagnosticsWriter::from_config(&config.diagnostics),
        })
    }

    /// Execute one run. On failure, diagnostics are captured before the
    /// error is returned.
    pub async fn run_once(&self) -> Result<RunReport> {
        let started_at = Utc::now();
        let timer = Instant::now();
        report::header(&format!(
            "RUN START {}",
            self.formatter
                .local_time(started_at)
                .format("%Y-%m-%d %H:%M:%S %:z")
        ));

        let result = self.run_stages(started_at).await;

        match &result {
            Ok(run) => report::summary(
                "Run",
                &[
                    ("records", run.records.len().to_string()),
                    ("free", run.free_count().to_string()),
                    ("changed", run.changed().to_string()),
                    ("decision", run.decision.as_str().to_string()),
                    ("dispatch", format!("{:?}", run.dispatch)),
                    ("persisted", run.persisted.to_string()),
                ],
            ),
            Err(e) => {
                log::error!("Run failed: {}", e);
                self.diagnostics.capture(self.source).await;
            }
        }

        log::info!("RUN END ({:.1}s)", timer.elapsed().as_secs_f64());
        result
    }

    async fn run_stages(&self, started_at: DateTime<Utc>) -> Result<RunReport> {
        let markup = self.acquire().await?;
        if self.config.diagnostics.save_page_on_success {
            self.diagnostics.save_page(&markup).await;
        }

        let records = self.extractor.extract(&markup);
        let free: Vec<String> = records
            .iter()
            .filter(|r| r.is_free())
            .map(|r| r.display_label())
            .collect();
        for label in &free {
            log::info!("FREE_DATE: {}", label);
        }
        if free.is_empty() {
            log::info!("no free slots");
        } else {
            log::info!("free slots found: {}", free.len());
        }

        let previous = self.store.load().await?;
        let detection = detect_change(&records, previous.as_ref());
        log::info!(
            "Snapshot {} (previous {})",
            detection.current.fingerprint(),
            previous
                .as_ref()
                .map(|p| p.fingerprint())
                .unwrap_or_else(|| "none".to_string())
        );

        let decision = detection.decide(self.config.policy.only_notify_when_free);
        log::info!("Decision: {}", decision.as_str());

        let dispatch = match decision {
            Decision::Notify => self.dispatch(&records, started_at).await,
            Decision::Unchanged | Decision::Suppress => DispatchOutcome::NotAttempted,
        };

        let persisted = match decision {
            Decision::Unchanged => false,
            Decision::Notify | Decision::Suppress => self.persist(&detection).await,
        };

        Ok(RunReport {
            records,
            detection,
            decision,
            dispatch,
            persisted,
        })
    }

    async fn acquire(&self) -> Result<String> {
        let secs = self.config.crawler.page_load_timeout_secs;
        tokio::time::timeout(Duration::from_secs(secs), self.source.fetch())
            .await
            .map_err(|_| AppError::timeout("loading the target page", secs))?
    }

    async fn dispatch(&self, records: &RecordSet, now: DateTime<Utc>) -> DispatchOutcome {
        let Some(notifier) = self.notifier else {
            log::warn!("Telegram credentials missing; alert not sent");
            return DispatchOutcome::NoNotifier;
        };

        let text = self
            .formatter
            .compose(records, &self.config.target.url, now);
        let message = OutboundMessage::html(&self.config.telegram.chat_id, text);

        let secs = self.config.telegram.timeout_secs;
        let sent = tokio::time::timeout(Duration::from_secs(secs), notifier.send(&message))
            .await
            .unwrap_or_else(|_| Err(AppError::timeout("sending the alert", secs)));

        match sent {
            Ok(()) => {
                log::info!("Alert sent");
                DispatchOutcome::Sent
            }
            Err(e) => {
                log::error!("Alert not delivered: {}", e);
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }

    async fn persist(&self, detection: &Detection) -> bool {
        match self.store.save(&detection.current).await {
            Ok(()) => {
                log::info!("State saved to {}", self.store.location());
                true
            }
            Err(e) => {
                log::error!("State not saved to {}: {}", self.store.location(), e);
                false
            }
        }
    }
}
