//! End-to-end runs of the monitor against fake collaborators.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use slotwatch::error::{AppError, Result};
use slotwatch::models::{Config, SlotStatus, Snapshot};
use slotwatch::pipeline::{Decision, DispatchOutcome, Monitor, RunReport, run_monitor};
use slotwatch::services::{Notifier, OutboundMessage, PageSource};
use slotwatch::storage::{LocalStateStore, MemoryStateStore, StateStore};
use tempfile::TempDir;

const TWO_DAYS: &str = r#"
    <html><body>
      <div class="calendar">
        <div class="day green"><span>12 May</span> <span>Есть места</span></div>
        <div class="day"><span>13 May</span></div>
      </div>
    </body></html>
"#;

const NOTHING_FREE: &str = r#"
    <html><body>
      <div class="day"><span>12 May</span> <span>Свободных мест нет</span></div>
      <div class="day"><span>13 May</span></div>
    </body></html>
"#;

const TWO_DAYS_REORDERED: &str = r#"
    <html><body>
      <div class="day"><span>13 May</span></div>
      <div class="day green"><span>12 May</span> <span>Есть места</span></div>
    </body></html>
"#;

const NO_CARDS: &str = r#"
    <html><body>
      <h1>Запись на свидание</h1>
      <p>Записаться</p>
    </body></html>
"#;

struct StaticPage(String);

#[async_trait]
impl PageSource for StaticPage {
    async fn fetch(&self) -> Result<String> {
        Ok(self.0.clone())
    }

    fn last_markup(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Gets as far as the login page, then times out.
struct TimingOutPage;

#[async_trait]
impl PageSource for TimingOutPage {
    async fn fetch(&self) -> Result<String> {
        Err(AppError::timeout("waiting for the calendar", 15))
    }

    fn last_markup(&self) -> Option<String> {
        Some("<html>login form</html>".to_string())
    }

    async fn screenshot(&self) -> Option<Vec<u8>> {
        Some(b"PNG".to_vec())
    }
}

struct HangingPage;

#[async_trait]
impl PageSource for HangingPage {
    async fn fetch(&self) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(String::new())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<OutboundMessage>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail {
            Err(AppError::dispatch("HTTP 401 Unauthorized"))
        } else {
            Ok(())
        }
    }
}

/// Loads nothing and refuses every write.
struct ReadOnlyStore;

#[async_trait]
impl StateStore for ReadOnlyStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        Ok(None)
    }

    async fn save(&self, _snapshot: &Snapshot) -> Result<()> {
        Err(AppError::storage("read-only file system"))
    }

    fn location(&self) -> String {
        "read-only".to_string()
    }
}

fn test_config(tmp: &TempDir) -> Config {
    let mut config = Config::default();
    config.telegram.token = "123:abc".to_string();
    config.telegram.chat_id = "42".to_string();
    config.diagnostics.html_path = tmp.path().join("page.html").display().to_string();
    config.diagnostics.screenshot_path = tmp.path().join("page.png").display().to_string();
    config.diagnostics.save_page_on_success = false;
    config
}

async fn run(
    config: &Config,
    markup: &str,
    store: &dyn StateStore,
    notifier: &RecordingNotifier,
) -> RunReport {
    let source = StaticPage(markup.to_string());
    Monitor::new(config, &source, store, Some(notifier))
        .unwrap()
        .run_once()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_free_day_is_alerted_and_persisted() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    let report = run(&config, TWO_DAYS, &store, &notifier).await;

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].date_label, "12 May");
    assert_eq!(report.records[0].status, SlotStatus::Free);
    assert_eq!(report.records[1].date_label, "13 May");
    assert_eq!(report.records[1].status, SlotStatus::Unavailable);
    assert_eq!(report.decision, Decision::Notify);
    assert_eq!(report.dispatch, DispatchOutcome::Sent);
    assert!(report.persisted);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].chat_id, "42");
    assert_eq!(messages[0].parse_mode, "HTML");
    assert!(messages[0].disable_preview);
    assert_eq!(messages[0].text.matches("✅").count(), 1);
    assert!(messages[0].text.contains("✅ <b>12 May</b>"));
    assert!(!messages[0].text.contains("13 May"));

    assert_eq!(
        store.current().unwrap().as_str(),
        r#"[{"date":"12 May","status":"free","time":null},{"date":"13 May","status":"unavailable","time":null}]"#
    );
}

#[tokio::test]
async fn test_first_run_without_free_days_is_persisted_silently() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    let report = run(&config, NOTHING_FREE, &store, &notifier).await;

    assert!(report.changed());
    assert!(!report.has_free());
    assert_eq!(report.decision, Decision::Suppress);
    assert_eq!(report.dispatch, DispatchOutcome::NotAttempted);
    assert!(report.persisted);
    assert!(notifier.messages().is_empty());
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn test_identical_second_run_does_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    run(&config, NOTHING_FREE, &store, &notifier).await;
    let second = run(&config, NOTHING_FREE, &store, &notifier).await;

    assert!(!second.changed());
    assert_eq!(second.decision, Decision::Unchanged);
    assert!(!second.persisted);
    assert!(notifier.messages().is_empty());
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn test_free_page_alerts_only_once() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    run(&config, TWO_DAYS, &store, &notifier).await;
    let second = run(&config, TWO_DAYS, &store, &notifier).await;

    assert!(!second.changed());
    assert_eq!(second.dispatch, DispatchOutcome::NotAttempted);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_page_without_cards_falls_back_to_page_text() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    let report = run(&config, NO_CARDS, &store, &notifier).await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].status, SlotStatus::Free);
    assert_eq!(report.dispatch, DispatchOutcome::Sent);
    assert!(notifier.messages()[0].text.contains("✅ <b>Свободно</b>"));
}

#[tokio::test]
async fn test_acquisition_timeout_fails_and_captures_diagnostics() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    let result = run_monitor(&config, &TimingOutPage, &store, Some(&notifier)).await;

    assert!(matches!(result, Err(AppError::Timeout { .. })));
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("page.html")).unwrap(),
        "<html>login form</html>"
    );
    assert_eq!(std::fs::read(tmp.path().join("page.png")).unwrap(), b"PNG");
    assert!(notifier.messages().is_empty());
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn test_page_load_is_bounded() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.crawler.page_load_timeout_secs = 1;
    let store = MemoryStateStore::new();

    let result = run_monitor(&config, &HangingPage, &store, None).await;

    assert!(matches!(result, Err(AppError::Timeout { secs: 1, .. })));
}

#[tokio::test]
async fn test_failure_is_suppressed_when_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.policy.fail_on_error = false;
    let store = MemoryStateStore::new();

    let result = run_monitor(&config, &TimingOutPage, &store, None).await;

    assert!(matches!(result, Ok(None)));
    assert!(tmp.path().join("page.html").exists());
}

#[tokio::test]
async fn test_reordered_records_count_as_change() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    run(&config, TWO_DAYS, &store, &notifier).await;
    let second = run(&config, TWO_DAYS_REORDERED, &store, &notifier).await;

    assert!(second.changed());
    assert_eq!(notifier.messages().len(), 2);
    assert_eq!(store.save_count(), 2);
}

#[tokio::test]
async fn test_dispatch_failure_still_persists() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::failing();

    let report = run(&config, TWO_DAYS, &store, &notifier).await;

    assert!(matches!(report.dispatch, DispatchOutcome::Failed(ref e) if e.contains("401")));
    assert!(report.persisted);

    let second = run(&config, TWO_DAYS, &store, &notifier).await;
    assert_eq!(second.decision, Decision::Unchanged);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_persistence_failure_is_swallowed() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let notifier = RecordingNotifier::default();

    let report = run(&config, TWO_DAYS, &ReadOnlyStore, &notifier).await;

    assert_eq!(report.dispatch, DispatchOutcome::Sent);
    assert!(!report.persisted);
}

#[tokio::test]
async fn test_notify_regardless_sends_no_free_text() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.policy.only_notify_when_free = false;
    let store = MemoryStateStore::new();
    let notifier = RecordingNotifier::default();

    let report = run(&config, NOTHING_FREE, &store, &notifier).await;

    assert_eq!(report.decision, Decision::Notify);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text.contains("Свободных дат нет."));
    assert!(!messages[0].text.contains("✅"));
}

#[tokio::test]
async fn test_missing_notifier_still_persists() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = MemoryStateStore::new();
    let source = StaticPage(TWO_DAYS.to_string());

    let report = run_monitor(&config, &source, &store, None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.dispatch, DispatchOutcome::NoNotifier);
    assert!(report.persisted);
}

#[tokio::test]
async fn test_state_survives_between_processes() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.diagnostics.save_page_on_success = true;
    let state_path = tmp.path().join("state/state.json");
    let notifier = RecordingNotifier::default();

    let first = run(&config, TWO_DAYS, &LocalStateStore::new(&state_path), &notifier).await;
    assert!(first.persisted);
    assert_eq!(
        std::fs::read_to_string(&state_path).unwrap(),
        Snapshot::encode(&first.records).as_str()
    );
    assert!(tmp.path().join("page.html").exists());

    let second = run(&config, TWO_DAYS, &LocalStateStore::new(&state_path), &notifier).await;
    assert!(!second.changed());
    assert_eq!(notifier.messages().len(), 1);
}
