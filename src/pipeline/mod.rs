//! Pipeline entry points for monitoring runs.
//!
//! - `run_monitor`: one orchestrated run with the configured failure policy
//! - `Monitor`: the orchestrator itself, for callers that need the raw result

pub mod diagnostics;
pub mod diff;
pub mod run;

pub use diagnostics::DiagnosticsWriter;
pub use diff::{Decision, Detection, detect_change};
pub use run::{DispatchOutcome, Monitor, RunReport};

use crate::error::Result;
use crate::models::Config;
use crate::services::{Notifier, PageSource};
use crate::storage::StateStore;

/// Apply the failure policy to a finished run.
///
/// With `fail_on_error` a failed run is returned as an error; without it the
/// failure is logged and the caller sees `Ok(None)`.
pub fn settle(result: Result<RunReport>, fail_on_error: bool) -> Result<Option<RunReport>> {
    match result {
        Ok(report) => Ok(Some(report)),
        Err(e) if fail_on_error => Err(e),
        Err(e) => {
            log::warn!("Suppressed failure (fail_on_error = false): {}", e);
            Ok(None)
        }
    }
}

/// Run the monitor once against the given collaborators.
pub async fn run_monitor(
    config: &Config,
    source: &dyn PageSource,
    store: &dyn StateStore,
    notifier: Option<&dyn Notifier>,
) -> Result<Option<RunReport>> {
    let monitor = Monitor::new(config, source, store, notifier)?;
    settle(monitor.run_once().await, config.policy.fail_on_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_settle_propagates_when_fatal() {
        let failed = Err(AppError::timeout("loading the target page", 60));
        assert!(matches!(
            settle(failed, true),
            Err(AppError::Timeout { secs: 60, .. })
        ));
    }

    #[test]
    fn test_settle_suppresses_when_not_fatal() {
        let failed = Err(AppError::acquisition("https://example.com", "refused"));
        assert!(matches!(settle(failed, false), Ok(None)));
    }
}
