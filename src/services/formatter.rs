// src/services/formatter.rs

//! Alert text rendering.
//!
//! Output uses the HTML subset understood by Telegram (`<b>`, `<a>`), so every
//! label taken from the page is escaped.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::models::{AlertConfig, AvailabilityRecord};
use crate::utils::escape_html;

/// Renders alert bodies from record sets.
#[derive(Debug, Clone)]
pub struct NotificationFormatter {
    alert: AlertConfig,
}

impl NotificationFormatter {
    pub fn new(alert: AlertConfig) -> Self {
        Self { alert }
    }

    /// One `✅ <b>label</b>` line per free record, or the "no free dates" text.
    pub fn format_lines(&self, records: &[AvailabilityRecord]) -> String {
        let lines: Vec<String> = records
            .iter()
            .filter(|r| r.is_free())
            .map(|r| {
                let label = r.display_label();
                let label = if label.is_empty() {
                    self.alert.fallback_label.as_str()
                } else {
                    label.as_str()
                };
                format!("✅ <b>{}</b>", escape_html(label))
            })
            .collect();

        if lines.is_empty() {
            self.alert.no_free_text.clone()
        } else {
            lines.join("\n")
        }
    }

    /// Full alert body: headline with local time, lines, booking link.
    pub fn compose(
        &self,
        records: &[AvailabilityRecord],
        target_url: &str,
        now: DateTime<Utc>,
    ) -> String {
        format!(
            "🚨 {} [{}]\n\n{}\n\n{} <a href=\"{}\">{}</a>",
            escape_html(&self.alert.title),
            self.local_time(now).format("%Y-%m-%d %H:%M"),
            self.format_lines(records),
            escape_html(&self.alert.link_prefix),
            escape_html(target_url).replace('"', "&quot;"),
            escape_html(&self.alert.link_text),
        )
    }

    /// Convert to the configured alert time zone.
    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        let offset = self
            .alert
            .utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        now.with_timezone(&offset)
    }
}

impl Default for NotificationFormatter {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
