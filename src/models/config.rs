//! Application configuration structures.
//!
//! Configuration is read from a TOML file, overlaid with environment
//! variables and validated once at start-up. The resulting [`Config`] is passed
//! explicitly to everything that needs it.

use std::fs;
use std::path::Path;

use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Page to watch
    #[serde(default)]
    pub target: TargetConfig,

    /// HTTP behaviour and bounded waits
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Where the last snapshot is persisted
    #[serde(default)]
    pub state: StateConfig,

    /// Telegram credentials
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Notification and failure policy
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Failure artifacts
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Alert wording
    #[serde(default)]
    pub alert: AlertConfig,

    /// Markup heuristics
    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&content)?)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TARGET_URL") {
            self.target.url = v;
        }
        if let Some(v) = get("LOGIN_URL") {
            self.target.login_url = v;
        }
        if let Some(v) = get("STATE_FILE") {
            self.state.path = v;
        }
        if let Some(v) = get("TELEGRAM_TOKEN") {
            self.telegram.token = v;
        }
        if let Some(v) = get("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }
        if let Some(v) = get("ONLY_NOTIFY_WHEN_FREE") {
            self.policy.only_notify_when_free = parse_flag("ONLY_NOTIFY_WHEN_FREE", &v)?;
        }
        if let Some(v) = get("FAIL_ON_ERROR") {
            self.policy.fail_on_error = parse_flag("FAIL_ON_ERROR", &v)?;
        }
        if let Some(v) = get("CRAWL_TIMEOUT_SECS") {
            self.crawler.timeout_secs = v
                .trim()
                .parse()
                .map_err(|_| AppError::validation(format!("CRAWL_TIMEOUT_SECS: '{v}'")))?;
        }
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.target.url)?;
        Url::parse(&self.target.login_url)?;

        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.page_load_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.page_load_timeout_secs must be > 0",
            ));
        }
        if self.telegram.timeout_secs == 0 {
            return Err(AppError::validation("telegram.timeout_secs must be > 0"));
        }
        if self.state.path.trim().is_empty() {
            return Err(AppError::validation("state.path is empty"));
        }
        if !(-12..=14).contains(&self.alert.utc_offset_hours) {
            return Err(AppError::validation(
                "alert.utc_offset_hours must be within -12..=14",
            ));
        }
        self.extraction.validate()
    }
}

/// Parse a boolean flag the way shell-style environments spell them.
pub fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::validation(format!(
            "{key} must be a boolean flag, got '{other}'"
        ))),
    }
}

/// The watched page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Booking page with the availability calendar
    #[serde(default = "defaults::target_url")]
    pub url: String,

    /// Page visited first to obtain session cookies
    #[serde(default = "defaults::login_url")]
    pub login_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: defaults::target_url(),
            login_url: defaults::login_url(),
        }
    }
}

/// HTTP client and bounded wait settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Upper bound for the whole login + target acquisition
    #[serde(default = "defaults::page_load_timeout")]
    pub page_load_timeout_secs: u64,

    /// Pause after the login bootstrap request
    #[serde(default = "defaults::login_settle")]
    pub login_settle_ms: u64,

    /// Pause after the target request
    #[serde(default = "defaults::target_settle")]
    pub target_settle_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_load_timeout_secs: defaults::page_load_timeout(),
            login_settle_ms: defaults::login_settle(),
            target_settle_ms: defaults::target_settle(),
        }
    }
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Local file holding the last snapshot
    #[serde(default = "defaults::state_path")]
    pub path: String,

    /// Object storage location, used instead of `path` when built with `s3`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3StateConfig>,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: defaults::state_path(),
            s3: None,
        }
    }
}

/// Bucket and key of the persisted snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StateConfig {
    pub bucket: String,
    pub key: String,
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,

    /// Destination chat, channel or user id
    #[serde(default)]
    pub chat_id: String,

    #[serde(default = "defaults::telegram_api")]
    pub api_base: String,

    /// Upper bound for one sendMessage call
    #[serde(default = "defaults::telegram_timeout")]
    pub timeout_secs: u64,
}

impl TelegramConfig {
    /// Whether both token and chat id are present.
    pub fn has_credentials(&self) -> bool {
        !self.token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            chat_id: String::new(),
            api_base: defaults::telegram_api(),
            timeout_secs: defaults::telegram_timeout(),
        }
    }
}

/// Notification and failure policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Send only when at least one record is free
    #[serde(default = "defaults::enabled")]
    pub only_notify_when_free: bool,

    /// Report a failed run as a fatal error
    #[serde(default = "defaults::enabled")]
    pub fail_on_error: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            only_notify_when_free: true,
            fail_on_error: true,
        }
    }
}

/// Locations of operator-facing artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default = "defaults::html_path")]
    pub html_path: String,

    #[serde(default = "defaults::screenshot_path")]
    pub screenshot_path: String,

    /// Keep the last fetched page even when the run succeeds
    #[serde(default = "defaults::enabled")]
    pub save_page_on_success: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            html_path: defaults::html_path(),
            screenshot_path: defaults::screenshot_path(),
            save_page_on_success: true,
        }
    }
}

/// Alert wording and time zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Headline of the alert
    #[serde(default = "defaults::alert_title")]
    pub title: String,

    /// Text before the booking link
    #[serde(default = "defaults::link_prefix")]
    pub link_prefix: String,

    /// Anchor text of the booking link
    #[serde(default = "defaults::link_text")]
    pub link_text: String,

    /// Body used when no record is free
    #[serde(default = "defaults::no_free_text")]
    pub no_free_text: String,

    /// Label shown for a free record with a blank date
    #[serde(default = "defaults::fallback_label")]
    pub fallback_label: String,

    /// Offset from UTC for the alert timestamp
    #[serde(default = "defaults::utc_offset")]
    pub utc_offset_hours: i32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            title: defaults::alert_title(),
            link_prefix: defaults::link_prefix(),
            link_text: defaults::link_text(),
            no_free_text: defaults::no_free_text(),
            fallback_label: defaults::fallback_label(),
            utc_offset_hours: defaults::utc_offset(),
        }
    }
}

/// How the page-level fallback labels its single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Empty label
    #[default]
    Page,
    /// The first visible line carrying a positive keyword
    Line,
}

/// Selectors and keyword sets driving record extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Containers representing one day or slot, in priority order
    #[serde(default = "defaults::card_selectors")]
    pub card_selectors: Vec<String>,

    /// Dedicated date element inside a card
    #[serde(default = "defaults::date_selector")]
    pub date_selector: String,

    /// Dedicated time element inside a card
    #[serde(default = "defaults::time_selector")]
    pub time_selector: String,

    /// Dedicated status element inside a card
    #[serde(default = "defaults::status_selector")]
    pub status_selector: String,

    /// Clickable controls inside a card
    #[serde(default = "defaults::action_selector")]
    pub action_selector: String,

    /// Phrases signalling capacity (case-insensitive)
    #[serde(default = "defaults::positive_keywords")]
    pub positive_keywords: Vec<String>,

    /// Phrases signalling no capacity; checked before positives
    #[serde(default = "defaults::negative_keywords")]
    pub negative_keywords: Vec<String>,

    /// Class tokens marking a card as free
    #[serde(default = "defaults::free_classes")]
    pub free_classes: Vec<String>,

    /// Status phrases removed from date labels, longest first
    #[serde(default = "defaults::strip_markers")]
    pub strip_markers: Vec<String>,

    #[serde(default)]
    pub fallback_mode: FallbackMode,
}

impl ExtractionConfig {
    /// Check that every selector parses and the keyword sets are usable.
    pub fn validate(&self) -> Result<()> {
        if self.card_selectors.iter().all(|s| s.trim().is_empty()) {
            return Err(AppError::validation("extraction.card_selectors is empty"));
        }
        if self.positive_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(AppError::validation(
                "extraction.positive_keywords is empty",
            ));
        }
        let subs = [
            &self.date_selector,
            &self.time_selector,
            &self.status_selector,
            &self.action_selector,
        ];
        for s in self.card_selectors.iter().chain(subs) {
            if s.trim().is_empty() {
                continue;
            }
            Selector::parse(s).map_err(|e| AppError::selector(s.as_str(), format!("{e:?}")))?;
        }
        Ok(())
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            card_selectors: defaults::card_selectors(),
            date_selector: defaults::date_selector(),
            time_selector: defaults::time_selector(),
            status_selector: defaults::status_selector(),
            action_selector: defaults::action_selector(),
            positive_keywords: defaults::positive_keywords(),
            negative_keywords: defaults::negative_keywords(),
            free_classes: defaults::free_classes(),
            strip_markers: defaults::strip_markers(),
            fallback_mode: FallbackMode::Page,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Write the log stream to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            file: None,
        }
    }
}

mod defaults {
    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    pub fn enabled() -> bool {
        true
    }

    // Target defaults
    pub fn target_url() -> String {
        "https://f-okno.ru/base/moscovskaya_oblast/sizo11noginsk".into()
    }
    pub fn login_url() -> String {
        "https://f-okno.ru/login?request_uri=%2Fbase%2Fmoscovskaya_oblast%2Fsizo11noginsk".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; slotwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_load_timeout() -> u64 {
        60
    }
    pub fn login_settle() -> u64 {
        1500
    }
    pub fn target_settle() -> u64 {
        1000
    }

    pub fn state_path() -> String {
        "state.json".into()
    }

    pub fn telegram_api() -> String {
        "https://api.telegram.org".into()
    }
    pub fn telegram_timeout() -> u64 {
        20
    }

    pub fn html_path() -> String {
        "page.html".into()
    }
    pub fn screenshot_path() -> String {
        "page.png".into()
    }

    // Alert defaults
    pub fn alert_title() -> String {
        "Появились свободные слоты!".into()
    }
    pub fn link_prefix() -> String {
        "Записаться тут:".into()
    }
    pub fn link_text() -> String {
        "страница записи".into()
    }
    pub fn no_free_text() -> String {
        "Свободных дат нет.".into()
    }
    pub fn fallback_label() -> String {
        "Свободно".into()
    }
    pub fn utc_offset() -> i32 {
        3
    }

    // Extraction defaults
    pub fn card_selectors() -> Vec<String> {
        strings(&[
            ".day",
            ".calendar-day",
            ".slot",
            ".slots-list .slot",
            ".calendar .day",
        ])
    }
    pub fn date_selector() -> String {
        ".date, .day-date, .calendar-day__date".into()
    }
    pub fn time_selector() -> String {
        ".time, .slot-time".into()
    }
    pub fn status_selector() -> String {
        ".status, .slot-status".into()
    }
    pub fn action_selector() -> String {
        "a, button, input[type=submit], input[type=button]".into()
    }
    pub fn positive_keywords() -> Vec<String> {
        strings(&[
            "Есть места",
            "Записаться",
            "Свободн",
            "available",
            "book now",
            "has capacity",
        ])
    }
    pub fn negative_keywords() -> Vec<String> {
        strings(&[
            "Свободных мест нет",
            "мест нет",
            "Нет мест",
            "unavailable",
            "fully booked",
            "no capacity",
        ])
    }
    pub fn free_classes() -> Vec<String> {
        strings(&["green", "free", "available", "is-free"])
    }
    pub fn strip_markers() -> Vec<String> {
        strings(&["Есть места", "Свободных мест нет", "мест нет", "Записаться"])
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
