// src/services/page.rs

//! Page acquisition.
//!
//! A [`PageSource`] yields the raw markup of the watched page after whatever
//! session bootstrap the site needs. Sources remember the last markup they
//! received so failure diagnostics can be written even when a later step
//! fails.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::utils::http::create_async_client;

/// Source of the watched page's markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the current markup of the target page.
    async fn fetch(&self) -> Result<String>;

    /// The most recent markup received, if any.
    fn last_markup(&self) -> Option<String> {
        None
    }

    /// PNG capture of the rendered page, when the source can produce one.
    async fn screenshot(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Slot for the last received body.
#[derive(Debug, Default)]
struct LastBody(Mutex<Option<String>>);

impl LastBody {
    fn set(&self, body: &str) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(body.to_string());
        }
    }

    fn get(&self) -> Option<String> {
        self.0.lock().ok().and_then(|slot| slot.clone())
    }
}

/// Fetches the page over HTTP, visiting the login URL first for cookies.
pub struct HttpPageSource {
    client: Client,
    login_url: String,
    target_url: String,
    login_settle: Duration,
    target_settle: Duration,
    last: LastBody,
}

impl HttpPageSource {
    /// Create a source with a cookie-keeping client built from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: create_async_client(&config.crawler)?,
            login_url: config.target.login_url.clone(),
            target_url: config.target.url.clone(),
            login_settle: Duration::from_millis(config.crawler.login_settle_ms),
            target_settle: Duration::from_millis(config.crawler.target_settle_ms),
            last: LastBody::default(),
        })
    }

    async fn get(&self, url: &str) -> Result<(reqwest::StatusCode, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::acquisition(url, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::acquisition(url, e))?;
        self.last.set(&body);
        Ok((status, body))
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self) -> Result<String> {
        log::info!("Opening login page {}", self.login_url);
        let (status, _) = self.get(&self.login_url).await?;
        if !status.is_success() {
            log::warn!("Login page answered {}; continuing with target", status);
        }
        tokio::time::sleep(self.login_settle).await;

        log::info!("Opening target page {}", self.target_url);
        let (status, body) = self.get(&self.target_url).await?;
        if !status.is_success() {
            return Err(AppError::acquisition(
                &self.target_url,
                format!("HTTP {status}"),
            ));
        }
        tokio::time::sleep(self.target_settle).await;

        log::debug!("Fetched {} bytes of markup", body.len());
        Ok(body)
    }

    fn last_markup(&self) -> Option<String> {
        self.last.get()
    }
}

/// Replays a page saved on disk.
pub struct FilePageSource {
    path: PathBuf,
    last: LastBody,
}

impl FilePageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last: LastBody::default(),
        }
    }
}

#[async_trait]
impl PageSource for FilePageSource {
    async fn fetch(&self) -> Result<String> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::acquisition(self.path.display().to_string(), e))?;
        self.last.set(&body);
        Ok(body)
    }

    fn last_markup(&self) -> Option<String> {
        self.last.get()
    }
}
