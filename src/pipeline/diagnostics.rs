//! Best-effort diagnostic artifacts.
//!
//! Nothing in here may fail a run: write errors are logged and dropped.

use std::path::{Path, PathBuf};

use crate::models::DiagnosticsConfig;
use crate::services::PageSource;

/// Writes the last page (and a screenshot, if available) for operators.
#[derive(Debug, Clone)]
pub struct DiagnosticsWriter {
    html_path: PathBuf,
    screenshot_path: PathBuf,
}

impl DiagnosticsWriter {
    pub fn new(html_path: impl Into<PathBuf>, screenshot_path: impl Into<PathBuf>) -> Self {
        Self {
            html_path: html_path.into(),
            screenshot_path: screenshot_path.into(),
        }
    }

    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        Self::new(&config.html_path, &config.screenshot_path)
    }

    /// Save markup to the HTML artifact path.
    pub async fn save_page(&self, markup: &str) -> bool {
        write_artifact(&self.html_path, markup.as_bytes()).await
    }

    /// Capture whatever the source can still provide after a failure.
    pub async fn capture(&self, source: &dyn PageSource) {
        match source.last_markup() {
            Some(markup) => {
                if self.save_page(&markup).await {
                    log::info!("Saved last page to {}", self.html_path.display());
                }
            }
            None => log::info!("No markup received before the failure"),
        }

        if let Some(png) = source.screenshot().await {
            if write_artifact(&self.screenshot_path, &png).await {
                log::info!("Saved screenshot to {}", self.screenshot_path.display());
            }
        }
    }
}

async fn write_artifact(path: &Path, bytes: &[u8]) -> bool {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            log::warn!("Cannot create {}: {}", parent.display(), e);
            return false;
        }
    }
    match tokio::fs::write(path, bytes).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Cannot write {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::error::{AppError, Result};

    struct Broken {
        markup: Option<String>,
        png: Option<Vec<u8>>,
    }

    #[async_trait]
    impl PageSource for Broken {
        async fn fetch(&self) -> Result<String> {
            Err(AppError::acquisition("https://example.com", "boom"))
        }

        fn last_markup(&self) -> Option<String> {
            self.markup.clone()
        }

        async fn screenshot(&self) -> Option<Vec<u8>> {
            self.png.clone()
        }
    }

    #[tokio::test]
    async fn test_capture_writes_both_artifacts() {
        let tmp = TempDir::new().unwrap();
        let writer = DiagnosticsWriter::new(
            tmp.path().join("out/page.html"),
            tmp.path().join("out/page.png"),
        );
        let source = Broken {
            markup: Some("<html>login</html>".into()),
            png: Some(vec![0x89, b'P', b'N', b'G']),
        };

        writer.capture(&source).await;

        let html = std::fs::read_to_string(tmp.path().join("out/page.html")).unwrap();
        assert_eq!(html, "<html>login</html>");
        assert_eq!(
            std::fs::read(tmp.path().join("out/page.png")).unwrap(),
            vec![0x89, b'P', b'N', b'G']
        );
    }

    #[tokio::test]
    async fn test_capture_with_nothing_is_quiet() {
        let tmp = TempDir::new().unwrap();
        let writer = DiagnosticsWriter::new(tmp.path().join("page.html"), tmp.path().join("page.png"));
        writer
            .capture(&Broken {
                markup: None,
                png: None,
            })
            .await;
        assert!(!tmp.path().join("page.html").exists());
        assert!(!tmp.path().join("page.png").exists());
    }

    #[tokio::test]
    async fn test_unwritable_path_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let writer = DiagnosticsWriter::new(blocker.join("page.html"), blocker.join("page.png"));
        assert!(!writer.save_page("<html></html>").await);
    }
}
