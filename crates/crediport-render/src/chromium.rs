//! Headless-Chromium implementations of the fetch and render capabilities.
//!
//! Each invocation spawns a fresh browser process with `kill_on_drop`, so a
//! timed-out session is forcibly terminated when the future is dropped and
//! never leaks past the hard timeout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::document::ReportDocument;
use crate::traits::{FetchError, PdfRenderer, RenderError, ReportFetcher};

/// Marker the portal renders for settled credits.
const SETTLED_MARKER: &str = "CANCELADO";

fn validate_binary_path(path: &str) -> Result<(), String> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err("Browser path contains dangerous characters".to_string());
    }
    Ok(())
}

/// Fetches the report page for a DNI by loading the portal URL in headless
/// Chromium and dumping the resulting DOM.
pub struct ChromiumFetcher {
    chromium_path: String,
    report_url_template: String,
    timeout: Duration,
}

impl ChromiumFetcher {
    pub fn new(
        chromium_path: impl Into<String>,
        report_url_template: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let chromium_path = chromium_path.into();
        validate_binary_path(&chromium_path).map_err(FetchError::Navigation)?;
        Ok(Self {
            chromium_path,
            report_url_template: report_url_template.into(),
            timeout,
        })
    }

    fn report_url(&self, dni: &str) -> String {
        self.report_url_template.replace("{dni}", dni)
    }
}

#[async_trait]
impl ReportFetcher for ChromiumFetcher {
    async fn fetch(&self, dni: &str) -> Result<ReportDocument, FetchError> {
        let url = self.report_url(dni);
        let start = std::time::Instant::now();

        let child = Command::new(&self.chromium_path)
            .args([
                "--headless",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--incognito",
                "--dump-dom",
                &url,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // On timeout the child handle is dropped and the browser killed.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Navigation(format!(
                "Browser exited with {}: {}",
                output.status, stderr
            )));
        }

        let html = String::from_utf8_lossy(&output.stdout).into_owned();
        let document = ReportDocument::new(html);

        if document.is_empty() {
            return Err(FetchError::SubjectNotFound);
        }
        if document.html.contains(SETTLED_MARKER) {
            return Err(FetchError::CreditSettled);
        }

        tracing::debug!(
            dni = %dni,
            html_bytes = document.html.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Report page fetched"
        );

        Ok(document)
    }
}

/// Renders a document to PDF via Chromium's `--print-to-pdf`.
pub struct ChromiumRenderer {
    chromium_path: String,
    timeout: Duration,
}

impl ChromiumRenderer {
    pub fn new(chromium_path: impl Into<String>, timeout: Duration) -> Result<Self, RenderError> {
        let chromium_path = chromium_path.into();
        validate_binary_path(&chromium_path).map_err(RenderError::Failed)?;
        Ok(Self {
            chromium_path,
            timeout,
        })
    }
}

#[async_trait]
impl PdfRenderer for ChromiumRenderer {
    async fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
        let workdir = tempfile::tempdir()?;
        let html_path = workdir.path().join("reporte.html");
        let pdf_path = workdir.path().join("reporte.pdf");

        tokio::fs::write(&html_path, &document.html).await?;

        let pdf_arg = format!("--print-to-pdf={}", pdf_path.display());
        let url = format!("file://{}", html_path.display());
        let start = std::time::Instant::now();

        let child = Command::new(&self.chromium_path)
            .args([
                "--headless",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                &pdf_arg,
                &url,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Failed(format!(
                "Browser exited with {}: {}",
                output.status, stderr
            )));
        }

        let bytes = tokio::fs::read(&pdf_path)
            .await
            .map_err(|e| RenderError::Failed(format!("PDF output missing: {}", e)))?;

        if bytes.is_empty() {
            return Err(RenderError::Failed("Renderer produced no output".to_string()));
        }

        tracing::debug!(
            pdf_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Document rendered to PDF"
        );

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_rejects_dangerous_binary_path() {
        let result = ChromiumFetcher::new(
            "chromium; rm -rf /",
            "https://portal.example/report/{dni}",
            Duration::from_secs(30),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_renderer_rejects_dangerous_binary_path() {
        assert!(ChromiumRenderer::new("chromium|cat", Duration::from_secs(30)).is_err());
    }

    #[test]
    fn test_report_url_substitution() {
        let fetcher = ChromiumFetcher::new(
            "chromium",
            "https://portal.example/report/{dni}?_cp=1",
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(
            fetcher.report_url("12345678"),
            "https://portal.example/report/12345678?_cp=1"
        );
    }
}
