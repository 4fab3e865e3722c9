//! Fake fetch/render capabilities injected in place of the real browser.

use async_trait::async_trait;
use crediport_render::{FetchError, PdfRenderer, RenderError, ReportDocument, ReportFetcher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts fetch invocations and optionally delays, to observe job sharing.
pub struct CountingFetcher {
    pub calls: Arc<AtomicUsize>,
    pub delay: Duration,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportFetcher for CountingFetcher {
    async fn fetch(&self, dni: &str) -> Result<ReportDocument, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(ReportDocument::new(format!(
            "<html><body>report for {}</body></html>",
            dni
        )))
    }
}

/// Always fails at the portal.
pub struct FailingFetcher;

#[async_trait]
impl ReportFetcher for FailingFetcher {
    async fn fetch(&self, _dni: &str) -> Result<ReportDocument, FetchError> {
        Err(FetchError::Navigation("portal login failed".to_string()))
    }
}

/// Produces a minimal PDF payload.
pub struct PdfStubRenderer;

#[async_trait]
impl PdfRenderer for PdfStubRenderer {
    async fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.extend_from_slice(document.html.as_bytes());
        Ok(bytes)
    }
}

/// Always fails mid-render.
pub struct FailingRenderer;

#[async_trait]
impl PdfRenderer for FailingRenderer {
    async fn render(&self, _document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Failed("conversion crashed".to_string()))
    }
}
