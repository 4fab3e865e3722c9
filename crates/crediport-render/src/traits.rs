//! Capability traits for the two external browser-driven steps.
//!
//! The orchestrator depends on these seams only; production implementations
//! drive a headless browser, test implementations are plain fakes.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::document::ReportDocument;

/// Fetch errors (page retrieval stage)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Portal navigation failed: {0}")]
    Navigation(String),

    #[error("No credit record found for the requested subject")]
    SubjectNotFound,

    #[error("Credit is already settled for the requested subject")]
    CreditSettled,

    #[error("Browser timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Render errors (document-to-PDF stage)
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Renderer failed: {0}")]
    Failed(String),

    #[error("Renderer timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Retrieves the renderable credit-report document for a normalized DNI.
#[async_trait]
pub trait ReportFetcher: Send + Sync {
    async fn fetch(&self, dni: &str) -> Result<ReportDocument, FetchError>;
}

/// Renders a fetched document to PDF bytes.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, RenderError>;
}
