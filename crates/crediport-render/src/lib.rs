//! Browser-driven capabilities: report-page retrieval and PDF rendering.
//!
//! The traits in [`traits`] are the seams the rest of the workspace depends
//! on; [`chromium`] holds the production headless-browser implementations.

mod chromium;
mod document;
mod traits;

pub use chromium::{ChromiumFetcher, ChromiumRenderer};
pub use document::ReportDocument;
pub use traits::{FetchError, PdfRenderer, RenderError, ReportFetcher};
