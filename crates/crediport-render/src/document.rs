/// A renderable credit-report document as retrieved from the portal.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub html: String,
}

impl ReportDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty()
    }
}
