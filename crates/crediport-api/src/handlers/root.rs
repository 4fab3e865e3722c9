use axum::Json;

/// Service banner with the endpoint map.
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Credit report PDF generation API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/token": "POST - Issue a bearer token",
            "/generate-pdf": "POST - Generate a report PDF by DNI",
            "/generate-and-download-pdf": "POST - Generate and stream the PDF",
            "/download/{filename}": "GET - Download a generated PDF",
            "/list-pdfs": "GET - List available PDFs",
            "/cleanup-pdfs": "DELETE - Evict expired PDFs (admin)",
            "/docs": "GET - API documentation"
        }
    }))
}

/// Liveness probe - process is running.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "alive" }))
}
