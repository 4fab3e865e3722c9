use crate::auth::models::{AuthContext, ClientIp};
use crate::error::{ErrorResponse, HttpAppError};
use crate::middleware::audit;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Extension, Path, State},
    http::{header, StatusCode},
    response::Response,
};
use crediport_core::AppError;
use crediport_store::ArtifactKey;
use futures::StreamExt;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "reports",
    params(
        ("filename" = String, Path, description = "Artifact filename (reporte_<dni>.pdf)")
    ),
    responses(
        (status = 200, description = "Artifact bytes", content_type = "application/pdf"),
        (status = 400, description = "Filename outside the allow-list", body = ErrorResponse),
        (status = 404, description = "Artifact not found", body = ErrorResponse)
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(username = %auth.username, filename = %filename, operation = "download_pdf"))]
pub async fn download_pdf(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Extension(client_ip): Extension<ClientIp>,
    Path(filename): Path<String>,
) -> Result<Response, HttpAppError> {
    // The presented filename is parsed back into a key and the path re-derived
    // from it; the raw string never reaches the filesystem.
    let key = ArtifactKey::from_filename(&filename).map_err(HttpAppError::from)?;

    let (artifact, stream) = state.store.read_stream(&key).await.map_err(HttpAppError::from)?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Artifact stream error: {}", e)))
    });

    audit::log_artifact_downloaded(
        auth.username.clone(),
        artifact.filename.clone(),
        Some(client_ip.0),
    );

    let content_disposition = format!("attachment; filename=\"{}\"", artifact.filename);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(header::CONTENT_LENGTH, artifact.size_bytes)
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
