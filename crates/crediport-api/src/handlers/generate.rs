use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::middleware::audit;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
    Json,
};
use crediport_core::AppError;
use crediport_store::ArtifactKey;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DniRequest {
    pub dni: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateResponse {
    pub message: String,
    pub filename: String,
    pub size_bytes: u64,
    pub download_url: String,
}

#[utoipa::path(
    post,
    path = "/generate-pdf",
    tag = "reports",
    request_body = DniRequest,
    responses(
        (status = 200, description = "Report generated", body = GenerateResponse),
        (status = 400, description = "Invalid DNI", body = ErrorResponse),
        (status = 502, description = "Upstream fetch or render failure", body = ErrorResponse),
        (status = 503, description = "Render queue full", body = ErrorResponse),
        (status = 504, description = "Upstream timeout", body = ErrorResponse)
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(username = %auth.username, operation = "generate_pdf"))]
pub async fn generate_pdf(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<DniRequest>,
) -> Result<Json<GenerateResponse>, HttpAppError> {
    let artifact = state.orchestrator.generate(&request.dni).await?;

    audit::log_artifact_generated(
        auth.username.clone(),
        artifact.filename.clone(),
        artifact.size_bytes,
    );

    Ok(Json(GenerateResponse {
        message: "Report generated successfully".to_string(),
        download_url: format!("/download/{}", artifact.filename),
        filename: artifact.filename,
        size_bytes: artifact.size_bytes,
    }))
}

#[utoipa::path(
    post,
    path = "/generate-and-download-pdf",
    tag = "reports",
    request_body = DniRequest,
    responses(
        (status = 200, description = "Generated PDF bytes", content_type = "application/pdf"),
        (status = 400, description = "Invalid DNI", body = ErrorResponse),
        (status = 502, description = "Upstream fetch or render failure", body = ErrorResponse)
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(username = %auth.username, operation = "generate_and_download_pdf"))]
pub async fn generate_and_download_pdf(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    ValidatedJson(request): ValidatedJson<DniRequest>,
) -> Result<Response, HttpAppError> {
    let artifact = state.orchestrator.generate(&request.dni).await?;

    audit::log_artifact_generated(
        auth.username.clone(),
        artifact.filename.clone(),
        artifact.size_bytes,
    );

    // The artifact was just written under this key; re-derive it for streaming.
    let key = ArtifactKey::from_filename(&artifact.filename).map_err(HttpAppError::from)?;
    let (_, stream) = state.store.read_stream(&key).await.map_err(HttpAppError::from)?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Artifact stream error: {}", e)))
    });

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
