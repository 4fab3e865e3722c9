use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct PdfInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub download_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse {
    pub total_pdfs: usize,
    pub pdfs: Vec<PdfInfo>,
}

#[utoipa::path(
    get,
    path = "/list-pdfs",
    tag = "reports",
    responses(
        (status = 200, description = "Available artifacts, newest first", body = ListResponse)
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(username = %auth.username, operation = "list_pdfs"))]
pub async fn list_pdfs(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<Json<ListResponse>, HttpAppError> {
    let artifacts = state.store.list().await.map_err(HttpAppError::from)?;

    let pdfs: Vec<PdfInfo> = artifacts
        .into_iter()
        .map(|a| PdfInfo {
            download_url: format!("/download/{}", a.filename),
            filename: a.filename,
            size_bytes: a.size_bytes,
            created_at: a.created_at,
        })
        .collect();

    Ok(Json(ListResponse {
        total_pdfs: pdfs.len(),
        pdfs,
    }))
}
