use crate::auth::models::AuthContext;
use crate::auth::require_role;
use crate::error::{ErrorResponse, HttpAppError};
use crate::middleware::audit;
use crate::state::AppState;
use axum::{extract::State, Json};
use crediport_core::Role;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct CleanupResponse {
    pub message: String,
    pub deleted_files: Vec<String>,
}

#[utoipa::path(
    delete,
    path = "/cleanup-pdfs",
    tag = "reports",
    responses(
        (status = 200, description = "Eviction sweep completed", body = CleanupResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(username = %auth.username, operation = "cleanup_pdfs"))]
pub async fn cleanup_pdfs(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
) -> Result<Json<CleanupResponse>, HttpAppError> {
    require_role(&auth, Role::Admin)?;

    let max_age = Duration::from_secs(state.config.artifact_max_age_secs);
    let deleted = state
        .store
        .evict_older_than(max_age)
        .await
        .map_err(HttpAppError::from)?;

    audit::log_artifacts_evicted(Some(auth.username.clone()), &deleted);

    Ok(Json(CleanupResponse {
        message: format!("Cleanup completed, {} artifacts removed", deleted.len()),
        deleted_files: deleted,
    }))
}
