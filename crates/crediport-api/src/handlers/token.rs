use crate::auth::models::{LoginRequest, TokenResponse};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::middleware::audit;
use crate::state::AppState;
use crate::utils::ip::extract_client_ip;
use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/token",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Too many login attempts", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "issue_token"))]
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, HttpAppError> {
    let client_ip = extract_client_ip(&headers, None);
    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let account = state
        .credentials
        .verify(&request.username, &request.password)
        .map_err(|e| {
            audit::log_auth_failure(
                client_ip.clone(),
                user_agent.clone(),
                "POST /token".to_string(),
                format!("Credential check failed for {}", request.username),
            );
            HttpAppError(e)
        })?;

    let issued = state.jwt.issue(&account.username, account.role)?;

    audit::log_token_issued(account.username.clone(), client_ip, user_agent);

    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "bearer".to_string(),
        expires_in: issued.expires_in_secs,
    }))
}
