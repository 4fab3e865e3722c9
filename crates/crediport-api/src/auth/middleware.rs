use crate::auth::jwt::JwtService;
use crate::auth::models::{AuthContext, ClientIp};
use crate::error::HttpAppError;
use crate::middleware::audit;
use crate::utils::ip::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use crediport_core::AppError;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<JwtService>,
}

/// Validates the bearer credential on every protected route and inserts the
/// caller's [`AuthContext`] (and [`ClientIp`]) into request extensions.
/// Every validation failure is reported to the audit log before rejecting.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let client_ip = extract_client_ip(request.headers(), socket_addr.as_ref());

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let route = format!("{} {}", request.method(), request.uri().path());

    let Some(auth_header) = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    else {
        return reject("Missing authorization header", client_ip, user_agent, route);
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return reject(
            "Invalid authorization header format",
            client_ip,
            user_agent,
            route,
        );
    };

    match auth_state.jwt.validate(token) {
        Ok(claims) => {
            let context = AuthContext {
                username: claims.sub,
                role: claims.role,
            };
            request.extensions_mut().insert(ClientIp(client_ip));
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => {
            let reason = match &e {
                AppError::Unauthorized(msg) => msg.clone(),
                other => other.to_string(),
            };
            reject(&reason, client_ip, user_agent, route)
        }
    }
}

fn reject(reason: &str, client_ip: String, user_agent: Option<String>, route: String) -> Response {
    audit::log_auth_failure(client_ip, user_agent, route, reason.to_string());
    HttpAppError(AppError::Unauthorized(reason.to_string())).into_response()
}
