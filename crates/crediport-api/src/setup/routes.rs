//! Route configuration and setup.

use crate::api_doc;
use crate::auth::middleware::{auth_middleware, AuthState};
use crate::handlers;
use crate::middleware::{rate_limit_middleware, RateLimitState, RouteClass, RouteRateLimiter};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use crediport_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Request bodies are small JSON documents; anything larger is rejected.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let auth_state = Arc::new(AuthState {
        jwt: state.jwt.clone(),
    });
    let limiter = Arc::new(RouteRateLimiter::new(config.budgets));

    let rate_limited = |class: RouteClass| {
        axum::middleware::from_fn_with_state(
            RateLimitState {
                limiter: limiter.clone(),
                class,
            },
            rate_limit_middleware,
        )
    };
    let authenticated =
        || axum::middleware::from_fn_with_state(auth_state.clone(), auth_middleware);

    let login_routes = Router::new()
        .route("/token", post(handlers::token::issue_token))
        .route_layer(rate_limited(RouteClass::Login));

    // Layer order: the auth layer is added last so it runs first and the rate
    // limiter can key buckets on the authenticated username.
    let generate_routes = Router::new()
        .route("/generate-pdf", post(handlers::generate::generate_pdf))
        .route(
            "/generate-and-download-pdf",
            post(handlers::generate::generate_and_download_pdf),
        )
        .route_layer(rate_limited(RouteClass::Generate))
        .route_layer(authenticated());

    let download_routes = Router::new()
        .route("/download/{filename}", get(handlers::download::download_pdf))
        .route("/list-pdfs", get(handlers::list::list_pdfs))
        .route_layer(rate_limited(RouteClass::Download))
        .route_layer(authenticated());

    let cleanup_routes = Router::new()
        .route("/cleanup-pdfs", delete(handlers::cleanup::cleanup_pdfs))
        .route_layer(rate_limited(RouteClass::Cleanup))
        .route_layer(authenticated());

    let concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1024)
        .max(1);

    let app = Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health))
        .route(
            "/api/openapi.json",
            get(|| async { Json(api_doc::get_openapi_spec()) }),
        )
        .merge(login_routes)
        .merge(generate_routes)
        .merge(download_routes)
        .merge(cleanup_routes)
        .with_state(state);

    let app = app
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE];

    if config.cors_origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| anyhow::anyhow!("Invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any))
}
