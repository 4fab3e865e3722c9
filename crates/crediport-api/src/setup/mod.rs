//! Application assembly: wiring capabilities, state, and routes.

pub mod routes;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use crediport_core::Config;
use crediport_render::{ChromiumFetcher, ChromiumRenderer, PdfRenderer, ReportFetcher};
use crediport_store::ArtifactStore;

use crate::auth::{CredentialStore, JwtService};
use crate::middleware::audit;
use crate::orchestrator::RenderJobOrchestrator;
use crate::state::AppState;

/// Build the application with the production headless-browser capabilities.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    let fetcher = Arc::new(
        ChromiumFetcher::new(
            config.chromium_path.clone(),
            config.report_url.clone(),
            Duration::from_secs(config.scrape_timeout_secs),
        )
        .map_err(|e| anyhow::anyhow!("Failed to configure fetcher: {}", e))?,
    );
    let renderer = Arc::new(
        ChromiumRenderer::new(
            config.chromium_path.clone(),
            Duration::from_secs(config.render_timeout_secs),
        )
        .map_err(|e| anyhow::anyhow!("Failed to configure renderer: {}", e))?,
    );

    initialize_app_with(config, fetcher, renderer).await
}

/// Build the application with injected fetch/render capabilities. The seam
/// used by tests to substitute fakes for the real browser.
pub async fn initialize_app_with(
    config: Config,
    fetcher: Arc<dyn ReportFetcher>,
    renderer: Arc<dyn PdfRenderer>,
) -> Result<(Arc<AppState>, Router)> {
    let store = Arc::new(
        ArtifactStore::new(config.artifact_dir.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open artifact store: {}", e))?,
    );

    let orchestrator = Arc::new(RenderJobOrchestrator::new(
        store.clone(),
        fetcher,
        renderer,
        config.max_concurrent_renders,
        config.render_queue_capacity,
        Duration::from_secs(config.scrape_timeout_secs),
        Duration::from_secs(config.render_timeout_secs),
    ));

    let jwt = Arc::new(JwtService::new(
        &config.jwt_secret,
        config.token_ttl_minutes,
    ));
    let credentials = Arc::new(CredentialStore::new(config.accounts.clone()));

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        orchestrator,
        jwt,
        credentials,
    });

    spawn_eviction_sweep(&state);

    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}

/// Optional background eviction sweep. The cleanup route remains the explicit
/// trigger; this task only supplements it when configured.
fn spawn_eviction_sweep(state: &Arc<AppState>) {
    let interval_secs = state.config.cleanup_sweep_interval_secs;
    if interval_secs == 0 {
        return;
    }

    let store = state.store.clone();
    let max_age = Duration::from_secs(state.config.artifact_max_age_secs);

    tracing::info!(
        interval_secs,
        max_age_secs = max_age.as_secs(),
        "Background eviction sweep enabled"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.evict_older_than(max_age).await {
                Ok(deleted) if !deleted.is_empty() => {
                    audit::log_artifacts_evicted(None, &deleted);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Background eviction sweep failed");
                }
            }
        }
    });
}
