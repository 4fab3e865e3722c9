//! Application state shared across handlers.

use std::sync::Arc;

use crediport_core::Config;
use crediport_store::ArtifactStore;

use crate::auth::{CredentialStore, JwtService};
use crate::orchestrator::RenderJobOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<ArtifactStore>,
    pub orchestrator: Arc<RenderJobOrchestrator>,
    pub jwt: Arc<JwtService>,
    pub credentials: Arc<CredentialStore>,
}
