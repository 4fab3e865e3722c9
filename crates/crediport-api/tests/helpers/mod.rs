#![allow(dead_code)]

pub mod fakes;

use std::path::PathBuf;
use std::sync::Arc;

use axum_test::TestServer;
use crediport_api::auth::CredentialStore;
use crediport_api::setup::initialize_app_with;
use crediport_api::state::AppState;
use crediport_core::{Config, Role, RouteBudget, RouteBudgets, UserAccount};
use crediport_render::{PdfRenderer, ReportFetcher};
use tempfile::TempDir;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password-for-tests";
pub const USER_USERNAME: &str = "ana";
pub const USER_PASSWORD: &str = "user-password-for-tests";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    _artifact_dir: TempDir,
}

/// Config with generous budgets and a temp artifact directory; individual
/// tests tighten the knobs they exercise.
pub fn test_config(artifact_dir: PathBuf) -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        jwt_secret: "integration-test-secret-0123456789abcdef".to_string(),
        token_ttl_minutes: 30,
        accounts: vec![
            UserAccount {
                username: ADMIN_USERNAME.to_string(),
                role: Role::Admin,
                password_hash: CredentialStore::hash_password(ADMIN_PASSWORD).unwrap(),
            },
            UserAccount {
                username: USER_USERNAME.to_string(),
                role: Role::User,
                password_hash: CredentialStore::hash_password(USER_PASSWORD).unwrap(),
            },
        ],
        artifact_dir,
        artifact_max_age_secs: 3600,
        cleanup_sweep_interval_secs: 0,
        budgets: RouteBudgets {
            login: RouteBudget::new(100, 60),
            generate: RouteBudget::new(100, 60),
            download: RouteBudget::new(100, 60),
            cleanup: RouteBudget::new(100, 60),
        },
        max_concurrent_renders: 4,
        render_queue_capacity: 8,
        scrape_timeout_secs: 5,
        render_timeout_secs: 5,
        chromium_path: "chromium".to_string(),
        report_url: "https://portal.example/report/{dni}".to_string(),
    }
}

pub async fn setup_test_app(
    fetcher: Arc<dyn ReportFetcher>,
    renderer: Arc<dyn PdfRenderer>,
) -> TestApp {
    setup_test_app_with(fetcher, renderer, |_| {}).await
}

pub async fn setup_test_app_with(
    fetcher: Arc<dyn ReportFetcher>,
    renderer: Arc<dyn PdfRenderer>,
    tweak: impl FnOnce(&mut Config),
) -> TestApp {
    let artifact_dir = tempfile::tempdir().expect("temp artifact dir");
    let mut config = test_config(artifact_dir.path().to_path_buf());
    tweak(&mut config);

    let (state, router) = initialize_app_with(config, fetcher, renderer)
        .await
        .expect("app setup");
    let server = TestServer::new(router).expect("test server");

    TestApp {
        server,
        state,
        _artifact_dir: artifact_dir,
    }
}

/// Issue a bearer token through the real login route.
pub async fn token_for(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/token")
        .json(&serde_json::json!({ "username": username, "password": password }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    body["access_token"]
        .as_str()
        .expect("access_token in response")
        .to_string()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
