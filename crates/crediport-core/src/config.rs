//! Configuration module
//!
//! Configuration is sourced from environment variables (with `.env` support via
//! dotenvy) and parsed into an explicit struct with defaults. Secrets and the
//! account table are required; everything else has a documented default.

use std::env;
use std::path::PathBuf;

use crate::models::UserAccount;

// Common constants
const SERVER_PORT: u16 = 8000;
const TOKEN_TTL_MINUTES: i64 = 30;
const ARTIFACT_MAX_AGE_SECS: u64 = 3600;
const MAX_CONCURRENT_RENDERS: usize = 2;
const RENDER_QUEUE_CAPACITY: usize = 8;
const SCRAPE_TIMEOUT_SECS: u64 = 30;
const RENDER_TIMEOUT_SECS: u64 = 30;

/// A fixed-window request budget for one route class.
#[derive(Clone, Copy, Debug)]
pub struct RouteBudget {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RouteBudget {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }

    /// Parse a `max/window_secs` pair, e.g. `5/60`.
    fn parse(spec: &str) -> Option<Self> {
        let (max, window) = spec.split_once('/')?;
        Some(Self {
            max_requests: max.trim().parse().ok()?,
            window_secs: window.trim().parse().ok()?,
        })
    }

    fn from_env(var: &str, default: RouteBudget) -> Self {
        env::var(var)
            .ok()
            .and_then(|s| Self::parse(&s))
            .unwrap_or(default)
    }
}

/// Per-route-class request budgets.
#[derive(Clone, Copy, Debug)]
pub struct RouteBudgets {
    pub login: RouteBudget,
    pub generate: RouteBudget,
    pub download: RouteBudget,
    pub cleanup: RouteBudget,
}

impl Default for RouteBudgets {
    fn default() -> Self {
        Self {
            login: RouteBudget::new(5, 60),
            generate: RouteBudget::new(10, 60),
            download: RouteBudget::new(20, 60),
            cleanup: RouteBudget::new(2, 3600),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub accounts: Vec<UserAccount>,
    pub artifact_dir: PathBuf,
    pub artifact_max_age_secs: u64,
    /// Interval for the background eviction sweep. 0 = disabled; the cleanup
    /// route remains the explicit trigger either way.
    pub cleanup_sweep_interval_secs: u64,
    pub budgets: RouteBudgets,
    pub max_concurrent_renders: usize,
    pub render_queue_capacity: usize,
    pub scrape_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub chromium_path: String,
    /// Report page URL template; `{dni}` is replaced with the normalized key.
    pub report_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?;

        let accounts_spec = env::var("API_USERS").map_err(|_| {
            anyhow::anyhow!("API_USERS must be set (username:role:argon2-hash;...)")
        })?;
        let accounts = UserAccount::parse_table(&accounts_spec)
            .map_err(|e| anyhow::anyhow!("Failed to parse API_USERS: {}", e))?;

        let report_url = env::var("REPORT_URL")
            .map_err(|_| anyhow::anyhow!("REPORT_URL must be set (use {{dni}} as placeholder)"))?;

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            jwt_secret,
            token_ttl_minutes: parse_env("TOKEN_TTL_MINUTES", TOKEN_TTL_MINUTES),
            accounts,
            artifact_dir: PathBuf::from(
                env::var("ARTIFACT_DIR").unwrap_or_else(|_| "pdfs_generados".to_string()),
            ),
            artifact_max_age_secs: parse_env("ARTIFACT_MAX_AGE_SECS", ARTIFACT_MAX_AGE_SECS),
            cleanup_sweep_interval_secs: parse_env("CLEANUP_SWEEP_INTERVAL_SECS", 0),
            budgets: RouteBudgets {
                login: RouteBudget::from_env("RATE_LIMIT_LOGIN", RouteBudgets::default().login),
                generate: RouteBudget::from_env(
                    "RATE_LIMIT_GENERATE",
                    RouteBudgets::default().generate,
                ),
                download: RouteBudget::from_env(
                    "RATE_LIMIT_DOWNLOAD",
                    RouteBudgets::default().download,
                ),
                cleanup: RouteBudget::from_env(
                    "RATE_LIMIT_CLEANUP",
                    RouteBudgets::default().cleanup,
                ),
            },
            max_concurrent_renders: parse_env("MAX_CONCURRENT_RENDERS", MAX_CONCURRENT_RENDERS)
                .max(1),
            render_queue_capacity: parse_env("RENDER_QUEUE_CAPACITY", RENDER_QUEUE_CAPACITY),
            scrape_timeout_secs: parse_env("SCRAPE_TIMEOUT_SECS", SCRAPE_TIMEOUT_SECS),
            render_timeout_secs: parse_env("RENDER_TIMEOUT_SECS", RENDER_TIMEOUT_SECS),
            chromium_path: env::var("CHROMIUM_PATH").unwrap_or_else(|_| "chromium".to_string()),
            report_url,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.report_url.find("{dni}").is_none() {
            return Err(anyhow::anyhow!(
                "REPORT_URL must contain a {{dni}} placeholder"
            ));
        }
        if self.max_concurrent_renders < 1 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_RENDERS must be at least 1"));
        }
        if self.is_production() {
            if self.jwt_secret.len() < 32 {
                return Err(anyhow::anyhow!(
                    "JWT_SECRET must be at least 32 characters in production"
                ));
            }
            if self.cors_origins.iter().any(|o| o == "*") {
                return Err(anyhow::anyhow!(
                    "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
                ));
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr + Copy>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
