//! Security audit logging
//!
//! Provides structured audit logging for security-relevant events including:
//! - Token issuance
//! - Authentication failures
//! - Rate limit violations
//! - Artifact generation/download/eviction
//!
//! Entries are fire-and-forget tracing events on the `audit` target; a failing
//! log sink never blocks or fails the request being handled.

use serde::Serialize;

/// Audit event types for categorization
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Bearer token issued
    TokenIssued,
    /// Authentication failure (bad credentials or bad/expired token)
    AuthenticationFailure,
    /// Rate limit exceeded
    RateLimitExceeded,
    /// Report artifact generated
    ArtifactGenerated,
    /// Report artifact downloaded
    ArtifactDownloaded,
    /// Artifacts evicted by cleanup
    ArtifactsEvicted,
}

/// Structured audit log entry
#[derive(Debug, Serialize)]
pub struct AuditLogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: AuditEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Event details (JSON object)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuditLogEntry {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            username: None,
            client_ip: None,
            user_agent: None,
            route: None,
            details: None,
            success: true,
            error_message: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<Option<String>>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_client_ip(mut self, client_ip: impl Into<Option<String>>) -> Self {
        self.client_ip = client_ip.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<Option<String>>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_route(mut self, route: impl Into<Option<String>>) -> Self {
        self.route = route.into();
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_failure(mut self, error_message: String) -> Self {
        self.success = false;
        self.error_message = Some(error_message);
        self
    }

    /// Log the audit entry
    ///
    /// Uses structured logging with the `audit` target for easy filtering
    pub fn log(&self) {
        // Log as JSON for structured logging (useful for log aggregation systems)
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());

        if self.success {
            tracing::event!(
                target: "audit",
                tracing::Level::INFO,
                audit_entry = %json,
                event_type = ?self.event_type,
                username = ?self.username,
                success = self.success,
                "Security audit log"
            );
        } else {
            tracing::event!(
                target: "audit",
                tracing::Level::WARN,
                audit_entry = %json,
                event_type = ?self.event_type,
                username = ?self.username,
                success = self.success,
                error = ?self.error_message,
                "Security audit log - failure"
            );
        }
    }
}

// Helper functions for common audit events

/// Log a successful token issuance
pub fn log_token_issued(username: String, client_ip: String, user_agent: Option<String>) {
    AuditLogEntry::new(AuditEventType::TokenIssued)
        .with_username(Some(username))
        .with_client_ip(Some(client_ip))
        .with_user_agent(user_agent)
        .log();
}

/// Log an authentication failure (credentials or token validation)
pub fn log_auth_failure(
    client_ip: String,
    user_agent: Option<String>,
    route: String,
    reason: String,
) {
    AuditLogEntry::new(AuditEventType::AuthenticationFailure)
        .with_client_ip(Some(client_ip))
        .with_user_agent(user_agent)
        .with_route(Some(route))
        .with_failure(reason)
        .log();
}

/// Log a rate limit violation
pub fn log_rate_limit_exceeded(
    username: Option<String>,
    client_ip: Option<String>,
    route: String,
    limit: u32,
) {
    AuditLogEntry::new(AuditEventType::RateLimitExceeded)
        .with_username(username)
        .with_client_ip(client_ip)
        .with_route(Some(route))
        .with_details(serde_json::json!({ "rate_limit": limit }))
        .with_failure("Rate limit exceeded".to_string())
        .log();
}

/// Log a generated artifact
pub fn log_artifact_generated(username: String, filename: String, size_bytes: u64) {
    AuditLogEntry::new(AuditEventType::ArtifactGenerated)
        .with_username(Some(username))
        .with_details(serde_json::json!({
            "filename": filename,
            "size_bytes": size_bytes,
        }))
        .log();
}

/// Log an artifact download
pub fn log_artifact_downloaded(username: String, filename: String, client_ip: Option<String>) {
    AuditLogEntry::new(AuditEventType::ArtifactDownloaded)
        .with_username(Some(username))
        .with_client_ip(client_ip)
        .with_details(serde_json::json!({ "filename": filename }))
        .log();
}

/// Log an eviction sweep
pub fn log_artifacts_evicted(username: Option<String>, deleted: &[String]) {
    AuditLogEntry::new(AuditEventType::ArtifactsEvicted)
        .with_username(username)
        .with_details(serde_json::json!({
            "deleted_count": deleted.len(),
            "deleted_files": deleted,
        }))
        .log();
}
