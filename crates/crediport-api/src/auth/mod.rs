//! Authentication: token issuance, validation, and role checks.

pub mod credentials;
pub mod jwt;
pub mod middleware;
pub mod models;

use crediport_core::{AppError, Role};

pub use credentials::CredentialStore;
pub use jwt::JwtService;
pub use models::{AuthContext, Claims, ClientIp, LoginRequest, TokenResponse};

/// Strict role check used to gate privileged routes.
pub fn require_role(context: &AuthContext, role: Role) -> Result<(), AppError> {
    if context.role == role {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "This route requires the {} role",
            role
        )))
    }
}
