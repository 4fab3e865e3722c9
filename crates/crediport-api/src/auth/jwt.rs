//! HS256 JWT issuance and validation for bearer credentials.

use chrono::{Duration, Utc};
use crediport_core::{AppError, Role};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::models::Claims;

/// A freshly issued bearer token plus its lifetime.
pub struct IssuedToken {
    pub token: String,
    pub expires_in_secs: i64,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Issue a signed, time-bounded token for an authenticated identity.
    pub fn issue(&self, username: &str, role: Role) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_in_secs: self.ttl.num_seconds(),
        })
    }

    /// Validate a bearer token: signature, structure, and expiry (no leeway).
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::Unauthorized("Token has expired".to_string())
                    }
                    _ => AppError::Unauthorized("Invalid token".to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, Header};

    const SECRET: &str = "test-secret-test-secret-test-secret!";

    fn token_with_offsets(issued_offset_mins: i64, ttl_mins: i64) -> String {
        let iat = Utc::now().timestamp() + issued_offset_mins * 60;
        let claims = Claims {
            sub: "alice".to_string(),
            role: Role::User,
            iat,
            exp: iat + ttl_mins * 60,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_validate_roundtrip() {
        let service = JwtService::new(SECRET, 30);
        let issued = service.issue("alice", Role::Admin).unwrap();
        assert_eq!(issued.expires_in_secs, 30 * 60);

        let claims = service.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_valid_just_before_expiry() {
        // Issued 29 minutes ago with a 30 minute lifetime: still valid.
        let service = JwtService::new(SECRET, 30);
        let token = token_with_offsets(-29, 30);
        assert!(service.validate(&token).is_ok());
    }

    #[test]
    fn test_token_rejected_after_expiry() {
        // Issued 31 minutes ago with a 30 minute lifetime: expired.
        let service = JwtService::new(SECRET, 30);
        let token = token_with_offsets(-31, 30);
        let err = service.validate(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let service = JwtService::new(SECRET, 30);
        let issued = service.issue("alice", Role::User).unwrap();
        let mut tampered = issued.token.clone();
        tampered.pop();
        tampered.push('A');
        assert!(service.validate(&tampered).is_err());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let service = JwtService::new(SECRET, 30);
        let other = JwtService::new("another-secret-another-secret-yes!", 30);
        let issued = other.issue("alice", Role::User).unwrap();
        assert!(service.validate(&issued.token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = JwtService::new(SECRET, 30);
        assert!(service.validate("not-a-jwt").is_err());
        assert!(service.validate("").is_err());
    }
}
