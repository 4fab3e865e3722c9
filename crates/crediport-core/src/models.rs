//! Domain models shared across crates: roles and the account table.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// User role for authorization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(AppError::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// One entry of the credential table sourced from configuration.
///
/// Passwords are stored as Argon2 PHC hashes; the plain password never
/// appears in configuration or logs.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub username: String,
    pub role: Role,
    pub password_hash: String,
}

impl UserAccount {
    /// Parse an account table spec of the form
    /// `username:role:argon2-hash;username:role:argon2-hash;...`.
    ///
    /// Argon2 PHC strings use `$` as their internal separator, so `:` and `;`
    /// are safe delimiters here.
    pub fn parse_table(spec: &str) -> Result<Vec<UserAccount>, AppError> {
        let mut accounts = Vec::new();
        for entry in spec.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.splitn(3, ':');
            let (username, role, hash) = match (parts.next(), parts.next(), parts.next()) {
                (Some(u), Some(r), Some(h)) if !u.is_empty() && !h.is_empty() => (u, r, h),
                _ => {
                    return Err(AppError::InvalidInput(format!(
                        "Malformed account entry (expected username:role:hash): {}",
                        entry
                    )))
                }
            };
            accounts.push(UserAccount {
                username: username.to_string(),
                role: role.parse()?,
                password_hash: hash.to_string(),
            });
        }
        if accounts.is_empty() {
            return Err(AppError::InvalidInput(
                "Account table is empty".to_string(),
            ));
        }
        Ok(accounts)
    }
}
