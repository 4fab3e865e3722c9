//! Credential verification against the configuration-sourced account table.
//!
//! Passwords are Argon2 PHC hashes. Unknown usernames still pay for one
//! verification against a fixed dummy hash so response timing does not leak
//! which usernames exist.

use std::collections::HashMap;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use crediport_core::{AppError, UserAccount};
use rand_core::OsRng;

/// Argon2 hash of an unguessable throwaway password, verified against when the
/// username is unknown.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$q8jXliPhYZKjfNIvjffDyg$qAyoRW2U9craB0cr3bfdLAKEotO3Xg42O9M+w2eJvLw";

pub struct CredentialStore {
    accounts: HashMap<String, UserAccount>,
}

impl CredentialStore {
    pub fn new(accounts: Vec<UserAccount>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|a| (a.username.clone(), a))
                .collect(),
        }
    }

    /// Verify a username/password pair, returning the matched account.
    pub fn verify(&self, username: &str, password: &str) -> Result<&UserAccount, AppError> {
        let unauthorized = || AppError::Unauthorized("Invalid username or password".to_string());

        let Some(account) = self.accounts.get(username) else {
            // Equalize timing for unknown usernames.
            let _ = verify_against(DUMMY_HASH, password);
            return Err(unauthorized());
        };

        if verify_against(&account.password_hash, password)? {
            Ok(account)
        } else {
            Err(unauthorized())
        }
    }

    /// Hash a password for inclusion in the account table.
    pub fn hash_password(password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }
}

fn verify_against(hash: &str, password: &str) -> Result<bool, AppError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Bad stored hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
