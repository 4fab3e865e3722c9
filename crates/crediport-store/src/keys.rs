//! Artifact keys: the only path from caller input into the filename space.
//!
//! A key is produced either by normalizing a DNI or by parsing a filename that
//! the store itself enumerated. The mapping to a filesystem path is
//! one-directional: callers never hand the store a raw path, so traversal is
//! impossible by construction rather than by blacklist filtering.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::StoreError;

/// Number of digits in a DNI after normalization.
const KEY_DIGITS: usize = 8;

const FILE_PREFIX: &str = "reporte_";
const FILE_EXTENSION: &str = ".pdf";

/// A validated artifact key: exactly eight ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Normalize a DNI into a key. Common separator characters (spaces, dots,
    /// hyphens) are stripped; the remainder must be exactly eight digits.
    pub fn from_dni(dni: &str) -> Result<Self, StoreError> {
        let digits: String = dni
            .chars()
            .filter(|c| !matches!(c, ' ' | '.' | '-'))
            .collect();

        if digits.len() != KEY_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StoreError::InvalidDni(format!(
                "DNI must normalize to exactly {} digits",
                KEY_DIGITS
            )));
        }

        Ok(ArtifactKey(digits))
    }

    /// Parse an artifact filename back into its key. Only names of the exact
    /// form `reporte_<8 digits>.pdf` are accepted; anything else (separators,
    /// parent references, stray characters) is rejected before any filesystem
    /// operation.
    pub fn from_filename(filename: &str) -> Result<Self, StoreError> {
        let key = filename
            .strip_prefix(FILE_PREFIX)
            .and_then(|rest| rest.strip_suffix(FILE_EXTENSION))
            .filter(|k| k.len() == KEY_DIGITS && k.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| {
                StoreError::InvalidFilename(format!(
                    "Filename must match {}<dni>{}",
                    FILE_PREFIX, FILE_EXTENSION
                ))
            })?;
        Ok(ArtifactKey(key.to_string()))
    }

    /// The canonical artifact filename for this key.
    pub fn filename(&self) -> String {
        format!("{}{}{}", FILE_PREFIX, self.0, FILE_EXTENSION)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ArtifactKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}
