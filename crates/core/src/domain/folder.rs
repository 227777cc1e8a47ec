// Folder name value object
//
// A folder is always addressed relative to the library root. Anything that
// could escape the root is rejected before it reaches the filesystem.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use super::error::DomainError;

/// Maximum accepted folder name length (bytes)
pub const MAX_FOLDER_NAME_LEN: usize = 255;

/// Validated folder name relative to the library root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolderName(String);

impl FolderName {
    /// Parse a user-supplied folder name.
    ///
    /// Accepts nested names (`trips/2024`) but rejects blank names,
    /// absolute paths and any `.`/`..` component. Surrounding spaces are
    /// part of the name; only trailing slashes are dropped.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim_end_matches('/');

        if trimmed.trim().is_empty() {
            return Err(DomainError::InvalidFolderName(
                "folder name is empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_FOLDER_NAME_LEN {
            return Err(DomainError::InvalidFolderName(format!(
                "folder name too long ({} > {})",
                trimmed.len(),
                MAX_FOLDER_NAME_LEN
            )));
        }
        if trimmed.contains('\0') {
            return Err(DomainError::InvalidFolderName(
                "folder name contains a NUL byte".to_string(),
            ));
        }

        let escapes = Path::new(trimmed)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(DomainError::InvalidFolderName(format!(
                "'{}' must be a plain path below the library root",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl std::fmt::Display for FolderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FolderName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FolderName> for String {
    fn from(value: FolderName) -> Self {
        value.0
    }
}
