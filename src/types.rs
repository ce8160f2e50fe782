use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ApiError;

pub type CollectionName = String;

/// A wrapper around `uuid::Uuid` used as the storage-level document identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// # Errors
    /// Returns `ApiError::InvalidDocumentId` if the string is not a valid UUID.
    pub fn parse_str(s: &str) -> Result<Self, ApiError> {
        Uuid::parse_str(s).map(Self).map_err(|_| ApiError::InvalidDocumentId(s.to_string()))
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
