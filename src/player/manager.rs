use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PlayerRecord;
use crate::document::{Document, FromValueTree, ToValueTree, ValueTree};
use crate::errors::PlayerStoreError;

/// Opaque identity handle assigned by the store on first insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageId(String);

impl StorageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ToValueTree for StorageId {
    fn to_value_tree(&self) -> ValueTree {
        ValueTree::Text(self.0.clone())
    }
}

impl FromValueTree for StorageId {
    const EXPECTED: &'static str = "text";

    fn from_value_tree(value: &ValueTree) -> Option<Self> {
        value.as_text().map(StorageId::new)
    }
}

/// Whether a record has been assigned a store identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Bound(StorageId),
}

/// A live connection for a player, as tracked by the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub unique_id: Uuid,
    pub username: String,
    pub address: Option<String>,
    pub connected_at: DateTime<Utc>,
}

impl SessionHandle {
    pub fn new(unique_id: Uuid, username: &str, address: Option<&str>) -> Self {
        Self {
            unique_id,
            username: username.to_string(),
            address: address.map(str::to_string),
            connected_at: Utc::now(),
        }
    }
}

/// The store-facing collaborator a [`PlayerRecord`] delegates its I/O to.
///
/// Implementations own connection lifecycle, retry policy and the guarantee
/// that at most one in-memory record exists per identity for concurrent callers.
pub trait PlayerManager: Send + Sync {
    /// The stored document for `unique_id`, if one exists.
    fn fetch_document(&self, unique_id: &Uuid) -> Result<Option<Document>, PlayerStoreError>;

    /// The player's live session, if they are currently online.
    fn live_session(&self, unique_id: &Uuid) -> Option<SessionHandle>;

    /// Insert or update the record's document and return its storage identity.
    fn persist(&self, record: &PlayerRecord) -> Result<StorageId, PlayerStoreError>;
}
