//! Polymorphic, owner-attached player assets.
//!
//! An asset is stored as `{type-descriptor, meta}`. On load the descriptor is
//! looked up in an [`AssetRegistry`] populated at startup, and the registered
//! factory rebuilds the asset from its owner and meta map. Entries that cannot
//! be rebuilt are skipped and reported; they never fail the record load.

pub mod builtin;
pub mod loader;
pub mod registry;

use std::any::Any;
use std::fmt::Debug;

use thiserror::Error;
use uuid::Uuid;

use crate::document::{Document, FromValueTree};
use crate::player::PlayerRecord;

pub use loader::{encode_assets, AssetLoader};
pub use registry::{AssetFactory, AssetRegistry};

/// A typed extension object owned by a player record.
pub trait Asset: Debug + Send + Sync {
    /// The descriptor this asset was registered under.
    fn descriptor(&self) -> &str;

    /// Identity of the owning player. Lookup only; the asset does not keep the record alive.
    fn owner(&self) -> Uuid;

    /// Meta map written to storage and handed back to the factory on load.
    fn meta(&self) -> Document;

    fn as_any(&self) -> &dyn Any;
}

/// Statically typed assets that can be registered with [`AssetRegistry::register_type`].
pub trait AssetType: Asset + Sized + 'static {
    const DESCRIPTOR: &'static str;

    fn load(owner: &PlayerRecord, meta: &Document) -> Result<Self, AssetError>;
}

/// Why a stored asset entry could not be rebuilt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssetError {
    #[error("no factory registered for descriptor '{0}'")]
    UnknownDescriptor(String),

    #[error("malformed asset entry: {0}")]
    MalformedEntry(String),

    #[error("missing meta field '{0}'")]
    MissingMeta(String),

    #[error("meta field '{field}' should be {expected}")]
    InvalidMeta {
        field: String,
        expected: &'static str,
    },

    #[error("factory failed: {0}")]
    Factory(String),

    #[error("factory panicked: {0}")]
    Panicked(String),
}

/// Read a required meta field, telling "missing" apart from "wrong shape".
pub fn meta_required<T: FromValueTree>(meta: &Document, field: &str) -> Result<T, AssetError> {
    let raw = meta
        .get(field)
        .ok_or_else(|| AssetError::MissingMeta(field.to_string()))?;
    T::from_value_tree(raw).ok_or_else(|| AssetError::InvalidMeta {
        field: field.to_string(),
        expected: T::EXPECTED,
    })
}
