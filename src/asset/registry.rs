//! Closed descriptor -> factory table for asset reconstruction.
//!
//! Populated once at startup, then shared read-only behind an `Arc`. Every
//! loadable asset type is known up front; nothing is discovered by name at
//! load time.

use std::collections::HashMap;
use std::fmt;

use log::warn;

use super::{Asset, AssetError, AssetType};
use crate::document::Document;
use crate::player::PlayerRecord;

/// Builds an asset from its owning record and stored meta map.
pub type AssetFactory =
    Box<dyn Fn(&PlayerRecord, &Document) -> Result<Box<dyn Asset>, AssetError> + Send + Sync>;

#[derive(Default)]
pub struct AssetRegistry {
    factories: HashMap<String, AssetFactory>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `descriptor`. A second registration for the same
    /// descriptor replaces the first.
    pub fn register<F>(&mut self, descriptor: impl Into<String>, factory: F)
    where
        F: Fn(&PlayerRecord, &Document) -> Result<Box<dyn Asset>, AssetError>
            + Send
            + Sync
            + 'static,
    {
        let descriptor = descriptor.into();
        if self
            .factories
            .insert(descriptor.clone(), Box::new(factory))
            .is_some()
        {
            warn!("asset descriptor '{}' registered twice; keeping the latest factory", descriptor);
        }
    }

    pub fn register_type<T: AssetType>(&mut self) {
        self.register(T::DESCRIPTOR, |owner, meta| {
            T::load(owner, meta).map(|asset| Box::new(asset) as Box<dyn Asset>)
        });
    }

    /// Builder form of [`register_type`](Self::register_type).
    pub fn with_type<T: AssetType>(mut self) -> Self {
        self.register_type::<T>();
        self
    }

    pub fn get(&self, descriptor: &str) -> Option<&AssetFactory> {
        self.factories.get(descriptor)
    }

    pub fn contains(&self, descriptor: &str) -> bool {
        self.factories.contains_key(descriptor)
    }

    /// Registered descriptors in sorted order.
    pub fn descriptors(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("descriptors", &self.descriptors())
            .finish()
    }
}
