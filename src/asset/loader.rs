use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::warn;

use super::{Asset, AssetError, AssetRegistry};
use crate::diagnostics::{Diagnostic, DiagnosticsSink, LogDiagnostics};
use crate::document::{Document, DocumentKey, ValueTree};
use crate::metrics;
use crate::player::PlayerRecord;

const UNKNOWN_DESCRIPTOR: &str = "<none>";

/// Rebuilds assets from stored entries, isolating every per-entry failure.
#[derive(Clone)]
pub struct AssetLoader {
    registry: Arc<AssetRegistry>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl AssetLoader {
    pub fn new(registry: Arc<AssetRegistry>, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            registry,
            diagnostics,
        }
    }

    /// Loader that reports through the `log` facade.
    pub fn with_logging(registry: Arc<AssetRegistry>) -> Self {
        Self::new(registry, Arc::new(LogDiagnostics))
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn diagnostics(&self) -> &dyn DiagnosticsSink {
        self.diagnostics.as_ref()
    }

    /// Rebuild every resolvable entry, in document order.
    pub fn decode_assets(&self, owner: &PlayerRecord, entries: &[ValueTree]) -> Vec<Box<dyn Asset>> {
        let mut assets = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.decode_entry(owner, entry) {
                Ok(asset) => {
                    metrics::inc_assets_resolved();
                    assets.push(asset);
                }
                Err((descriptor, cause)) => {
                    metrics::inc_assets_skipped();
                    self.diagnostics.report(Diagnostic::AssetUnresolved {
                        descriptor,
                        owner: owner.unique_id(),
                        cause,
                    });
                }
            }
        }
        assets
    }

    fn decode_entry(
        &self,
        owner: &PlayerRecord,
        entry: &ValueTree,
    ) -> Result<Box<dyn Asset>, (String, AssetError)> {
        let Some(fields) = entry.as_map() else {
            return Err((
                UNKNOWN_DESCRIPTOR.to_string(),
                AssetError::MalformedEntry(format!("expected map, found {}", entry.shape())),
            ));
        };

        let descriptor = match fields.get(DocumentKey::TypeDescriptor.as_str()) {
            Some(ValueTree::Text(d)) => d.clone(),
            Some(other) => {
                return Err((
                    UNKNOWN_DESCRIPTOR.to_string(),
                    AssetError::MalformedEntry(format!(
                        "{} should be text, found {}",
                        DocumentKey::TypeDescriptor,
                        other.shape()
                    )),
                ))
            }
            None => {
                return Err((
                    UNKNOWN_DESCRIPTOR.to_string(),
                    AssetError::MalformedEntry(format!("{} missing", DocumentKey::TypeDescriptor)),
                ))
            }
        };

        // Missing or ill-shaped meta is handed to the factory as an empty map.
        let empty = Document::new();
        let meta = fields
            .get(DocumentKey::Meta.as_str())
            .and_then(ValueTree::as_map)
            .unwrap_or(&empty);

        let Some(factory) = self.registry.get(&descriptor) else {
            let cause = AssetError::UnknownDescriptor(descriptor.clone());
            return Err((descriptor, cause));
        };

        match panic::catch_unwind(AssertUnwindSafe(|| factory(owner, meta))) {
            Ok(Ok(asset)) => Ok(asset),
            Ok(Err(cause)) => Err((descriptor, cause)),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err((descriptor, AssetError::Panicked(message)))
            }
        }
    }

    /// Encode assets as `{type-descriptor, meta}` maps, warning about any whose
    /// descriptor this loader could not read back.
    pub fn encode_assets(&self, assets: &[Box<dyn Asset>]) -> ValueTree {
        for asset in assets {
            if !self.registry.contains(asset.descriptor()) {
                warn!(
                    "asset '{}' of player {} has no registered factory and will be skipped on load",
                    asset.descriptor(),
                    asset.owner()
                );
            }
        }
        encode_assets(assets)
    }
}

/// Encode assets as `{type-descriptor, meta}` maps in list order.
pub fn encode_assets(assets: &[Box<dyn Asset>]) -> ValueTree {
    ValueTree::List(
        assets
            .iter()
            .map(|asset| {
                let mut entry = Document::new();
                entry.insert(
                    DocumentKey::TypeDescriptor.to_string(),
                    ValueTree::Text(asset.descriptor().to_string()),
                );
                entry.insert(DocumentKey::Meta.to_string(), ValueTree::Map(asset.meta()));
                ValueTree::Map(entry)
            })
            .collect(),
    )
}
