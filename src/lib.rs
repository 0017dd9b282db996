//! # playerdoc - player profiles over a schemaless document store
//!
//! playerdoc persists a player profile (identity, history, settings and owned
//! extensible "assets") as a loosely typed document tree and rebuilds it on
//! demand.
//!
//! ## Features
//!
//! - **Closed value model**: every stored value is one of eight [`document::ValueTree`] shapes.
//! - **Tolerant decoding**: each field read is shape-checked and falls back on mismatch, so a
//!   drifted or partially corrupt document still loads with whatever is salvageable.
//! - **Polymorphic assets**: asset entries name their type by descriptor; an explicit
//!   [`asset::AssetRegistry`] maps descriptors to factories and bad entries are skipped.
//! - **Injected diagnostics**: recoverable problems flow through a [`diagnostics::DiagnosticsSink`].
//! - **Sled store**: [`store::SledPlayerStore`] is a ready-made [`player::PlayerManager`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use playerdoc::asset::{builtin::Wallet, AssetLoader, AssetRegistry};
//! use playerdoc::player::{PlayerManager, PlayerRecord};
//! use playerdoc::store::SledPlayerStore;
//! use uuid::Uuid;
//!
//! fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(AssetRegistry::new().with_type::<Wallet>());
//!     let loader = AssetLoader::with_logging(registry);
//!     let store = SledPlayerStore::open("./data/players")?;
//!
//!     let id = Uuid::new_v4();
//!     let document = store.fetch_document(&id)?;
//!     let mut record = PlayerRecord::construct(id, document.as_ref(), &loader);
//!     record.settings_mut().set("chat.visible", &true);
//!     record.persist(&store)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`document`] - ValueTree, the codec and the schema keys
//! - [`settings`] - loosely typed per-player settings
//! - [`asset`] - asset trait, registry, loader and built-in types
//! - [`player`] - the player record and its manager contract
//! - [`store`] - sled-backed manager
//! - [`diagnostics`] - recoverable decode problems and their sinks
//! - [`config`] - configuration for the binary

pub mod asset;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod errors;
pub mod logutil;
pub mod metrics;
pub mod player;
pub mod settings;
pub mod store;
