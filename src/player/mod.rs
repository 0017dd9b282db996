//! The player record: identity, history, settings and owned assets.
//!
//! A record is either **fresh** (no backing document, never persisted) or
//! **hydrated** from a stored [`Document`]. It never talks to a store itself;
//! [`PlayerRecord::refresh`] and [`PlayerRecord::persist`] call out to a
//! [`PlayerManager`] and only produce or consume documents.
//!
//! Binding: a record starts `Unbound` unless its document carries an
//! `identity-handle`, becomes `Bound` on the first successful persist, and
//! stays `Bound` for the rest of its life.

pub mod manager;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use uuid::Uuid;

use crate::asset::{encode_assets, Asset, AssetLoader};
use crate::diagnostics::Diagnostic;
use crate::document::{Document, DocumentKey, DocumentReader, ToValueTree, ValueTree};
use crate::errors::PlayerStoreError;
use crate::logutil::escape_log;
use crate::metrics;
use crate::settings::SettingStore;

pub use manager::{BindingState, PlayerManager, SessionHandle, StorageId};

#[derive(Debug)]
pub struct PlayerRecord {
    unique_id: Uuid,
    storage_id: Option<StorageId>,
    last_known_username: Option<String>,
    known_usernames: Vec<String>,
    known_ip_addresses: Vec<String>,
    first_time_online: Option<DateTime<Utc>>,
    last_time_online: Option<DateTime<Utc>>,
    /// Never negative.
    milliseconds_online: i64,
    settings: SettingStore,
    assets: Vec<Box<dyn Asset>>,
    /// Start of the current session; in memory only.
    session_started: Option<DateTime<Utc>>,
}

impl PlayerRecord {
    /// A record with no backing document.
    pub fn fresh(unique_id: Uuid) -> Self {
        Self {
            unique_id,
            storage_id: None,
            last_known_username: None,
            known_usernames: Vec::new(),
            known_ip_addresses: Vec::new(),
            first_time_online: None,
            last_time_online: None,
            milliseconds_online: 0,
            settings: SettingStore::new(),
            assets: Vec::new(),
            session_started: None,
        }
    }

    /// Fresh when `document` is `None`, hydrated otherwise.
    pub fn construct(unique_id: Uuid, document: Option<&Document>, loader: &AssetLoader) -> Self {
        match document {
            Some(doc) => Self::from_document(unique_id, doc, loader),
            None => Self::fresh(unique_id),
        }
    }

    /// Hydrate from a stored document. The document's own `unique-id` wins;
    /// `lookup_id` is kept only when the stored one is missing or unparsable.
    pub fn from_document(lookup_id: Uuid, doc: &Document, loader: &AssetLoader) -> Self {
        let mut record = Self::fresh(lookup_id);
        record.storage_id =
            DocumentReader::new(doc, loader.diagnostics()).get_opt(DocumentKey::IdentityHandle);
        record.apply_document(doc, loader);
        metrics::inc_records_loaded();
        record
    }

    /// An independent copy built by round-tripping through this record's document.
    pub fn reload_copy(&self, loader: &AssetLoader) -> Self {
        let mut copy = Self::from_document(self.unique_id, &self.to_document(), loader);
        copy.session_started = self.session_started;
        copy
    }

    /// Replace every stored field from `doc`. The storage identity is left alone.
    fn apply_document(&mut self, doc: &Document, loader: &AssetLoader) {
        let sink = loader.diagnostics();
        let reader = DocumentReader::new(doc, sink);

        match reader.get_opt::<Uuid>(DocumentKey::UniqueId) {
            Some(id) => self.unique_id = id,
            None => sink.report(Diagnostic::IdentityFallback {
                kept: self.unique_id,
                stored: reader
                    .raw(DocumentKey::UniqueId)
                    .and_then(ValueTree::as_text)
                    .map(str::to_string),
            }),
        }

        self.last_known_username = reader.get(DocumentKey::LastUsername, None);
        self.first_time_online = reader.get(DocumentKey::FirstSeen, None);
        self.last_time_online = reader.get(DocumentKey::LastSeen, None);
        self.milliseconds_online = reader.get(DocumentKey::TimeOnlineMs, 0i64).max(0);
        self.known_ip_addresses = reader.list(DocumentKey::KnownIps).unwrap_or_default();
        self.known_usernames = reader.list(DocumentKey::KnownUsernames).unwrap_or_default();
        self.settings = SettingStore::from_document(
            reader
                .get_opt::<Document>(DocumentKey::Settings)
                .unwrap_or_default(),
        );

        let entries: Vec<ValueTree> = reader.list(DocumentKey::Assets).unwrap_or_default();
        self.assets.clear();
        let assets = loader.decode_assets(self, &entries);
        self.assets = assets;
    }

    /// Serialize to a document. `identity-handle` is included only once bound.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        let mut put = |key: DocumentKey, value: ValueTree| {
            doc.insert(key.to_string(), value);
        };
        if let Some(id) = &self.storage_id {
            put(DocumentKey::IdentityHandle, id.to_value_tree());
        }
        put(
            DocumentKey::LastUsername,
            self.last_known_username.to_value_tree(),
        );
        put(DocumentKey::UniqueId, self.unique_id.to_value_tree());
        put(DocumentKey::FirstSeen, self.first_time_online.to_value_tree());
        put(DocumentKey::LastSeen, self.last_time_online.to_value_tree());
        put(
            DocumentKey::TimeOnlineMs,
            self.milliseconds_online.to_value_tree(),
        );
        put(DocumentKey::KnownIps, self.known_ip_addresses.to_value_tree());
        put(
            DocumentKey::KnownUsernames,
            self.known_usernames.to_value_tree(),
        );
        put(
            DocumentKey::Settings,
            ValueTree::Map(self.settings.to_document()),
        );
        put(DocumentKey::Assets, encode_assets(&self.assets));
        doc
    }

    /// Re-hydrate from a freshly fetched document, replacing every stored field.
    /// On failure the record is left untouched.
    pub fn refresh(
        &mut self,
        manager: &dyn PlayerManager,
        loader: &AssetLoader,
    ) -> Result<(), PlayerStoreError> {
        let document = match manager.fetch_document(&self.unique_id) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                metrics::inc_refresh_failures();
                return Err(PlayerStoreError::NotFound(self.unique_id));
            }
            Err(e) => {
                metrics::inc_refresh_failures();
                warn!("refresh of player {} failed: {}", self.unique_id, e);
                return Err(e);
            }
        };
        self.apply_document(&document, loader);
        metrics::inc_records_loaded();
        Ok(())
    }

    /// Hand the record to the manager for storage. The first success binds the
    /// record to the returned identity; a failure changes nothing.
    pub fn persist(&mut self, manager: &dyn PlayerManager) -> Result<StorageId, PlayerStoreError> {
        let assigned = manager.persist(self).map_err(|e| {
            metrics::inc_persist_failures();
            warn!("persist of player {} failed: {}", self.unique_id, e);
            e
        })?;
        metrics::inc_records_persisted();

        match &self.storage_id {
            Some(existing) => {
                if *existing != assigned {
                    warn!(
                        "store returned identity {} for player {} already bound to {}; keeping {}",
                        assigned, self.unique_id, existing, existing
                    );
                }
                Ok(existing.clone())
            }
            None => {
                debug!("player {} bound to {}", self.unique_id, assigned);
                self.storage_id = Some(assigned.clone());
                Ok(assigned)
            }
        }
    }

    /// The player's live session, if the manager reports one.
    pub fn online_session(&self, manager: &dyn PlayerManager) -> Option<SessionHandle> {
        manager.live_session(&self.unique_id)
    }

    // ------------------------------------------------------------------
    // Session bookkeeping
    // ------------------------------------------------------------------

    /// Record a login: updates the username, extends the known username/IP
    /// history, stamps first/last seen and starts the session clock.
    pub fn note_login(&mut self, username: &str, address: Option<&str>, at: DateTime<Utc>) {
        debug!("player {} logged in as '{}'", self.unique_id, escape_log(username));
        self.last_known_username = Some(username.to_string());
        self.add_known_username(username);
        if let Some(address) = address {
            self.add_known_ip(address);
        }
        self.first_time_online.get_or_insert(at);
        self.last_time_online = Some(at);
        self.session_started = Some(at);
    }

    /// Close the current session, adding its length to the online total.
    /// Returns the milliseconds added (0 when no session was open).
    pub fn note_logout(&mut self, at: DateTime<Utc>) -> i64 {
        let Some(started) = self.session_started.take() else {
            return 0;
        };
        let elapsed = (at - started).num_milliseconds().max(0);
        self.milliseconds_online = self.milliseconds_online.saturating_add(elapsed);
        self.last_time_online = Some(at);
        elapsed
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn unique_id(&self) -> Uuid {
        self.unique_id
    }

    pub fn storage_id(&self) -> Option<&StorageId> {
        self.storage_id.as_ref()
    }

    pub fn binding_state(&self) -> BindingState {
        match &self.storage_id {
            Some(id) => BindingState::Bound(id.clone()),
            None => BindingState::Unbound,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.storage_id.is_some()
    }

    pub fn last_known_username(&self) -> Option<&str> {
        self.last_known_username.as_deref()
    }

    pub fn set_last_known_username(&mut self, username: impl Into<String>) {
        self.last_known_username = Some(username.into());
    }

    pub fn known_usernames(&self) -> &[String] {
        &self.known_usernames
    }

    /// Append `username` unless already known. Returns true if it was added.
    pub fn add_known_username(&mut self, username: &str) -> bool {
        push_unique(&mut self.known_usernames, username)
    }

    pub fn known_ip_addresses(&self) -> &[String] {
        &self.known_ip_addresses
    }

    /// Append `address` unless already known. Returns true if it was added.
    pub fn add_known_ip(&mut self, address: &str) -> bool {
        push_unique(&mut self.known_ip_addresses, address)
    }

    pub fn first_time_online(&self) -> Option<DateTime<Utc>> {
        self.first_time_online
    }

    pub fn set_first_time_online(&mut self, at: Option<DateTime<Utc>>) {
        self.first_time_online = at;
    }

    pub fn last_time_online(&self) -> Option<DateTime<Utc>> {
        self.last_time_online
    }

    pub fn set_last_time_online(&mut self, at: Option<DateTime<Utc>>) {
        self.last_time_online = at;
    }

    pub fn milliseconds_online(&self) -> i64 {
        self.milliseconds_online
    }

    /// Negative totals are stored as 0.
    pub fn set_milliseconds_online(&mut self, ms: i64) {
        self.milliseconds_online = ms.max(0);
    }

    pub fn settings(&self) -> &SettingStore {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingStore {
        &mut self.settings
    }

    pub fn assets(&self) -> &[Box<dyn Asset>] {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut Vec<Box<dyn Asset>> {
        &mut self.assets
    }

    pub fn give_asset(&mut self, asset: Box<dyn Asset>) {
        if asset.owner() != self.unique_id {
            warn!(
                "asset '{}' owned by {} given to player {}",
                escape_log(asset.descriptor()),
                asset.owner(),
                self.unique_id
            );
        }
        self.assets.push(asset);
    }

    pub fn remove_asset(&mut self, index: usize) -> Option<Box<dyn Asset>> {
        (index < self.assets.len()).then(|| self.assets.remove(index))
    }

    pub fn retain_assets<F>(&mut self, keep: F)
    where
        F: FnMut(&Box<dyn Asset>) -> bool,
    {
        self.assets.retain(keep);
    }

    /// First asset of concrete type `T`.
    pub fn find_asset<T: Asset + 'static>(&self) -> Option<&T> {
        self.assets
            .iter()
            .find_map(|asset| asset.as_any().downcast_ref::<T>())
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|known| known == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::builtin::{Cosmetic, Wallet};
    use crate::asset::AssetRegistry;
    use crate::diagnostics::CollectingDiagnostics;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    fn loader() -> (AssetLoader, Arc<CollectingDiagnostics>) {
        let registry = AssetRegistry::new()
            .with_type::<Wallet>()
            .with_type::<Cosmetic>();
        let sink = Arc::new(CollectingDiagnostics::new());
        (AssetLoader::new(Arc::new(registry), sink.clone()), sink)
    }

    #[derive(Default)]
    struct MemoryManager {
        docs: Mutex<HashMap<Uuid, Document>>,
        next_id: AtomicU64,
        offline: AtomicBool,
    }

    impl PlayerManager for MemoryManager {
        fn fetch_document(&self, id: &Uuid) -> Result<Option<Document>, PlayerStoreError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(PlayerStoreError::Unavailable("offline".into()));
            }
            Ok(self.docs.lock().unwrap().get(id).cloned())
        }

        fn live_session(&self, _id: &Uuid) -> Option<SessionHandle> {
            None
        }

        fn persist(&self, record: &PlayerRecord) -> Result<StorageId, PlayerStoreError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(PlayerStoreError::Unavailable("offline".into()));
            }
            let id = record.storage_id().cloned().unwrap_or_else(|| {
                StorageId::new(format!("h{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
            });
            let mut doc = record.to_document();
            doc.insert("identity-handle".into(), id.to_value_tree());
            self.docs.lock().unwrap().insert(record.unique_id(), doc);
            Ok(id)
        }
    }

    #[test]
    fn fresh_record_is_empty_and_unbound() {
        let id = Uuid::new_v4();
        let (loader, _) = loader();
        let record = PlayerRecord::construct(id, None, &loader);
        assert_eq!(record.unique_id(), id);
        assert!(record.known_usernames().is_empty());
        assert!(record.assets().is_empty());
        assert_eq!(record.binding_state(), BindingState::Unbound);
        assert_eq!(record.milliseconds_online(), 0);
    }

    #[test]
    fn document_identity_is_authoritative() {
        let (loader, sink) = loader();
        let stored = Uuid::new_v4();
        let mut doc = Document::new();
        doc.insert("unique-id".into(), stored.to_value_tree());
        let record = PlayerRecord::from_document(Uuid::new_v4(), &doc, &loader);
        assert_eq!(record.unique_id(), stored);
        assert!(sink.is_empty());
    }

    #[test]
    fn unparsable_identity_keeps_lookup_id() {
        let (loader, sink) = loader();
        let lookup = Uuid::new_v4();
        let mut doc = Document::new();
        doc.insert("unique-id".into(), ValueTree::Text("not-a-uuid".into()));
        let record = PlayerRecord::from_document(lookup, &doc, &loader);
        assert_eq!(record.unique_id(), lookup);
        assert!(sink.entries().contains(&Diagnostic::IdentityFallback {
            kept: lookup,
            stored: Some("not-a-uuid".into()),
        }));
    }

    #[test]
    fn missing_time_online_decodes_as_zero() {
        let (loader, _) = loader();
        let id = Uuid::new_v4();
        let mut doc = Document::new();
        doc.insert("unique-id".into(), id.to_value_tree());
        doc.insert("last-username".into(), ValueTree::Text("Notch".into()));
        let record = PlayerRecord::from_document(id, &doc, &loader);
        assert_eq!(record.milliseconds_online(), 0);
        assert_eq!(record.last_known_username(), Some("Notch"));
        assert!(record.first_time_online().is_none());
    }

    #[test]
    fn persist_binds_once_and_includes_identity_afterwards() {
        let manager = MemoryManager::default();
        let mut record = PlayerRecord::fresh(Uuid::new_v4());
        assert!(!record.to_document().contains_key("identity-handle"));

        let first = record.persist(&manager).expect("first persist");
        assert_eq!(record.binding_state(), BindingState::Bound(first.clone()));
        assert_eq!(
            record.to_document().get("identity-handle"),
            Some(&ValueTree::Text(first.to_string()))
        );

        let second = record.persist(&manager).expect("second persist");
        assert_eq!(first, second);
    }

    #[test]
    fn failed_persist_leaves_record_unbound() {
        let manager = MemoryManager::default();
        manager.offline.store(true, Ordering::SeqCst);
        let mut record = PlayerRecord::fresh(Uuid::new_v4());
        let err = record.persist(&manager).unwrap_err();
        assert!(err.is_connectivity());
        assert!(record.storage_id().is_none());
    }

    #[test]
    fn refresh_replaces_fields_and_reports_missing_document() {
        let (loader, _) = loader();
        let manager = MemoryManager::default();
        let id = Uuid::new_v4();

        let mut record = PlayerRecord::fresh(id);
        assert!(matches!(
            record.refresh(&manager, &loader),
            Err(PlayerStoreError::NotFound(missing)) if missing == id
        ));

        record.set_last_known_username("before");
        record.settings_mut().set("volume", &7i64);
        record.persist(&manager).expect("persist");

        record.set_last_known_username("after");
        record.settings_mut().remove("volume");
        record.refresh(&manager, &loader).expect("refresh");
        assert_eq!(record.last_known_username(), Some("before"));
        assert_eq!(record.settings().get("volume", 0i64), 7);
        assert!(record.is_bound());
    }

    #[test]
    fn login_and_logout_track_history() {
        let t0 = Utc.with_ymd_and_hms(2014, 6, 1, 10, 0, 0).unwrap();
        let mut record = PlayerRecord::fresh(Uuid::new_v4());

        record.note_login("jeb_", Some("10.0.0.5"), t0);
        assert_eq!(record.note_logout(t0 + Duration::minutes(2)), 120_000);
        record.note_login("jeb_", Some("10.0.0.6"), t0 + Duration::hours(1));
        record.note_login("Jeb", Some("10.0.0.5"), t0 + Duration::hours(2));

        assert_eq!(record.known_usernames(), ["jeb_", "Jeb"]);
        assert_eq!(record.known_ip_addresses(), ["10.0.0.5", "10.0.0.6"]);
        assert_eq!(record.first_time_online(), Some(t0));
        assert_eq!(record.last_time_online(), Some(t0 + Duration::hours(2)));
        assert_eq!(record.milliseconds_online(), 120_000);
        assert_eq!(record.note_logout(t0), 0);
    }

    #[test]
    fn online_total_at_the_limit_survives_reload() {
        let (loader, _) = loader();
        let t0 = Utc.with_ymd_and_hms(2014, 6, 1, 10, 0, 0).unwrap();
        let mut record = PlayerRecord::fresh(Uuid::new_v4());
        record.set_milliseconds_online(i64::MAX - 10);

        record.note_login("Grumm", None, t0);
        record.note_logout(t0 + Duration::seconds(5));
        assert_eq!(record.milliseconds_online(), i64::MAX);

        let copy = PlayerRecord::from_document(record.unique_id(), &record.to_document(), &loader);
        assert_eq!(copy.milliseconds_online(), i64::MAX);

        record.set_milliseconds_online(-40);
        assert_eq!(record.milliseconds_online(), 0);
    }

    #[test]
    fn negative_stored_online_total_loads_as_zero() {
        let (loader, _) = loader();
        let id = Uuid::new_v4();
        let mut doc = PlayerRecord::fresh(id).to_document();
        doc.insert("time-online-ms".into(), ValueTree::Integer(-500));
        let record = PlayerRecord::from_document(id, &doc, &loader);
        assert_eq!(record.milliseconds_online(), 0);
    }

    #[test]
    fn reload_copy_keeps_assets_and_identity() {
        let (loader, _) = loader();
        let mut record = PlayerRecord::fresh(Uuid::new_v4());
        let owner = record.unique_id();
        record.give_asset(Box::new(Wallet::new(owner, 12, "coins")));
        record.give_asset(Box::new(Cosmetic::new(owner, "wings")));
        let manager = MemoryManager::default();
        record.persist(&manager).expect("persist");

        let copy = record.reload_copy(&loader);
        assert_eq!(copy.storage_id(), record.storage_id());
        assert_eq!(copy.assets().len(), 2);
        assert_eq!(copy.find_asset::<Wallet>().map(|w| w.balance), Some(12));
    }

    #[test]
    fn remove_asset_by_index() {
        let mut record = PlayerRecord::fresh(Uuid::new_v4());
        let owner = record.unique_id();
        record.give_asset(Box::new(Cosmetic::new(owner, "a")));
        record.give_asset(Box::new(Cosmetic::new(owner, "b")));
        assert!(record.remove_asset(5).is_none());
        let removed = record.remove_asset(0).expect("index 0");
        assert_eq!(removed.meta().get("item"), Some(&ValueTree::Text("a".into())));
        record.retain_assets(|a| a.descriptor() != "cosmetic");
        assert!(record.assets().is_empty());
    }
}
