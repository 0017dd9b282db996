//! Record behaviour when the backing manager misbehaves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use playerdoc::asset::{AssetLoader, AssetRegistry};
use playerdoc::diagnostics::CollectingDiagnostics;
use playerdoc::document::{Document, ValueTree};
use playerdoc::errors::PlayerStoreError;
use playerdoc::player::{
    BindingState, PlayerManager, PlayerRecord, SessionHandle, StorageId,
};
use uuid::Uuid;

/// A manager whose backend can be switched off, and which may hand back a
/// different handle on every save.
struct FlakyManager {
    offline: AtomicBool,
    rotate_handles: bool,
    saves: Mutex<Vec<Document>>,
    stored: Mutex<Option<Document>>,
}

impl FlakyManager {
    fn new() -> Self {
        Self {
            offline: AtomicBool::new(false),
            rotate_handles: false,
            saves: Mutex::new(Vec::new()),
            stored: Mutex::new(None),
        }
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PlayerStoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(PlayerStoreError::Unavailable("backend down".into()))
        } else {
            Ok(())
        }
    }
}

impl PlayerManager for FlakyManager {
    fn fetch_document(&self, _unique_id: &Uuid) -> Result<Option<Document>, PlayerStoreError> {
        self.check()?;
        Ok(self.stored.lock().unwrap().clone())
    }

    fn live_session(&self, _unique_id: &Uuid) -> Option<SessionHandle> {
        None
    }

    fn persist(&self, record: &PlayerRecord) -> Result<StorageId, PlayerStoreError> {
        self.check()?;
        let mut saves = self.saves.lock().unwrap();
        let doc = record.to_document();
        saves.push(doc.clone());
        *self.stored.lock().unwrap() = Some(doc);
        let n = if self.rotate_handles { saves.len() } else { 1 };
        Ok(StorageId::new(format!("handle-{}", n)))
    }
}

fn loader() -> AssetLoader {
    AssetLoader::new(
        Arc::new(AssetRegistry::new()),
        Arc::new(CollectingDiagnostics::new()),
    )
}

#[test]
fn test_persist_failure_leaves_record_unbound() {
    let manager = FlakyManager::new();
    manager.set_offline(true);
    let mut record = PlayerRecord::fresh(Uuid::new_v4());

    let err = record.persist(&manager).unwrap_err();
    assert!(err.is_connectivity());
    assert_eq!(record.binding_state(), BindingState::Unbound);
    assert!(!record.to_document().contains_key("identity-handle"));

    manager.set_offline(false);
    let handle = record.persist(&manager).unwrap();
    assert_eq!(record.binding_state(), BindingState::Bound(handle));
}

#[test]
fn test_refresh_failure_keeps_in_memory_state() {
    let manager = FlakyManager::new();
    let loader = loader();
    let mut record = PlayerRecord::fresh(Uuid::new_v4());
    record.set_last_known_username("Notch");
    record.settings_mut().set("volume", &7);
    record.persist(&manager).unwrap();

    record.set_last_known_username("jeb_");
    manager.set_offline(true);
    let before = record.to_document();
    assert!(record.refresh(&manager, &loader).is_err());
    assert_eq!(record.to_document(), before);
    assert_eq!(record.last_known_username(), Some("jeb_"));
}

#[test]
fn test_refresh_without_document_reports_not_found() {
    let manager = FlakyManager::new();
    let loader = loader();
    let id = Uuid::new_v4();
    let mut record = PlayerRecord::fresh(id);
    record.set_milliseconds_online(1234);

    match record.refresh(&manager, &loader) {
        Err(PlayerStoreError::NotFound(missing)) => assert_eq!(missing, id),
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
    assert_eq!(record.milliseconds_online(), 1234);
}

#[test]
fn test_bound_identity_survives_rotating_manager() {
    let mut manager = FlakyManager::new();
    manager.rotate_handles = true;
    let mut record = PlayerRecord::fresh(Uuid::new_v4());

    let first = record.persist(&manager).unwrap();
    record.persist(&manager).unwrap();
    record.persist(&manager).unwrap();

    assert_eq!(record.storage_id(), Some(&first));
    let saves = manager.saves.lock().unwrap();
    assert!(!saves[0].contains_key("identity-handle"));
    for doc in &saves[1..] {
        assert_eq!(
            doc.get("identity-handle"),
            Some(&ValueTree::Text(first.to_string()))
        );
    }
}
