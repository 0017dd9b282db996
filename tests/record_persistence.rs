//! End-to-end persistence of player records through the sled store.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use playerdoc::asset::builtin::{Cosmetic, Wallet};
use playerdoc::asset::{Asset, AssetError, AssetLoader, AssetRegistry};
use playerdoc::diagnostics::{CollectingDiagnostics, Diagnostic};
use playerdoc::document::{Document, ToValueTree, ValueTree};
use playerdoc::player::{BindingState, PlayerManager, PlayerRecord};
use playerdoc::store::SledPlayerStore;
use tempfile::tempdir;
use uuid::Uuid;

fn loader() -> (AssetLoader, Arc<CollectingDiagnostics>) {
    let registry = AssetRegistry::new()
        .with_type::<Wallet>()
        .with_type::<Cosmetic>();
    let sink = Arc::new(CollectingDiagnostics::new());
    (AssetLoader::new(Arc::new(registry), sink.clone()), sink)
}

fn asset_entry(descriptor: &str, meta: Document) -> ValueTree {
    let mut entry = Document::new();
    entry.insert("type-descriptor".into(), ValueTree::Text(descriptor.into()));
    entry.insert("meta".into(), ValueTree::Map(meta));
    ValueTree::Map(entry)
}

#[test]
fn test_full_record_round_trip() {
    let tmp = tempdir().unwrap();
    let store = SledPlayerStore::open(tmp.path()).unwrap();
    let (loader, sink) = loader();
    let id = Uuid::new_v4();
    let login = Utc.with_ymd_and_hms(2014, 2, 14, 18, 30, 0).unwrap();

    let mut record = PlayerRecord::construct(id, store.fetch_document(&id).unwrap().as_ref(), &loader);
    assert_eq!(record.binding_state(), BindingState::Unbound);

    record.note_login("Grumm", Some("192.168.1.20"), login);
    record.note_logout(login + chrono::Duration::seconds(90));
    record.settings_mut().set("hub.visibility", &false);
    record.settings_mut().set("chat.ignored", &vec!["spammer".to_string()]);
    record.give_asset(Box::new(Wallet::new(id, 250, "tokens")));
    record.give_asset(Box::new(Cosmetic::new(id, "party_hat")));

    let handle = record.persist(&store).unwrap();
    assert!(record.is_bound());

    let stored = store.fetch_document(&id).unwrap().expect("stored");
    assert_eq!(
        stored.get("identity-handle"),
        Some(&ValueTree::Text(handle.to_string()))
    );
    assert_eq!(stored.get("time-online-ms"), Some(&ValueTree::Integer(90_000)));

    let loaded = PlayerRecord::construct(id, Some(&stored), &loader);
    assert_eq!(loaded.storage_id(), Some(&handle));
    assert_eq!(loaded.last_known_username(), Some("Grumm"));
    assert_eq!(loaded.known_usernames(), ["Grumm"]);
    assert_eq!(loaded.known_ip_addresses(), ["192.168.1.20"]);
    assert_eq!(loaded.first_time_online(), Some(login));
    assert_eq!(loaded.milliseconds_online(), 90_000);
    assert!(!loaded.settings().get("hub.visibility", true));
    assert_eq!(
        loaded.settings().get::<Vec<String>>("chat.ignored", Vec::new()),
        vec!["spammer".to_string()]
    );
    let descriptors: Vec<&str> = loaded.assets().iter().map(|a| a.descriptor()).collect();
    assert_eq!(descriptors, vec!["wallet", "cosmetic"]);
    assert_eq!(loaded.find_asset::<Wallet>().map(|w| w.balance), Some(250));
    assert!(sink.is_empty(), "unexpected diagnostics: {:?}", sink.entries());
}

#[test]
fn test_second_persist_keeps_identity() {
    let tmp = tempdir().unwrap();
    let store = SledPlayerStore::open(tmp.path()).unwrap();
    let mut record = PlayerRecord::fresh(Uuid::new_v4());

    let first = record.persist(&store).unwrap();
    record.set_last_known_username("Searge");
    let second = record.persist(&store).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        record.to_document().get("identity-handle"),
        Some(&ValueTree::Text(first.to_string()))
    );
    assert_eq!(store.list_player_ids().unwrap(), vec![record.unique_id()]);
}

#[test]
fn test_unresolved_assets_are_dropped_in_order() {
    let tmp = tempdir().unwrap();
    let store = SledPlayerStore::open(tmp.path()).unwrap();
    let (loader, sink) = loader();
    let id = Uuid::new_v4();

    let cosmetic = |item: &str| {
        let mut meta = Document::new();
        meta.insert("item".into(), ValueTree::Text(item.into()));
        asset_entry("cosmetic", meta)
    };
    let mut doc = Document::new();
    doc.insert("unique-id".into(), id.to_value_tree());
    doc.insert(
        "assets".into(),
        ValueTree::List(vec![
            cosmetic("first"),
            asset_entry("net.communitycraft.hub.Gadget", Document::new()),
            cosmetic("second"),
            asset_entry("pet", Document::new()),
            cosmetic("third"),
        ]),
    );
    store.put_document(&id, &doc).unwrap();

    let record = PlayerRecord::construct(id, store.fetch_document(&id).unwrap().as_ref(), &loader);
    let items: Vec<String> = record
        .assets()
        .iter()
        .filter_map(|a| a.as_any().downcast_ref::<Cosmetic>())
        .map(|c| c.item.clone())
        .collect();
    assert_eq!(items, vec!["first", "second", "third"]);

    let unresolved: Vec<(String, Uuid)> = sink
        .entries()
        .into_iter()
        .filter_map(|d| match d {
            Diagnostic::AssetUnresolved {
                descriptor,
                owner,
                cause: AssetError::UnknownDescriptor(_),
            } => Some((descriptor, owner)),
            _ => None,
        })
        .collect();
    assert_eq!(
        unresolved,
        vec![
            ("net.communitycraft.hub.Gadget".to_string(), id),
            ("pet".to_string(), id)
        ]
    );
}

#[test]
fn test_drifted_document_degrades_per_field() {
    let tmp = tempdir().unwrap();
    let store = SledPlayerStore::open(tmp.path()).unwrap();
    let (loader, sink) = loader();
    let id = Uuid::new_v4();

    let mut doc = Document::new();
    doc.insert("unique-id".into(), id.to_value_tree());
    doc.insert("last-username".into(), ValueTree::Text("Dinnerbone".into()));
    doc.insert("first-seen".into(), ValueTree::Text("yesterday".into()));
    doc.insert("time-online-ms".into(), ValueTree::Float(12.5));
    doc.insert(
        "known-ips".into(),
        ValueTree::List(vec![
            ValueTree::Text("10.0.0.1".into()),
            ValueTree::Integer(167772162),
            ValueTree::Text("10.0.0.3".into()),
        ]),
    );
    doc.insert("known-usernames".into(), ValueTree::Text("Dinnerbone".into()));
    doc.insert("settings".into(), ValueTree::List(vec![]));
    doc.insert("assets".into(), ValueTree::Integer(3));
    store.put_document(&id, &doc).unwrap();

    let record = PlayerRecord::construct(id, store.fetch_document(&id).unwrap().as_ref(), &loader);
    assert_eq!(record.last_known_username(), Some("Dinnerbone"));
    assert!(record.first_time_online().is_none());
    assert_eq!(record.milliseconds_online(), 0);
    assert_eq!(record.known_ip_addresses(), ["10.0.0.1", "10.0.0.3"]);
    assert!(record.known_usernames().is_empty());
    assert!(record.settings().is_empty());
    assert!(record.assets().is_empty());

    let mismatched: Vec<String> = sink
        .entries()
        .into_iter()
        .filter_map(|d| match d {
            Diagnostic::ShapeMismatch { key, .. } => Some(key),
            _ => None,
        })
        .collect();
    assert_eq!(
        mismatched,
        vec![
            "first-seen",
            "time-online-ms",
            "known-ips",
            "known-usernames",
            "settings",
            "assets"
        ]
    );
}

#[test]
fn test_refresh_picks_up_external_changes() {
    let tmp = tempdir().unwrap();
    let store = SledPlayerStore::open(tmp.path()).unwrap();
    let (loader, _) = loader();
    let id = Uuid::new_v4();

    let mut record = PlayerRecord::fresh(id);
    record.give_asset(Box::new(Wallet::new(id, 10, "coins")));
    record.persist(&store).unwrap();

    let mut other = PlayerRecord::construct(id, store.fetch_document(&id).unwrap().as_ref(), &loader);
    other.assets_mut().clear();
    other.give_asset(Box::new(Wallet::new(id, 99, "coins")));
    other.settings_mut().set("rank", "vip");
    other.persist(&store).unwrap();

    record.refresh(&store, &loader).unwrap();
    assert_eq!(record.find_asset::<Wallet>().map(|w| w.balance), Some(99));
    assert_eq!(record.settings().get_opt::<String>("rank").as_deref(), Some("vip"));
    assert_eq!(record.assets().len(), 1);
}

#[test]
fn test_online_session_comes_from_manager() {
    let tmp = tempdir().unwrap();
    let store = SledPlayerStore::open(tmp.path()).unwrap();
    let record = PlayerRecord::fresh(Uuid::new_v4());

    assert!(record.online_session(&store).is_none());
    store.mark_online(playerdoc::player::SessionHandle::new(
        record.unique_id(),
        "Jeb",
        None,
    ));
    assert_eq!(
        record.online_session(&store).map(|s| s.username),
        Some("Jeb".to_string())
    );
}

#[test]
fn test_assets_keep_owner_reference() {
    let (loader, _) = loader();
    let id = Uuid::new_v4();
    let mut record = PlayerRecord::fresh(id);
    record.give_asset(Box::new(Cosmetic::new(id, "boots")));

    let copy = record.reload_copy(&loader);
    let owners: Vec<Uuid> = copy.assets().iter().map(|a| a.owner()).collect();
    assert_eq!(owners, vec![id]);
}
