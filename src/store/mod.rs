//! Sled-backed player manager.
//!
//! Player documents are bincode-encoded [`Document`]s keyed by
//! `players:<uuid>`. The first insert for a player assigns an identity handle
//! from sled's id generator; later saves reuse it. Live sessions are tracked
//! in process only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};
use sled::IVec;
use uuid::Uuid;

use crate::document::{Document, DocumentKey, FromValueTree, ToValueTree};
use crate::errors::PlayerStoreError;
use crate::player::{PlayerManager, PlayerRecord, SessionHandle, StorageId};

const TREE_PLAYERS: &str = "players";
const PLAYER_PREFIX: &str = "players:";

/// Helper builder so tests can easily create throwaway stores with custom options.
pub struct SledPlayerStoreBuilder {
    path: PathBuf,
    flush_on_persist: bool,
}

impl SledPlayerStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_on_persist: true,
        }
    }

    /// Skip the explicit flush after every persist (sled still flushes periodically).
    pub fn flush_on_persist(mut self, flush: bool) -> Self {
        self.flush_on_persist = flush;
        self
    }

    pub fn open(self) -> Result<SledPlayerStore, PlayerStoreError> {
        SledPlayerStore::open_with_options(self.path, self.flush_on_persist)
    }
}

pub struct SledPlayerStore {
    db: sled::Db,
    players: sled::Tree,
    flush_on_persist: bool,
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
}

impl SledPlayerStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PlayerStoreError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(
        path: P,
        flush_on_persist: bool,
    ) -> Result<Self, PlayerStoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let players = db.open_tree(TREE_PLAYERS)?;
        debug!("opened player store at {}", path_ref.display());
        Ok(Self {
            db,
            players,
            flush_on_persist,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    fn player_key(unique_id: &Uuid) -> Vec<u8> {
        format!("{}{}", PLAYER_PREFIX, unique_id.hyphenated()).into_bytes()
    }

    fn serialize(document: &Document) -> Result<Vec<u8>, PlayerStoreError> {
        Ok(bincode::serialize(document)?)
    }

    fn deserialize(bytes: IVec) -> Result<Document, PlayerStoreError> {
        Ok(bincode::deserialize::<Document>(&bytes)?)
    }

    fn next_storage_id(&self) -> Result<StorageId, PlayerStoreError> {
        Ok(StorageId::new(format!("{:016x}", self.db.generate_id()?)))
    }

    /// The handle already stored for `unique_id`, if any. Keeps one identity
    /// per player even when an unbound record is saved over an existing document.
    /// A stored document that no longer decodes counts as having no handle; the
    /// write that follows replaces it.
    fn stored_identity(&self, unique_id: &Uuid) -> Result<Option<StorageId>, PlayerStoreError> {
        let document = match self.fetch_document(unique_id) {
            Ok(doc) => doc,
            Err(PlayerStoreError::Bincode(e)) => {
                warn!(
                    "stored document for player {} is unreadable ({}); it will be overwritten",
                    unique_id, e
                );
                None
            }
            Err(e) => return Err(e),
        };
        Ok(document.and_then(|doc| {
            doc.get(DocumentKey::IdentityHandle.as_str())
                .and_then(StorageId::from_value_tree)
        }))
    }

    /// Write a raw document as-is. Used for imports and tests that need
    /// documents the record type would never produce.
    pub fn put_document(
        &self,
        unique_id: &Uuid,
        document: &Document,
    ) -> Result<(), PlayerStoreError> {
        self.players
            .insert(Self::player_key(unique_id), Self::serialize(document)?)?;
        if self.flush_on_persist {
            self.players.flush()?;
        }
        Ok(())
    }

    /// List all stored player identities.
    pub fn list_player_ids(&self) -> Result<Vec<Uuid>, PlayerStoreError> {
        let mut ids = Vec::new();
        for entry in self.players.scan_prefix(PLAYER_PREFIX.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            match text.strip_prefix(PLAYER_PREFIX).map(Uuid::parse_str) {
                Some(Ok(id)) => ids.push(id),
                _ => warn!("skipping unexpected key in player tree: {}", text),
            }
        }
        Ok(ids)
    }

    /// Remove a player's document. Returns true if one existed.
    pub fn delete_player(&self, unique_id: &Uuid) -> Result<bool, PlayerStoreError> {
        let removed = self.players.remove(Self::player_key(unique_id))?.is_some();
        if removed && self.flush_on_persist {
            self.players.flush()?;
        }
        Ok(removed)
    }

    pub fn mark_online(&self, session: SessionHandle) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session.unique_id, session);
        }
    }

    pub fn mark_offline(&self, unique_id: &Uuid) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .ok()
            .and_then(|mut sessions| sessions.remove(unique_id))
    }

    pub fn online_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl PlayerManager for SledPlayerStore {
    fn fetch_document(&self, unique_id: &Uuid) -> Result<Option<Document>, PlayerStoreError> {
        match self.players.get(Self::player_key(unique_id))? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    fn live_session(&self, unique_id: &Uuid) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .ok()
            .and_then(|sessions| sessions.get(unique_id).cloned())
    }

    fn persist(&self, record: &PlayerRecord) -> Result<StorageId, PlayerStoreError> {
        let unique_id = record.unique_id();
        let storage_id = match record.storage_id() {
            Some(id) => id.clone(),
            None => match self.stored_identity(&unique_id)? {
                Some(existing) => existing,
                None => self.next_storage_id()?,
            },
        };

        let mut document = record.to_document();
        document.insert(
            DocumentKey::IdentityHandle.to_string(),
            storage_id.to_value_tree(),
        );
        self.put_document(&unique_id, &document)?;
        debug!("stored player {} as {}", unique_id, storage_id);
        Ok(storage_id)
    }
}
