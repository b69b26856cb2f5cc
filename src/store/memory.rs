use std::collections::HashMap as StdHashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{SessionStore, StoreError};
use crate::session::SessionRecord;

const SNAPSHOT_INTERVAL: Duration = Duration::from_millis(5_000);

/// In-process session store: a token-keyed map behind an RwLock, with optional
/// periodic bincode snapshots so sessions survive a restart.
#[derive(Clone)]
pub struct MemoryStore {
    map: Arc<RwLock<StdHashMap<String, SessionRecord>>>,
    dir: Option<PathBuf>,
    /// Guard to ensure we only spawn one persistence thread
    persist_started: Arc<parking_lot::Mutex<bool>>,
}

impl MemoryStore {
    /// Purely in-memory store; records are lost on shutdown.
    pub fn new() -> Self {
        Self {
            map: Arc::new(RwLock::new(StdHashMap::new())),
            dir: None,
            persist_started: Arc::new(parking_lot::Mutex::new(false)),
        }
    }

    /// Store rooted at `dir`: restores the last snapshot if one exists and
    /// snapshots periodically in the background.
    pub fn open(dir: PathBuf) -> Self {
        std::fs::create_dir_all(&dir).ok();
        let s = Self {
            map: Arc::new(RwLock::new(StdHashMap::new())),
            dir: Some(dir),
            persist_started: Arc::new(parking_lot::Mutex::new(false)),
        };
        let _ = s.load_snapshot();
        s.ensure_persistence_loop();
        s
    }

    fn snapshot_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join("snapshot.bin"))
    }

    fn ensure_persistence_loop(&self) {
        let mut started = self.persist_started.lock();
        if *started {
            return;
        }
        *started = true;
        drop(started);
        if self.dir.is_some() {
            let this = self.clone();
            std::thread::spawn(move || loop {
                std::thread::sleep(SNAPSHOT_INTERVAL);
                let _ = this.save_snapshot();
            });
        }
    }

    pub fn save_snapshot(&self) -> anyhow::Result<()> {
        #[derive(Serialize, Deserialize)]
        struct SnapEntry {
            token: String,
            user_id: String,
            groups: String,
        }
        #[derive(Serialize, Deserialize)]
        struct Snapshot {
            version: u32,
            entries: Vec<SnapEntry>,
        }

        let Some(path) = self.snapshot_path() else { return Ok(()); };
        let entries: Vec<SnapEntry> = self
            .map
            .read()
            .iter()
            .map(|(token, rec)| SnapEntry {
                token: token.clone(),
                user_id: rec.user_id.clone(),
                groups: rec.groups.clone(),
            })
            .collect();
        let snap = Snapshot { version: 1, entries };
        let bytes = bincode::serialize(&snap)?;
        let tmp = path.with_extension("bin.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }

    /// Load snapshot from disk into memory; ignores a missing file to allow
    /// first startup.
    pub fn load_snapshot(&self) -> anyhow::Result<()> {
        #[derive(Serialize, Deserialize)]
        struct SnapEntry {
            token: String,
            user_id: String,
            groups: String,
        }
        #[derive(Serialize, Deserialize)]
        struct Snapshot {
            version: u32,
            entries: Vec<SnapEntry>,
        }

        let Some(path) = self.snapshot_path() else { return Ok(()); };
        if !path.exists() {
            return Ok(());
        }
        let bytes = std::fs::read(path)?;
        let snap: Snapshot = bincode::deserialize(&bytes)?;
        let mut map = self.map.write();
        for e in snap.entries {
            map.insert(e.token, SessionRecord { user_id: e.user_id, groups: e.groups });
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemoryStore {
    fn put(&self, token: &str, record: SessionRecord) -> Result<(), StoreError> {
        self.map.write().insert(token.to_string(), record);
        Ok(())
    }

    fn get(&self, token: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.map.read().get(token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(user: &str, groups: &str) -> SessionRecord {
        SessionRecord { user_id: user.to_string(), groups: groups.to_string() }
    }

    #[test]
    fn put_then_get_returns_the_record() {
        let store = MemoryStore::new();
        store.put("tok1", rec("u1", r#"{"g1":true}"#)).unwrap();
        let got = store.get("tok1").unwrap().expect("record");
        assert_eq!(got.user_id, "u1");
        assert_eq!(got.groups, r#"{"g1":true}"#);
    }

    #[test]
    fn unknown_token_is_none_not_error() {
        let store = MemoryStore::new();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = MemoryStore::open(tmp.path().to_path_buf());
        store.put("tok1", rec("u1", "{}")).unwrap();
        store.put("tok2", rec("u2", r#"{"ops":true}"#)).unwrap();
        store.save_snapshot().unwrap();

        let reopened = MemoryStore::open(tmp.path().to_path_buf());
        assert_eq!(reopened.get("tok1").unwrap(), Some(rec("u1", "{}")));
        assert_eq!(reopened.get("tok2").unwrap(), Some(rec("u2", r#"{"ops":true}"#)));
        assert!(reopened.get("tok3").unwrap().is_none());
    }
}
