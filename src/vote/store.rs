use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;

use parking_lot::Mutex;
use sled::transaction::ConflictableTransactionError;
use sled::{Db, Transactional, Tree};

use crate::error::Result;
use crate::vote::snapshot::SessionSnapshot;
use crate::vote::SessionId;

/// Durable home for session snapshots. Sessions hand their snapshot to the store on every
/// transition; the engine never reads from it except to restore sessions at startup.
pub trait SnapshotStore: Send + Sync + Debug {
    fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;

    /// The latest snapshot of every session, in the order the sessions were first saved.
    fn load(&self) -> Result<Vec<SessionSnapshot>>;

    fn get(&self, id: SessionId) -> Result<Option<SessionSnapshot>> {
        Ok(self.load()?.into_iter().find(|snapshot| snapshot.id() == id))
    }
}

/// Keeps every snapshot ever saved, in order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    history: Mutex<Vec<SessionSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<SessionSnapshot> {
        self.history.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        self.history.lock().push(snapshot.clone());
        Ok(())
    }

    fn load(&self) -> Result<Vec<SessionSnapshot>> {
        let history = self.history.lock();
        let mut order = Vec::new();
        let mut latest = HashMap::new();
        for snapshot in history.iter() {
            if latest.insert(snapshot.id(), snapshot).is_none() {
                order.push(snapshot.id());
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|id| latest.remove(&id).cloned())
            .collect())
    }
}

/// Snapshots stored as JSON in a sled database, keyed by session id. A second tree records the
/// order in which sessions were first seen.
#[derive(Clone, Debug)]
pub struct SledStore {
    db: Db,
    sessions: Tree,
    order: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(sled::open(path)?)
    }

    pub fn new(db: Db) -> Result<Self> {
        Ok(Self {
            sessions: db.open_tree("sessions")?,
            order: db.open_tree("order")?,
            db,
        })
    }
}

impl SnapshotStore for SledStore {
    fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let id = snapshot.id();
        let key = id.0.as_bytes();
        let value = serde_json::to_vec(snapshot)?;
        // a session must never be saved without its order entry
        (&self.sessions, &self.order).transaction(|(sessions, order)| {
            if sessions.insert(&key[..], value.as_slice())?.is_none() {
                let seq = order.generate_id()?;
                order.insert(&seq.to_be_bytes()[..], &key[..])?;
            }
            Ok::<_, ConflictableTransactionError<sled::Error>>(())
        })?;
        self.db.flush()?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<SessionSnapshot>> {
        let mut snapshots = Vec::new();
        for entry in self.order.iter() {
            let (_, key) = entry?;
            if let Some(value) = self.sessions.get(key)? {
                snapshots.push(serde_json::from_slice(&value)?);
            }
        }
        Ok(snapshots)
    }

    fn get(&self, id: SessionId) -> Result<Option<SessionSnapshot>> {
        match self.sessions.get(id.0.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vote::test::{activate, approve, new_session};
    use crate::vote::{SessionHandle, Status};

    fn snapshots() -> Vec<SessionSnapshot> {
        vec![
            SessionHandle::from(new_session(3, 25)).snapshot(),
            activate(new_session(3, 25)).snapshot(),
            approve(new_session(1, 25)).snapshot(),
        ]
    }

    #[test]
    fn memory_store_keeps_history_and_loads_latest() {
        let store = MemoryStore::new();
        let snapshots = snapshots();
        for snapshot in &snapshots {
            store.save(snapshot).unwrap();
        }

        assert_eq!(store.len(), 3);
        assert_eq!(store.load().unwrap(), snapshots);
        assert_eq!(
            store.get(snapshots[1].id()).unwrap(),
            Some(snapshots[1].clone())
        );
        assert_eq!(store.get(SessionId::generate()).unwrap(), None);
    }

    #[test]
    fn memory_store_replaces_older_snapshots() {
        let store = MemoryStore::new();
        let created = SessionHandle::from(new_session(2, 25)).snapshot();
        let mut active = created.clone();
        active.status = Status::Active;
        let other = SessionHandle::from(new_session(2, 25)).snapshot();

        store.save(&created).unwrap();
        store.save(&other).unwrap();
        store.save(&active).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, vec![active, other]);
        assert_eq!(store.history().len(), 3);
    }

    #[test]
    fn sled_store_round_trip() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path())?;
        let snapshots = snapshots();
        for snapshot in &snapshots {
            store.save(snapshot)?;
        }

        assert_eq!(store.load()?, snapshots);
        assert_eq!(store.get(snapshots[2].id())?, Some(snapshots[2].clone()));
        assert_eq!(store.get(SessionId::generate())?, None);
        Ok(())
    }

    #[test]
    fn sled_store_writes_one_order_entry_per_session() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path())?;
        let snapshots = snapshots();
        for _ in 0..3 {
            for snapshot in &snapshots {
                store.save(snapshot)?;
            }
        }

        assert_eq!(store.sessions.len(), 3);
        assert_eq!(store.order.len(), 3);
        assert_eq!(store.load()?, snapshots);
        Ok(())
    }

    #[test]
    fn sled_store_keeps_first_seen_order() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = snapshots();
        {
            let store = SledStore::open(dir.path())?;
            for snapshot in snapshots.iter().rev() {
                store.save(snapshot)?;
            }
            // a later snapshot of the first session must not move it
            let mut updated = snapshots[2].clone();
            updated.ballot.description = "amended".to_owned();
            store.save(&updated)?;
        }

        let store = SledStore::open(dir.path())?;
        let loaded = store.load()?;
        let ids: Vec<_> = loaded.iter().map(SessionSnapshot::id).collect();
        let expected: Vec<_> = snapshots.iter().rev().map(SessionSnapshot::id).collect();
        assert_eq!(ids, expected);
        assert_eq!(loaded[0].ballot.description, "amended");
        Ok(())
    }
}
