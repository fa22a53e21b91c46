use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{PlenaryError, Result};
use crate::vote::config::VotingConfig;
use crate::vote::snapshot::SessionSnapshot;
use crate::vote::store::{MemoryStore, SnapshotStore};
use crate::vote::{Ballot, NewBallot, SessionHandle, SessionId, Status, VotingSession};

/// Every voting session of the assembly, in creation order. Sessions are archival records and
/// are never removed.
#[derive(Debug)]
pub struct VotingRegistry {
    config: VotingConfig,
    store: Arc<dyn SnapshotStore>,
    sessions: RwLock<Sessions>,
}

#[derive(Debug, Default)]
struct Sessions {
    order: Vec<VotingSession>,
    by_id: HashMap<SessionId, VotingSession>,
}

impl Sessions {
    fn insert(&mut self, session: VotingSession) {
        self.by_id.insert(session.id(), session.clone());
        self.order.push(session);
    }
}

impl VotingRegistry {
    pub fn new(config: VotingConfig, store: Arc<dyn SnapshotStore>) -> Self {
        VotingRegistry {
            config,
            store,
            sessions: RwLock::new(Sessions::default()),
        }
    }

    /// A registry whose snapshots are only kept in memory.
    pub fn with_config(config: VotingConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    pub fn config(&self) -> &VotingConfig {
        &self.config
    }

    pub fn create_session(&self, title: &str, quorum: usize) -> Result<VotingSession> {
        self.create(NewBallot::new(title).quorum(quorum))
    }

    /// Registers a new session for `draft`, filling in the configured quorum and countdown
    /// where the draft does not set them.
    pub fn create(&self, draft: NewBallot) -> Result<VotingSession> {
        let ballot = Ballot::from_draft(draft, &self.config)?;
        let session = VotingSession::new(SessionHandle::new(ballot), self.store.clone());
        tracing::info!(session = %session.id(), title = %session.ballot().title, "session created");

        // saved before anyone else can reach the session
        session.save()?;
        self.sessions.write().insert(session.clone());
        Ok(session)
    }

    pub fn get_session(&self, id: SessionId) -> Result<VotingSession> {
        self.sessions
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(PlenaryError::NotFound { id })
    }

    /// The sessions registered so far, optionally only those in `status`. The status filter is
    /// applied while iterating, and the list can be iterated any number of times.
    pub fn list_sessions(&self, status: Option<Status>) -> SessionList {
        SessionList {
            sessions: self.sessions.read().order.clone(),
            status,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many sessions are in each status.
    pub fn stats(&self) -> Stats {
        self.sessions
            .read()
            .order
            .iter()
            .map(VotingSession::status)
            .collect()
    }

    /// Rebuilds sessions from stored snapshots, keeping their ids and order. Nothing is
    /// registered unless every snapshot can be restored. Restored sessions are not re-saved.
    pub fn restore(&self, snapshots: impl IntoIterator<Item = SessionSnapshot>) -> Result<usize> {
        let handles = snapshots
            .into_iter()
            .map(SessionHandle::try_from)
            .collect::<Result<Vec<_>>>()?;

        let mut sessions = self.sessions.write();
        let mut seen = std::collections::HashSet::new();
        for handle in &handles {
            let id = handle.ballot().id;
            if sessions.by_id.contains_key(&id) || !seen.insert(id) {
                return Err(PlenaryError::validation(
                    "session id",
                    format!("session {} is already registered", id),
                ));
            }
        }

        let restored = handles.len();
        for handle in handles {
            sessions.insert(VotingSession::new(handle, self.store.clone()));
        }
        tracing::info!(restored, "sessions restored");
        Ok(restored)
    }
}

/// A point-in-time list of sessions, in creation order.
#[derive(Clone, Debug)]
pub struct SessionList {
    sessions: Vec<VotingSession>,
    status: Option<Status>,
}

impl SessionList {
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.sessions.iter(),
            status: self.status,
        }
    }
}

pub struct Iter<'a> {
    inner: std::slice::Iter<'a, VotingSession>,
    status: Option<Status>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a VotingSession;

    fn next(&mut self) -> Option<Self::Item> {
        let status = self.status;
        self.inner
            .by_ref()
            .find(|session| status.map_or(true, |status| session.status() == status))
    }
}

impl<'a> IntoIterator for &'a SessionList {
    type Item = &'a VotingSession;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct IntoIter {
    inner: std::vec::IntoIter<VotingSession>,
    status: Option<Status>,
}

impl Iterator for IntoIter {
    type Item = VotingSession;

    fn next(&mut self) -> Option<Self::Item> {
        let status = self.status;
        self.inner
            .by_ref()
            .find(|session| status.map_or(true, |status| session.status() == status))
    }
}

impl IntoIterator for SessionList {
    type Item = VotingSession;
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.sessions.into_iter(),
            status: self.status,
        }
    }
}

/// Number of sessions in total and per status.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub created: usize,
    pub active: usize,
    pub completed: usize,
    pub approved: usize,
}

impl Stats {
    pub fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Created => self.created += 1,
            Status::Active => self.active += 1,
            Status::Completed => self.completed += 1,
            Status::Approved => self.approved += 1,
        }
    }
}

impl FromIterator<Status> for Stats {
    fn from_iter<I: IntoIterator<Item = Status>>(iter: I) -> Self {
        let mut stats = Stats::default();
        for status in iter {
            stats.record(status);
        }
        stats
    }
}
