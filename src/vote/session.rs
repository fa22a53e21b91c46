use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{PlenaryError, Result};
use crate::vote::snapshot::{CastVote, SessionSnapshot, TallyCounts};
use crate::vote::store::SnapshotStore;
use crate::vote::{Apply, Ballot, Choice, Command, SessionHandle, SessionId, Status, Step};

/// A shared, thread-safe handle to one session. Cloning is cheap and every clone refers to the
/// same session.
///
/// Commands are serialized by a per-session lock, so a cast and a tick racing for the last
/// vote complete the session exactly once. Every transition hands a snapshot to the store and
/// is announced on the status channel returned by [`VotingSession::subscribe`].
#[derive(Clone)]
pub struct VotingSession {
    inner: Arc<Inner>,
}

struct Inner {
    ballot: Ballot,
    // only empty while a command is being applied
    handle: Mutex<Option<SessionHandle>>,
    status_tx: watch::Sender<Status>,
    store: Arc<dyn SnapshotStore>,
}

impl fmt::Debug for VotingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VotingSession {{ id: {}, title: {:?}, status: {} }}",
            self.inner.ballot.id,
            self.inner.ballot.title,
            self.status()
        )
    }
}

impl VotingSession {
    pub(crate) fn new(handle: SessionHandle, store: Arc<dyn SnapshotStore>) -> Self {
        let (status_tx, _) = watch::channel(handle.status());
        VotingSession {
            inner: Arc::new(Inner {
                ballot: handle.ballot().clone(),
                handle: Mutex::new(Some(handle)),
                status_tx,
                store,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.ballot.id
    }

    pub fn ballot(&self) -> &Ballot {
        &self.inner.ballot
    }

    pub fn status(&self) -> Status {
        *self.inner.status_tx.borrow()
    }

    /// Opens the session for voting and arms the countdown.
    pub fn activate(&self) -> Result<()> {
        self.apply(Command::Activate)
    }

    /// Records `voter`'s vote. `choice` must be one of `Yes`, `No` or `Abstain`.
    pub fn cast(&self, voter: &str, choice: &str) -> Result<()> {
        let choice = choice.parse::<Choice>()?;
        self.cast_choice(voter, choice)
    }

    pub fn cast_choice(&self, voter: &str, choice: Choice) -> Result<()> {
        self.apply(Command::Cast {
            voter: voter.to_owned(),
            choice,
        })
    }

    /// Advances the countdown by one step. Does nothing unless the session is open.
    pub fn tick(&self) -> Result<()> {
        self.apply(Command::Tick)
    }

    pub fn approve(&self, approver: &str, notes: &str) -> Result<()> {
        self.apply(Command::Approve {
            approver: approver.to_owned(),
            notes: notes.to_owned(),
        })
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        self.read(SessionHandle::snapshot)
    }

    /// Counts of the votes cast so far, once the session has been opened.
    pub fn counts(&self) -> Result<Option<TallyCounts>> {
        self.read(|handle| handle.tally().map(|tally| tally.counts()))
    }

    /// Share of the votes that went to `choice`, out of 100.
    pub fn percentage(&self, choice: Choice) -> Result<f64> {
        self.counts()?
            .ok_or(PlenaryError::EmptyTally)?
            .percentage(choice)
    }

    /// Every vote cast so far, in the order it was cast.
    pub fn votes(&self) -> Result<Vec<CastVote>> {
        self.read(|handle| {
            handle
                .tally()
                .map(|tally| tally.snapshot())
                .unwrap_or_default()
        })
    }

    /// Ticks left on the countdown, while the session is open.
    pub fn remaining(&self) -> Result<Option<u64>> {
        self.read(|handle| handle.timer().map(|timer| timer.remaining()))
    }

    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.inner.status_tx.subscribe()
    }

    /// Resolves once the session has reached `status` or moved past it.
    pub async fn reached(&self, status: Status) {
        let mut status_rx = self.subscribe();
        loop {
            if *status_rx.borrow_and_update() >= status {
                return;
            }
            if status_rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn read<T>(&self, f: impl FnOnce(&SessionHandle) -> T) -> Result<T> {
        let slot = self.inner.handle.lock();
        slot.as_ref().map(f).ok_or_else(|| self.lost())
    }

    fn apply(&self, cmd: Command) -> Result<()> {
        let mut slot = self.inner.handle.lock();
        let handle = slot.take().ok_or_else(|| self.lost())?;
        let before = handle.status();
        // an accepted vote must survive a restart even when it does not close the session
        let is_cast = matches!(cmd, Command::Cast { .. });

        let Step { handle, result } = handle.apply(cmd);
        let after = handle.status();
        let changed = before != after;
        let snapshot = (changed || (is_cast && result.is_ok())).then(|| handle.snapshot());
        *slot = Some(handle);

        // saved while the slot is still locked, so snapshots reach the store in order
        if let Some(snapshot) = snapshot {
            self.persist(&snapshot);
        }
        if changed {
            self.inner.status_tx.send_replace(after);
        }

        result
    }

    /// Saves the current snapshot while holding the session lock.
    pub(crate) fn save(&self) -> Result<()> {
        let slot = self.inner.handle.lock();
        let snapshot = slot.as_ref().map(SessionHandle::snapshot).ok_or_else(|| self.lost())?;
        self.persist(&snapshot);
        Ok(())
    }

    /// Hands the snapshot to the store. A store failure does not undo the transition.
    fn persist(&self, snapshot: &SessionSnapshot) {
        if let Err(err) = self.inner.store.save(snapshot) {
            tracing::error!(session = %self.id(), %err, "could not persist session snapshot");
        }
    }

    fn lost(&self) -> PlenaryError {
        PlenaryError::Internal {
            error_msg: format!("session {} was lost while applying a command", self.id()),
        }
    }
}
