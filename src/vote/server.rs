use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{PlenaryError, Result};
use crate::util::Shutdown;
use crate::vote::config::VotingConfig;
use crate::vote::registry::VotingRegistry;
use crate::vote::store::SnapshotStore;
use crate::vote::{SessionId, Status, VotingSession};

/// Runs the countdown of every open session on the tokio runtime. Each open session gets a task
/// that ticks it once per `tick_interval` until it completes or the server is shut down. A
/// session never has more than one countdown task.
pub struct Server {
    config: VotingConfig,
    registry: Arc<VotingRegistry>,
    running: Arc<Mutex<HashSet<SessionId>>>,
    shutdown: Shutdown,
}

/// Marks a session's countdown as running until dropped.
struct Running {
    id: SessionId,
    running: Arc<Mutex<HashSet<SessionId>>>,
}

impl Drop for Running {
    fn drop(&mut self) {
        self.running.lock().remove(&self.id);
    }
}

impl Server {
    pub fn new(config: VotingConfig, store: Arc<dyn SnapshotStore>) -> Self {
        Server {
            registry: Arc::new(VotingRegistry::new(config.clone(), store)),
            config,
            running: Arc::new(Mutex::new(HashSet::new())),
            shutdown: Shutdown::new(),
        }
    }

    pub fn registry(&self) -> Arc<VotingRegistry> {
        self.registry.clone()
    }

    /// Opens session `id` for voting and starts its countdown.
    pub fn start(&self, id: SessionId) -> Result<JoinHandle<Result<()>>> {
        let session = self.registry.get_session(id)?;
        session.activate()?;
        self.spawn(session).ok_or_else(|| PlenaryError::Internal {
            error_msg: format!("countdown of session {} is already running", id),
        })
    }

    /// Restarts the countdown of every open session that has none running, e.g. after a
    /// restore.
    pub fn resume(&self) -> Vec<JoinHandle<Result<()>>> {
        self.registry
            .list_sessions(Some(Status::Active))
            .into_iter()
            .filter_map(|session| self.spawn(session))
            .collect()
    }

    /// Whether session `id` has a countdown task.
    pub fn is_running(&self, id: SessionId) -> bool {
        self.running.lock().contains(&id)
    }

    /// Stops every countdown. Sessions stay in whatever stage they are in.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    fn spawn(&self, session: VotingSession) -> Option<JoinHandle<Result<()>>> {
        let id = session.id();
        if !self.running.lock().insert(id) {
            tracing::debug!(session = %id, "countdown already running");
            return None;
        }
        let running = Running {
            id,
            running: self.running.clone(),
        };

        let tick = self.config.tick_interval;
        let shutdown = self.shutdown.clone();
        Some(tokio::spawn(async move {
            let _running = running;
            countdown(session, tick, shutdown).await
        }))
    }
}

#[tracing::instrument(skip_all, fields(session = %session.id()))]
async fn countdown(session: VotingSession, tick: Duration, mut shutdown: Shutdown) -> Result<()> {
    let mut status_rx = session.subscribe();
    let mut step_interval = tokio::time::interval(tick);
    step_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    step_interval.tick().await;

    tracing::debug!(remaining = ?session.remaining()?, "countdown started");
    loop {
        let status = *status_rx.borrow_and_update();
        if status != Status::Active {
            tracing::debug!(%status, "countdown stopped");
            break;
        }

        tokio::select! {
            // shutdown
            _ = shutdown.wait() => {
                tracing::info!("countdown interrupted by shutdown");
                break;
            },
            // cast votes may complete the session between ticks
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            },
            _ = step_interval.tick() => session.tick()?,
        }
    }

    Ok(())
}
