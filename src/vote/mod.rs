//! The live voting engine. A vote moves through four stages, each of which is its own type:
//! a freshly created [`Session<Created>`], an [`Session<Active>`] session accepting ballots
//! against a countdown, a [`Session<Completed>`] session whose tally is frozen, and finally an
//! [`Session<Approved>`] session carrying the chair's sign-off.
//!
//! Stages only move forward. A session completes on whichever comes first: the tally reaching
//! the ballot's quorum, or the countdown running out. Both paths land on the same
//! [`Completed`] stage, so approval does not care how the vote ended.
//!
//! Commands are applied to a [`SessionHandle`], which owns the session in whatever stage it is
//! currently in. The handle is consumed and a new one is returned, together with the outcome of
//! the command. A rejected command hands back the session exactly as it was.

use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;

use derive_more::Display;
use uuid::Uuid;

use crate::error::{PlenaryError, Result};

pub use active::Active;
pub use approved::{Approval, Approved};
pub use ballot::{Ballot, NewBallot};
pub use completed::{Completed, Completion, Trigger};
pub use created::Created;
pub use registry::{SessionList, Stats, VotingRegistry};
pub use server::Server;
pub use session::VotingSession;
pub use snapshot::{CastVote, SessionSnapshot, TallyCounts};
pub use store::{MemoryStore, SledStore, SnapshotStore};
pub use tally::TallyStore;
pub use timer::CountdownTimer;

mod active;
mod approved;
pub mod ballot;
mod completed;
pub mod config;
mod created;
pub mod registry;
pub mod server;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod tally;
#[cfg(test)]
mod test;
pub mod timer;

/// Identity of an assembly member, as a voter or as an approver.
pub type VoterId = String;

/// Uniquely identifies a voting session. Assigned once by the registry and never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl FromStr for SessionId {
    type Err = PlenaryError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(SessionId(Uuid::parse_str(s.trim())?))
    }
}

/// A member's answer to the question on the ballot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Choice {
    Yes = 0,
    No = 1,
    Abstain = 2,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::Yes, Choice::No, Choice::Abstain];

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

impl FromStr for Choice {
    type Err = PlenaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Choice::Yes),
            "no" => Ok(Choice::No),
            "abstain" => Ok(Choice::Abstain),
            _ => Err(PlenaryError::InvalidChoice {
                choice: s.to_owned(),
            }),
        }
    }
}

/// Lifecycle position of a session. Ordered: a session only ever moves to a greater status.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
pub enum Status {
    Created,
    Active,
    Completed,
    Approved,
}

impl FromStr for Status {
    type Err = PlenaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(Status::Created),
            "active" => Ok(Status::Active),
            "completed" => Ok(Status::Completed),
            "approved" => Ok(Status::Approved),
            other => Err(PlenaryError::validation(
                "status",
                format!("unknown status {:?}", other),
            )),
        }
    }
}

/// The kind of a [`Command`], used when reporting a command that arrived in the wrong stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum Event {
    #[display(fmt = "activate")]
    Activate,
    #[display(fmt = "cast a vote in")]
    Cast,
    #[display(fmt = "tick")]
    Tick,
    #[display(fmt = "approve")]
    Approve,
}

/// Commands that move a session forward.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Open the session for voting and arm the countdown.
    Activate,
    /// Record a member's vote.
    Cast { voter: VoterId, choice: Choice },
    /// One step of the countdown.
    Tick,
    /// Sign off on the results of a completed vote.
    Approve { approver: VoterId, notes: String },
}

impl Command {
    pub fn event(&self) -> Event {
        match self {
            Command::Activate => Event::Activate,
            Command::Cast { .. } => Event::Cast,
            Command::Tick => Event::Tick,
            Command::Approve { .. } => Event::Approve,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Behavior shared by every stage of a session.
pub trait Stage: Debug {
    fn status(&self) -> Status;
}

/// A session in some stage. The ballot is common to all stages; everything else lives on the
/// stage, so a session can only hold a tally, a timer or an approval when its stage allows it.
#[derive(Debug)]
pub struct Session<S: Stage> {
    pub ballot: Ballot,
    pub stage: S,
}

impl<S: Stage> Session<S> {
    pub fn status(&self) -> Status {
        self.stage.status()
    }

    pub fn log_command(&self, cmd: &Command) {
        match cmd {
            Command::Tick => {}
            _ => {
                tracing::debug!(session = %self.ballot.id, status = %self.status(), "apply {}", cmd);
            }
        };
    }
}

impl<S: Stage> Session<S>
where
    SessionHandle: From<Session<S>>,
{
    fn accept(self) -> Step {
        Step {
            handle: self.into(),
            result: Ok(()),
        }
    }

    fn reject(self, error: PlenaryError) -> Step {
        Step {
            handle: self.into(),
            result: Err(error),
        }
    }

    fn out_of_stage(self, event: Event) -> Step {
        let state = self.status();
        self.reject(PlenaryError::InvalidStateTransition { state, event })
    }
}

/// The result of applying a command: the session in its (possibly new) stage, and whether the
/// command was accepted.
#[derive(Debug)]
pub struct Step {
    pub handle: SessionHandle,
    pub result: Result<()>,
}

/// Applying a command is the only way a session moves forward. Each stage decides which commands
/// it accepts.
pub trait Apply {
    fn apply(self, cmd: Command) -> Step;
}

/// Owns a session in whichever stage it is in.
#[derive(Debug)]
pub enum SessionHandle {
    Created(Session<Created>),
    Active(Session<Active>),
    Completed(Session<Completed>),
    Approved(Session<Approved>),
}

impl SessionHandle {
    /// A new session waiting to be opened.
    pub fn new(ballot: Ballot) -> SessionHandle {
        SessionHandle::Created(Session {
            ballot,
            stage: Created,
        })
    }

    pub fn status(&self) -> Status {
        match self {
            SessionHandle::Created(session) => session.status(),
            SessionHandle::Active(session) => session.status(),
            SessionHandle::Completed(session) => session.status(),
            SessionHandle::Approved(session) => session.status(),
        }
    }

    pub fn ballot(&self) -> &Ballot {
        match self {
            SessionHandle::Created(session) => &session.ballot,
            SessionHandle::Active(session) => &session.ballot,
            SessionHandle::Completed(session) => &session.ballot,
            SessionHandle::Approved(session) => &session.ballot,
        }
    }

    /// The tally, once the session has been opened.
    pub fn tally(&self) -> Option<&TallyStore> {
        match self {
            SessionHandle::Created(_) => None,
            SessionHandle::Active(session) => Some(&session.stage.tally),
            SessionHandle::Completed(session) => Some(&session.stage.tally),
            SessionHandle::Approved(session) => Some(&session.stage.tally),
        }
    }

    /// The countdown, only while the session is open.
    pub fn timer(&self) -> Option<&CountdownTimer> {
        match self {
            SessionHandle::Active(session) => Some(&session.stage.timer),
            _ => None,
        }
    }

    pub fn completion(&self) -> Option<&Completion> {
        match self {
            SessionHandle::Completed(session) => Some(&session.stage.completion),
            SessionHandle::Approved(session) => Some(&session.stage.completion),
            _ => None,
        }
    }

    pub fn approval(&self) -> Option<&Approval> {
        match self {
            SessionHandle::Approved(session) => Some(&session.stage.approval),
            _ => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved(_))
    }
}

impl Apply for SessionHandle {
    fn apply(self, cmd: Command) -> Step {
        match self {
            SessionHandle::Created(session) => session.apply(cmd),
            SessionHandle::Active(session) => session.apply(cmd),
            SessionHandle::Completed(session) => session.apply(cmd),
            SessionHandle::Approved(session) => session.apply(cmd),
        }
    }
}

impl From<Session<Created>> for SessionHandle {
    fn from(session: Session<Created>) -> Self {
        SessionHandle::Created(session)
    }
}

impl From<Session<Active>> for SessionHandle {
    fn from(session: Session<Active>) -> Self {
        SessionHandle::Active(session)
    }
}

impl From<Session<Completed>> for SessionHandle {
    fn from(session: Session<Completed>) -> Self {
        SessionHandle::Completed(session)
    }
}

impl From<Session<Approved>> for SessionHandle {
    fn from(session: Session<Approved>) -> Self {
        SessionHandle::Approved(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_parse_case_insensitively() {
        assert_eq!("Yes".parse::<Choice>().unwrap(), Choice::Yes);
        assert_eq!(" no ".parse::<Choice>().unwrap(), Choice::No);
        assert_eq!("ABSTAIN".parse::<Choice>().unwrap(), Choice::Abstain);
    }

    #[test]
    fn unknown_choice_is_rejected() {
        let err = "Maybe".parse::<Choice>().unwrap_err();
        assert_eq!(
            err,
            PlenaryError::InvalidChoice {
                choice: "Maybe".to_owned()
            }
        );
    }

    #[test]
    fn statuses_are_ordered_by_lifecycle() {
        assert!(Status::Created < Status::Active);
        assert!(Status::Active < Status::Completed);
        assert!(Status::Completed < Status::Approved);
        assert_eq!("completed".parse::<Status>().unwrap(), Status::Completed);
        assert!("pending".parse::<Status>().is_err());
    }

    #[test]
    fn session_ids_round_trip_through_display() {
        let id = SessionId::generate();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
