use crate::error::{PlenaryError, Result};
use crate::vote::{
    Active, Approval, Approved, Ballot, Choice, Completed, Completion, CountdownTimer, Created,
    Session, SessionHandle, SessionId, Status, TallyStore, VoterId,
};

/// One member's recorded vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVote {
    pub voter: VoterId,
    pub choice: Choice,
}

/// Aggregate counts of a tally.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyCounts {
    pub yes: usize,
    pub no: usize,
    pub abstain: usize,
    pub total: usize,
}

impl TallyCounts {
    pub fn count(&self, choice: Choice) -> usize {
        match choice {
            Choice::Yes => self.yes,
            Choice::No => self.no,
            Choice::Abstain => self.abstain,
        }
    }

    pub fn percentage(&self, choice: Choice) -> Result<f64> {
        if self.total == 0 {
            return Err(PlenaryError::EmptyTally);
        }

        Ok(self.count(choice) as f64 / self.total as f64 * 100.0)
    }
}

/// Read-only view of a session, handed to presentation layers and to the snapshot store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub ballot: Ballot,
    pub status: Status,
    /// Present once the session has been opened.
    pub tally: Option<TallyCounts>,
    #[serde(default)]
    pub votes: Vec<CastVote>,
    /// Present only while the session is open.
    pub remaining: Option<u64>,
    pub completion: Option<Completion>,
    pub approval: Option<Approval>,
}

impl SessionSnapshot {
    pub fn id(&self) -> SessionId {
        self.ballot.id
    }

    pub fn title(&self) -> &str {
        &self.ballot.title
    }
}

impl SessionHandle {
    pub fn snapshot(&self) -> SessionSnapshot {
        let tally = self.tally();
        SessionSnapshot {
            ballot: self.ballot().clone(),
            status: self.status(),
            tally: tally.map(TallyStore::counts),
            votes: tally.map(TallyStore::snapshot).unwrap_or_default(),
            remaining: self.timer().map(CountdownTimer::remaining),
            completion: self.completion().cloned(),
            approval: self.approval().cloned(),
        }
    }
}

/// Rebuilds a session from a stored snapshot. The votes are replayed into a fresh tally, so a
/// snapshot whose counts disagree with its votes is rejected.
impl TryFrom<SessionSnapshot> for SessionHandle {
    type Error = PlenaryError;

    fn try_from(snapshot: SessionSnapshot) -> Result<SessionHandle> {
        let SessionSnapshot {
            ballot,
            status,
            tally: counts,
            votes,
            remaining,
            completion,
            approval,
        } = snapshot;
        ballot.validate()?;

        let missing = |field: &'static str| {
            PlenaryError::validation(field, format!("missing for a {} session", status))
        };

        let handle = match status {
            Status::Created => Session {
                ballot,
                stage: Created,
            }
            .into(),
            Status::Active => {
                let timer = CountdownTimer::resume(
                    ballot.countdown,
                    remaining.unwrap_or(ballot.countdown),
                );
                Session {
                    ballot,
                    stage: Active {
                        tally: replay(votes, counts)?,
                        timer,
                    },
                }
                .into()
            }
            Status::Completed => Session {
                ballot,
                stage: Completed {
                    tally: replay(votes, counts)?,
                    completion: completion.ok_or_else(|| missing("completion"))?,
                },
            }
            .into(),
            Status::Approved => Session {
                ballot,
                stage: Approved {
                    tally: replay(votes, counts)?,
                    completion: completion.ok_or_else(|| missing("completion"))?,
                    approval: approval.ok_or_else(|| missing("approval"))?,
                },
            }
            .into(),
        };

        Ok(handle)
    }
}

fn replay(votes: Vec<CastVote>, counts: Option<TallyCounts>) -> Result<TallyStore> {
    let tally = TallyStore::from_votes(votes)?;
    if counts.map_or(false, |counts| counts != tally.counts()) {
        return Err(PlenaryError::validation(
            "tally",
            "counts do not match the recorded votes",
        ));
    }
    Ok(tally)
}
