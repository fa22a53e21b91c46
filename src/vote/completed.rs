use time::OffsetDateTime;

use crate::error::PlenaryError;
use crate::vote::approved::{Approval, Approved};
use crate::vote::{Apply, Command, Session, Stage, Status, Step, TallyStore};

/// Voting has closed and the tally is frozen, waiting for the chair to approve the results.
#[derive(Debug)]
pub struct Completed {
    pub tally: TallyStore,
    pub completion: Completion,
}

/// What closed the vote.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// The tally reached the ballot's quorum.
    Quorum,
    /// The countdown ran out first.
    Deadline,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub trigger: Trigger,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl Stage for Completed {
    fn status(&self) -> Status {
        Status::Completed
    }
}

impl Apply for Session<Completed> {
    #[tracing::instrument(skip(self), fields(session = %self.ballot.id))]
    fn apply(self, cmd: Command) -> Step {
        self.log_command(&cmd);

        match cmd {
            Command::Approve { approver, notes } => {
                let approver = approver.trim();
                if approver.is_empty() {
                    return self.reject(PlenaryError::validation("approver", "must not be blank"));
                }
                let notes = notes.trim();
                if notes.is_empty() {
                    return self.reject(PlenaryError::validation("notes", "must not be blank"));
                }

                let approval = Approval {
                    approver: approver.to_owned(),
                    notes: notes.to_owned(),
                    at: OffsetDateTime::now_utc(),
                };
                tracing::info!(approver = %approval.approver, "results approved");
                Session {
                    ballot: self.ballot,
                    stage: Approved {
                        tally: self.stage.tally,
                        completion: self.stage.completion,
                        approval,
                    },
                }
                .accept()
            }
            // a scheduler may still be ticking when a cast closes the vote
            Command::Tick => self.accept(),
            cmd => self.out_of_stage(cmd.event()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PlenaryError;
    use crate::vote::test::{activate, complete, new_session};
    use crate::vote::{Apply, Choice, Command, Event, Status, Step};

    fn approve(notes: &str) -> Command {
        Command::Approve {
            approver: "speaker".to_owned(),
            notes: notes.to_owned(),
        }
    }

    #[test]
    fn completed_to_approved() {
        let Step { handle, result } = complete(new_session(1, 25)).apply(approve("  Carried. "));
        result.unwrap();
        assert!(handle.is_approved());
        let approval = handle.approval().unwrap();
        assert_eq!(approval.approver, "speaker");
        assert_eq!(approval.notes, "Carried.");
        assert!(handle.completion().is_some());
    }

    #[test]
    fn approver_is_trimmed() {
        let Step { handle, result } = complete(new_session(1, 25)).apply(Command::Approve {
            approver: " speaker ".to_owned(),
            notes: "Carried.".to_owned(),
        });
        result.unwrap();
        assert_eq!(handle.approval().map(|a| a.approver.as_str()), Some("speaker"));
    }

    #[test]
    fn blank_notes_are_rejected() {
        let Step { handle, result } = complete(new_session(1, 25)).apply(approve(""));
        assert!(matches!(
            result,
            Err(PlenaryError::Validation { field: "notes", .. })
        ));
        assert!(handle.is_completed());
        assert!(handle.approval().is_none());
    }

    #[test]
    fn blank_approver_is_rejected() {
        let Step { handle, result } = complete(new_session(1, 25)).apply(Command::Approve {
            approver: " ".to_owned(),
            notes: "Carried.".to_owned(),
        });
        assert!(matches!(
            result,
            Err(PlenaryError::Validation {
                field: "approver",
                ..
            })
        ));
        assert!(handle.is_completed());
    }

    #[test]
    fn late_vote_is_rejected() {
        let Step { handle, result } = complete(new_session(1, 25)).apply(Command::Cast {
            voter: "late".to_owned(),
            choice: Choice::Yes,
        });
        assert_eq!(
            result,
            Err(PlenaryError::InvalidStateTransition {
                state: Status::Completed,
                event: Event::Cast,
            })
        );
        assert_eq!(handle.tally().map(|t| t.total()), Some(1));
    }

    #[test]
    fn tick_after_completion_is_ignored() {
        let Step { handle, result } = complete(new_session(1, 25)).apply(Command::Tick);
        result.unwrap();
        assert!(handle.is_completed());
    }

    #[test]
    fn activate_after_completion_is_rejected() {
        let session = activate(new_session(1, 25));
        let Step { handle, .. } = session.apply(Command::Cast {
            voter: "m1".to_owned(),
            choice: Choice::Abstain,
        });
        let Step { result, .. } = handle.apply(Command::Activate);
        assert!(matches!(
            result,
            Err(PlenaryError::InvalidStateTransition {
                state: Status::Completed,
                event: Event::Activate,
            })
        ));
    }
}
