use time::OffsetDateTime;

use crate::vote::completed::{Completed, Completion, Trigger};
use crate::vote::{Apply, Command, CountdownTimer, Session, Stage, Status, Step, TallyStore};

/// Open for voting until the tally reaches quorum or the countdown runs out.
#[derive(Debug)]
pub struct Active {
    pub tally: TallyStore,
    pub timer: CountdownTimer,
}

impl Stage for Active {
    fn status(&self) -> Status {
        Status::Active
    }
}

impl Session<Active> {
    fn has_quorum(&self) -> bool {
        self.stage.tally.total() >= self.ballot.quorum
    }

    fn complete(self, trigger: Trigger) -> Step {
        let session = Session {
            ballot: self.ballot,
            stage: Completed {
                tally: self.stage.tally,
                completion: Completion {
                    trigger,
                    at: OffsetDateTime::now_utc(),
                },
            },
        };
        tracing::info!(
            session = %session.ballot.id,
            ?trigger,
            total = session.stage.tally.total(),
            "voting closed"
        );
        session.accept()
    }
}

impl Apply for Session<Active> {
    #[tracing::instrument(skip(self), fields(session = %self.ballot.id))]
    fn apply(mut self, cmd: Command) -> Step {
        self.log_command(&cmd);

        match cmd {
            Command::Cast { voter, choice } => {
                if let Err(err) = self.stage.tally.cast(&voter, choice) {
                    return self.reject(err);
                }
                tracing::debug!(%voter, %choice, total = self.stage.tally.total(), "vote recorded");

                if self.has_quorum() {
                    return self.complete(Trigger::Quorum);
                }

                self.accept()
            }
            Command::Tick => {
                self.stage.timer.tick();
                tracing::trace!(remaining = self.stage.timer.remaining(), "tick");

                if self.stage.timer.is_expired() {
                    return self.complete(Trigger::Deadline);
                }

                self.accept()
            }
            cmd => self.out_of_stage(cmd.event()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PlenaryError;
    use crate::vote::test::{activate, new_session};
    use crate::vote::{Apply, Choice, Command, Event, SessionHandle, Status, Step, Trigger};

    fn cast(voter: &str, choice: Choice) -> Command {
        Command::Cast {
            voter: voter.to_owned(),
            choice,
        }
    }

    #[test]
    fn cast_stays_active_below_quorum() {
        let Step { handle, result } = activate(new_session(3, 25)).apply(cast("m1", Choice::Yes));
        result.unwrap();
        assert!(handle.is_active());
        assert_eq!(handle.tally().map(|t| t.total()), Some(1));
    }

    #[test]
    fn quorum_completes_the_session() {
        let mut handle = activate(new_session(2, 25));
        for voter in ["m1", "m2"] {
            let step = handle.apply(cast(voter, Choice::No));
            step.result.unwrap();
            handle = step.handle;
        }

        assert!(handle.is_completed());
        assert_eq!(handle.completion().map(|c| c.trigger), Some(Trigger::Quorum));
        assert!(handle.timer().is_none());
        assert_eq!(handle.tally().map(|t| t.count(Choice::No)), Some(2));
    }

    #[test]
    fn duplicate_vote_leaves_session_untouched() {
        let step = activate(new_session(3, 25)).apply(cast("m1", Choice::Yes));
        step.result.unwrap();
        let Step { handle, result } = step.handle.apply(cast("m1", Choice::No));
        assert_eq!(
            result,
            Err(PlenaryError::DuplicateVote {
                voter: "m1".to_owned()
            })
        );
        assert!(handle.is_active());
        assert_eq!(handle.tally().map(|t| t.total()), Some(1));
        assert_eq!(
            handle.tally().and_then(|t| t.choice_of("m1")),
            Some(Choice::Yes)
        );
    }

    #[test]
    fn deadline_completes_the_session() {
        let mut handle = activate(new_session(245, 25));
        for _ in 0..24 {
            handle = handle.apply(Command::Tick).handle;
            assert!(handle.is_active());
        }
        assert_eq!(handle.timer().map(|t| t.remaining()), Some(1));

        let Step { handle, result } = handle.apply(Command::Tick);
        result.unwrap();
        assert!(handle.is_completed());
        assert_eq!(handle.tally().map(|t| t.total()), Some(0));
        assert_eq!(
            handle.completion().map(|c| c.trigger),
            Some(Trigger::Deadline)
        );
    }

    #[test]
    fn activate_twice_is_rejected() {
        let Step { handle, result } = activate(new_session(3, 25)).apply(Command::Activate);
        assert_eq!(
            result,
            Err(PlenaryError::InvalidStateTransition {
                state: Status::Active,
                event: Event::Activate,
            })
        );
        assert!(handle.is_active());
    }

    #[test]
    fn approve_while_active_is_rejected() {
        let Step { handle, result } = activate(new_session(3, 25)).apply(Command::Approve {
            approver: "speaker".to_owned(),
            notes: "early".to_owned(),
        });
        assert!(matches!(
            result,
            Err(PlenaryError::InvalidStateTransition {
                state: Status::Active,
                ..
            })
        ));
        assert!(matches!(handle, SessionHandle::Active(_)));
    }
}
