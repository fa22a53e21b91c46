use crate::vote::active::Active;
use crate::vote::{Apply, Command, CountdownTimer, Session, Stage, Status, Step, TallyStore};

/// Registered but not yet open for voting.
#[derive(Debug)]
pub struct Created;

impl Stage for Created {
    fn status(&self) -> Status {
        Status::Created
    }
}

impl Apply for Session<Created> {
    #[tracing::instrument(skip(self), fields(session = %self.ballot.id))]
    fn apply(self, cmd: Command) -> Step {
        self.log_command(&cmd);

        match cmd {
            Command::Activate => {
                let session: Session<Active> = Session::from(self);
                tracing::info!(countdown = session.stage.timer.remaining(), "voting opened");
                session.accept()
            }
            // the countdown has not been armed yet
            Command::Tick => self.accept(),
            cmd => self.out_of_stage(cmd.event()),
        }
    }
}

impl From<Session<Created>> for Session<Active> {
    fn from(val: Session<Created>) -> Session<Active> {
        let timer = CountdownTimer::new(val.ballot.countdown);
        Session {
            ballot: val.ballot,
            stage: Active {
                tally: TallyStore::new(),
                timer,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PlenaryError;
    use crate::vote::test::new_session;
    use crate::vote::{Apply, Choice, Command, Event, SessionHandle, Status, Step};

    #[test]
    fn created_to_active() {
        let Step { handle, result } = new_session(3, 25).apply(Command::Activate);
        result.unwrap();
        match handle {
            SessionHandle::Active(session) => {
                assert!(session.stage.tally.is_empty());
                assert_eq!(session.stage.timer.remaining(), 25);
            }
            other => panic!("expected an active session, got {:?}", other.status()),
        }
    }

    #[test]
    fn cast_before_activation_is_rejected() {
        let Step { handle, result } = new_session(3, 25).apply(Command::Cast {
            voter: "m1".to_owned(),
            choice: Choice::Yes,
        });
        assert_eq!(
            result,
            Err(PlenaryError::InvalidStateTransition {
                state: Status::Created,
                event: Event::Cast,
            })
        );
        assert!(handle.is_created());
        assert!(handle.tally().is_none());
    }

    #[test]
    fn approve_before_activation_is_rejected() {
        let Step { handle, result } = new_session(3, 25).apply(Command::Approve {
            approver: "speaker".to_owned(),
            notes: "looks fine".to_owned(),
        });
        assert!(matches!(
            result,
            Err(PlenaryError::InvalidStateTransition {
                state: Status::Created,
                event: Event::Approve,
            })
        ));
        assert!(handle.is_created());
    }

    #[test]
    fn tick_before_activation_is_ignored() {
        let Step { handle, result } = new_session(3, 25).apply(Command::Tick);
        result.unwrap();
        assert!(handle.is_created());
        assert!(handle.timer().is_none());
    }
}
