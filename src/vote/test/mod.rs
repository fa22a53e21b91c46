use std::sync::Arc;

use crate::vote::config::VotingConfig;
use crate::vote::{
    Apply, Ballot, Choice, Command, Created, MemoryStore, Session, SessionHandle, VotingRegistry,
};

pub(crate) fn new_session(quorum: usize, countdown: u64) -> Session<Created> {
    Session {
        ballot: Ballot::new("Budget Amendment", quorum, countdown).unwrap(),
        stage: Created,
    }
}

pub(crate) fn activate(session: Session<Created>) -> SessionHandle {
    let step = session.apply(Command::Activate);
    step.result.unwrap();
    step.handle
}

/// Opens the session and fills it to quorum with `Yes` votes.
pub(crate) fn complete(session: Session<Created>) -> SessionHandle {
    let quorum = session.ballot.quorum;
    let mut handle = activate(session);
    for n in 0..quorum {
        let step = handle.apply(Command::Cast {
            voter: format!("m{}", n + 1),
            choice: Choice::Yes,
        });
        step.result.unwrap();
        handle = step.handle;
    }
    assert!(handle.is_completed());
    handle
}

pub(crate) fn approve(session: Session<Created>) -> SessionHandle {
    let step = complete(session).apply(Command::Approve {
        approver: "speaker".to_owned(),
        notes: "Carried.".to_owned(),
    });
    step.result.unwrap();
    step.handle
}

pub(crate) fn memory_registry() -> (Arc<MemoryStore>, VotingRegistry) {
    let store = Arc::new(MemoryStore::new());
    let registry = VotingRegistry::new(VotingConfig::default(), store.clone());
    (store, registry)
}
