use time::OffsetDateTime;

use crate::vote::completed::Completion;
use crate::vote::{Apply, Command, Session, Stage, Status, Step, TallyStore, VoterId};

/// The results have been signed off. Terminal: nothing changes an approved session.
#[derive(Debug)]
pub struct Approved {
    pub tally: TallyStore,
    pub completion: Completion,
    pub approval: Approval,
}

/// The chair's sign-off on a completed vote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub approver: VoterId,
    pub notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl Stage for Approved {
    fn status(&self) -> Status {
        Status::Approved
    }
}

impl Apply for Session<Approved> {
    #[tracing::instrument(skip(self), fields(session = %self.ballot.id))]
    fn apply(self, cmd: Command) -> Step {
        self.log_command(&cmd);

        match cmd {
            Command::Tick => self.accept(),
            cmd => self.out_of_stage(cmd.event()),
        }
    }
}
