use time::OffsetDateTime;

use crate::error::{PlenaryError, Result};
use crate::vote::config::VotingConfig;
use crate::vote::{SessionId, VoterId};

/// The question put to the assembly and how it is decided. Never changes once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ballot {
    pub id: SessionId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Number of cast votes that closes the session early.
    pub quorum: usize,
    /// Length of the voting window, in ticks.
    pub countdown: u64,
    pub created_by: Option<VoterId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Ballot {
    pub fn new(title: &str, quorum: usize, countdown: u64) -> Result<Ballot> {
        let ballot = Ballot {
            id: SessionId::generate(),
            title: title.trim().to_owned(),
            description: String::new(),
            quorum,
            countdown,
            created_by: None,
            created_at: OffsetDateTime::now_utc(),
        };
        ballot.validate()?;
        Ok(ballot)
    }

    /// Builds a ballot from a draft, taking whatever the draft leaves unset from `config`.
    pub(crate) fn from_draft(draft: NewBallot, config: &VotingConfig) -> Result<Ballot> {
        let mut ballot = Ballot::new(
            &draft.title,
            draft.quorum.unwrap_or(config.quorum),
            draft.countdown.unwrap_or(config.countdown),
        )?;
        ballot.description = draft.description.trim().to_owned();
        ballot.created_by = draft.created_by;
        Ok(ballot)
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(PlenaryError::validation("title", "must not be blank"));
        }
        if self.quorum == 0 {
            return Err(PlenaryError::validation("quorum", "must be at least 1"));
        }
        if self.countdown == 0 {
            return Err(PlenaryError::validation("countdown", "must be at least 1"));
        }

        Ok(())
    }
}

/// A ballot that has not been registered yet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewBallot {
    pub title: String,
    pub description: String,
    pub quorum: Option<usize>,
    pub countdown: Option<u64>,
    pub created_by: Option<VoterId>,
}

impl NewBallot {
    pub fn new(title: impl Into<String>) -> Self {
        NewBallot {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn quorum(mut self, quorum: usize) -> Self {
        self.quorum = Some(quorum);
        self
    }

    pub fn countdown(mut self, countdown: u64) -> Self {
        self.countdown = Some(countdown);
        self
    }

    pub fn created_by(mut self, member: impl Into<VoterId>) -> Self {
        self.created_by = Some(member.into());
        self
    }
}
