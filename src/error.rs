use crate::vote::{Event, SessionId, Status, VoterId};

pub type Result<T> = std::result::Result<T, PlenaryError>;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum PlenaryError {
    /// Bad constructor or command input.
    #[error("invalid {field}: {error_msg}")]
    Validation {
        field: &'static str,
        error_msg: String,
    },
    #[error("invalid choice {choice:?}, expected one of Yes, No, Abstain")]
    InvalidChoice { choice: String },
    #[error("{voter} has already voted")]
    DuplicateVote { voter: VoterId },
    /// A command arrived while the session was in a state that does not accept it.
    #[error("cannot {event} a session that is {state}")]
    InvalidStateTransition { state: Status, event: Event },
    #[error("session {id} not found")]
    NotFound { id: SessionId },
    #[error("no votes have been recorded")]
    EmptyTally,
    #[error("store error: {error_msg}")]
    Store { error_msg: String },
    #[error("config error: {error_msg}")]
    Config { error_msg: String },
    #[error("internal error: {error_msg}")]
    Internal { error_msg: String },
}

impl PlenaryError {
    pub(crate) fn validation(field: &'static str, error_msg: impl Into<String>) -> Self {
        PlenaryError::Validation {
            field,
            error_msg: error_msg.into(),
        }
    }
}

impl From<sled::Error> for PlenaryError {
    fn from(err: sled::Error) -> Self {
        PlenaryError::Store {
            error_msg: err.to_string(),
        }
    }
}

impl From<sled::transaction::TransactionError<sled::Error>> for PlenaryError {
    fn from(err: sled::transaction::TransactionError<sled::Error>) -> Self {
        PlenaryError::Store {
            error_msg: err.to_string(),
        }
    }
}

impl From<serde_json::error::Error> for PlenaryError {
    fn from(err: serde_json::error::Error) -> Self {
        PlenaryError::Store {
            error_msg: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for PlenaryError {
    fn from(err: config::ConfigError) -> Self {
        PlenaryError::Config {
            error_msg: err.to_string(),
        }
    }
}

impl From<uuid::Error> for PlenaryError {
    fn from(err: uuid::Error) -> Self {
        PlenaryError::validation("session id", err.to_string())
    }
}
