//! Live votes for a legislative assembly: ballots are opened, members cast Yes, No or Abstain
//! against a countdown, and the closed result is signed off by an approver.

pub mod config;
pub mod error;
pub mod util;
pub mod vote;

use std::sync::Arc;

use crate::config::PlenaryConfig;
use crate::error::{PlenaryError, Result};
use crate::vote::{Server, SledStore, SnapshotStore};

#[macro_use]
extern crate serde_derive;

/// Opens the snapshot database named by `config` and returns a server holding every session
/// found in it. Countdowns of sessions left open are not restarted until [`Server::resume`].
pub fn plenary(config: &PlenaryConfig) -> Result<Server> {
    config.voting.validate().map_err(|err| PlenaryError::Config {
        error_msg: err.to_string(),
    })?;

    let store = Arc::new(SledStore::open(&config.store.path)?);
    let snapshots = store.load()?;
    let server = Server::new(config.voting.clone(), store);
    server.registry().restore(snapshots)?;
    Ok(server)
}
