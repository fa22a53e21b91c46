use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::error::{PlenaryError, Result};
use crate::vote::snapshot::{CastVote, TallyCounts};
use crate::vote::{Choice, VoterId};

/// Every vote cast in one session. A member votes at most once: the first vote stands and any
/// later attempt is rejected.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TallyStore {
    votes: Vec<CastVote>,
    voters: HashMap<VoterId, Choice>,
    counts: [usize; 3],
}

impl TallyStore {
    pub fn new() -> TallyStore {
        TallyStore::default()
    }

    /// Rebuilds a tally from previously recorded votes, in their original order.
    pub fn from_votes(votes: impl IntoIterator<Item = CastVote>) -> Result<TallyStore> {
        let mut tally = TallyStore::new();
        for vote in votes {
            tally.cast(&vote.voter, vote.choice)?;
        }
        Ok(tally)
    }

    pub fn cast(&mut self, voter: &str, choice: Choice) -> Result<()> {
        if voter.trim().is_empty() {
            return Err(PlenaryError::validation("voter", "must not be blank"));
        }

        match self.voters.entry(voter.to_owned()) {
            Entry::Occupied(entry) => Err(PlenaryError::DuplicateVote {
                voter: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(choice);
                self.counts[choice.slot()] += 1;
                self.votes.push(CastVote {
                    voter: voter.to_owned(),
                    choice,
                });
                Ok(())
            }
        }
    }

    pub fn choice_of(&self, voter: &str) -> Option<Choice> {
        self.voters.get(voter).copied()
    }

    #[inline]
    pub fn count(&self, choice: Choice) -> usize {
        self.counts[choice.slot()]
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Share of the votes that went to `choice`, out of 100. Fails with
    /// [`PlenaryError::EmptyTally`] when nobody has voted.
    pub fn percentage(&self, choice: Choice) -> Result<f64> {
        self.counts().percentage(choice)
    }

    pub fn counts(&self) -> TallyCounts {
        TallyCounts {
            yes: self.count(Choice::Yes),
            no: self.count(Choice::No),
            abstain: self.count(Choice::Abstain),
            total: self.total(),
        }
    }

    /// A copy of every vote in the order it was cast.
    pub fn snapshot(&self) -> Vec<CastVote> {
        self.votes.clone()
    }
}
