use std::sync::Mutex;

use log::debug;

use crate::config::*;

/// An append-only collection of ballots.
///
/// Implementations must be safe to share between concurrent submissions:
/// two concurrent appends each result in exactly one new record.
pub trait VoteStore {
    /// Appends one ballot and returns its submission order (starting at 1).
    fn append(&self, ballot: &Ballot) -> Result<u64, StoreError>;

    /// All the records, in submission order.
    fn read_all(&self) -> Result<Vec<VoteRecord>, StoreError>;
}

/// A store that lives in memory. Every instance is independent.
#[derive(Debug, Default)]
pub struct MemoryVoteStore {
    ballots: Mutex<Vec<Ballot>>,
}

impl MemoryVoteStore {
    pub fn new() -> MemoryVoteStore {
        MemoryVoteStore::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let ballots = self.ballots.lock().map_err(|_| StoreError::Poisoned {})?;
        Ok(ballots.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl VoteStore for MemoryVoteStore {
    fn append(&self, ballot: &Ballot) -> Result<u64, StoreError> {
        let mut ballots = self.ballots.lock().map_err(|_| StoreError::Poisoned {})?;
        ballots.push(ballot.clone());
        debug!(
            "MemoryVoteStore::append: voter {:?} -> seq {}",
            ballot.voter,
            ballots.len()
        );
        Ok(ballots.len() as u64)
    }

    fn read_all(&self) -> Result<Vec<VoteRecord>, StoreError> {
        let ballots = self.ballots.lock().map_err(|_| StoreError::Poisoned {})?;
        Ok(ballots
            .iter()
            .enumerate()
            .map(|(idx, b)| VoteRecord {
                seq: (idx + 1) as u64,
                ballot: b.clone(),
            })
            .collect())
    }
}
