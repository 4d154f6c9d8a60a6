// The vote store on disk: a JSON Lines file with one ballot per line.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use quadratic_voting::store::VoteStore;
use quadratic_voting::*;

use crate::qv::io_common::{format_datetime, parse_datetime};

/// A ballot, as written in the file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StoredVote {
    pub username: String,
    pub votes: BTreeMap<String, u32>,
    pub vote_datetime: String,
}

impl From<&Ballot> for StoredVote {
    fn from(ballot: &Ballot) -> Self {
        StoredVote {
            username: ballot.voter.clone(),
            votes: ballot
                .allocation
                .iter()
                .map(|(o, c)| (o.to_string(), c))
                .collect(),
            vote_datetime: format_datetime(&ballot.submitted_at),
        }
    }
}

pub struct JsonLinesVoteStore {
    path: PathBuf,
}

impl JsonLinesVoteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> JsonLinesVoteStore {
        JsonLinesVoteStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn read_lines(&self) -> Result<Vec<(usize, String)>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(non_blank_lines(&contents)),
            // Nobody voted yet.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).context(UnavailableSnafu {
                path: self.display_path(),
            }),
        }
    }

    fn parse_line(&self, lineno: usize, line: &str) -> Result<Ballot, StoreError> {
        let sv: StoredVote = serde_json::from_str(line).map_err(|e| StoreError::Corrupt {
            path: self.display_path(),
            line: lineno,
            message: e.to_string(),
        })?;
        let submitted_at = parse_datetime(&sv.vote_datetime).context(CorruptSnafu {
            path: self.display_path(),
            line: lineno,
            message: format!("cannot read the date {:?}", sv.vote_datetime),
        })?;
        Ok(Ballot {
            voter: sv.username,
            allocation: sv.votes.into_iter().collect(),
            submitted_at,
        })
    }

    // Counts the records and appends the line while holding an exclusive
    // lock on the file, so that concurrent writers get distinct numbers.
    fn locked_append(&self, file: &mut File, line: &str) -> io::Result<u64> {
        file.lock_exclusive()?;
        let mut contents = String::new();
        let res = file
            .read_to_string(&mut contents)
            .and_then(|_| file.write_all(line.as_bytes()))
            .map(|_| non_blank_lines(&contents).len() as u64 + 1);
        file.unlock()?;
        res
    }
}

fn non_blank_lines(contents: &str) -> Vec<(usize, String)> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(idx, l)| (idx + 1, l.to_string()))
        .collect()
}

impl VoteStore for JsonLinesVoteStore {
    fn append(&self, ballot: &Ballot) -> Result<u64, StoreError> {
        let mut line = serde_json::to_string(&StoredVote::from(ballot)).map_err(|e| {
            StoreError::Encoding {
                path: self.display_path(),
                message: e.to_string(),
            }
        })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .context(UnavailableSnafu {
                path: self.display_path(),
            })?;
        let seq = self
            .locked_append(&mut file, &line)
            .context(UnavailableSnafu {
                path: self.display_path(),
            })?;
        debug!(
            "JsonLinesVoteStore::append: {} -> #{}: {}",
            self.display_path(),
            seq,
            line.trim_end()
        );
        Ok(seq)
    }

    fn read_all(&self) -> Result<Vec<VoteRecord>, StoreError> {
        let mut res: Vec<VoteRecord> = Vec::new();
        for (lineno, line) in self.read_lines()? {
            let ballot = self.parse_line(lineno, &line)?;
            res.push(VoteRecord {
                seq: (res.len() + 1) as u64,
                ballot,
            });
        }
        debug!(
            "JsonLinesVoteStore::read_all: {} records from {}",
            res.len(),
            self.display_path()
        );
        Ok(res)
    }
}
