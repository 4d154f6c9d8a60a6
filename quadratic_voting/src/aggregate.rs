use log::{debug, warn};

use std::collections::{HashMap, HashSet};

use crate::config::*;
use crate::option_cost;

/// Sums the vote counts of every record, per option.
///
/// Every option of `options` is present in the result, with zero if nobody
/// voted for it. Counts for options that are not in `options` are ignored.
pub fn aggregate(records: &[VoteRecord], options: &[String]) -> AggregateResult {
    aggregate_with(records, options, AggregateMode::Votes)
}

pub fn aggregate_with(
    records: &[VoteRecord],
    options: &[String],
    mode: AggregateMode,
) -> AggregateResult {
    let positions: HashMap<&str, usize> = options
        .iter()
        .enumerate()
        .map(|(idx, o)| (o.as_str(), idx))
        .collect();
    let mut totals: Vec<u64> = vec![0; options.len()];
    for record in records {
        for (option, count) in record.ballot.allocation.iter() {
            match positions.get(option) {
                Some(idx) => {
                    let score = match mode {
                        AggregateMode::Votes => count as u64,
                        AggregateMode::Credits => option_cost(count),
                    };
                    totals[*idx] = totals[*idx].saturating_add(score);
                }
                None if count > 0 => {
                    warn!(
                        "aggregate: record #{} from {:?}: ignoring {} votes for unknown option {:?}",
                        record.seq, record.ballot.voter, count, option
                    );
                }
                None => {}
            }
        }
    }
    debug!(
        "aggregate: {} records, mode {:?} -> {:?}",
        records.len(),
        mode,
        totals
    );
    AggregateResult {
        totals: options.iter().cloned().zip(totals).collect(),
    }
}

/// Options ordered by total, highest first.
///
/// Ties keep the canonical order of the options.
pub fn rank(result: &AggregateResult) -> Vec<(String, u64)> {
    let mut res = result.totals.clone();
    // Stable sort: equal totals stay in canonical order.
    res.sort_by(|a, b| b.1.cmp(&a.1));
    res
}

/// Keeps the latest record of every voter, by submission time then by
/// submission order. The result is in submission order.
pub fn latest_per_voter(records: &[VoteRecord]) -> Vec<VoteRecord> {
    let mut latest: HashMap<&str, &VoteRecord> = HashMap::new();
    for record in records {
        let key = record.ballot.voter.as_str();
        let replace = match latest.get(key) {
            Some(cur) => {
                (record.ballot.submitted_at, record.seq) >= (cur.ballot.submitted_at, cur.seq)
            }
            None => true,
        };
        if replace {
            latest.insert(key, record);
        }
    }
    let mut res: Vec<VoteRecord> = latest.into_values().cloned().collect();
    res.sort_by_key(|r| r.seq);
    res
}

pub fn select_records(records: &[VoteRecord], policy: VoterPolicy) -> Vec<VoteRecord> {
    match policy {
        VoterPolicy::AllRecords => records.to_vec(),
        VoterPolicy::LatestPerVoter => latest_per_voter(records),
    }
}

/// Statistics over the records of the store (`all`) and the ones that were
/// actually counted.
pub fn statistics(all: &[VoteRecord], counted: &[VoteRecord]) -> VoteStatistics {
    let voters: HashSet<&str> = all.iter().map(|r| r.ballot.voter.as_str()).collect();
    VoteStatistics {
        total_records: all.len(),
        unique_voters: voters.len(),
        duplicate_records: all.len() - counted.len(),
        latest_submission: counted.iter().map(|r| r.ballot.submitted_at).max(),
    }
}

/// The counts of every record, with the options in the order of `ranking`.
pub fn voter_breakdown(records: &[VoteRecord], ranking: &[(String, u64)]) -> Vec<VoterRow> {
    records
        .iter()
        .map(|r| VoterRow {
            voter: r.ballot.voter.clone(),
            submitted_at: r.ballot.submitted_at,
            counts: ranking
                .iter()
                .map(|(option, _)| r.ballot.allocation.count(option))
                .collect(),
        })
        .collect()
}
