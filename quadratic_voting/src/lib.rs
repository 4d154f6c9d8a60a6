mod aggregate;
pub mod builder;
mod config;
pub mod manual;
pub mod store;

use log::{debug, info};
use snafu::prelude::*;
use std::collections::HashSet;
use std::num::IntErrorKind;

pub use crate::aggregate::*;
pub use crate::config::*;
use crate::store::VoteStore;

/// Credits spent by casting `votes` votes on a single option.
pub fn option_cost(votes: u32) -> u64 {
    let v = votes as u64;
    v * v
}

/// Total quadratic cost of an allocation: the sum of the squared counts.
///
/// Doubling the votes on one option quadruples what this option costs.
pub fn compute_cost(allocation: &VoteAllocation) -> u64 {
    allocation
        .iter()
        .map(|(_, n)| option_cost(n))
        .fold(0, u64::saturating_add)
}

pub fn remaining_credits(allocation: &VoteAllocation, config: &PollConfig) -> u64 {
    config.credits.saturating_sub(compute_cost(allocation))
}

/// The largest count that `option` can take, keeping the counts of the other
/// options as they are in `allocation`.
pub fn max_votes_for_option(option: &str, allocation: &VoteAllocation, config: &PollConfig) -> u32 {
    let others = compute_cost(allocation) - option_cost(allocation.count(option));
    let theoretical = integer_sqrt(config.credits.saturating_sub(others));
    let res = if single_option_capped(config) {
        theoretical.min(integer_sqrt(config.credits - 1))
    } else {
        theoretical
    };
    res.min(u32::MAX as u64) as u32
}

/// True if one more vote on at least one option still fits in the budget.
pub fn can_vote_more(allocation: &VoteAllocation, config: &PollConfig) -> bool {
    let remaining = remaining_credits(allocation, config);
    config.options.iter().any(|option| {
        let current = allocation.count(option);
        let next = current.saturating_add(1);
        let marginal = option_cost(next) - option_cost(current);
        let hits_single_cap = single_option_capped(config) && option_cost(next) >= config.credits;
        remaining >= marginal && !hits_single_cap
    })
}

pub fn credit_status(allocation: &VoteAllocation, config: &PollConfig) -> CreditStatus {
    if remaining_credits(allocation, config) == 0 {
        CreditStatus::Exhausted
    } else if can_vote_more(allocation, config) {
        CreditStatus::Open
    } else {
        CreditStatus::Stranded
    }
}

/// Reads `OPTION=COUNT` entries as typed by a voter.
///
/// Only the shape is checked here: the options and the signs of the counts
/// are checked by [`validate_allocation`].
pub fn parse_vote_entries(entries: &[String]) -> Result<Vec<(String, i64)>, ValidationError> {
    let mut res: Vec<(String, i64)> = Vec::new();
    for entry in entries {
        let (option, raw) = entry
            .rsplit_once('=')
            .context(MalformedEntrySnafu { entry: entry.clone() })?;
        let option = option.trim();
        ensure!(
            !option.is_empty(),
            MalformedEntrySnafu {
                entry: entry.clone()
            }
        );
        let raw = raw.trim();
        let count = match raw.parse::<i64>() {
            Ok(count) => count,
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    return CountOutOfRangeSnafu { option, count: raw }.fail()
                }
                _ => return NonIntegerCountSnafu { option, raw }.fail(),
            },
        };
        res.push((option.to_string(), count));
    }
    debug!("parse_vote_entries: {:?} -> {:?}", entries, res);
    Ok(res)
}

/// Turns raw counts into an allocation that satisfies every constraint of
/// the poll. Options that are not mentioned get a count of zero.
///
/// The returned allocation lists every option, in canonical order.
pub fn validate_allocation(
    counts: &[(String, i64)],
    config: &PollConfig,
) -> Result<VoteAllocation, ValidationError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for (option, count) in counts {
        ensure!(
            config.has_option(option),
            UnknownOptionSnafu {
                option: option.clone()
            }
        );
        ensure!(
            seen.insert(option.as_str()),
            RepeatedOptionSnafu {
                option: option.clone()
            }
        );
        ensure!(
            *count >= 0,
            NegativeCountSnafu {
                option: option.clone(),
                count: *count
            }
        );
        ensure!(
            *count <= u32::MAX as i64,
            CountOutOfRangeSnafu {
                option: option.clone(),
                count: count.to_string()
            }
        );
    }

    let allocation: VoteAllocation = config
        .options
        .iter()
        .map(|option| {
            let count = counts
                .iter()
                .find(|(o, _)| o == option)
                .map(|(_, c)| *c as u32)
                .unwrap_or(0);
            (option.clone(), count)
        })
        .collect();

    let cost = compute_cost(&allocation);
    ensure!(
        cost <= config.credits,
        OverBudgetSnafu {
            cost,
            credits: config.credits
        }
    );

    if single_option_capped(config) {
        if let Some((option, count)) = allocation
            .iter()
            .find(|(_, c)| option_cost(*c) >= config.credits)
        {
            return FullBudgetOnOneOptionSnafu {
                option,
                cost: option_cost(count),
                credits: config.credits,
            }
            .fail();
        }
    }

    if config.rules.require_spent_credits {
        ensure!(
            credit_status(&allocation, config) != CreditStatus::Open,
            CreditsUnspentSnafu {
                remaining: config.credits - cost
            }
        );
    }

    Ok(allocation)
}

/// Validates a submission and, if it is acceptable, appends exactly one
/// record to the store.
///
/// Nothing is written when the submission is rejected.
pub fn validate_and_submit<S: VoteStore + ?Sized>(
    submission: &Submission,
    config: &PollConfig,
    store: &S,
) -> Result<SubmitReceipt, SubmitError> {
    let voter = check_voter(&submission.voter).context(RejectedSnafu)?;
    let allocation = validate_allocation(&submission.counts, config).context(RejectedSnafu)?;
    let cost = compute_cost(&allocation);
    let status = credit_status(&allocation, config);
    let ballot = Ballot {
        voter: voter.to_string(),
        allocation,
        submitted_at: submission.submitted_at,
    };
    let seq = store.append(&ballot).context(StoreSnafu)?;
    info!(
        "validate_and_submit: recorded ballot #{} from {:?}: cost {} / {}",
        seq, ballot.voter, cost, config.credits
    );
    Ok(SubmitReceipt {
        seq,
        cost,
        remaining: config.credits - cost,
        status,
    })
}

fn check_voter(voter: &str) -> Result<&str, ValidationError> {
    let voter = voter.trim();
    ensure!(!voter.is_empty(), MissingVoterSnafu);
    Ok(voter)
}

fn single_option_capped(config: &PollConfig) -> bool {
    config.rules.forbid_full_budget_on_one_option && config.options.len() > 1
}

fn integer_sqrt(n: u64) -> u64 {
    let mut x = (n as f64).sqrt() as u64;
    while x.checked_mul(x).map_or(true, |sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).map_or(false, |sq| sq <= n) {
        x += 1;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PollBuilder;
    use crate::store::MemoryVoteStore;
    use chrono::NaiveDate;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn alloc(xs: &[(&str, u32)]) -> VoteAllocation {
        xs.iter().map(|(o, c)| (o.to_string(), *c)).collect()
    }

    fn counts(xs: &[(&str, i64)]) -> Vec<(String, i64)> {
        xs.iter().map(|(o, c)| (o.to_string(), *c)).collect()
    }

    fn poll(options: &[&str], credits: i64, rules: PollRules) -> PollConfig {
        let options: Vec<String> = options.iter().map(|s| s.to_string()).collect();
        PollBuilder::new()
            .title("test")
            .options(&options)
            .credits(credits)
            .rules(rules)
            .build()
            .unwrap()
    }

    fn submission(voter: &str, xs: &[(&str, i64)]) -> Submission {
        Submission {
            voter: voter.to_string(),
            counts: counts(xs),
            submitted_at: NaiveDate::from_ymd_opt(2025, 7, 1)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn cost_is_sum_of_squares() {
        assert_eq!(compute_cost(&VoteAllocation::default()), 0);
        assert_eq!(compute_cost(&alloc(&[("A", 1)])), 1);
        assert_eq!(compute_cost(&alloc(&[("A", 2)])), 4);
        assert_eq!(compute_cost(&alloc(&[("A", 3), ("B", 4)])), 25);
        assert_eq!(compute_cost(&alloc(&[("A", 0), ("B", 0)])), 0);
    }

    #[test]
    fn cost_saturates() {
        let a = alloc(&[("A", u32::MAX), ("B", u32::MAX)]);
        assert_eq!(compute_cost(&a), u64::MAX);
    }

    #[test]
    fn accepts_exact_budget() {
        init();
        let config = poll(&["A", "B"], 100, PollRules::DEFAULT_RULES);
        let store = MemoryVoteStore::new();
        let receipt = validate_and_submit(&submission("x", &[("A", 10)]), &config, &store).unwrap();
        assert_eq!(receipt.cost, 100);
        assert_eq!(receipt.remaining, 0);
        assert_eq!(receipt.status, CreditStatus::Exhausted);
        assert_eq!(receipt.seq, 1);
        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ballot.allocation.count("A"), 10);
        assert_eq!(records[0].ballot.allocation.count("B"), 0);
    }

    #[test]
    fn rejects_over_budget() {
        let config = poll(&["A", "B"], 100, PollRules::DEFAULT_RULES);
        let store = MemoryVoteStore::new();
        let res = validate_and_submit(&submission("x", &[("A", 10), ("B", 1)]), &config, &store);
        match res {
            Err(SubmitError::Rejected { source }) => assert_eq!(
                source,
                ValidationError::OverBudget {
                    cost: 101,
                    credits: 100
                }
            ),
            x => panic!("unexpected result {:?}", x),
        }
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn rejects_unknown_and_negative_without_writing() {
        let config = poll(&["A", "B"], 100, PollRules::DEFAULT_RULES);
        let store = MemoryVoteStore::new();

        let res = validate_and_submit(&submission("x", &[("Z", 1)]), &config, &store);
        assert!(matches!(
            res,
            Err(SubmitError::Rejected {
                source: ValidationError::UnknownOption { .. }
            })
        ));

        let res = validate_and_submit(&submission("x", &[("A", -1)]), &config, &store);
        assert!(matches!(
            res,
            Err(SubmitError::Rejected {
                source: ValidationError::NegativeCount { count: -1, .. }
            })
        ));

        let res = validate_and_submit(&submission("x", &[("A", 1), ("A", 2)]), &config, &store);
        assert!(matches!(
            res,
            Err(SubmitError::Rejected {
                source: ValidationError::RepeatedOption { .. }
            })
        ));

        let res = validate_and_submit(&submission("x", &[("A", 1i64 << 40)]), &config, &store);
        assert!(matches!(
            res,
            Err(SubmitError::Rejected {
                source: ValidationError::CountOutOfRange { .. }
            })
        ));

        let res = validate_and_submit(&submission("  ", &[("A", 1)]), &config, &store);
        assert!(matches!(
            res,
            Err(SubmitError::Rejected {
                source: ValidationError::MissingVoter {}
            })
        ));

        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn parses_entries() {
        let entries: Vec<String> = vec!["温泉=5".to_string(), " BBQ = 2 ".to_string()];
        assert_eq!(
            parse_vote_entries(&entries).unwrap(),
            counts(&[("温泉", 5), ("BBQ", 2)])
        );

        let res = parse_vote_entries(&["A=2.5".to_string()]);
        assert_eq!(
            res,
            Err(ValidationError::NonIntegerCount {
                option: "A".to_string(),
                raw: "2.5".to_string()
            })
        );

        let res = parse_vote_entries(&["A".to_string()]);
        assert!(matches!(res, Err(ValidationError::MalformedEntry { .. })));
        let res = parse_vote_entries(&["=3".to_string()]);
        assert!(matches!(res, Err(ValidationError::MalformedEntry { .. })));

        let res = parse_vote_entries(&["A=99999999999999999999".to_string()]);
        assert_eq!(
            res,
            Err(ValidationError::CountOutOfRange {
                option: "A".to_string(),
                count: "99999999999999999999".to_string()
            })
        );
        let res = parse_vote_entries(&["A=-99999999999999999999".to_string()]);
        assert!(matches!(res, Err(ValidationError::CountOutOfRange { .. })));

        // The sign is kept, it is rejected later.
        assert_eq!(
            parse_vote_entries(&["A=-3".to_string()]).unwrap(),
            counts(&[("A", -3)])
        );
    }

    #[test]
    fn single_option_rule() {
        let rules = PollRules {
            forbid_full_budget_on_one_option: true,
            ..PollRules::DEFAULT_RULES
        };
        let config = poll(&["A", "B"], 100, rules);
        let res = validate_allocation(&counts(&[("A", 10)]), &config);
        assert_eq!(
            res,
            Err(ValidationError::FullBudgetOnOneOption {
                option: "A".to_string(),
                cost: 100,
                credits: 100
            })
        );
        assert!(validate_allocation(&counts(&[("A", 9), ("B", 4)]), &config).is_ok());

        // With a single option, the rule does not apply.
        let config = poll(&["A"], 100, rules);
        assert!(validate_allocation(&counts(&[("A", 10)]), &config).is_ok());
    }

    #[test]
    fn spent_credits_rule() {
        let rules = PollRules {
            require_spent_credits: true,
            ..PollRules::DEFAULT_RULES
        };
        let config = poll(&["A", "B"], 100, rules);
        assert_eq!(
            validate_allocation(&counts(&[("A", 5)]), &config),
            Err(ValidationError::CreditsUnspent { remaining: 75 })
        );
        // 81 + 16 = 97: 3 credits left, but the cheapest next vote costs 5.
        assert!(validate_allocation(&counts(&[("A", 9), ("B", 4)]), &config).is_ok());
    }

    #[test]
    fn planning_helpers() {
        let config = poll(&["A", "B", "C"], 100, PollRules::DEFAULT_RULES);
        let a = alloc(&[("A", 6), ("B", 0), ("C", 0)]);
        assert_eq!(remaining_credits(&a, &config), 64);
        assert_eq!(max_votes_for_option("A", &a, &config), 10);
        assert_eq!(max_votes_for_option("B", &a, &config), 8);
        assert_eq!(credit_status(&a, &config), CreditStatus::Open);

        let a = alloc(&[("A", 9), ("B", 4), ("C", 1)]);
        assert_eq!(remaining_credits(&a, &config), 2);
        assert!(!can_vote_more(&a, &config));
        assert_eq!(credit_status(&a, &config), CreditStatus::Stranded);

        let a = alloc(&[("A", 6), ("B", 8)]);
        assert_eq!(credit_status(&a, &config), CreditStatus::Exhausted);

        let rules = PollRules {
            forbid_full_budget_on_one_option: true,
            ..PollRules::DEFAULT_RULES
        };
        let config = poll(&["A", "B"], 100, rules);
        assert_eq!(
            max_votes_for_option("A", &VoteAllocation::default(), &config),
            9
        );
    }

    #[test]
    fn integer_sqrt_is_exact() {
        for n in [0u64, 1, 2, 3, 4, 15, 16, 17, 99, 100, 101, u64::MAX] {
            let r = integer_sqrt(n);
            assert!(r * r <= n);
            assert!((r + 1).checked_mul(r + 1).map_or(true, |sq| sq > n));
        }
    }
}
