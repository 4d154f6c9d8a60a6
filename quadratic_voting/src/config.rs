// ********* Poll configuration ***********

use chrono::NaiveDateTime;
use snafu::Snafu;

/// Restrictions on how a voter may spread credits, on top of the budget itself.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct PollRules {
    /// When the poll has more than one option, a single option may not
    /// absorb the whole budget: `count² >= credits` is rejected.
    pub forbid_full_budget_on_one_option: bool,
    /// Rejects submissions that leave credits unspent while another whole
    /// vote would still fit in the budget.
    pub require_spent_credits: bool,
}

impl PollRules {
    pub const DEFAULT_RULES: PollRules = PollRules {
        forbid_full_budget_on_one_option: false,
        require_spent_credits: false,
    };
}

impl Default for PollRules {
    fn default() -> Self {
        PollRules::DEFAULT_RULES
    }
}

/// A validated poll: title, options in display order and the credit budget
/// of every voter.
///
/// It is immutable once built. Use [`crate::builder::PollBuilder`] to
/// create one.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PollConfig {
    pub(crate) title: String,
    pub(crate) options: Vec<String>,
    pub(crate) credits: u64,
    pub(crate) rules: PollRules,
}

impl PollConfig {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The options, in canonical (display) order.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn credits(&self) -> u64 {
        self.credits
    }

    pub fn rules(&self) -> PollRules {
        self.rules
    }

    /// Position of the option in the canonical order.
    pub fn position(&self, option: &str) -> Option<usize> {
        self.options.iter().position(|o| o == option)
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.position(option).is_some()
    }
}

// ********* Votes ***********

/// Vote counts per option for one submission.
///
/// Counts are non-negative by construction. An option that is not listed
/// has a count of zero.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct VoteAllocation {
    counts: Vec<(String, u32)>,
}

impl VoteAllocation {
    pub fn count(&self, option: &str) -> u32 {
        self.counts
            .iter()
            .find(|(o, _)| o == option)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(o, c)| (o.as_str(), *c))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Replaces the count of an option, adding it if missing.
    pub fn set(&mut self, option: &str, count: u32) {
        match self.counts.iter_mut().find(|(o, _)| o == option) {
            Some(entry) => entry.1 = count,
            None => self.counts.push((option.to_string(), count)),
        }
    }
}

impl FromIterator<(String, u32)> for VoteAllocation {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut res = VoteAllocation::default();
        for (option, count) in iter {
            res.set(&option, count);
        }
        res
    }
}

/// A raw submission, as received from a voter, before any validation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Submission {
    pub voter: String,
    pub counts: Vec<(String, i64)>,
    pub submitted_at: NaiveDateTime,
}

/// A validated allocation, ready to be appended to a store.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    pub voter: String,
    pub allocation: VoteAllocation,
    pub submitted_at: NaiveDateTime,
}

/// A ballot as persisted in a store.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRecord {
    /// Submission order in the store, starting at 1.
    pub seq: u64,
    pub ballot: Ballot,
}

/// Where a voter stands with respect to the budget.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CreditStatus {
    /// Every credit has been spent.
    Exhausted,
    /// Some credits are left, but no further vote fits in them.
    Stranded,
    /// At least one more vote can be added.
    Open,
}

/// Returned on a successful submission.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct SubmitReceipt {
    pub seq: u64,
    pub cost: u64,
    pub remaining: u64,
    pub status: CreditStatus,
}

// ******** Aggregation *********

/// What is summed across records.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AggregateMode {
    /// The vote counts.
    Votes,
    /// The quadratic costs (credits spent).
    Credits,
}

/// Which records are counted.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum VoterPolicy {
    AllRecords,
    /// Only the latest record of every voter.
    LatestPerVoter,
}

/// Totals per option, always in the canonical option order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AggregateResult {
    pub(crate) totals: Vec<(String, u64)>,
}

impl AggregateResult {
    /// Builds a result from arbitrary totals. Options absent from `totals`
    /// get zero; totals for options outside of `options` are dropped.
    pub fn from_totals(options: &[String], totals: &[(String, u64)]) -> AggregateResult {
        AggregateResult {
            totals: options
                .iter()
                .map(|o| {
                    let t = totals
                        .iter()
                        .filter(|(name, _)| name == o)
                        .map(|(_, t)| *t)
                        .sum();
                    (o.clone(), t)
                })
                .collect(),
        }
    }

    pub fn total(&self, option: &str) -> Option<u64> {
        self.totals.iter().find(|(o, _)| o == option).map(|p| p.1)
    }

    pub fn totals(&self) -> &[(String, u64)] {
        &self.totals
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteStatistics {
    pub total_records: usize,
    pub unique_voters: usize,
    pub duplicate_records: usize,
    pub latest_submission: Option<NaiveDateTime>,
}

/// One row of the per-voter breakdown, with counts in ranking order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoterRow {
    pub voter: String,
    pub submitted_at: NaiveDateTime,
    pub counts: Vec<u32>,
}

// ********* Errors **********

/// The poll configuration is not usable. Fatal at startup.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("the poll configuration is missing the field `{field}`"))]
    MissingField { field: &'static str },
    #[snafu(display("the poll title is empty"))]
    EmptyTitle {},
    #[snafu(display("credits must be a positive integer, got {credits}"))]
    NonPositiveCredits { credits: i64 },
    #[snafu(display("the poll has no options"))]
    NoOptions {},
    #[snafu(display("option #{position} has an empty name"))]
    EmptyOption { position: usize },
    #[snafu(display("option {option:?} is listed more than once"))]
    DuplicateOption { option: String },
}

/// A submission was rejected. Nothing has been written.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum ValidationError {
    #[snafu(display("the voter name is empty"))]
    MissingVoter {},
    #[snafu(display("cannot read {entry:?}: expected OPTION=COUNT"))]
    MalformedEntry { entry: String },
    #[snafu(display("the count {raw:?} for {option:?} is not an integer"))]
    NonIntegerCount { option: String, raw: String },
    #[snafu(display("the count for {option:?} is negative ({count})"))]
    NegativeCount { option: String, count: i64 },
    #[snafu(display("the count for {option:?} is out of range ({count})"))]
    CountOutOfRange { option: String, count: String },
    #[snafu(display("{option:?} is not an option of this poll"))]
    UnknownOption { option: String },
    #[snafu(display("{option:?} appears more than once"))]
    RepeatedOption { option: String },
    #[snafu(display("the allocation costs {cost} credits but only {credits} are available"))]
    OverBudget { cost: u64, credits: u64 },
    #[snafu(display(
        "{option:?} would take {cost} of the {credits} credits: the whole budget cannot go to one option"
    ))]
    FullBudgetOnOneOption {
        option: String,
        cost: u64,
        credits: u64,
    },
    #[snafu(display("{remaining} credits are left and more votes can still be cast"))]
    CreditsUnspent { remaining: u64 },
}

/// The vote store could not be read or written.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("vote store {path} is unavailable"))]
    Unavailable {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("vote store {path}: record on line {line} is unreadable: {message}"))]
    Corrupt {
        path: String,
        line: usize,
        message: String,
    },
    #[snafu(display("vote store {path}: cannot encode record: {message}"))]
    Encoding { path: String, message: String },
    #[snafu(display("vote store lock was poisoned"))]
    Poisoned {},
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SubmitError {
    #[snafu(display("submission rejected: {source}"))]
    Rejected { source: ValidationError },
    #[snafu(display("submission failed: {source}"))]
    Store { source: StoreError },
}
