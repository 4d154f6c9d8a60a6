use log::{debug, info, warn};

use quadratic_voting::store::VoteStore;
use quadratic_voting::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Args, Command, ModeArg};
use crate::qv::chart::render_bar_chart;
use crate::qv::config_reader::*;
use crate::qv::io_common::*;
use crate::qv::io_jsonl::JsonLinesVoteStore;
use crate::qv::io_table::write_voter_table;

pub mod chart;
pub mod config_reader;
pub mod io_common;
pub mod io_jsonl;
pub mod io_table;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum QvError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}: {source}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid poll configuration in {path}: {source}"))]
    Config {
        source: ConfigError,
        path: String,
    },
    #[snafu(display("{source}"))]
    Submit { source: SubmitError },
    #[snafu(display("{source}"))]
    InvalidInput { source: ValidationError },
    #[snafu(display("{source}"))]
    Store { source: StoreError },
    #[snafu(display("Error writing the table {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type QvResult<T> = Result<T, QvError>;

pub fn run(args: &Args) -> QvResult<()> {
    let config = read_poll_config(&args.config)?;
    info!(
        "Poll {:?}: {} options, {} credits",
        config.title(),
        config.options().len(),
        config.credits()
    );
    let store = JsonLinesVoteStore::new(&args.store);
    match &args.command {
        Command::Check => run_check(&config),
        Command::Quote { votes } => run_quote(&config, votes),
        Command::Vote { voter, votes } => run_vote(&config, &store, voter, votes),
        Command::Results {
            mode,
            latest_per_voter,
            out,
            reference,
            table,
        } => {
            let mode = match mode {
                ModeArg::Votes => AggregateMode::Votes,
                ModeArg::Credits => AggregateMode::Credits,
            };
            let policy = if *latest_per_voter {
                VoterPolicy::LatestPerVoter
            } else {
                VoterPolicy::AllRecords
            };
            run_results(
                &config,
                &store,
                mode,
                policy,
                out.as_deref(),
                reference.as_deref(),
                table.as_deref(),
            )
        }
    }
}

fn run_check(config: &PollConfig) -> QvResult<()> {
    println!("{}", config.title());
    println!("credits per voter: {}", config.credits());
    for (idx, option) in config.options().iter().enumerate() {
        println!("{:>3}. {}", idx + 1, option);
    }
    let rules = config.rules();
    if rules.forbid_full_budget_on_one_option {
        println!("rule: the whole budget cannot go to a single option");
    }
    if rules.require_spent_credits {
        println!("rule: credits must be spent while votes still fit");
    }
    Ok(())
}

/// The allocation of a quote. Unlike a ballot, it may exceed the budget so
/// that the voter can see by how much.
fn quote_allocation(config: &PollConfig, counts: &[(String, i64)]) -> QvResult<VoteAllocation> {
    let mut allocation: VoteAllocation = config
        .options()
        .iter()
        .map(|o| (o.clone(), 0))
        .collect();
    for (option, count) in counts {
        let checked = if !config.has_option(option) {
            Err(ValidationError::UnknownOption {
                option: option.clone(),
            })
        } else if *count < 0 {
            Err(ValidationError::NegativeCount {
                option: option.clone(),
                count: *count,
            })
        } else if *count > u32::MAX as i64 {
            Err(ValidationError::CountOutOfRange {
                option: option.clone(),
                count: count.to_string(),
            })
        } else {
            Ok(*count as u32)
        };
        allocation.set(option, checked.context(InvalidInputSnafu)?);
    }
    Ok(allocation)
}

fn run_quote(config: &PollConfig, votes: &[String]) -> QvResult<()> {
    let counts = parse_vote_entries(votes).context(InvalidInputSnafu)?;
    let allocation = quote_allocation(config, &counts)?;
    print!("{}", describe_allocation(config, &allocation));
    if let Err(e) = validate_allocation(&counts, config) {
        println!("this ballot would be rejected: {}", e);
    }
    Ok(())
}

fn describe_allocation(config: &PollConfig, allocation: &VoteAllocation) -> String {
    let mut res = String::new();
    for option in config.options() {
        let n = allocation.count(option);
        res.push_str(&format!(
            "{}: {} votes, {} credits (at most {} votes)\n",
            option,
            n,
            option_cost(n),
            max_votes_for_option(option, allocation, config)
        ));
    }
    let cost = compute_cost(allocation);
    res.push_str(&format!(
        "total: {} / {} credits, {} remaining ({})\n",
        cost,
        config.credits(),
        remaining_credits(allocation, config),
        status_message(credit_status(allocation, config))
    ));
    res
}

fn status_message(status: CreditStatus) -> &'static str {
    match status {
        CreditStatus::Exhausted => "all credits are spent",
        CreditStatus::Stranded => "no further vote fits in the remaining credits",
        CreditStatus::Open => "more votes can be cast",
    }
}

fn run_vote<S: VoteStore + ?Sized>(
    config: &PollConfig,
    store: &S,
    voter: &str,
    votes: &[String],
) -> QvResult<()> {
    let counts = parse_vote_entries(votes).context(InvalidInputSnafu)?;
    let submission = Submission {
        voter: voter.to_string(),
        counts,
        submitted_at: now(),
    };
    let receipt = validate_and_submit(&submission, config, store).context(SubmitSnafu)?;
    println!(
        "ballot #{} recorded at {}: {} credits used, {} remaining ({})",
        receipt.seq,
        format_datetime(&submission.submitted_at),
        receipt.cost,
        receipt.remaining,
        status_message(receipt.status)
    );
    Ok(())
}

pub fn build_summary_js(
    config: &PollConfig,
    mode: AggregateMode,
    ranking: &[(String, u64)],
    stats: &VoteStatistics,
) -> JSValue {
    let results: Vec<JSValue> = ranking
        .iter()
        .enumerate()
        .map(|(idx, (option, total))| json!({"rank": idx + 1, "option": option, "total": total}))
        .collect();
    json!({
        "poll": {
            "title": config.title(),
            "credits": config.credits(),
            "options": config.options(),
        },
        "mode": match mode {
            AggregateMode::Votes => "votes",
            AggregateMode::Credits => "credits",
        },
        "results": results,
        "stats": {
            "totalRecords": stats.total_records,
            "uniqueVoters": stats.unique_voters,
            "duplicateRecords": stats.duplicate_records,
            "latestSubmission": stats.latest_submission.as_ref().map(format_datetime),
        }
    })
}

pub fn run_results<S: VoteStore + ?Sized>(
    config: &PollConfig,
    store: &S,
    mode: AggregateMode,
    policy: VoterPolicy,
    out: Option<&str>,
    reference: Option<&str>,
    table: Option<&str>,
) -> QvResult<()> {
    let all_records = store.read_all().context(StoreSnafu)?;
    let counted = select_records(&all_records, policy);
    info!(
        "run_results: {} records in the store, {} counted",
        all_records.len(),
        counted.len()
    );

    let result = aggregate_with(&counted, config.options(), mode);
    let ranking = rank(&result);
    let stats = statistics(&all_records, &counted);
    debug!("run_results: ranking: {:?} stats: {:?}", ranking, stats);

    println!("{}", config.title());
    if counted.is_empty() {
        println!("No ballot has been recorded yet.");
    }
    print!("{}", render_bar_chart(&ranking, 40));
    println!(
        "ballots: {}, voters: {}, superseded: {}, latest: {}",
        stats.total_records,
        stats.unique_voters,
        stats.duplicate_records,
        stats
            .latest_submission
            .as_ref()
            .map(format_datetime)
            .unwrap_or_else(|| "-".to_string())
    );

    if let Some(table_p) = table {
        let rows = voter_breakdown(&counted, &ranking);
        write_voter_table(table_p, &ranking, &rows)?;
        info!("run_results: wrote {} rows to {}", rows.len(), table_p);
    }

    let summary_js = build_summary_js(config, mode, &ranking, &stats);
    let pretty_js_stats = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {
        path: "<summary>",
    })?;

    if let Some(out_p) = out {
        if is_stdout(out_p) {
            println!("{}", pretty_js_stats);
        } else {
            fs::write(out_p, &pretty_js_stats).context(WritingOutputSnafu { path: out_p })?;
            info!("run_results: summary written to {}", out_p);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {
                path: summary_p,
            })?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary {}", summary_p);
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
        info!("run_results: summary matches {}", summary_p);
    }
    Ok(())
}

/// Reads the poll configuration, failing when it is not usable.
pub fn read_poll_config(path: &str) -> QvResult<PollConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let doc: PollDocument =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_poll_config: {:?}", doc);
    doc.into_poll().context(ConfigSnafu { path })
}

pub fn read_summary(path: &str) -> QvResult<JSValue> {
    if !Path::new(path).exists() {
        whatever!("Reference summary {} does not exist", path)
    }
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}
