use clap::{Parser, Subcommand, ValueEnum};

/// This is a quadratic voting program: voters spread a budget of credits over
/// the options of a poll, and n votes on one option cost n² credits.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, default config.json) The JSON document describing the poll: title, options and credits.
    #[clap(short, long, value_parser, default_value = "config.json")]
    pub config: String,

    /// (file path, default votes.jsonl) The file in which ballots are recorded, one per line.
    #[clap(short, long, value_parser, default_value = "votes.jsonl")]
    pub store: String,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Checks the configuration and prints a description of the poll.
    Check,

    /// Shows what a ballot would cost, without recording it.
    Quote {
        /// (OPTION=COUNT, repeatable) The votes for one option. Options not mentioned get zero votes.
        #[clap(long = "votes", value_parser)]
        votes: Vec<String>,
    },

    /// Validates a ballot and records it.
    Vote {
        /// The name of the voter.
        #[clap(long, value_parser)]
        voter: String,

        /// (OPTION=COUNT, repeatable) The votes for one option. Options not mentioned get zero votes.
        #[clap(long = "votes", value_parser)]
        votes: Vec<String>,
    },

    /// Tallies the recorded ballots.
    Results {
        /// (default votes) What to sum for every option: the votes or the credits spent.
        #[clap(long, value_enum, default_value = "votes")]
        mode: ModeArg,

        /// If passed, only the latest ballot of every voter is counted.
        #[clap(long, takes_value = false)]
        latest_per_voter: bool,

        /// (file path, 'stdout' or empty) If specified, the summary of the results will be written
        /// in JSON format to the given location.
        #[clap(short, long, value_parser)]
        out: Option<String>,

        /// (file path) A reference file containing the expected summary in JSON format. If provided,
        /// qvote will check that the tallied output matches the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,

        /// (file path) If specified, one row per counted ballot is written to this CSV file.
        #[clap(long, value_parser)]
        table: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Votes,
    Credits,
}
