// Per-voter table of the counted ballots, as CSV.

use quadratic_voting::VoterRow;
use snafu::prelude::*;

use crate::qv::io_common::format_datetime;
use crate::qv::*;

/// Writes one row per ballot. The option columns follow the ranking.
pub fn write_voter_table(
    path: &str,
    ranking: &[(String, u64)],
    rows: &[VoterRow],
) -> QvResult<()> {
    let mut wtr = csv::Writer::from_path(path).context(WritingCsvSnafu { path })?;
    let mut header: Vec<String> = vec!["voter".to_string(), "submitted_at".to_string()];
    header.extend(ranking.iter().map(|(o, _)| o.clone()));
    wtr.write_record(&header)
        .context(WritingCsvSnafu { path })?;
    for row in rows {
        let mut record: Vec<String> = vec![row.voter.clone(), format_datetime(&row.submitted_at)];
        record.extend(row.counts.iter().map(|c| c.to_string()));
        wtr.write_record(&record).context(WritingCsvSnafu { path })?;
    }
    wtr.flush().context(WritingOutputSnafu { path })?;
    Ok(())
}
