use chrono::{Local, NaiveDateTime, Timelike};

/// The format of the submission times in the vote store.
pub const VOTE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(VOTE_DATETIME_FORMAT).to_string()
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), VOTE_DATETIME_FORMAT).ok()
}

/// The current local time, truncated to the second as stored.
pub fn now() -> NaiveDateTime {
    let dt = Local::now().naive_local();
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// `stdout` or an empty value means the standard output.
pub fn is_stdout(target: &str) -> bool {
    target.is_empty() || target == "stdout"
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn datetime_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(20, 22, 17)
            .unwrap();
        assert_eq!(format_datetime(&dt), "2025-07-01 20:22:17");
        assert_eq!(parse_datetime("2025-07-01 20:22:17"), Some(dt));
        assert_eq!(parse_datetime("2025/07/01 20:22"), None);
    }

    #[test]
    fn now_has_no_subseconds() {
        let dt = now();
        assert_eq!(dt.nanosecond(), 0);
        assert_eq!(parse_datetime(&format_datetime(&dt)), Some(dt));
    }
}
