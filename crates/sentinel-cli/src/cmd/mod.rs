pub mod config;
pub mod deliverable;
pub mod feedback;
pub mod init;
pub mod milestone;
pub mod outbox;
pub mod team;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};

/// Accept either a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub(crate) fn parse_due(s: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid due date '{s}': use YYYY-MM-DD or RFC 3339"))?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .context("invalid due date")?
        .and_utc())
}

pub(crate) fn fmt_date(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_due_accepts_both_forms() {
        let a = parse_due("2026-07-01").unwrap();
        let b = parse_due("2026-07-01T00:00:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_due("next tuesday").is_err());
    }
}
