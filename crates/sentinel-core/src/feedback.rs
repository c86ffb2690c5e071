//! Feedback thread on a deliverable.
//!
//! Entries are append-only. Resolving flips a flag; nothing is ever removed.
//! IDs are sequential: FB1, FB2, FB3, …

use crate::error::{Result, SentinelError};
use crate::types::AuthorRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub author: String,
    pub role: AuthorRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved: bool,
}

/// Next id after the highest numeric suffix carrying `prefix`.
pub(crate) fn next_id<'a>(prefix: &str, ids: impl Iterator<Item = &'a str>) -> String {
    let max = ids
        .filter_map(|id| id.strip_prefix(prefix)?.parse::<usize>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{}", max + 1)
}

/// Append an unresolved entry and return its id.
pub fn append_feedback(
    thread: &mut Vec<Feedback>,
    author: impl Into<String>,
    role: AuthorRole,
    content: impl Into<String>,
    now: DateTime<Utc>,
) -> String {
    let id = next_id("FB", thread.iter().map(|f| f.id.as_str()));
    thread.push(Feedback {
        id: id.clone(),
        author: author.into(),
        role,
        content: content.into(),
        created_at: now,
        resolved: false,
    });
    id
}

/// Mark an entry resolved. Returns `false` if it already was.
pub fn resolve_feedback(thread: &mut [Feedback], id: &str) -> Result<bool> {
    let entry = thread
        .iter_mut()
        .find(|f| f.id == id)
        .ok_or_else(|| SentinelError::FeedbackNotFound(id.to_string()))?;
    if entry.resolved {
        return Ok(false);
    }
    entry.resolved = true;
    Ok(true)
}

pub fn unresolved_count(thread: &[Feedback]) -> usize {
    thread.iter().filter(|f| !f.resolved).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids() {
        let mut thread = Vec::new();
        let now = Utc::now();
        assert_eq!(append_feedback(&mut thread, "Ana", AuthorRole::Client, "a", now), "FB1");
        assert_eq!(append_feedback(&mut thread, "Bo", AuthorRole::Admin, "b", now), "FB2");
        assert_eq!(thread[1].author, "Bo");
        assert!(!thread[1].resolved);
    }

    #[test]
    fn resolve_flips_without_removing() {
        let mut thread = Vec::new();
        let now = Utc::now();
        append_feedback(&mut thread, "Ana", AuthorRole::Client, "tweak the logo", now);
        append_feedback(&mut thread, "Ana", AuthorRole::Client, "and the footer", now);
        assert_eq!(unresolved_count(&thread), 2);

        assert!(resolve_feedback(&mut thread, "FB1").unwrap());
        assert!(!resolve_feedback(&mut thread, "FB1").unwrap());
        assert_eq!(thread.len(), 2);
        assert_eq!(unresolved_count(&thread), 1);
    }

    #[test]
    fn resolve_missing_is_not_found() {
        let mut thread: Vec<Feedback> = Vec::new();
        let err = resolve_feedback(&mut thread, "FB7").unwrap_err();
        assert!(matches!(err, SentinelError::FeedbackNotFound(id) if id == "FB7"));
    }

    #[test]
    fn next_id_ignores_foreign_ids() {
        let ids = ["FB2", "legacy-uuid", "R9"];
        assert_eq!(next_id("FB", ids.into_iter()), "FB3");
    }
}
