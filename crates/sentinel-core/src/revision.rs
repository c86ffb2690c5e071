use crate::error::{Result, SentinelError};
use crate::feedback::next_id;
use crate::types::AuthorRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A substantive submission or rejection record. IDs are sequential: R1, R2, …
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: String,
    pub content: String,
    pub author: AuthorRole,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked_final_at: Option<DateTime<Utc>>,
}

impl Revision {
    pub fn is_decided(&self) -> bool {
        self.approved_at.is_some() || self.rejected_at.is_some()
    }

    pub fn mark_approved(&mut self, now: DateTime<Utc>) {
        self.approved_at = Some(now);
        self.rejected_at = None;
    }

    pub fn mark_rejected(&mut self, now: DateTime<Utc>) {
        self.rejected_at = Some(now);
        self.approved_at = None;
    }

    /// Returns `false` if already final.
    pub fn mark_final(&mut self, now: DateTime<Utc>) -> bool {
        if self.marked_final_at.is_some() {
            return false;
        }
        self.marked_final_at = Some(now);
        true
    }
}

pub fn append_revision(
    history: &mut Vec<Revision>,
    author: AuthorRole,
    content: impl Into<String>,
    now: DateTime<Utc>,
) -> String {
    let id = next_id("R", history.iter().map(|r| r.id.as_str()));
    history.push(Revision {
        id: id.clone(),
        content: content.into(),
        author,
        created_at: now,
        approved_at: None,
        rejected_at: None,
        marked_final_at: None,
    });
    id
}

pub fn find_revision_mut<'a>(history: &'a mut [Revision], id: &str) -> Result<&'a mut Revision> {
    history
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| SentinelError::RevisionNotFound(id.to_string()))
}

/// The newest revision that has not been approved or rejected yet.
pub fn pending_revision_mut(history: &mut [Revision]) -> Option<&mut Revision> {
    history.iter_mut().rev().find(|r| !r.is_decided())
}
