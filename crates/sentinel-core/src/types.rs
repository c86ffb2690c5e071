use crate::error::SentinelError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DeliverableStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a deliverable.
///
/// ```text
/// not_started → in_progress → delivered ⇄ in_review
///                    ↑            ├─→ approved ─┐
///                    │            └─→ rejected ─┤
///                    └──────────────────────────┘ (reopen / revision request)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableStatus {
    NotStarted,
    InProgress,
    Delivered,
    InReview,
    Approved,
    Rejected,
}

impl DeliverableStatus {
    pub fn all() -> &'static [DeliverableStatus] {
        &[
            DeliverableStatus::NotStarted,
            DeliverableStatus::InProgress,
            DeliverableStatus::Delivered,
            DeliverableStatus::InReview,
            DeliverableStatus::Approved,
            DeliverableStatus::Rejected,
        ]
    }

    pub const fn allowed_next_states(self) -> &'static [DeliverableStatus] {
        use DeliverableStatus::*;
        match self {
            NotStarted => &[InProgress],
            InProgress => &[Delivered],
            Delivered => &[Approved, Rejected, InReview, InProgress],
            InReview => &[Approved, Rejected, Delivered, InProgress],
            Approved => &[InProgress],
            Rejected => &[InProgress],
        }
    }

    pub fn can_transition_to(self, next: DeliverableStatus) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Delivered and InReview both mean "waiting on a client decision".
    pub fn is_awaiting_decision(self) -> bool {
        matches!(self, DeliverableStatus::Delivered | DeliverableStatus::InReview)
    }

    pub fn is_approved(self) -> bool {
        self == DeliverableStatus::Approved
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliverableStatus::NotStarted => "not_started",
            DeliverableStatus::InProgress => "in_progress",
            DeliverableStatus::Delivered => "delivered",
            DeliverableStatus::InReview => "in_review",
            DeliverableStatus::Approved => "approved",
            DeliverableStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for DeliverableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeliverableStatus {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" | "not-started" => Ok(DeliverableStatus::NotStarted),
            "in_progress" | "in-progress" => Ok(DeliverableStatus::InProgress),
            "delivered" => Ok(DeliverableStatus::Delivered),
            "in_review" | "in-review" => Ok(DeliverableStatus::InReview),
            "approved" => Ok(DeliverableStatus::Approved),
            "rejected" => Ok(DeliverableStatus::Rejected),
            _ => Err(SentinelError::validation(format!("unknown status '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Visibility / Audience
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Internal,
    Client,
    Public,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Internal => "internal",
            Visibility::Client => "client",
            Visibility::Public => "public",
        }
    }

    pub fn admits(self, audience: Audience) -> bool {
        match audience {
            Audience::Internal => true,
            Audience::Client => matches!(self, Visibility::Client | Visibility::Public),
            Audience::Public => self == Visibility::Public,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(Visibility::Internal),
            "client" => Ok(Visibility::Client),
            "public" => Ok(Visibility::Public),
            _ => Err(SentinelError::validation(format!("unknown visibility '{s}'"))),
        }
    }
}

/// Who is looking at a deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Internal,
    Client,
    Public,
}

impl Audience {
    pub fn as_str(self) -> &'static str {
        match self {
            Audience::Internal => "internal",
            Audience::Client => "client",
            Audience::Public => "public",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Audience {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(Audience::Internal),
            "client" => Ok(Audience::Client),
            "public" => Ok(Audience::Public),
            _ => Err(SentinelError::validation(format!("unknown audience '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthorRole
// ---------------------------------------------------------------------------

/// Which side of the engagement wrote a revision or feedback entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    Client,
    Admin,
}

impl AuthorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthorRole::Client => "client",
            AuthorRole::Admin => "admin",
        }
    }
}

impl fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthorRole {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(AuthorRole::Client),
            "admin" => Ok(AuthorRole::Admin),
            _ => Err(SentinelError::validation(format!("unknown author role '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_roundtrip() {
        for status in DeliverableStatus::all() {
            assert_eq!(DeliverableStatus::from_str(status.as_str()).unwrap(), *status);
        }
    }

    #[test]
    fn status_graph() {
        use DeliverableStatus::*;
        assert!(NotStarted.can_transition_to(InProgress));
        assert!(!NotStarted.can_transition_to(Delivered));
        assert!(InProgress.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Approved));
        assert!(InReview.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(InProgress));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(Rejected.can_transition_to(InProgress));
    }

    #[test]
    fn in_review_is_alias_of_delivered() {
        assert!(DeliverableStatus::Delivered.is_awaiting_decision());
        assert!(DeliverableStatus::InReview.is_awaiting_decision());
        assert!(!DeliverableStatus::Approved.is_awaiting_decision());
    }

    #[test]
    fn visibility_gate() {
        assert!(Visibility::Internal.admits(Audience::Internal));
        assert!(!Visibility::Internal.admits(Audience::Client));
        assert!(Visibility::Client.admits(Audience::Client));
        assert!(!Visibility::Client.admits(Audience::Public));
        assert!(Visibility::Public.admits(Audience::Public));
    }

    #[test]
    fn unknown_status_is_validation_error() {
        let err = DeliverableStatus::from_str("shipped").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }
}
