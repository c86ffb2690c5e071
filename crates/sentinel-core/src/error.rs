use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("not initialized: run 'sentinel init'")]
    NotInitialized,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("permission denied: role '{role}' lacks '{permission}'")]
    PermissionDenied { role: String, permission: String },

    #[error("user '{0}' is not an active member of this project")]
    NotAMember(String),

    #[error("feedback not found: {0}")]
    FeedbackNotFound(String),

    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    #[error("deliverable not found: {0}")]
    DeliverableNotFound(String),

    #[error("deliverable already exists: {0}")]
    DeliverableExists(String),

    #[error("milestone not found: {0}")]
    MilestoneNotFound(String),

    #[error("milestone already exists: {0}")]
    MilestoneExists(String),

    #[error("team member not found: {0}")]
    MemberNotFound(String),

    #[error("cannot {action} from '{from}': {reason}")]
    IllegalTransition {
        from: String,
        action: String,
        reason: String,
    },

    #[error("'{id}' changed since it was read (expected version {expected}, found {found})")]
    Conflict {
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("invalid id '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidSlug(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SentinelError>;

/// Coarse error category surfaced to callers that render user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Permission,
    NotFound,
    IllegalTransition,
    Conflict,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::IllegalTransition => "illegal_transition",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Storage => "storage",
        };
        f.write_str(s)
    }
}

impl SentinelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SentinelError::Validation(_)
            | SentinelError::InvalidSlug(_)
            | SentinelError::DeliverableExists(_)
            | SentinelError::MilestoneExists(_) => ErrorKind::Validation,
            SentinelError::PermissionDenied { .. } | SentinelError::NotAMember(_) => {
                ErrorKind::Permission
            }
            SentinelError::FeedbackNotFound(_)
            | SentinelError::RevisionNotFound(_)
            | SentinelError::DeliverableNotFound(_)
            | SentinelError::MilestoneNotFound(_)
            | SentinelError::MemberNotFound(_) => ErrorKind::NotFound,
            SentinelError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            SentinelError::Conflict { .. } => ErrorKind::Conflict,
            SentinelError::NotInitialized
            | SentinelError::Io(_)
            | SentinelError::Yaml(_)
            | SentinelError::Json(_) => ErrorKind::Storage,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        SentinelError::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            SentinelError::validation("feedback required").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            SentinelError::FeedbackNotFound("FB9".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SentinelError::PermissionDenied {
                role: "viewer".into(),
                permission: "approve:deliverables".into(),
            }
            .kind(),
            ErrorKind::Permission
        );
    }

    #[test]
    fn validation_message() {
        let e = SentinelError::validation("feedback required");
        assert_eq!(e.to_string(), "validation failed: feedback required");
    }
}
