//! Role-based capability table.
//!
//! Capabilities have the shape `action:resource` (e.g. `edit:deliverables`).
//! Each [`Role`] maps to a fixed maximal set; configuration can only narrow
//! who approves, never widen a role past its tier.

use crate::error::SentinelError;
use crate::team::{MemberStatus, TeamMember};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Editor,
    Owner,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            _ => Err(SentinelError::validation(format!("unknown role '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Action / Resource / Permission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Edit,
    Approve,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Approve => "approve",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Projects,
    Milestones,
    Deliverables,
    Comments,
    Invoices,
    Payments,
    Team,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Projects => "projects",
            Resource::Milestones => "milestones",
            Resource::Deliverables => "deliverables",
            Resource::Comments => "comments",
            Resource::Invoices => "invoices",
            Resource::Payments => "payments",
            Resource::Team => "team",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    pub action: Action,
    pub resource: Resource,
}

impl Permission {
    pub const fn new(action: Action, resource: Resource) -> Self {
        Self { action, resource }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action.as_str(), self.resource.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SentinelError::validation(format!("malformed permission '{s}'"));
        let (action, resource) = s.split_once(':').ok_or_else(bad)?;
        let action = match action {
            "view" => Action::View,
            "edit" => Action::Edit,
            "approve" => Action::Approve,
            _ => return Err(bad()),
        };
        let resource = match resource {
            "projects" => Resource::Projects,
            "milestones" => Resource::Milestones,
            "deliverables" => Resource::Deliverables,
            "comments" => Resource::Comments,
            "invoices" => Resource::Invoices,
            "payments" => Resource::Payments,
            "team" => Resource::Team,
            _ => return Err(bad()),
        };
        Ok(Permission { action, resource })
    }
}

// ---------------------------------------------------------------------------
// PermissionProvider
// ---------------------------------------------------------------------------

pub trait PermissionProvider {
    /// Effective role of `user_id`, or `None` when they are not an active member.
    fn role_of(&self, user_id: &str, members: &[TeamMember]) -> Option<Role>;

    fn has_permission(&self, role: Role, permission: Permission) -> bool;
}

/// The static role → capability table.
#[derive(Debug, Clone)]
pub struct CapabilityTable {
    approvers: Vec<Role>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self {
            approvers: vec![Role::Owner],
        }
    }
}

impl CapabilityTable {
    /// Build a table where `approvers` may additionally hold `approve:deliverables`.
    /// Owners always approve; viewers never do.
    pub fn with_approvers(approvers: &[Role]) -> Self {
        let mut roles = vec![Role::Owner];
        for &r in approvers {
            if r != Role::Viewer && !roles.contains(&r) {
                roles.push(r);
            }
        }
        Self { approvers: roles }
    }

    pub fn approvers(&self) -> &[Role] {
        &self.approvers
    }

    fn grants(&self, role: Role, p: Permission) -> bool {
        match role {
            Role::Owner => true,
            Role::Editor => match p.action {
                Action::View => true,
                Action::Edit => matches!(
                    p.resource,
                    Resource::Deliverables | Resource::Milestones | Resource::Comments
                ),
                Action::Approve => {
                    p.resource == Resource::Deliverables && self.approvers.contains(&Role::Editor)
                }
            },
            Role::Viewer => p.action == Action::View,
        }
    }
}

impl PermissionProvider for CapabilityTable {
    fn role_of(&self, user_id: &str, members: &[TeamMember]) -> Option<Role> {
        members
            .iter()
            .find(|m| m.id == user_id && m.status == MemberStatus::Active)
            .map(|m| m.role)
    }

    fn has_permission(&self, role: Role, permission: Permission) -> bool {
        self.grants(role, permission)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
