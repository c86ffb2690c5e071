use crate::error::{Result, SentinelError};
use crate::permission::Role;
use crate::types::AuthorRole;
use crate::{io, paths};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// MemberStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Pending,
    Active,
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemberStatus::Pending => "pending",
            MemberStatus::Active => "active",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// TeamMember
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: MemberStatus,
    /// Which side of the engagement this member writes feedback and revisions
    /// for. Unset means derived from `role`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<AuthorRole>,
}

impl TeamMember {
    /// Editors are studio staff; owners and viewers speak for the client.
    pub fn side(&self) -> AuthorRole {
        self.side.unwrap_or(match self.role {
            Role::Editor => AuthorRole::Admin,
            Role::Owner | Role::Viewer => AuthorRole::Client,
        })
    }

    /// Short random id for members invited without one.
    pub fn generate_id() -> String {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        format!("u-{}", &raw[..8])
    }
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

impl Team {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::team_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&paths::team_path(root), data.as_bytes())
    }

    pub fn find(&self, id: &str) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Add a pending member. Emails are unique within a team.
    pub fn invite(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Result<&TeamMember> {
        let id = id.into();
        let email = email.into();
        paths::validate_slug(&id)?;
        if !email.contains('@') {
            return Err(SentinelError::validation(format!("invalid email '{email}'")));
        }
        if self.find(&id).is_some() {
            return Err(SentinelError::validation(format!("member '{id}' already exists")));
        }
        if self.members.iter().any(|m| m.email.eq_ignore_ascii_case(&email)) {
            return Err(SentinelError::validation(format!("'{email}' is already invited")));
        }
        self.members.push(TeamMember {
            id,
            name: name.into(),
            email,
            role,
            status: MemberStatus::Pending,
            side: None,
        });
        Ok(&self.members[self.members.len() - 1])
    }

    /// Mark a member active. Returns `false` if they already were.
    pub fn activate(&mut self, id: &str) -> Result<bool> {
        let member = self.member_mut(id)?;
        if member.status == MemberStatus::Active {
            return Ok(false);
        }
        member.status = MemberStatus::Active;
        Ok(true)
    }

    pub fn set_role(&mut self, id: &str, role: Role) -> Result<()> {
        self.member_mut(id)?.role = role;
        Ok(())
    }

    pub fn set_side(&mut self, id: &str, side: AuthorRole) -> Result<()> {
        self.member_mut(id)?.side = Some(side);
        Ok(())
    }

    fn member_mut(&mut self, id: &str) -> Result<&mut TeamMember> {
        self.members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| SentinelError::MemberNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_starts_pending_and_activates_once() {
        let mut team = Team::default();
        team.invite("cli", "Client Co", "pm@client.co", Role::Viewer)
            .unwrap();
        assert_eq!(team.find("cli").unwrap().status, MemberStatus::Pending);
        assert!(team.activate("cli").unwrap());
        assert!(!team.activate("cli").unwrap());
        assert_eq!(team.find("cli").unwrap().status, MemberStatus::Active);
    }

    #[test]
    fn duplicate_email_rejected() {
        let mut team = Team::default();
        team.invite("a", "A", "same@x.io", Role::Editor).unwrap();
        let err = team.invite("b", "B", "SAME@x.io", Role::Viewer).unwrap_err();
        assert!(err.to_string().contains("already invited"));
    }

    #[test]
    fn unknown_member_is_not_found() {
        let mut team = Team::default();
        let err = team.set_role("ghost", Role::Owner).unwrap_err();
        assert!(matches!(err, SentinelError::MemberNotFound(_)));
    }

    #[test]
    fn side_defaults_from_role_and_can_be_pinned() {
        let mut team = Team::default();
        team.invite("own", "Owner", "o@x.io", Role::Owner).unwrap();
        team.invite("ed", "Ed", "e@x.io", Role::Editor).unwrap();
        assert_eq!(team.find("own").unwrap().side(), AuthorRole::Client);
        assert_eq!(team.find("ed").unwrap().side(), AuthorRole::Admin);

        team.set_side("own", AuthorRole::Admin).unwrap();
        assert_eq!(team.find("own").unwrap().side(), AuthorRole::Admin);
    }

    #[test]
    fn generated_ids_are_valid_slugs() {
        let id = TeamMember::generate_id();
        paths::validate_slug(&id).unwrap();
    }

    #[test]
    fn load_missing_is_empty_and_save_roundtrips() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Team::load(dir.path()).unwrap().members.is_empty());
        let mut team = Team::default();
        team.invite("own", "Owner", "o@x.io", Role::Owner).unwrap();
        team.save(dir.path()).unwrap();
        let back = Team::load(dir.path()).unwrap();
        assert_eq!(back.members, team.members);
    }
}
