use crate::cache::DEFAULT_MILESTONE_TTL_SECS;
use crate::error::{Result, SentinelError};
use crate::permission::{CapabilityTable, Role};
use crate::{io, paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Roles allowed to approve, reject, and request revisions.
    #[serde(default = "default_approver_roles")]
    pub approver_roles: Vec<Role>,
}

fn default_approver_roles() -> Vec<Role> {
    vec![Role::Owner]
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            approver_roles: default_approver_roles(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_milestone_ttl")]
    pub milestone_ttl_secs: u64,
}

fn default_milestone_ttl() -> u64 {
    DEFAULT_MILESTONE_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            milestone_ttl_secs: default_milestone_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Record events in `.sentinel/outbox.jsonl`.
    #[serde(default = "default_outbox")]
    pub outbox: bool,
}

fn default_outbox() -> bool {
    true
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            outbox: default_outbox(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl Config {
    pub fn new(project_id: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                id: project_id.into(),
                name: project_name.into(),
            },
            permissions: PermissionsConfig::default(),
            cache: CacheConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(SentinelError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&paths::config_path(root), data.as_bytes())
    }

    pub fn capability_table(&self) -> CapabilityTable {
        CapabilityTable::with_approvers(&self.permissions.approver_roles)
    }

    pub fn milestone_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.milestone_ttl_secs)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if paths::validate_slug(&self.project.id).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("project id '{}' is not a valid slug", self.project.id),
            });
        }

        if self.permissions.approver_roles.contains(&Role::Viewer) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "viewer in permissions.approver_roles is ignored: viewers are read-only"
                    .to_string(),
            });
        }

        if self.cache.milestone_ttl_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "cache.milestone_ttl_secs is 0: milestone lists are never cached"
                    .to_string(),
            });
        }

        warnings
    }
}
