use crate::error::{Result, SentinelError};
use crate::feedback::{self, Feedback};
use crate::revision::Revision;
use crate::types::{Audience, DeliverableStatus, Visibility};
use crate::{io, paths};
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;

// ---------------------------------------------------------------------------
// Deliverable
// ---------------------------------------------------------------------------

/// A trackable unit of work inside a milestone.
///
/// Only `status` is stored. `is_approved` is derived from it and written to
/// documents as an output-only field; any stored value is ignored on read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Deliverable {
    pub id: String,
    pub project_id: String,
    pub milestone_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    pub status: DeliverableStatus,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub revisions: Vec<Revision>,
    #[serde(default)]
    pub feedback: Vec<Feedback>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Serialize for Deliverable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Deliverable", 15)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("project_id", &self.project_id)?;
        s.serialize_field("milestone_id", &self.milestone_id)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("description", &self.description)?;
        s.serialize_field("notes", &self.notes)?;
        s.serialize_field("status", &self.status)?;
        s.serialize_field("is_approved", &self.is_approved())?;
        s.serialize_field("visibility", &self.visibility)?;
        s.serialize_field("revisions", &self.revisions)?;
        s.serialize_field("feedback", &self.feedback)?;
        s.serialize_field("due_date", &self.due_date)?;
        s.serialize_field("created_at", &self.created_at)?;
        s.serialize_field("updated_at", &self.updated_at)?;
        s.serialize_field("version", &self.version)?;
        s.end()
    }
}

impl Deliverable {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        milestone_id: impl Into<String>,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            milestone_id: milestone_id.into(),
            name: name.into(),
            description: String::new(),
            notes: String::new(),
            status: DeliverableStatus::NotStarted,
            visibility: Visibility::default(),
            revisions: Vec::new(),
            feedback: Vec::new(),
            due_date: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status.is_approved()
    }

    pub fn is_visible_to(&self, audience: Audience) -> bool {
        self.visibility.admits(audience)
    }

    pub fn unresolved_feedback(&self) -> usize {
        feedback::unresolved_count(&self.feedback)
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn create(root: &Path, mut deliverable: Deliverable) -> Result<Self> {
        paths::validate_slug(&deliverable.id)?;
        if paths::deliverable_manifest(root, &deliverable.id).exists() {
            return Err(SentinelError::DeliverableExists(deliverable.id));
        }
        deliverable.version = 0;
        deliverable.save(root)?;
        Ok(deliverable)
    }

    pub fn load(root: &Path, id: &str) -> Result<Self> {
        paths::validate_slug(id)?;
        let manifest = paths::deliverable_manifest(root, id);
        if !manifest.exists() {
            return Err(SentinelError::DeliverableNotFound(id.to_string()));
        }
        let data = std::fs::read_to_string(&manifest)?;
        let d: Self = serde_yaml::from_str(&data)?;
        if d.id != id {
            return Err(SentinelError::validation(format!(
                "manifest for '{id}' carries id '{}'",
                d.id
            )));
        }
        Ok(d)
    }

    /// Unconditional write. Bumps `version` once the manifest is on disk.
    pub fn save(&mut self, root: &Path) -> Result<()> {
        self.version += 1;
        let written = serde_yaml::to_string(&*self)
            .map_err(SentinelError::from)
            .and_then(|data| {
                io::atomic_write(&paths::deliverable_manifest(root, &self.id), data.as_bytes())
            });
        if written.is_err() {
            self.version -= 1;
        }
        written
    }

    /// Write only if the stored copy still carries this snapshot's version.
    pub fn save_if_version(&mut self, root: &Path) -> Result<()> {
        let stored = Self::load(root, &self.id)?;
        if stored.version != self.version {
            return Err(SentinelError::Conflict {
                id: self.id.clone(),
                expected: self.version,
                found: stored.version,
            });
        }
        self.save(root)
    }

    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let dir = root.join(paths::DELIVERABLES_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let id = entry.file_name().to_string_lossy().into_owned();
                match Self::load(root, &id) {
                    Ok(d) => out.push(d),
                    Err(SentinelError::DeliverableNotFound(_) | SentinelError::InvalidSlug(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    pub fn list_for_milestone(root: &Path, milestone_id: &str) -> Result<Vec<Self>> {
        Ok(Self::list(root)?
            .into_iter()
            .filter(|d| d.milestone_id == milestone_id)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
