use crate::deliverable::Deliverable;
use crate::error::{Result, SentinelError};
use crate::{io, paths};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// MilestoneStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Active,
    Complete,
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MilestoneStatus::Active => "active",
            MilestoneStatus::Complete => "complete",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Milestone
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub status: MilestoneStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Milestone {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            title: title.into(),
            description: None,
            due_date: None,
            status: MilestoneStatus::Active,
            created_at: now,
            completed_at: None,
        }
    }

    /// Fraction of this milestone's deliverables that are approved, in `0.0..=1.0`.
    pub fn completion_ratio(&self, deliverables: &[Deliverable]) -> f64 {
        let mine: Vec<_> = self.deliverables_in(deliverables).collect();
        if mine.is_empty() {
            return 0.0;
        }
        let approved = mine.iter().filter(|d| d.is_approved()).count();
        approved as f64 / mine.len() as f64
    }

    /// At least one deliverable, and every one of them approved.
    pub fn is_ready_to_complete(&self, deliverables: &[Deliverable]) -> bool {
        let mut mine = self.deliverables_in(deliverables).peekable();
        mine.peek().is_some() && mine.all(|d| d.is_approved())
    }

    fn deliverables_in<'a>(
        &'a self,
        deliverables: &'a [Deliverable],
    ) -> impl Iterator<Item = &'a Deliverable> + 'a {
        deliverables.iter().filter(move |d| d.milestone_id == self.id)
    }

    pub fn mark_complete(&mut self, now: DateTime<Utc>) {
        self.status = MilestoneStatus::Complete;
        self.completed_at = Some(now);
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn create(root: &Path, milestone: Milestone) -> Result<Self> {
        paths::validate_slug(&milestone.id)?;
        if paths::milestone_manifest(root, &milestone.id).exists() {
            return Err(SentinelError::MilestoneExists(milestone.id));
        }
        milestone.save(root)?;
        Ok(milestone)
    }

    pub fn load(root: &Path, id: &str) -> Result<Self> {
        paths::validate_slug(id)?;
        let manifest = paths::milestone_manifest(root, id);
        if !manifest.exists() {
            return Err(SentinelError::MilestoneNotFound(id.to_string()));
        }
        let data = std::fs::read_to_string(&manifest)?;
        let m: Self = serde_yaml::from_str(&data)?;
        if m.id != id {
            return Err(SentinelError::validation(format!(
                "manifest for '{id}' carries id '{}'",
                m.id
            )));
        }
        Ok(m)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&paths::milestone_manifest(root, &self.id), data.as_bytes())
    }

    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let dir = root.join(paths::MILESTONES_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut milestones = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let id = entry.file_name().to_string_lossy().into_owned();
                match Self::load(root, &id) {
                    Ok(m) => milestones.push(m),
                    Err(SentinelError::MilestoneNotFound(_) | SentinelError::InvalidSlug(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        milestones.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(milestones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeliverableStatus;

    fn deliverable(id: &str, milestone: &str, status: DeliverableStatus) -> Deliverable {
        let mut d = Deliverable::new(id, "acme", milestone, id, Utc::now());
        d.status = status;
        d
    }

    #[test]
    fn completion_counts_only_own_deliverables() {
        let m = Milestone::new("brand", "acme", "Brand", Utc::now());
        let ds = vec![
            deliverable("logo", "brand", DeliverableStatus::Approved),
            deliverable("palette", "brand", DeliverableStatus::Delivered),
            deliverable("site", "web", DeliverableStatus::Approved),
        ];
        assert!((m.completion_ratio(&ds) - 0.5).abs() < f64::EPSILON);
        assert!(!m.is_ready_to_complete(&ds));
    }

    #[test]
    fn empty_milestone_is_not_ready() {
        let m = Milestone::new("brand", "acme", "Brand", Utc::now());
        assert!(!m.is_ready_to_complete(&[]));
        assert_eq!(m.completion_ratio(&[]), 0.0);
    }

    #[test]
    fn all_approved_is_ready() {
        let m = Milestone::new("brand", "acme", "Brand", Utc::now());
        let ds = vec![deliverable("logo", "brand", DeliverableStatus::Approved)];
        assert!(m.is_ready_to_complete(&ds));
    }

    #[test]
    fn load_refuses_path_like_ids() {
        let dir = tempfile::TempDir::new().unwrap();
        for id in ["../deliverables/logo", "..", "a/b"] {
            assert!(matches!(
                Milestone::load(dir.path(), id),
                Err(SentinelError::InvalidSlug(_))
            ));
        }
    }

    #[test]
    fn persistence_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let m = Milestone::create(
            dir.path(),
            Milestone::new("launch", "acme", "Launch", Utc::now()),
        )
        .unwrap();
        assert_eq!(Milestone::load(dir.path(), "launch").unwrap(), m);
        assert!(matches!(
            Milestone::create(dir.path(), m.clone()),
            Err(SentinelError::MilestoneExists(_))
        ));
        assert_eq!(Milestone::list(dir.path()).unwrap().len(), 1);
    }
}
