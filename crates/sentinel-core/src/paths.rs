use crate::error::{Result, SentinelError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SENTINEL_DIR: &str = ".sentinel";
pub const DELIVERABLES_DIR: &str = ".sentinel/deliverables";
pub const MILESTONES_DIR: &str = ".sentinel/milestones";

pub const CONFIG_FILE: &str = ".sentinel/config.yaml";
pub const TEAM_FILE: &str = ".sentinel/team.yaml";
pub const OUTBOX_FILE: &str = ".sentinel/outbox.jsonl";
pub const MANIFEST_FILE: &str = "manifest.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn deliverable_dir(root: &Path, id: &str) -> PathBuf {
    root.join(DELIVERABLES_DIR).join(id)
}

pub fn deliverable_manifest(root: &Path, id: &str) -> PathBuf {
    deliverable_dir(root, id).join(MANIFEST_FILE)
}

pub fn milestone_dir(root: &Path, id: &str) -> PathBuf {
    root.join(MILESTONES_DIR).join(id)
}

pub fn milestone_manifest(root: &Path, id: &str) -> PathBuf {
    milestone_dir(root, id).join(MANIFEST_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn team_path(root: &Path) -> PathBuf {
    root.join(TEAM_FILE)
}

pub fn outbox_path(root: &Path) -> PathBuf {
    root.join(OUTBOX_FILE)
}

// ---------------------------------------------------------------------------
// Slug validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

/// Ids double as directory names, so they are restricted to lowercase slugs.
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(SentinelError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_slugs() {
        for slug in ["homepage-copy", "a", "logo-v2", "x1"] {
            validate_slug(slug).unwrap_or_else(|_| panic!("expected valid: {slug}"));
        }
    }

    #[test]
    fn invalid_slugs() {
        for slug in ["", "-lead", "trail-", "has spaces", "UPPER", "a_b", "../etc"] {
            assert!(validate_slug(slug).is_err(), "expected invalid: {slug}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.sentinel/config.yaml")
        );
        assert_eq!(
            deliverable_manifest(root, "logo"),
            PathBuf::from("/tmp/proj/.sentinel/deliverables/logo/manifest.yaml")
        );
        assert_eq!(
            milestone_manifest(root, "launch"),
            PathBuf::from("/tmp/proj/.sentinel/milestones/launch/manifest.yaml")
        );
    }
}
