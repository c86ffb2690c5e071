use anyhow::Context;
use sentinel_core::{
    config::Config,
    io, paths,
    permission::Role,
    team::Team,
};
use std::path::Path;

pub const OWNER_ID: &str = "owner";

/// Turn a directory name into a usable project id.
fn project_id_from(name: &str) -> String {
    let mut id = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c.to_ascii_lowercase());
        } else if !id.is_empty() && !id.ends_with('-') {
            id.push('-');
        }
    }
    let id = id.trim_end_matches('-').to_string();
    if paths::validate_slug(&id).is_ok() {
        id
    } else {
        "project".to_string()
    }
}

pub fn run(
    root: &Path,
    project_id: Option<&str>,
    name: Option<&str>,
    owner_name: &str,
    owner_email: &str,
) -> anyhow::Result<()> {
    let dir_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    println!("Initializing Scope Sentinel in: {}", root.display());

    for dir in [paths::SENTINEL_DIR, paths::DELIVERABLES_DIR, paths::MILESTONES_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    if paths::config_path(root).exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        let id = match project_id {
            Some(id) => {
                paths::validate_slug(id)?;
                id.to_string()
            }
            None => project_id_from(&dir_name),
        };
        let cfg = Config::new(id, name.unwrap_or(&dir_name));
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    }

    let mut team = Team::load(root)?;
    if team.members.is_empty() {
        team.invite(OWNER_ID, owner_name, owner_email, Role::Owner)?;
        team.activate(OWNER_ID)?;
        team.save(root).context("failed to write team.yaml")?;
        println!("  created: {} (owner: {OWNER_ID})", paths::TEAM_FILE);
    } else {
        println!("  exists:  {}", paths::TEAM_FILE);
    }

    Ok(())
}
