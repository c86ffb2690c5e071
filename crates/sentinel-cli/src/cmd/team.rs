use crate::output::{print_json, print_table};
use crate::session::Session;
use anyhow::Context;
use clap::Subcommand;
use sentinel_core::{
    permission::{Action, Resource, Role},
    team::{MemberStatus, TeamMember},
    types::AuthorRole,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum TeamSubcommand {
    /// Invite someone to the project (starts pending)
    Invite {
        name: String,
        email: String,
        /// owner, editor, or viewer
        #[arg(long, default_value = "viewer")]
        role: Role,
        /// Member id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// client or admin (default: editors are admin, everyone else client)
        #[arg(long)]
        side: Option<AuthorRole>,
    },
    /// Activate a pending member
    Activate { id: String },
    /// Change a member's role
    Role { id: String, role: Role },
    /// List team members
    List,
}

pub fn run(root: &Path, user: Option<&str>, subcmd: TeamSubcommand, json: bool) -> anyhow::Result<()> {
    let session = Session::open(root, user)?;
    match subcmd {
        TeamSubcommand::Invite {
            name,
            email,
            role,
            id,
            side,
        } => invite(session, &name, &email, role, id, side, json),
        TeamSubcommand::Activate { id } => activate(session, &id, json),
        TeamSubcommand::Role { id, role } => set_role(session, &id, role, json),
        TeamSubcommand::List => list(&session, json),
    }
}

fn invite(
    mut session: Session,
    name: &str,
    email: &str,
    role: Role,
    id: Option<String>,
    side: Option<AuthorRole>,
    json: bool,
) -> anyhow::Result<()> {
    session.require(Action::Edit, Resource::Team)?;
    let id = id.unwrap_or_else(TeamMember::generate_id);
    session.team.invite(id.as_str(), name, email, role)?;
    if let Some(side) = side {
        session.team.set_side(&id, side)?;
    }
    session.team.save(&session.root).context("failed to save team")?;

    let side = session
        .team
        .find(&id)
        .map_or(AuthorRole::Client, TeamMember::side);
    if json {
        print_json(&serde_json::json!({
            "id": id,
            "role": role,
            "side": side,
            "status": "pending",
        }))?;
    } else {
        println!("Invited {name} <{email}> as {role} ({side}) [{id}]");
    }
    Ok(())
}

fn activate(mut session: Session, id: &str, json: bool) -> anyhow::Result<()> {
    session.require(Action::Edit, Resource::Team)?;
    let changed = session.team.activate(id)?;
    session.team.save(&session.root).context("failed to save team")?;

    if json {
        print_json(&serde_json::json!({ "id": id, "status": "active", "changed": changed }))?;
    } else if changed {
        println!("Activated [{id}]");
    } else {
        println!("[{id}] is already active");
    }
    Ok(())
}

fn set_role(mut session: Session, id: &str, role: Role, json: bool) -> anyhow::Result<()> {
    session.require(Action::Edit, Resource::Team)?;
    let is_active_owner = |m: &TeamMember| m.role == Role::Owner && m.status == MemberStatus::Active;
    let target_is_owner = session.team.find(id).is_some_and(is_active_owner);
    if target_is_owner && role != Role::Owner {
        let owners = session
            .team
            .members
            .iter()
            .filter(|m| is_active_owner(m))
            .count();
        if owners == 1 {
            anyhow::bail!("cannot demote the last owner");
        }
    }
    session.team.set_role(id, role)?;
    session.team.save(&session.root).context("failed to save team")?;

    if json {
        print_json(&serde_json::json!({ "id": id, "role": role }))?;
    } else {
        println!("[{id}] is now {role}");
    }
    Ok(())
}

fn list(session: &Session, json: bool) -> anyhow::Result<()> {
    session.require(Action::View, Resource::Team)?;
    if json {
        return print_json(&session.team.members);
    }
    let rows = session
        .team
        .members
        .iter()
        .map(|m| {
            vec![
                m.id.clone(),
                m.name.clone(),
                m.email.clone(),
                m.role.to_string(),
                m.side().to_string(),
                m.status.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "EMAIL", "ROLE", "SIDE", "STATUS"], rows);
    Ok(())
}
