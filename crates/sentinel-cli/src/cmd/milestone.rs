use super::{fmt_date, parse_due};
use crate::output::{print_json, print_table};
use crate::session::Session;
use anyhow::Context;
use chrono::Utc;
use clap::Subcommand;
use sentinel_core::{
    deliverable::Deliverable,
    milestone::Milestone,
    permission::{Action, Resource},
};
use std::path::Path;

#[derive(Subcommand)]
pub enum MilestoneSubcommand {
    /// Create a new milestone
    Create {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
    },
    /// List milestones with approval progress
    List,
    /// Show a milestone and its deliverables
    Show { id: String },
    /// Mark a milestone complete (every deliverable must be approved)
    Complete { id: String },
}

pub fn run(
    root: &Path,
    user: Option<&str>,
    subcmd: MilestoneSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let session = Session::open(root, user)?;
    match subcmd {
        MilestoneSubcommand::Create {
            id,
            title,
            description,
            due,
        } => create(&session, &id, &title, description, due.as_deref(), json),
        MilestoneSubcommand::List => list(&session, json),
        MilestoneSubcommand::Show { id } => show(&session, &id, json),
        MilestoneSubcommand::Complete { id } => complete(&session, &id, json),
    }
}

fn create(
    session: &Session,
    id: &str,
    title: &str,
    description: Option<String>,
    due: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    session.require(Action::Edit, Resource::Milestones)?;
    let mut m = Milestone::new(id, session.project_id(), title, Utc::now());
    m.description = description;
    m.due_date = due.map(parse_due).transpose()?;
    let m = Milestone::create(&session.root, m)?;
    session.invalidate_milestones();

    if json {
        print_json(&m)?;
    } else {
        println!("Created milestone '{}': {}", m.id, m.title);
    }
    Ok(())
}

fn list(session: &Session, json: bool) -> anyhow::Result<()> {
    session.require(Action::View, Resource::Milestones)?;
    let milestones = session.milestones()?;
    let deliverables = Deliverable::list(&session.root)?;

    if json {
        let out: Vec<_> = milestones
            .iter()
            .map(|m| {
                serde_json::json!({
                    "id": m.id,
                    "title": m.title,
                    "status": m.status,
                    "due_date": m.due_date,
                    "completion": m.completion_ratio(&deliverables),
                })
            })
            .collect();
        return print_json(&out);
    }

    if milestones.is_empty() {
        println!("No milestones.");
        return Ok(());
    }
    let rows = milestones
        .iter()
        .map(|m| {
            vec![
                m.id.clone(),
                m.title.clone(),
                m.status.to_string(),
                fmt_date(m.due_date),
                format!("{:.0}%", m.completion_ratio(&deliverables) * 100.0),
            ]
        })
        .collect();
    print_table(&["ID", "TITLE", "STATUS", "DUE", "APPROVED"], rows);
    Ok(())
}

fn show(session: &Session, id: &str, json: bool) -> anyhow::Result<()> {
    session.require(Action::View, Resource::Milestones)?;
    let m = session.milestone(id)?;
    let deliverables = Deliverable::list_for_milestone(&session.root, id)?;

    if json {
        return print_json(&serde_json::json!({
            "milestone": m,
            "deliverables": deliverables,
            "ready_to_complete": m.is_ready_to_complete(&deliverables),
        }));
    }

    println!("{}: {} [{}]", m.id, m.title, m.status);
    if let Some(desc) = &m.description {
        println!("{desc}");
    }
    println!("Due: {}", fmt_date(m.due_date));
    let rows = deliverables
        .iter()
        .map(|d| vec![d.id.clone(), d.name.clone(), d.status.to_string()])
        .collect();
    print_table(&["DELIVERABLE", "NAME", "STATUS"], rows);
    Ok(())
}

fn complete(session: &Session, id: &str, json: bool) -> anyhow::Result<()> {
    let m = Milestone::load(&session.root, id)?;
    let deliverables = Deliverable::list_for_milestone(&session.root, id)?;
    let outcome = session.engine().plan_complete_milestone(
        &m,
        &deliverables,
        &session.actor,
        &session.team.members,
    )?;
    if outcome.changed() {
        outcome
            .value
            .save(&session.root)
            .context("failed to save milestone")?;
        session.engine().publish(&outcome);
        session.invalidate_milestones();
    }

    if json {
        print_json(&outcome.value)?;
    } else if outcome.changed() {
        println!("Milestone '{id}' complete.");
    } else {
        println!("Milestone '{id}' was already complete.");
    }
    Ok(())
}
