use super::{fmt_date, parse_due};
use crate::output::{print_json, print_table};
use crate::session::Session;
use anyhow::Context;
use chrono::Utc;
use clap::Subcommand;
use sentinel_core::{
    deliverable::Deliverable,
    permission::{Action, Resource},
    types::{Audience, Visibility},
    workflow::Command,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum DeliverableSubcommand {
    /// Create a deliverable under a milestone
    Create {
        id: String,
        #[arg(long)]
        milestone: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// internal, client, or public
        #[arg(long, default_value = "internal")]
        visibility: Visibility,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
    },
    /// List deliverables
    List {
        #[arg(long)]
        milestone: Option<String>,
        /// Only show what this audience may see: internal, client, public
        #[arg(long)]
        audience: Option<Audience>,
    },
    /// Show a deliverable with its revisions and feedback
    Show { id: String },
    /// Start work (not started → in progress)
    Start { id: String },
    /// Submit for client review (in progress → delivered)
    RequestApproval { id: String },
    /// Approve delivered work
    Approve {
        id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Reject delivered work (feedback required)
    Reject {
        id: String,
        #[arg(long)]
        feedback: String,
    },
    /// Send delivered or approved work back for changes
    RequestRevision {
        id: String,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Reopen approved or rejected work for editing
    Reopen { id: String },
    /// Record a new revision
    SubmitRevision { id: String, content: String },
    /// Mark a revision as the final version
    MarkFinal { id: String, revision_id: String },
}

pub fn run(
    root: &Path,
    user: Option<&str>,
    subcmd: DeliverableSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let session = Session::open(root, user)?;
    let (id, command) = match subcmd {
        DeliverableSubcommand::Create {
            id,
            milestone,
            name,
            description,
            visibility,
            due,
        } => {
            return create(
                &session,
                &id,
                &milestone,
                &name,
                description,
                visibility,
                due.as_deref(),
                json,
            )
        }
        DeliverableSubcommand::List {
            milestone,
            audience,
        } => return list(&session, milestone.as_deref(), audience, json),
        DeliverableSubcommand::Show { id } => return show(&session, &id, json),
        DeliverableSubcommand::Start { id } => (id, Command::StartWork),
        DeliverableSubcommand::RequestApproval { id } => (id, Command::RequestApproval),
        DeliverableSubcommand::Approve { id, comment } => (id, Command::Approve { comment }),
        DeliverableSubcommand::Reject { id, feedback } => (id, Command::Reject { feedback }),
        DeliverableSubcommand::RequestRevision { id, comment } => {
            (id, Command::RequestRevision { comment })
        }
        DeliverableSubcommand::Reopen { id } => (id, Command::ReopenForEdit),
        DeliverableSubcommand::SubmitRevision { id, content } => {
            (id, Command::SubmitRevision { content })
        }
        DeliverableSubcommand::MarkFinal { id, revision_id } => {
            (id, Command::MarkRevisionFinal { revision_id })
        }
    };
    transition(&session, &id, command, json)
}

#[allow(clippy::too_many_arguments)]
fn create(
    session: &Session,
    id: &str,
    milestone: &str,
    name: &str,
    description: Option<String>,
    visibility: Visibility,
    due: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    session
        .milestone(milestone)
        .with_context(|| format!("cannot add '{id}'"))?;

    let mut draft = Deliverable::new(id, session.project_id(), milestone, name, Utc::now());
    draft.description = description.unwrap_or_default();
    draft.visibility = visibility;
    draft.due_date = due.map(parse_due).transpose()?;

    let mut outcome = session
        .engine()
        .plan_create(draft, &session.actor, &session.team.members)?;
    outcome.value = Deliverable::create(&session.root, outcome.value)?;
    session.engine().publish(&outcome);

    if json {
        print_json(&outcome.value)?;
    } else {
        println!("Created deliverable '{id}' in milestone '{milestone}'");
    }
    Ok(())
}

fn transition(session: &Session, id: &str, command: Command, json: bool) -> anyhow::Result<()> {
    let action = command.name();
    let d = session
        .apply(id, command)
        .with_context(|| format!("failed to {action} '{id}'"))?;

    if json {
        print_json(&serde_json::json!({
            "id": d.id,
            "status": d.status,
            "is_approved": d.is_approved(),
            "version": d.version,
        }))?;
    } else {
        println!("{id}: {}", d.status);
    }
    Ok(())
}

fn list(
    session: &Session,
    milestone: Option<&str>,
    audience: Option<Audience>,
    json: bool,
) -> anyhow::Result<()> {
    session.require(Action::View, Resource::Deliverables)?;
    let deliverables: Vec<_> = Deliverable::list(&session.root)?
        .into_iter()
        .filter(|d| milestone.map_or(true, |m| d.milestone_id == m))
        .filter(|d| audience.map_or(true, |a| d.is_visible_to(a)))
        .collect();

    if json {
        return print_json(&deliverables);
    }
    if deliverables.is_empty() {
        println!("No deliverables.");
        return Ok(());
    }

    let rows = deliverables
        .iter()
        .map(|d| {
            vec![
                d.id.clone(),
                d.milestone_id.clone(),
                d.name.clone(),
                d.status.to_string(),
                d.visibility.to_string(),
                fmt_date(d.due_date),
                d.unresolved_feedback().to_string(),
            ]
        })
        .collect();
    print_table(
        &["ID", "MILESTONE", "NAME", "STATUS", "VISIBILITY", "DUE", "OPEN FEEDBACK"],
        rows,
    );
    Ok(())
}

fn show(session: &Session, id: &str, json: bool) -> anyhow::Result<()> {
    session.require(Action::View, Resource::Deliverables)?;
    let d = Deliverable::load(&session.root, id)?;

    if json {
        return print_json(&d);
    }

    println!("{} ({})", d.name, d.id);
    println!("Milestone:  {}", d.milestone_id);
    println!("Status:     {}", d.status);
    println!("Approved:   {}", d.is_approved());
    println!("Visibility: {}", d.visibility);
    println!("Due:        {}", fmt_date(d.due_date));
    if !d.description.is_empty() {
        println!("\n{}", d.description);
    }

    if !d.revisions.is_empty() {
        println!("\nRevisions:");
        let rows = d
            .revisions
            .iter()
            .map(|r| {
                let state = if r.approved_at.is_some() {
                    "approved"
                } else if r.rejected_at.is_some() {
                    "rejected"
                } else {
                    "open"
                };
                let fin = if r.marked_final_at.is_some() { "yes" } else { "" };
                vec![
                    r.id.clone(),
                    r.author.to_string(),
                    state.to_string(),
                    fin.to_string(),
                    r.content.clone(),
                ]
            })
            .collect();
        print_table(&["ID", "AUTHOR", "STATE", "FINAL", "CONTENT"], rows);
    }

    if !d.feedback.is_empty() {
        println!("\nFeedback:");
        super::feedback::print_thread(&d.feedback);
    }
    Ok(())
}
