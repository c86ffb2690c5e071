use crate::output::{print_json, print_table};
use crate::session::Session;
use anyhow::Context;
use clap::Subcommand;
use sentinel_core::{
    deliverable::Deliverable,
    feedback::Feedback,
    permission::{Action, Resource},
    workflow::Command,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum FeedbackSubcommand {
    /// Comment on a deliverable
    Add { id: String, content: String },
    /// Mark a feedback entry resolved
    Resolve { id: String, feedback_id: String },
    /// List the feedback thread on a deliverable
    List {
        id: String,
        /// Hide resolved entries
        #[arg(long)]
        unresolved: bool,
    },
}

pub fn run(
    root: &Path,
    user: Option<&str>,
    subcmd: FeedbackSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let session = Session::open(root, user)?;
    match subcmd {
        FeedbackSubcommand::Add { id, content } => add(&session, &id, content, json),
        FeedbackSubcommand::Resolve { id, feedback_id } => {
            resolve(&session, &id, feedback_id, json)
        }
        FeedbackSubcommand::List { id, unresolved } => list(&session, &id, unresolved, json),
    }
}

fn add(session: &Session, id: &str, content: String, json: bool) -> anyhow::Result<()> {
    let d = session
        .apply(id, Command::AddFeedback { content })
        .with_context(|| format!("failed to comment on '{id}'"))?;
    let entry = d
        .feedback
        .last()
        .context("feedback thread is empty after append")?;

    if json {
        print_json(entry)?;
    } else {
        println!("Added feedback [{}] to '{id}'", entry.id);
    }
    Ok(())
}

fn resolve(session: &Session, id: &str, feedback_id: String, json: bool) -> anyhow::Result<()> {
    let d = session.apply(
        id,
        Command::ResolveFeedback {
            feedback_id: feedback_id.clone(),
        },
    )?;

    if json {
        print_json(&serde_json::json!({
            "id": id,
            "feedback_id": feedback_id,
            "resolved": true,
            "unresolved_remaining": d.unresolved_feedback(),
        }))?;
    } else {
        println!("Resolved feedback [{feedback_id}] on '{id}'");
    }
    Ok(())
}

fn list(session: &Session, id: &str, unresolved: bool, json: bool) -> anyhow::Result<()> {
    session.require(Action::View, Resource::Comments)?;
    let d = Deliverable::load(&session.root, id)?;
    let thread: Vec<Feedback> = d
        .feedback
        .into_iter()
        .filter(|f| !unresolved || !f.resolved)
        .collect();

    if json {
        return print_json(&thread);
    }
    if thread.is_empty() {
        println!("No feedback on '{id}'.");
        return Ok(());
    }
    print_thread(&thread);
    Ok(())
}

pub(crate) fn print_thread(thread: &[Feedback]) {
    let rows = thread
        .iter()
        .map(|f| {
            vec![
                f.id.clone(),
                format!("{} ({})", f.author, f.role),
                f.created_at.format("%Y-%m-%d %H:%M").to_string(),
                if f.resolved { "resolved" } else { "open" }.to_string(),
                f.content.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "AUTHOR", "WHEN", "STATE", "CONTENT"], rows);
}
