mod cmd;
mod output;
mod root;
mod session;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, deliverable::DeliverableSubcommand, feedback::FeedbackSubcommand,
    milestone::MilestoneSubcommand, outbox::OutboxSubcommand, team::TeamSubcommand,
};
use sentinel_core::SentinelError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sentinel",
    about = "Scope Sentinel: deliverable approvals, feedback, and revisions for client projects",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .sentinel/ or .git/)
    #[arg(long, global = true, env = "SENTINEL_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Team member id to act as (default: the project owner)
    #[arg(long = "as", global = true, env = "SENTINEL_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize .sentinel/ in the project root
    Init {
        /// Project id (default: derived from the directory name)
        #[arg(long)]
        project_id: Option<String>,
        /// Display name for the project
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "Owner")]
        owner_name: String,
        #[arg(long, default_value = "owner@localhost")]
        owner_email: String,
    },

    /// Manage team members and roles
    Team {
        #[command(subcommand)]
        subcommand: TeamSubcommand,
    },

    /// Manage milestones
    Milestone {
        #[command(subcommand)]
        subcommand: MilestoneSubcommand,
    },

    /// Create deliverables and drive their approval workflow
    Deliverable {
        #[command(subcommand)]
        subcommand: DeliverableSubcommand,
    },

    /// Add, resolve, and list feedback on deliverables
    Feedback {
        #[command(subcommand)]
        subcommand: FeedbackSubcommand,
    },

    /// Inspect recorded notification events
    Outbox {
        #[command(subcommand)]
        subcommand: OutboxSubcommand,
    },

    /// Show or validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let user = cli.user.as_deref();

    let result = match cli.command {
        Commands::Init {
            project_id,
            name,
            owner_name,
            owner_email,
        } => cmd::init::run(
            &root,
            project_id.as_deref(),
            name.as_deref(),
            &owner_name,
            &owner_email,
        ),
        Commands::Team { subcommand } => cmd::team::run(&root, user, subcommand, cli.json),
        Commands::Milestone { subcommand } => {
            cmd::milestone::run(&root, user, subcommand, cli.json)
        }
        Commands::Deliverable { subcommand } => {
            cmd::deliverable::run(&root, user, subcommand, cli.json)
        }
        Commands::Feedback { subcommand } => cmd::feedback::run(&root, user, subcommand, cli.json),
        Commands::Outbox { subcommand } => cmd::outbox::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        if cli.json {
            eprintln!("{}", error_json(&e));
        } else {
            eprintln!("error: {e:#}");
        }
        std::process::exit(1);
    }
}

/// `{"error": "...", "kind": "..."}`; `kind` is omitted for errors from outside the core.
fn error_json(e: &anyhow::Error) -> serde_json::Value {
    let kind = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<SentinelError>())
        .map(SentinelError::kind);
    let mut out = serde_json::json!({ "error": format!("{e:#}") });
    if let Some(kind) = kind {
        out["kind"] = serde_json::json!(kind);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn json_errors_carry_the_kind() {
        let e = Err::<(), _>(SentinelError::FeedbackNotFound("FB9".into()))
            .context("failed to resolve")
            .unwrap_err();
        let v = error_json(&e);
        assert_eq!(v["kind"], "not_found");
        assert_eq!(v["error"], "failed to resolve: feedback not found: FB9");

        let plain = error_json(&anyhow::anyhow!("no acting user"));
        assert!(plain.get("kind").is_none());
    }
}
