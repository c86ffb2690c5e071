use crate::output::{print_json, print_table};
use clap::Subcommand;
use sentinel_core::{notify::read_outbox, paths};
use std::path::Path;

#[derive(Subcommand)]
pub enum OutboxSubcommand {
    /// List recorded notification events, oldest first
    List {
        /// Show only the last N events
        #[arg(long)]
        tail: Option<usize>,
    },
}

pub fn run(root: &Path, subcmd: OutboxSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        OutboxSubcommand::List { tail } => list(root, tail, json),
    }
}

fn list(root: &Path, tail: Option<usize>, json: bool) -> anyhow::Result<()> {
    let mut events = read_outbox(&paths::outbox_path(root))?;
    if let Some(n) = tail {
        let skip = events.len().saturating_sub(n);
        events.drain(..skip);
    }

    if json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("Outbox is empty.");
        return Ok(());
    }
    let rows = events
        .iter()
        .map(|e| {
            vec![
                e.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                e.kind.to_string(),
                e.actor.clone(),
                e.message.clone(),
            ]
        })
        .collect();
    print_table(&["WHEN", "TYPE", "ACTOR", "MESSAGE"], rows);
    Ok(())
}
