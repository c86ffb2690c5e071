//! Deliverable approval workflow.
//!
//! [`transition`] is a pure function of (snapshot, role, actor, command, now):
//! it checks the caller's capability, validates input, applies the state rule,
//! and returns the next deliverable together with at most one notification.
//! Re-applying it to the same snapshot yields the same result, so callers can
//! retry on a version conflict by reloading and calling it again.
//!
//! [`WorkflowEngine`] wraps it with role resolution, a clock, and a sink.

use crate::clock::Clock;
use crate::deliverable::Deliverable;
use crate::error::{Result, SentinelError};
use crate::feedback::{append_feedback, resolve_feedback};
use crate::milestone::{Milestone, MilestoneStatus};
use crate::notify::{deliver, NotificationEvent, NotificationSink, NotificationType};
use crate::paths;
use crate::permission::{Action, Permission, PermissionProvider, Resource, Role};
use crate::revision::{append_revision, find_revision_mut, pending_revision_mut};
use crate::team::TeamMember;
use crate::types::{AuthorRole, DeliverableStatus};
use chrono::{DateTime, Utc};
use serde_json::json;

// ---------------------------------------------------------------------------
// Actor / Command
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub display_name: String,
    pub side: AuthorRole,
}

impl Actor {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        side: AuthorRole,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            side,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartWork,
    RequestApproval,
    Approve { comment: Option<String> },
    Reject { feedback: String },
    RequestRevision { comment: Option<String> },
    AddFeedback { content: String },
    ResolveFeedback { feedback_id: String },
    ReopenForEdit,
    SubmitRevision { content: String },
    MarkRevisionFinal { revision_id: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartWork => "start work",
            Command::RequestApproval => "request approval",
            Command::Approve { .. } => "approve",
            Command::Reject { .. } => "reject",
            Command::RequestRevision { .. } => "request revision",
            Command::AddFeedback { .. } => "add feedback",
            Command::ResolveFeedback { .. } => "resolve feedback",
            Command::ReopenForEdit => "reopen",
            Command::SubmitRevision { .. } => "submit revision",
            Command::MarkRevisionFinal { .. } => "mark revision final",
        }
    }

    pub fn required_permission(&self) -> Permission {
        match self {
            Command::StartWork
            | Command::RequestApproval
            | Command::ReopenForEdit
            | Command::SubmitRevision { .. }
            | Command::MarkRevisionFinal { .. } => {
                Permission::new(Action::Edit, Resource::Deliverables)
            }
            Command::Approve { .. } | Command::Reject { .. } | Command::RequestRevision { .. } => {
                Permission::new(Action::Approve, Resource::Deliverables)
            }
            Command::AddFeedback { .. } => Permission::new(Action::View, Resource::Comments),
            Command::ResolveFeedback { .. } => Permission::new(Action::Edit, Resource::Comments),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The next value plus the event to publish. `event` is `None` for no-ops.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub event: Option<NotificationEvent>,
}

impl<T> Outcome<T> {
    fn unchanged(value: T) -> Self {
        Self { value, event: None }
    }

    pub fn changed(&self) -> bool {
        self.event.is_some()
    }
}

pub type Transition = Outcome<Deliverable>;

// ---------------------------------------------------------------------------
// Pure transition
// ---------------------------------------------------------------------------

fn require(permissions: &impl PermissionProvider, role: Role, permission: Permission) -> Result<()> {
    if permissions.has_permission(role, permission) {
        Ok(())
    } else {
        Err(SentinelError::PermissionDenied {
            role: role.to_string(),
            permission: permission.to_string(),
        })
    }
}

fn illegal(from: DeliverableStatus, command: &Command, reason: &str) -> SentinelError {
    SentinelError::IllegalTransition {
        from: from.to_string(),
        action: command.name().to_string(),
        reason: reason.to_string(),
    }
}

/// Blank optional comments count as absent.
fn non_blank(text: &Option<String>) -> Option<&str> {
    text.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

fn require_text<'a>(text: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SentinelError::validation(format!("{what} required")));
    }
    Ok(trimmed)
}

fn validate(command: &Command) -> Result<()> {
    match command {
        Command::Reject { feedback } => require_text(feedback, "feedback").map(|_| ()),
        Command::AddFeedback { content } => require_text(content, "feedback content").map(|_| ()),
        Command::SubmitRevision { content } => require_text(content, "revision content").map(|_| ()),
        _ => Ok(()),
    }
}

fn event(
    d: &Deliverable,
    actor: &Actor,
    kind: NotificationType,
    message: String,
    metadata: serde_json::Value,
    now: DateTime<Utc>,
) -> NotificationEvent {
    let mut metadata = metadata;
    if let Some(obj) = metadata.as_object_mut() {
        obj.insert("deliverable_id".into(), json!(d.id));
        obj.insert("milestone_id".into(), json!(d.milestone_id));
    }
    NotificationEvent {
        project_id: d.project_id.clone(),
        kind,
        actor: actor.user_id.clone(),
        message,
        metadata,
        created_at: now,
    }
}

/// Move `d` to `to` along an edge of the status graph.
fn status_changed(
    mut d: Deliverable,
    command: &Command,
    to: DeliverableStatus,
    actor: &Actor,
    message: String,
    now: DateTime<Utc>,
) -> Result<Transition> {
    let from = d.status;
    if !from.can_transition_to(to) {
        return Err(illegal(from, command, &format!("'{to}' is not reachable from here")));
    }
    d.status = to;
    d.updated_at = now;
    let ev = event(
        &d,
        actor,
        NotificationType::DeliverableUpdated,
        message,
        json!({ "from": from, "to": to }),
        now,
    );
    Ok(Outcome {
        value: d,
        event: Some(ev),
    })
}

/// Apply `command` to `snapshot` on behalf of `actor` holding `role`.
///
/// Checks run in order: capability, input, state. Re-issuing a command whose
/// target state is already reached returns the snapshot unchanged with no
/// event; `reject` still insists on non-empty feedback in that case.
pub fn transition(
    snapshot: &Deliverable,
    role: Role,
    permissions: &impl PermissionProvider,
    actor: &Actor,
    command: &Command,
    now: DateTime<Utc>,
) -> Result<Transition> {
    use DeliverableStatus::*;

    require(permissions, role, command.required_permission())?;
    validate(command)?;

    let from = snapshot.status;
    let mut d = snapshot.clone();
    let who = &actor.display_name;
    let name = &snapshot.name;

    match command {
        Command::StartWork => match from {
            NotStarted => status_changed(d, command, InProgress, actor, format!("{who} started work on \"{name}\""), now),
            InProgress => Ok(Outcome::unchanged(d)),
            _ => Err(illegal(from, command, "work has already been started")),
        },

        Command::RequestApproval => match from {
            InProgress => status_changed(d, command, Delivered, actor, format!("\"{name}\" is ready for review"), now),
            s if s.is_awaiting_decision() => Ok(Outcome::unchanged(d)),
            _ => Err(illegal(from, command, "only in-progress work can be submitted for review")),
        },

        Command::Approve { comment } => match from {
            s if s.is_awaiting_decision() => {
                if let Some(text) = non_blank(comment) {
                    append_feedback(&mut d.feedback, who.as_str(), actor.side, text, now);
                }
                if let Some(rev) = pending_revision_mut(&mut d.revisions) {
                    rev.mark_approved(now);
                }
                status_changed(d, command, Approved, actor, format!("{who} approved \"{name}\""), now)
            }
            Approved => Ok(Outcome::unchanged(d)),
            _ => Err(illegal(from, command, "only delivered work can be approved")),
        },

        Command::Reject { feedback } => match from {
            s if s.is_awaiting_decision() => {
                if let Some(rev) = pending_revision_mut(&mut d.revisions) {
                    rev.mark_rejected(now);
                }
                let id = append_revision(&mut d.revisions, actor.side, feedback.trim(), now);
                if let Some(rev) = d.revisions.iter_mut().find(|r| r.id == id) {
                    rev.mark_rejected(now);
                }
                status_changed(d, command, Rejected, actor, format!("{who} requested changes to \"{name}\""), now)
            }
            Rejected => Ok(Outcome::unchanged(d)),
            _ => Err(illegal(from, command, "only delivered work can be rejected")),
        },

        Command::RequestRevision { comment } => match from {
            s if s == Approved || s.is_awaiting_decision() => {
                if let Some(text) = non_blank(comment) {
                    append_feedback(&mut d.feedback, who.as_str(), actor.side, text, now);
                }
                status_changed(d, command, InProgress, actor, format!("{who} requested a revision of \"{name}\""), now)
            }
            InProgress => Ok(Outcome::unchanged(d)),
            _ => Err(illegal(from, command, "revisions can only be requested on delivered or approved work")),
        },

        Command::ReopenForEdit => match from {
            Approved | Rejected => status_changed(d, command, InProgress, actor, format!("{who} reopened \"{name}\""), now),
            InProgress => Ok(Outcome::unchanged(d)),
            _ => Err(illegal(from, command, "only approved or rejected work can be reopened")),
        },

        Command::AddFeedback { content } => {
            let id = append_feedback(&mut d.feedback, who.as_str(), actor.side, content.trim(), now);
            d.updated_at = now;
            let ev = event(
                &d,
                actor,
                NotificationType::CommentAdded,
                format!("{who} commented on \"{name}\""),
                json!({ "feedback_id": id }),
                now,
            );
            Ok(Outcome { value: d, event: Some(ev) })
        }

        Command::ResolveFeedback { feedback_id } => {
            if !resolve_feedback(&mut d.feedback, feedback_id)? {
                return Ok(Outcome::unchanged(snapshot.clone()));
            }
            d.updated_at = now;
            let ev = event(
                &d,
                actor,
                NotificationType::DeliverableUpdated,
                format!("{who} resolved feedback on \"{name}\""),
                json!({ "feedback_id": feedback_id, "resolved": true }),
                now,
            );
            Ok(Outcome { value: d, event: Some(ev) })
        }

        Command::SubmitRevision { content } => match from {
            s if s == InProgress || s.is_awaiting_decision() => {
                let id = append_revision(&mut d.revisions, actor.side, content.trim(), now);
                d.updated_at = now;
                let ev = event(
                    &d,
                    actor,
                    NotificationType::RevisionAdded,
                    format!("{who} added revision {id} to \"{name}\""),
                    json!({ "revision_id": id }),
                    now,
                );
                Ok(Outcome { value: d, event: Some(ev) })
            }
            _ => Err(illegal(from, command, "revisions are submitted while work is open")),
        },

        Command::MarkRevisionFinal { revision_id } => {
            if !find_revision_mut(&mut d.revisions, revision_id)?.mark_final(now) {
                return Ok(Outcome::unchanged(snapshot.clone()));
            }
            d.updated_at = now;
            let ev = event(
                &d,
                actor,
                NotificationType::DeliverableUpdated,
                format!("{who} marked revision {revision_id} of \"{name}\" final"),
                json!({ "revision_id": revision_id, "final": true }),
                now,
            );
            Ok(Outcome { value: d, event: Some(ev) })
        }
    }
}

// ---------------------------------------------------------------------------
// Creation / milestone completion
// ---------------------------------------------------------------------------

/// Validate and normalize a new deliverable: history is cleared and status
/// reset to NotStarted.
pub fn plan_create(
    draft: Deliverable,
    role: Role,
    permissions: &impl PermissionProvider,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Outcome<Deliverable>> {
    require(permissions, role, Permission::new(Action::Edit, Resource::Deliverables))?;
    paths::validate_slug(&draft.id)?;
    require_text(&draft.name, "deliverable name")?;
    require_text(&draft.milestone_id, "milestone")?;

    let mut d = draft;
    d.name = d.name.trim().to_string();
    d.status = DeliverableStatus::NotStarted;
    d.revisions.clear();
    d.feedback.clear();
    d.created_at = now;
    d.updated_at = now;
    d.version = 0;

    let ev = event(
        &d,
        actor,
        NotificationType::DeliverableAdded,
        format!("{} added \"{}\"", actor.display_name, d.name),
        json!({ "visibility": d.visibility }),
        now,
    );
    Ok(Outcome { value: d, event: Some(ev) })
}

pub fn plan_complete_milestone(
    milestone: &Milestone,
    deliverables: &[Deliverable],
    role: Role,
    permissions: &impl PermissionProvider,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Outcome<Milestone>> {
    require(permissions, role, Permission::new(Action::Edit, Resource::Milestones))?;

    if milestone.status == MilestoneStatus::Complete {
        return Ok(Outcome::unchanged(milestone.clone()));
    }
    if !milestone.is_ready_to_complete(deliverables) {
        return Err(SentinelError::IllegalTransition {
            from: milestone.status.to_string(),
            action: "complete milestone".to_string(),
            reason: "every deliverable must be approved first".to_string(),
        });
    }

    let mut m = milestone.clone();
    m.mark_complete(now);
    let ev = NotificationEvent {
        project_id: m.project_id.clone(),
        kind: NotificationType::MilestoneCompleted,
        actor: actor.user_id.clone(),
        message: format!("Milestone \"{}\" is complete", m.title),
        metadata: json!({ "milestone_id": m.id }),
        created_at: now,
    };
    Ok(Outcome { value: m, event: Some(ev) })
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

pub struct WorkflowEngine<P, S, C> {
    permissions: P,
    sink: S,
    clock: C,
}

impl<P: PermissionProvider, S: NotificationSink, C: Clock> WorkflowEngine<P, S, C> {
    pub fn new(permissions: P, sink: S, clock: C) -> Self {
        Self {
            permissions,
            sink,
            clock,
        }
    }

    pub fn permissions(&self) -> &P {
        &self.permissions
    }

    pub fn resolve_role(&self, actor: &Actor, team: &[TeamMember]) -> Result<Role> {
        self.permissions
            .role_of(&actor.user_id, team)
            .ok_or_else(|| SentinelError::NotAMember(actor.user_id.clone()))
    }

    /// Compute the transition without publishing anything.
    pub fn plan(
        &self,
        deliverable: &Deliverable,
        actor: &Actor,
        team: &[TeamMember],
        command: &Command,
    ) -> Result<Transition> {
        let role = self.resolve_role(actor, team)?;
        transition(deliverable, role, &self.permissions, actor, command, self.clock.now())
    }

    /// Hand a planned outcome's event to the sink. Failures are logged, never returned.
    pub fn publish<T>(&self, outcome: &Outcome<T>) {
        match &outcome.event {
            Some(ev) => {
                tracing::debug!(kind = %ev.kind, actor = %ev.actor, "publishing notification");
                deliver(&self.sink, ev);
            }
            None => tracing::info!("no state change; nothing to publish"),
        }
    }

    /// Load, plan, and store a deliverable, reloading and planning again when
    /// `store` reports a [`SentinelError::Conflict`]. Gives up with that conflict
    /// after `max_attempts`. The event is published once, after a store succeeds.
    pub fn apply_with_retry(
        &self,
        actor: &Actor,
        team: &[TeamMember],
        command: &Command,
        max_attempts: usize,
        mut load: impl FnMut() -> Result<Deliverable>,
        mut store: impl FnMut(&mut Deliverable) -> Result<()>,
    ) -> Result<Deliverable> {
        let mut attempt = 1;
        loop {
            let snapshot = load()?;
            let mut outcome = self.plan(&snapshot, actor, team, command)?;
            if !outcome.changed() {
                tracing::info!(deliverable = %snapshot.id, action = command.name(), "already applied");
                return Ok(outcome.value);
            }
            match store(&mut outcome.value) {
                Ok(()) => {
                    self.publish(&outcome);
                    return Ok(outcome.value);
                }
                Err(SentinelError::Conflict { .. }) if attempt < max_attempts => {
                    tracing::warn!(deliverable = %snapshot.id, attempt, "concurrent update; retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Plan, publish, and return the updated deliverable.
    pub fn execute(
        &self,
        deliverable: &Deliverable,
        actor: &Actor,
        team: &[TeamMember],
        command: Command,
    ) -> Result<Deliverable> {
        let outcome = self.plan(deliverable, actor, team, &command)?;
        tracing::debug!(
            deliverable = %deliverable.id,
            action = command.name(),
            from = %deliverable.status,
            to = %outcome.value.status,
            "workflow transition"
        );
        self.publish(&outcome);
        Ok(outcome.value)
    }

    pub fn start_work(&self, d: &Deliverable, actor: &Actor, team: &[TeamMember]) -> Result<Deliverable> {
        self.execute(d, actor, team, Command::StartWork)
    }

    pub fn request_approval(&self, d: &Deliverable, actor: &Actor, team: &[TeamMember]) -> Result<Deliverable> {
        self.execute(d, actor, team, Command::RequestApproval)
    }

    pub fn approve(
        &self,
        d: &Deliverable,
        actor: &Actor,
        team: &[TeamMember],
        comment: Option<String>,
    ) -> Result<Deliverable> {
        self.execute(d, actor, team, Command::Approve { comment })
    }

    pub fn reject(
        &self,
        d: &Deliverable,
        actor: &Actor,
        team: &[TeamMember],
        feedback: impl Into<String>,
    ) -> Result<Deliverable> {
        self.execute(d, actor, team, Command::Reject { feedback: feedback.into() })
    }

    pub fn request_revision(
        &self,
        d: &Deliverable,
        actor: &Actor,
        team: &[TeamMember],
        comment: Option<String>,
    ) -> Result<Deliverable> {
        self.execute(d, actor, team, Command::RequestRevision { comment })
    }

    pub fn add_feedback(
        &self,
        d: &Deliverable,
        actor: &Actor,
        team: &[TeamMember],
        content: impl Into<String>,
    ) -> Result<Deliverable> {
        self.execute(d, actor, team, Command::AddFeedback { content: content.into() })
    }

    pub fn resolve_feedback(
        &self,
        d: &Deliverable,
        actor: &Actor,
        team: &[TeamMember],
        feedback_id: impl Into<String>,
    ) -> Result<Deliverable> {
        self.execute(d, actor, team, Command::ResolveFeedback { feedback_id: feedback_id.into() })
    }

    pub fn reopen_for_edit(&self, d: &Deliverable, actor: &Actor, team: &[TeamMember]) -> Result<Deliverable> {
        self.execute(d, actor, team, Command::ReopenForEdit)
    }

    pub fn submit_revision(
        &self,
        d: &Deliverable,
        actor: &Actor,
        team: &[TeamMember],
        content: impl Into<String>,
    ) -> Result<Deliverable> {
        self.execute(d, actor, team, Command::SubmitRevision { content: content.into() })
    }

    pub fn mark_revision_final(
        &self,
        d: &Deliverable,
        actor: &Actor,
        team: &[TeamMember],
        revision_id: impl Into<String>,
    ) -> Result<Deliverable> {
        self.execute(d, actor, team, Command::MarkRevisionFinal { revision_id: revision_id.into() })
    }

    pub fn plan_create(&self, draft: Deliverable, actor: &Actor, team: &[TeamMember]) -> Result<Outcome<Deliverable>> {
        let role = self.resolve_role(actor, team)?;
        plan_create(draft, role, &self.permissions, actor, self.clock.now())
    }

    pub fn create_deliverable(&self, draft: Deliverable, actor: &Actor, team: &[TeamMember]) -> Result<Deliverable> {
        let outcome = self.plan_create(draft, actor, team)?;
        self.publish(&outcome);
        Ok(outcome.value)
    }

    pub fn plan_complete_milestone(
        &self,
        milestone: &Milestone,
        deliverables: &[Deliverable],
        actor: &Actor,
        team: &[TeamMember],
    ) -> Result<Outcome<Milestone>> {
        let role = self.resolve_role(actor, team)?;
        plan_complete_milestone(milestone, deliverables, role, &self.permissions, actor, self.clock.now())
    }

    pub fn complete_milestone(
        &self,
        milestone: &Milestone,
        deliverables: &[Deliverable],
        actor: &Actor,
        team: &[TeamMember],
    ) -> Result<Milestone> {
        let outcome = self.plan_complete_milestone(milestone, deliverables, actor, team)?;
        self.publish(&outcome);
        Ok(outcome.value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
