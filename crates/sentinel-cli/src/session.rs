use anyhow::Context;
use sentinel_core::{
    cache::TtlCache,
    clock::SystemClock,
    config::Config,
    deliverable::Deliverable,
    milestone::Milestone,
    notify::{NotificationSink, NullSink, OutboxSink},
    paths,
    permission::{Action, CapabilityTable, Permission, PermissionProvider, Resource, Role},
    team::{MemberStatus, Team},
    workflow::{Actor, Command, WorkflowEngine},
    SentinelError,
};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

const MAX_ATTEMPTS: usize = 3;

pub type Engine = WorkflowEngine<CapabilityTable, Box<dyn NotificationSink>, SystemClock>;

/// Everything a command needs: the project on disk and who is acting.
pub struct Session {
    pub root: PathBuf,
    pub config: Config,
    pub team: Team,
    pub actor: Actor,
    pub role: Role,
    engine: Engine,
    milestones: RefCell<TtlCache<String, Vec<Milestone>, SystemClock>>,
}

impl Session {
    pub fn open(root: &Path, user: Option<&str>) -> anyhow::Result<Self> {
        let config = Config::load(root).context("failed to load .sentinel/config.yaml")?;
        let team = Team::load(root).context("failed to load team")?;

        let member = match user {
            Some(id) => team
                .find(id)
                .with_context(|| format!("'{id}' is not on this project's team"))?,
            None => team
                .members
                .iter()
                .find(|m| m.role == Role::Owner && m.status == MemberStatus::Active)
                .context("no acting user: pass --as <member-id> or set SENTINEL_USER")?,
        };
        let actor = Actor::new(member.id.clone(), member.name.clone(), member.side());

        let table = config.capability_table();
        let role = table
            .role_of(&actor.user_id, &team.members)
            .ok_or_else(|| SentinelError::NotAMember(actor.user_id.clone()))?;

        let sink: Box<dyn NotificationSink> = if config.notifications.outbox {
            Box::new(OutboxSink::new(paths::outbox_path(root)))
        } else {
            Box::new(NullSink)
        };
        let engine = WorkflowEngine::new(table, sink, SystemClock);
        let milestones = RefCell::new(TtlCache::new(config.milestone_ttl(), SystemClock));

        tracing::debug!(user = %actor.user_id, role = %role, "session opened");
        Ok(Self {
            root: root.to_path_buf(),
            config,
            team,
            actor,
            role,
            engine,
            milestones,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn project_id(&self) -> &str {
        &self.config.project.id
    }

    pub fn require(&self, action: Action, resource: Resource) -> anyhow::Result<()> {
        let permission = Permission::new(action, resource);
        if !self.engine.permissions().has_permission(self.role, permission) {
            return Err(SentinelError::PermissionDenied {
                role: self.role.to_string(),
                permission: permission.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Project milestones, served from the per-session cache while fresh.
    pub fn milestones(&self) -> anyhow::Result<Vec<Milestone>> {
        let key = self.project_id().to_string();
        let mut cache = self.milestones.borrow_mut();
        cache.purge_expired();
        let list = cache.get_or_try_insert_with(key, || Milestone::list(&self.root))?;
        Ok(list)
    }

    pub fn invalidate_milestones(&self) {
        self.milestones
            .borrow_mut()
            .invalidate(&self.config.project.id);
    }

    pub fn milestone(&self, id: &str) -> anyhow::Result<Milestone> {
        self.milestones()?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| SentinelError::MilestoneNotFound(id.to_string()).into())
    }

    /// Load, transition, and save a deliverable, retrying when another writer
    /// got there first. The event is published only after the write lands.
    pub fn apply(&self, id: &str, command: Command) -> anyhow::Result<Deliverable> {
        let d = self.engine.apply_with_retry(
            &self.actor,
            &self.team.members,
            &command,
            MAX_ATTEMPTS,
            || Deliverable::load(&self.root, id),
            |d| d.save_if_version(&self.root),
        )?;
        Ok(d)
    }
}
