use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use project_access_core::adapters::{MemoryDatabaseAdapter, MembershipOps, ProjectOps, UserOps};
use project_access_core::audit::MemoryAuditSink;
use project_access_core::config::AccessConfig;
use project_access_core::context::AccessContext;
use project_access_core::error::{AccessError, AccessResult};
use project_access_core::logger::MemoryLogger;
use project_access_core::notify::{InvitationNotice, InvitationNotifier};
use project_access_core::types::{
    CreateMembership, CreateProject, CreateUser, Invitation, Membership, Project, Role, User,
};

use crate::handlers::invite_core;
use crate::registry;
use crate::types::InviteRequest;

#[derive(Clone, Default)]
pub(crate) struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<InvitationNotice>>>,
    pub fail: bool,
}

#[async_trait]
impl InvitationNotifier for RecordingNotifier {
    async fn notify(&self, notice: &InvitationNotice) -> AccessResult<()> {
        if self.fail {
            return Err(AccessError::internal("mail relay unavailable"));
        }
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

pub(crate) struct Fixture {
    pub ctx: AccessContext<MemoryDatabaseAdapter>,
    pub roles: Vec<Role>,
    pub project: Project,
    pub owner: User,
    pub notifier: RecordingNotifier,
    pub audit: MemoryAuditSink,
    pub logger: MemoryLogger,
}

pub(crate) async fn fixture() -> Fixture {
    fixture_with_notifier(RecordingNotifier::default()).await
}

pub(crate) async fn fixture_with_notifier(notifier: RecordingNotifier) -> Fixture {
    let audit = MemoryAuditSink::new();
    let logger = MemoryLogger::new();
    let config = AccessConfig::new("https://crm.example.com")
        .notifier(Arc::new(notifier.clone()))
        .audit_sink(Arc::new(audit.clone()))
        .logger(Arc::new(logger.clone()));

    let database: MemoryDatabaseAdapter = MemoryDatabaseAdapter::new();
    let roles = registry::seed_system_roles(&database).await.unwrap();
    let owner = database
        .create_user(CreateUser::new().with_email("owner@example.com").with_name("Olga"))
        .await
        .unwrap();
    let project = database
        .create_project(CreateProject::new("Clinic", &owner.id))
        .await
        .unwrap();

    Fixture {
        ctx: AccessContext::new(Arc::new(config), Arc::new(database)),
        roles,
        project,
        owner,
        notifier,
        audit,
        logger,
    }
}

impl Fixture {
    pub fn role(&self, name: &str) -> &Role {
        self.roles.iter().find(|r| r.name == name).unwrap()
    }

    pub async fn user(&self, email: &str) -> User {
        self.ctx
            .database
            .create_user(CreateUser::new().with_email(email))
            .await
            .unwrap()
    }

    /// A user with an active membership in the fixture project.
    pub async fn member(&self, email: &str, role: &str) -> (User, Membership) {
        let user = self.user(email).await;
        let membership = self
            .ctx
            .database
            .create_membership(CreateMembership::active(
                &self.project.id,
                &user.id,
                &self.role(role).id,
                &self.owner.id,
            ))
            .await
            .unwrap();
        (user, membership)
    }

    pub async fn invite(&self, issuer: &User, email: &str, role: &str) -> AccessResult<Invitation> {
        let body = InviteRequest::new(email, &self.role(role).id);
        invite_core(&self.project, issuer, &body, &self.ctx).await
    }
}
