//! Shared harness for the integration tests.
//!
//! Provides:
//! - [`TestHarness`]: a `ProjectAccess` over the memory adapter with a
//!   recording notifier, an in-memory audit sink and a seeded project.
//! - [`unique_email`]: counter-based addresses to avoid collisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use project_access::adapters::{MembershipOps, MemoryDatabaseAdapter, RoleOps, UserOps};
use project_access::types::{CreateMembership, CreateUser, Membership, Project, Role, User};
use project_access::{
    AccessBuilder, AccessConfig, AccessResult, InvitationNotice, InvitationNotifier,
    MemoryAuditSink, ProjectAccess,
};

static EMAIL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique email address for testing.
#[allow(dead_code)]
pub fn unique_email(prefix: &str) -> String {
    let n = EMAIL_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{n}@test.com")
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<InvitationNotice>>>,
}

impl RecordingNotifier {
    #[allow(dead_code)]
    pub fn sent(&self) -> Vec<InvitationNotice> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvitationNotifier for RecordingNotifier {
    async fn notify(&self, notice: &InvitationNotice) -> AccessResult<()> {
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

pub struct TestHarness {
    pub access: ProjectAccess<MemoryDatabaseAdapter>,
    pub notifier: RecordingNotifier,
    pub audit: MemoryAuditSink,
    pub owner: User,
    pub project: Project,
}

#[allow(dead_code)]
impl TestHarness {
    pub async fn new() -> Self {
        let notifier = RecordingNotifier::default();
        let audit = MemoryAuditSink::new();
        let access = AccessBuilder::new(AccessConfig::new("https://crm.example.com"))
            .notifier(notifier.clone())
            .audit_sink(audit.clone())
            .database(MemoryDatabaseAdapter::new())
            .build()
            .await
            .expect("Failed to build access service");

        let owner = access
            .database()
            .create_user(CreateUser::new().with_email("owner@example.com").with_name("Olga"))
            .await
            .expect("Failed to create owner");
        let project = access
            .create_project(&owner, "Clinic", Some("Front desk team"))
            .await
            .expect("Failed to create project");

        Self {
            access,
            notifier,
            audit,
            owner,
            project,
        }
    }

    pub async fn role(&self, name: &str) -> Role {
        self.access
            .database()
            .get_role_by_name(name)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("role {name} not seeded"))
    }

    pub async fn user(&self, email: &str) -> User {
        self.access
            .database()
            .create_user(CreateUser::new().with_email(email))
            .await
            .expect("Failed to create user")
    }

    /// A user holding an active membership in the harness project.
    pub async fn member(&self, email: &str, role: &str) -> (User, Membership) {
        let user = self.user(email).await;
        let role = self.role(role).await;
        let membership = self
            .access
            .database()
            .create_membership(CreateMembership::active(
                &self.project.id,
                &user.id,
                &role.id,
                &self.owner.id,
            ))
            .await
            .expect("Failed to create membership");
        (user, membership)
    }

    pub async fn memberships_of(&self, user: &User) -> usize {
        self.access
            .database()
            .list_project_memberships(&self.project.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.user_id == user.id)
            .count()
    }
}
