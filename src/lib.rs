//! # Project Access
//!
//! Project membership and role-based permissions: a fixed registry of
//! system roles, a fail-closed permission evaluator, per-project
//! memberships, token-based invitations and the guards that keep a
//! project's owner in place.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use project_access::{AccessBuilder, AccessConfig, ConsoleNotifier};
//! use project_access::adapters::MemoryDatabaseAdapter;
//! use project_access::types::CreateUser;
//! use project_access::adapters::UserOps;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let access = AccessBuilder::new(AccessConfig::new("https://crm.example.com"))
//!         .database(MemoryDatabaseAdapter::<project_access::types::User>::new())
//!         .notifier(ConsoleNotifier)
//!         .build()
//!         .await?;
//!
//!     let owner = access
//!         .database()
//!         .create_user(CreateUser::new().with_email("owner@example.com"))
//!         .await?;
//!     let project = access.create_project(&owner, "Clinic", None).await?;
//!     let team = access.team(&project.id, &owner).await?;
//!     assert_eq!(team.summary.total_members, 1);
//!
//!     Ok(())
//! }
//! ```

// The facade lives in the root crate because it stitches the workflows
// (project-access-api) onto storage and config (project-access-core).
pub mod core;

pub use project_access_core::{
    AccessConfig, AccessContext, AccessError, AccessResult, AccessUser, Action, AuditAction,
    AuditEntry, AuditSink, ConsoleNotifier, DatabaseError, ErrorKind, InvitationLinks,
    InvitationNotice, InvitationNotifier, LogLevel, Logger, MemoryAuditSink, MemoryLogger,
    PermissionSet, Resource, TracingAuditSink, TracingLogger, invitation_links,
};

pub mod types {
    pub use project_access_api::types::*;
    pub use project_access_core::types::*;
}

pub mod adapters {
    pub use project_access_core::adapters::*;
}

pub mod workflows {
    pub use project_access_api::{guard, handlers, rbac, registry, token};
}

pub use crate::core::{AccessBuilder, ProjectAccess, TypedAccessBuilder};
pub use project_access_api::rbac::Access;
pub use project_access_api::registry::{
    ADMIN_ROLE, EDITOR_ROLE, SCHEDULER_ROLE, VIEWER_ROLE, system_roles,
};
pub use project_access_api::types::normalize_email;
pub use project_access_core::{
    DEFAULT_INVITATION_TTL_DAYS, MIN_INVITATION_TOKEN_LENGTH, OWNER_ROLE,
};
