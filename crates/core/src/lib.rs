//! # Project Access Core
//!
//! Types, storage traits and adapters shared by the project access
//! operations: roles and their permission maps, projects, memberships,
//! invitations, configuration and error handling.

pub mod adapters;
pub mod audit;
pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod logger;
pub mod notify;
pub mod permissions;
pub mod types;
pub mod types_impls;

pub use adapters::{
    DatabaseAdapter, InvitationInsert, InvitationOps, MembershipOps, MemoryDatabaseAdapter,
    MemoryUser, ProjectOps, RoleOps, UserOps,
};
#[cfg(feature = "sqlx-postgres")]
pub use adapters::{PoolConfig, SqlxAdapter, SqlxEntity};
pub use audit::{AuditAction, AuditEntry, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use config::{AccessConfig, DEFAULT_INVITATION_TTL_DAYS, MIN_INVITATION_TOKEN_LENGTH};
pub use context::AccessContext;
pub use entity::AccessUser;
pub use error::{AccessError, AccessResult, DatabaseError, ErrorKind};
pub use logger::{LogLevel, Logger, MemoryLogger, TracingLogger};
pub use notify::{
    ConsoleNotifier, InvitationLinks, InvitationNotice, InvitationNotifier, invitation_links,
};
pub use permissions::{Action, PermissionSet, Resource};
pub use types::{
    CreateInvitation, CreateMembership, CreateProject, CreateRole, CreateUser, Invitation,
    InvitationStatus, Membership, MembershipStatus, OWNER_ROLE, Project, ProjectStatus, Role,
    User,
};
