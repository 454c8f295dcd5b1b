//! # Project Access API
//!
//! Operations on top of the core types: the system role registry, the
//! permission evaluator, ownership guards, invitation tokens and the
//! invitation and membership workflows.

pub mod guard;
pub mod handlers;
pub mod rbac;
pub mod registry;
pub mod token;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use rbac::{Access, access_of, has_access, has_permission, has_permission_str, role_of};
pub use registry::{assignable_roles, owner_role, seed_system_roles, system_roles};
pub use types::{
    CreateProjectRequest, InviteRequest, PendingInvitationView, ProjectCapabilities,
    RemovedMember, RoleChange, TeamMember, TeamOverview, TeamSummary, UpdateRoleRequest,
    normalize_email,
};
