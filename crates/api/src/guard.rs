//! Ownership invariants: the owner holds every permission through
//! `projects.owner_id`, can never be demoted, removed or leave, and the
//! owner role is never handed out through a membership.

use project_access_core::error::{AccessError, AccessResult};
use project_access_core::types::{Project, Role};

const TRANSFER_HINT: &str = "Transfer ownership of the project to another user first";

/// Reject the owner role as an assignment target.
pub fn ensure_role_assignable(role: &Role) -> AccessResult<()> {
    if role.is_owner() {
        return Err(AccessError::OwnerRoleNotAssignable);
    }
    Ok(())
}

/// Reject a role change aimed at the project owner.
pub fn ensure_not_owner_target(project: &Project, target_user_id: &str) -> AccessResult<()> {
    if project.is_owned_by(target_user_id) {
        return Err(AccessError::ownership(
            "The project owner's role cannot be changed",
            TRANSFER_HINT,
        ));
    }
    Ok(())
}

/// Check that `actor_id` may remove `target_user_id`: never the owner, and
/// never oneself (that is what leaving is for).
pub fn ensure_removable(project: &Project, target_user_id: &str, actor_id: &str) -> AccessResult<()> {
    if project.is_owned_by(target_user_id) {
        return Err(AccessError::ownership(
            "The project owner cannot be removed",
            TRANSFER_HINT,
        ));
    }
    if target_user_id == actor_id {
        return Err(AccessError::conflict(
            "You cannot remove yourself; leave the project instead",
        ));
    }
    Ok(())
}

pub fn ensure_can_leave(project: &Project, actor_id: &str) -> AccessResult<()> {
    if project.is_owned_by(actor_id) {
        return Err(AccessError::ownership(
            "The project owner cannot leave the project",
            TRANSFER_HINT,
        ));
    }
    Ok(())
}
