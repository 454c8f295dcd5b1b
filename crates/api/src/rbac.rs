//! Permission evaluation.
//!
//! A user's effective role in a project is the owner role when they own it,
//! the role of their active membership otherwise, and nothing at all when
//! neither applies. Every check is fail-closed: unknown resources, unknown
//! actions and missing roles all deny.

use project_access_core::adapters::{MembershipOps, RoleOps};
use project_access_core::error::{AccessError, AccessResult};
use project_access_core::permissions::{Action, Resource};
use project_access_core::types::{Membership, Project, Role};

use crate::registry;

/// True iff `role` grants `action` on `resource`.
pub fn has_permission(role: &Role, resource: Resource, action: Action) -> bool {
    role.permissions.allows(resource.as_str(), action.as_str())
}

/// String form of [`has_permission`] for names coming from callers or
/// storage.
pub fn has_permission_str(role: &Role, resource: &str, action: &str) -> bool {
    role.permissions.allows(resource, action)
}

/// A user's standing in one project.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Owner(Role),
    Member { membership: Membership, role: Role },
    None,
}

impl Access {
    pub fn role(&self) -> Option<&Role> {
        match self {
            Self::Owner(role) | Self::Member { role, .. } => Some(role),
            Self::None => None,
        }
    }

    pub fn into_role(self) -> Option<Role> {
        match self {
            Self::Owner(role) | Self::Member { role, .. } => Some(role),
            Self::None => None,
        }
    }

    pub fn membership(&self) -> Option<&Membership> {
        match self {
            Self::Member { membership, .. } => Some(membership),
            _ => None,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner(_))
    }

    pub fn has_access(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn can(&self, resource: Resource, action: Action) -> bool {
        self.role()
            .is_some_and(|role| has_permission(role, resource, action))
    }
}

/// Resolve `user_id`'s standing in `project`.
///
/// Only storage failures surface as errors. A membership whose role row is
/// missing yields [`Access::None`].
pub async fn access_of<DB>(db: &DB, user_id: &str, project: &Project) -> AccessResult<Access>
where
    DB: MembershipOps + RoleOps + ?Sized,
{
    if project.is_owned_by(user_id) {
        return Ok(Access::Owner(registry::owner_role(db).await?));
    }

    let Some(membership) = db.get_active_membership(&project.id, user_id).await? else {
        return Ok(Access::None);
    };

    match db.get_role_by_id(&membership.role_id).await? {
        Some(role) => Ok(Access::Member { membership, role }),
        None => {
            tracing::warn!(
                membership_id = %membership.id,
                role_id = %membership.role_id,
                "membership references a missing role; denying access"
            );
            Ok(Access::None)
        }
    }
}

pub async fn role_of<DB>(db: &DB, user_id: &str, project: &Project) -> AccessResult<Option<Role>>
where
    DB: MembershipOps + RoleOps + ?Sized,
{
    Ok(access_of(db, user_id, project).await?.into_role())
}

pub async fn has_access<DB>(db: &DB, user_id: &str, project: &Project) -> AccessResult<bool>
where
    DB: MembershipOps + RoleOps + ?Sized,
{
    Ok(access_of(db, user_id, project).await?.has_access())
}

/// Resolve access and require `action` on `resource`, failing with
/// `Forbidden(message)` otherwise.
pub async fn require_permission<DB>(
    db: &DB,
    user_id: &str,
    project: &Project,
    resource: Resource,
    action: Action,
    message: &str,
) -> AccessResult<Access>
where
    DB: MembershipOps + RoleOps + ?Sized,
{
    let access = access_of(db, user_id, project).await?;
    if !access.can(resource, action) {
        tracing::debug!(
            project_id = %project.id,
            user_id,
            permission = %format!("{resource}.{action}"),
            "permission denied"
        );
        return Err(AccessError::forbidden(message));
    }
    Ok(access)
}
