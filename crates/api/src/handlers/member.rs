use chrono::Utc;
use serde_json::json;
use validator::Validate;

use project_access_core::adapters::DatabaseAdapter;
use project_access_core::audit::{AuditAction, AuditEntry};
use project_access_core::context::AccessContext;
use project_access_core::entity::AccessUser;
use project_access_core::error::{AccessError, AccessResult};
use project_access_core::permissions::{Action, Resource};
use project_access_core::types::{Membership, Project, Role};

use crate::rbac::{self, Access};
use crate::types::{
    PendingInvitationView, RemovedMember, RoleChange, TeamMember, TeamOverview, TeamSummary,
    UpdateRoleRequest,
};
use crate::{guard, registry};

/// Membership `membership_id` of `project`, or `NotFound` when it belongs
/// elsewhere or does not exist.
async fn project_membership<DB: DatabaseAdapter>(
    project: &Project,
    membership_id: &str,
    ctx: &AccessContext<DB>,
) -> AccessResult<Membership> {
    ctx.database
        .get_membership_by_id(membership_id)
        .await?
        .filter(|m| m.project_id == project.id)
        .ok_or_else(|| AccessError::not_found("Member not found in this project"))
}

/// Resolve `actor`'s access, failing with `Forbidden` when they have none.
async fn require_access<DB: DatabaseAdapter>(
    project: &Project,
    actor_id: &str,
    ctx: &AccessContext<DB>,
) -> AccessResult<Access> {
    let access = rbac::access_of(ctx.database.as_ref(), actor_id, project).await?;
    if !access.has_access() {
        return Err(AccessError::forbidden(
            "You don't have access to this project",
        ));
    }
    Ok(access)
}

/// Give membership `membership_id` a new role.
pub async fn update_member_role_core<DB: DatabaseAdapter>(
    project: &Project,
    membership_id: &str,
    body: &UpdateRoleRequest,
    actor: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<RoleChange> {
    body.validate()?;
    let db = ctx.database.as_ref();

    let new_role = registry::resolve_assignable_role(db, &body.role_id).await?;
    let membership = project_membership(project, membership_id, ctx).await?;

    rbac::require_permission(
        db,
        actor.id(),
        project,
        Resource::Users,
        Action::ManageRoles,
        "You don't have permission to change member roles",
    )
    .await?;

    guard::ensure_not_owner_target(project, &membership.user_id)?;

    let old_role = db
        .get_role_by_id(&membership.role_id)
        .await?
        .ok_or_else(|| AccessError::internal("Membership references a missing role"))?;

    let updated = db
        .update_membership_role(&membership.id, &new_role.id)
        .await?;

    tracing::info!(
        project_id = %project.id,
        membership_id = %updated.id,
        old_role = %old_role.name,
        new_role = %new_role.name,
        actor_id = %actor.id(),
        "member role updated"
    );

    ctx.audit(
        AuditEntry::new(
            &project.id,
            actor.id(),
            AuditAction::RoleUpdated,
            "membership",
            &updated.id,
        )
        .with_old(json!({ "role_id": old_role.id, "role": old_role.name }))
        .with_new(json!({ "role_id": new_role.id, "role": new_role.name })),
    )
    .await;

    Ok(RoleChange {
        membership: updated,
        old_role,
        new_role,
    })
}

/// Delete membership `membership_id` on behalf of `actor`.
pub async fn remove_member_core<DB: DatabaseAdapter>(
    project: &Project,
    membership_id: &str,
    actor: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<RemovedMember> {
    let db = ctx.database.as_ref();
    let membership = project_membership(project, membership_id, ctx).await?;

    rbac::require_permission(
        db,
        actor.id(),
        project,
        Resource::Users,
        Action::Remove,
        "You don't have permission to remove members",
    )
    .await?;

    guard::ensure_removable(project, &membership.user_id, actor.id())?;

    db.delete_membership(&membership.id).await?;

    tracing::info!(
        project_id = %project.id,
        membership_id = %membership.id,
        user_id = %membership.user_id,
        actor_id = %actor.id(),
        "member removed"
    );

    ctx.audit(
        AuditEntry::new(
            &project.id,
            actor.id(),
            AuditAction::MemberRemoved,
            "membership",
            &membership.id,
        )
        .with_old(json!({
            "user_id": membership.user_id,
            "role_id": membership.role_id,
            "status": membership.status,
        })),
    )
    .await;

    Ok(RemovedMember {
        membership,
        removed_by: actor.id().to_string(),
    })
}

/// `actor` gives up their own membership.
pub async fn leave_project_core<DB: DatabaseAdapter>(
    project: &Project,
    actor: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<()> {
    guard::ensure_can_leave(project, actor.id())?;

    let membership = ctx
        .database
        .get_active_membership(&project.id, actor.id())
        .await?
        .ok_or_else(|| AccessError::not_found("You are not a member of this project"))?;

    ctx.database.delete_membership(&membership.id).await?;

    tracing::info!(
        project_id = %project.id,
        membership_id = %membership.id,
        user_id = %actor.id(),
        "member left project"
    );

    ctx.audit(
        AuditEntry::new(
            &project.id,
            actor.id(),
            AuditAction::MemberLeft,
            "membership",
            &membership.id,
        )
        .with_old(json!({ "role_id": membership.role_id })),
    )
    .await;

    Ok(())
}

/// Owner, active members and live invitations of `project` as seen by
/// `actor`.
pub async fn team_core<DB: DatabaseAdapter>(
    project: &Project,
    actor: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<TeamOverview> {
    let access = require_access(project, actor.id(), ctx).await?;
    if !access.can(Resource::Users, Action::View) {
        return Err(AccessError::forbidden(
            "You don't have permission to view the team",
        ));
    }
    let can_remove = access.can(Resource::Users, Action::Remove);
    let can_cancel = access.can(Resource::Users, Action::Invite);

    let db = ctx.database.as_ref();
    let mut members = Vec::new();

    let owner = db.get_user_by_id(&project.owner_id).await?;
    members.push(TeamMember {
        membership_id: None,
        user_id: project.owner_id.clone(),
        name: owner.as_ref().and_then(|u| u.name().map(str::to_string)),
        email: owner.as_ref().and_then(|u| u.email().map(str::to_string)),
        role: registry::owner_role(db).await?,
        is_owner: true,
        status: None,
        invited_by: None,
        joined_at: Some(project.created_at),
        can_remove: false,
    });

    let mut active_members = 0;
    for membership in db.list_project_memberships(&project.id).await? {
        if !membership.is_active() {
            continue;
        }
        let Some(role) = db.get_role_by_id(&membership.role_id).await? else {
            continue;
        };
        let user = db.get_user_by_id(&membership.user_id).await?;
        active_members += 1;
        members.push(TeamMember {
            membership_id: Some(membership.id.clone()),
            name: user.as_ref().and_then(|u| u.name().map(str::to_string)),
            email: user.as_ref().and_then(|u| u.email().map(str::to_string)),
            can_remove: can_remove && membership.user_id != actor.id(),
            user_id: membership.user_id,
            role,
            is_owner: false,
            status: Some(membership.status),
            invited_by: Some(membership.invited_by),
            joined_at: membership.joined_at,
        });
    }

    let now = Utc::now();
    let mut pending_invitations = Vec::new();
    for invitation in db.list_project_invitations(&project.id).await? {
        if !invitation.is_live_at(now) {
            continue;
        }
        let role = db.get_role_by_id(&invitation.role_id).await?;
        pending_invitations.push(PendingInvitationView {
            invitation,
            role,
            can_cancel,
        });
    }

    let available_roles = registry::assignable_roles(db).await?;

    Ok(TeamOverview {
        summary: TeamSummary {
            total_members: members.len(),
            active_members: active_members + 1,
            pending_invitations: pending_invitations.len(),
            available_roles,
        },
        members,
        pending_invitations,
    })
}

/// Roles `actor` may pick from when inviting or re-assigning.
pub async fn available_roles_core<DB: DatabaseAdapter>(
    project: &Project,
    actor: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<Vec<Role>> {
    require_access(project, actor.id(), ctx).await?;
    registry::assignable_roles(ctx.database.as_ref()).await
}
