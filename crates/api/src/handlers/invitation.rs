use chrono::Utc;
use serde_json::json;
use validator::Validate;

use project_access_core::adapters::{DatabaseAdapter, InvitationInsert};
use project_access_core::audit::{AuditAction, AuditEntry};
use project_access_core::context::AccessContext;
use project_access_core::entity::AccessUser;
use project_access_core::error::{AccessError, AccessResult};
use project_access_core::notify::{InvitationNotice, invitation_links};
use project_access_core::permissions::{Action, Resource};
use project_access_core::types::{
    CreateInvitation, CreateMembership, Invitation, InvitationStatus, Membership, Project,
};

use crate::types::{InviteRequest, normalize_email};
use crate::{guard, rbac, registry, token};

/// Issue an invitation for `body.email` to join `project` with `body.role_id`.
pub async fn invite_core<DB: DatabaseAdapter>(
    project: &Project,
    issuer: &DB::User,
    body: &InviteRequest,
    ctx: &AccessContext<DB>,
) -> AccessResult<Invitation> {
    let email = normalize_email(&body.email);
    let body = InviteRequest {
        email: email.clone(),
        role_id: body.role_id.clone(),
    };
    body.validate()?;

    let db = ctx.database.as_ref();
    let role = registry::resolve_assignable_role(db, &body.role_id).await?;

    rbac::require_permission(
        db,
        issuer.id(),
        project,
        Resource::Users,
        Action::Invite,
        "You don't have permission to invite users",
    )
    .await?;

    if let Some(existing_user) = db.get_user_by_email(&email).await? {
        if rbac::has_access(db, existing_user.id(), project).await? {
            return Err(AccessError::conflict(
                "This user already has access to the project",
            ));
        }
        // Pending or suspended rows would make acceptance hit the
        // (project, user) uniqueness constraint.
        if db
            .get_membership(&project.id, existing_user.id())
            .await?
            .is_some()
        {
            return Err(AccessError::conflict(
                "This user already has a membership in the project",
            ));
        }
    }

    let now = Utc::now();
    let create = CreateInvitation {
        project_id: project.id.clone(),
        email: email.clone(),
        role_id: role.id.clone(),
        token: token::generate_invitation_token(ctx.config.invitation_token_length),
        invited_by: issuer.id().to_string(),
        expires_at: now + ctx.config.invitation_expires_in,
    };

    let invitation = match db.create_invitation_if_absent(create, now).await? {
        InvitationInsert::Created(invitation) => invitation,
        InvitationInsert::Existing(existing) => {
            let role = db
                .get_role_by_id(&existing.role_id)
                .await?
                .map(|r| r.display_name)
                .unwrap_or_else(|| existing.role_id.clone());
            return Err(AccessError::PendingInvitationExists {
                expires_at: existing.expires_at,
                role,
            });
        }
    };

    tracing::info!(
        project_id = %project.id,
        invitation_id = %invitation.id,
        role = %role.name,
        invited_by = %issuer.id(),
        "invitation issued"
    );

    let notice = InvitationNotice {
        invitation_id: invitation.id.clone(),
        email: invitation.email.clone(),
        project_id: project.id.clone(),
        project_name: project.name.clone(),
        project_description: project.description.clone(),
        inviter_id: issuer.id().to_string(),
        inviter_name: issuer.name().map(str::to_string),
        role_name: role.display_name.clone(),
        expires_at: invitation.expires_at,
        links: invitation_links(&ctx.config.base_url, &project.id, &invitation.token),
    };
    ctx.notify_invitation(&notice).await;

    ctx.audit(
        AuditEntry::new(
            &project.id,
            issuer.id(),
            AuditAction::InvitationSent,
            "invitation",
            &invitation.id,
        )
        .with_new(json!({
            "email": invitation.email,
            "role_id": invitation.role_id,
            "expires_at": invitation.expires_at,
        })),
    )
    .await;

    Ok(invitation)
}

/// Find a live invitation by token and check it is addressed to `user`.
async fn live_invitation_for<DB: DatabaseAdapter>(
    token: &str,
    user: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<Invitation> {
    let invitation = ctx
        .database
        .get_live_invitation_by_token(token, Utc::now())
        .await?
        .ok_or(AccessError::InvalidInvitation)?;

    let user_email = user.email().map(normalize_email);
    if user_email.as_deref() != Some(invitation.email.as_str()) {
        return Err(AccessError::InvitationEmailMismatch);
    }

    Ok(invitation)
}

/// Accept the invitation identified by `token` as `user`, creating an
/// active membership.
pub async fn accept_invitation_core<DB: DatabaseAdapter>(
    token: &str,
    user: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<Membership> {
    let invitation = live_invitation_for(token, user, ctx).await?;
    let db = ctx.database.as_ref();

    let project = db
        .get_project_by_id(&invitation.project_id)
        .await?
        .ok_or(AccessError::InvalidInvitation)?;

    if rbac::has_access(db, user.id(), &project).await? {
        return Err(AccessError::conflict(
            "You already have access to this project",
        ));
    }

    if let Some(role) = db.get_role_by_id(&invitation.role_id).await? {
        guard::ensure_role_assignable(&role)?;
    }

    let now = Utc::now();
    let create = CreateMembership::active(
        &project.id,
        user.id(),
        &invitation.role_id,
        &invitation.invited_by,
    )
    .with_invited_at(invitation.created_at)
    .with_joined_at(now);

    let (membership, accepted) = db.accept_invitation(&invitation.id, create, now).await?;

    tracing::info!(
        project_id = %project.id,
        invitation_id = %accepted.id,
        membership_id = %membership.id,
        user_id = %user.id(),
        "invitation accepted"
    );

    ctx.audit(
        AuditEntry::new(
            &project.id,
            user.id(),
            AuditAction::InvitationAccepted,
            "invitation",
            &accepted.id,
        )
        .with_old(json!({ "status": InvitationStatus::Pending }))
        .with_new(json!({
            "status": accepted.status,
            "membership_id": membership.id,
            "role_id": membership.role_id,
        })),
    )
    .await;

    Ok(membership)
}

/// Decline the invitation identified by `token` as `user`.
pub async fn reject_invitation_core<DB: DatabaseAdapter>(
    token: &str,
    user: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<Invitation> {
    let invitation = live_invitation_for(token, user, ctx).await?;

    let rejected = ctx
        .database
        .transition_pending_invitation(&invitation.id, InvitationStatus::Rejected)
        .await?
        .ok_or(AccessError::InvalidInvitation)?;

    tracing::info!(
        project_id = %rejected.project_id,
        invitation_id = %rejected.id,
        user_id = %user.id(),
        "invitation rejected"
    );

    ctx.audit(
        AuditEntry::new(
            &rejected.project_id,
            user.id(),
            AuditAction::InvitationRejected,
            "invitation",
            &rejected.id,
        )
        .with_new(json!({ "status": rejected.status })),
    )
    .await;

    Ok(rejected)
}

/// Cancel a pending invitation of `project`. Expired but still pending
/// invitations can be cancelled too.
pub async fn cancel_invitation_core<DB: DatabaseAdapter>(
    project: &Project,
    invitation_id: &str,
    canceller: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<Invitation> {
    let db = ctx.database.as_ref();

    let invitation = db
        .get_invitation_by_id(invitation_id)
        .await?
        .filter(|i| i.project_id == project.id)
        .ok_or_else(|| AccessError::not_found("Invitation not found in this project"))?;

    rbac::require_permission(
        db,
        canceller.id(),
        project,
        Resource::Users,
        Action::Invite,
        "You don't have permission to cancel invitations",
    )
    .await?;

    if !invitation.is_pending() {
        return Err(AccessError::InvitationNotPending {
            status: invitation.status,
        });
    }

    let cancelled = match db
        .transition_pending_invitation(&invitation.id, InvitationStatus::Cancelled)
        .await?
    {
        Some(cancelled) => cancelled,
        None => {
            // Lost a race with accept/reject/cancel; report what won.
            let status = db
                .get_invitation_by_id(&invitation.id)
                .await?
                .map(|i| i.status)
                .unwrap_or(invitation.status);
            return Err(AccessError::InvitationNotPending { status });
        }
    };

    tracing::info!(
        project_id = %project.id,
        invitation_id = %cancelled.id,
        cancelled_by = %canceller.id(),
        "invitation cancelled"
    );

    ctx.audit(
        AuditEntry::new(
            &project.id,
            canceller.id(),
            AuditAction::InvitationCancelled,
            "invitation",
            &cancelled.id,
        )
        .with_old(json!({ "status": InvitationStatus::Pending }))
        .with_new(json!({ "status": cancelled.status })),
    )
    .await;

    Ok(cancelled)
}

/// Live invitations addressed to `user`'s email, across all projects.
pub async fn pending_invitations_for_core<DB: DatabaseAdapter>(
    user: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<Vec<Invitation>> {
    let email = user
        .email()
        .map(normalize_email)
        .ok_or_else(|| AccessError::validation("User has no email address"))?;

    ctx.database
        .list_live_invitations_for_email(&email, Utc::now())
        .await
}
