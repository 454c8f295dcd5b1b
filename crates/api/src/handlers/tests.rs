use super::*;
use crate::test_helpers::{RecordingNotifier, fixture, fixture_with_notifier};
use crate::types::{CreateProjectRequest, InviteRequest, UpdateRoleRequest};
use chrono::{Duration, Utc};
use project_access_core::adapters::{InvitationInsert, InvitationOps, MembershipOps, ProjectOps};
use project_access_core::audit::AuditAction;
use project_access_core::error::ErrorKind;
use project_access_core::logger::LogLevel;
use project_access_core::types::{
    CreateInvitation, CreateMembership, InvitationStatus, MembershipStatus,
};

// -----------------------------------------------------------------------
// Invitations
// -----------------------------------------------------------------------

#[tokio::test]
async fn test_invite_and_accept() {
    let f = fixture().await;
    let invitation = f.invite(&f.owner, "Bob@Example.com ", "editor").await.unwrap();

    assert_eq!(invitation.email, "bob@example.com");
    assert_eq!(invitation.status, InvitationStatus::Pending);
    assert_eq!(invitation.token.len(), 64);
    assert!(invitation.expires_at > Utc::now() + Duration::days(6));
    assert!(invitation.expires_at <= Utc::now() + Duration::days(7));

    let bob = f.user("bob@example.com").await;
    let membership = accept_invitation_core(&invitation.token, &bob, &f.ctx)
        .await
        .unwrap();

    assert_eq!(membership.status, MembershipStatus::Active);
    assert_eq!(membership.role_id, f.role("editor").id);
    assert_eq!(membership.invited_by, f.owner.id);
    assert_eq!(membership.invited_at, Some(invitation.created_at));
    assert!(membership.joined_at.is_some());

    let stored = f
        .ctx
        .database
        .get_invitation_by_id(&invitation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, InvitationStatus::Accepted);

    assert_eq!(
        f.audit.actions(),
        vec![AuditAction::InvitationSent, AuditAction::InvitationAccepted]
    );
}

#[tokio::test]
async fn test_invite_notifies_with_links() {
    let f = fixture().await;
    let invitation = f.invite(&f.owner, "ana@example.com", "viewer").await.unwrap();

    let sent = f.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].email, "ana@example.com");
    assert_eq!(sent[0].role_name, "Solo lectura");
    assert_eq!(sent[0].project_name, "Clinic");
    assert_eq!(sent[0].inviter_name.as_deref(), Some("Olga"));
    assert_eq!(
        sent[0].links.accept,
        format!(
            "https://crm.example.com/api/v1/projects/{}/invitations/{}/accept",
            f.project.id, invitation.token
        )
    );
}

#[tokio::test]
async fn test_notifier_failure_does_not_fail_invite() {
    let f = fixture_with_notifier(RecordingNotifier {
        fail: true,
        ..Default::default()
    })
    .await;

    let invitation = f.invite(&f.owner, "ana@example.com", "viewer").await.unwrap();
    assert!(invitation.is_pending());
    assert!(f.logger.contains(LogLevel::Warn, &invitation.id));
}

#[tokio::test]
async fn test_invite_rejects_owner_role_and_unknown_role() {
    let f = fixture().await;

    let err = f.invite(&f.owner, "ana@example.com", "owner").await.unwrap_err();
    assert!(matches!(err, AccessError::OwnerRoleNotAssignable));

    let body = InviteRequest::new("ana@example.com", "no-such-role");
    let err = invite_core(&f.project, &f.owner, &body, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let body = InviteRequest::new("not an email", &f.role("viewer").id);
    let err = invite_core(&f.project, &f.owner, &body, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_invite_requires_users_invite() {
    let f = fixture().await;
    let (editor, _) = f.member("ed@example.com", "editor").await;
    let (admin, _) = f.member("ada@example.com", "admin").await;

    let err = f.invite(&editor, "x@example.com", "viewer").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    assert!(f.invite(&admin, "x@example.com", "viewer").await.is_ok());
}

#[tokio::test]
async fn test_invite_existing_member_conflicts() {
    let f = fixture().await;
    f.member("ed@example.com", "editor").await;

    let err = f.invite(&f.owner, "ED@example.com", "viewer").await.unwrap_err();
    assert!(matches!(err, AccessError::Conflict(_)));

    let err = f.invite(&f.owner, "owner@example.com", "viewer").await.unwrap_err();
    assert!(matches!(err, AccessError::Conflict(_)));
}

#[tokio::test]
async fn test_invite_user_with_inactive_membership_conflicts() {
    let f = fixture().await;
    let sus = f.user("sus@example.com").await;
    f.ctx
        .database
        .create_membership(
            CreateMembership::active(&f.project.id, &sus.id, &f.role("viewer").id, &f.owner.id)
                .with_status(MembershipStatus::Suspended),
        )
        .await
        .unwrap();

    let err = f.invite(&f.owner, "sus@example.com", "editor").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(
        f.ctx
            .database
            .list_project_invitations(&f.project.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(f.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_pending_invitation() {
    let f = fixture().await;
    let first = f.invite(&f.owner, "ana@example.com", "viewer").await.unwrap();

    let err = f.invite(&f.owner, "ana@example.com", "editor").await.unwrap_err();
    match err {
        AccessError::PendingInvitationExists { expires_at, role } => {
            assert_eq!(expires_at, first.expires_at);
            assert_eq!(role, "Solo lectura");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let pending: Vec<_> = f
        .ctx
        .database
        .list_project_invitations(&f.project.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|i| i.is_pending())
        .collect();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn test_reinvite_after_expiry() {
    let f = fixture().await;
    let now = Utc::now();
    f.ctx
        .database
        .create_invitation_if_absent(
            CreateInvitation {
                project_id: f.project.id.clone(),
                email: "ana@example.com".into(),
                role_id: f.role("viewer").id.clone(),
                token: "e".repeat(64),
                invited_by: f.owner.id.clone(),
                expires_at: now - Duration::hours(1),
            },
            now - Duration::days(8),
        )
        .await
        .unwrap();

    assert!(f.invite(&f.owner, "ana@example.com", "viewer").await.is_ok());
}

#[tokio::test]
async fn test_accept_errors() {
    let f = fixture().await;
    let invitation = f.invite(&f.owner, "bob@example.com", "editor").await.unwrap();
    let mallory = f.user("mallory@example.com").await;

    let err = accept_invitation_core("unknown-token", &mallory, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidInvitation));

    let err = accept_invitation_core(&invitation.token, &mallory, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvitationEmailMismatch));

    // The mismatch did not consume the invitation.
    let bob = f.user("bob@example.com").await;
    accept_invitation_core(&invitation.token, &bob, &f.ctx)
        .await
        .unwrap();

    let err = accept_invitation_core(&invitation.token, &bob, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidInvitation));

    let memberships = f
        .ctx
        .database
        .list_project_memberships(&f.project.id)
        .await
        .unwrap();
    assert_eq!(memberships.len(), 1);
}

#[tokio::test]
async fn test_accept_expired_invitation_fails() {
    let f = fixture().await;
    let now = Utc::now();
    f.ctx
        .database
        .create_invitation_if_absent(
            CreateInvitation {
                project_id: f.project.id.clone(),
                email: "late@example.com".into(),
                role_id: f.role("viewer").id.clone(),
                token: "x".repeat(64),
                invited_by: f.owner.id.clone(),
                expires_at: now - Duration::seconds(1),
            },
            now - Duration::days(7),
        )
        .await
        .unwrap();

    let late = f.user("late@example.com").await;
    let err = accept_invitation_core(&"x".repeat(64), &late, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidInvitation));
    assert!(
        f.ctx
            .database
            .get_membership(&f.project.id, &late.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_reject_invitation() {
    let f = fixture().await;
    let invitation = f.invite(&f.owner, "bob@example.com", "editor").await.unwrap();
    let bob = f.user("bob@example.com").await;

    let rejected = reject_invitation_core(&invitation.token, &bob, &f.ctx)
        .await
        .unwrap();
    assert_eq!(rejected.status, InvitationStatus::Rejected);

    let err = accept_invitation_core(&invitation.token, &bob, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidInvitation));
}

#[tokio::test]
async fn test_cancel_invitation() {
    let f = fixture().await;
    let invitation = f.invite(&f.owner, "bob@example.com", "editor").await.unwrap();
    let (viewer, _) = f.member("vic@example.com", "viewer").await;

    let err = cancel_invitation_core(&f.project, &invitation.id, &viewer, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let cancelled = cancel_invitation_core(&f.project, &invitation.id, &f.owner, &f.ctx)
        .await
        .unwrap();
    assert_eq!(cancelled.status, InvitationStatus::Cancelled);

    let err = cancel_invitation_core(&f.project, &invitation.id, &f.owner, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AccessError::InvitationNotPending {
            status: InvitationStatus::Cancelled
        }
    ));

    let bob = f.user("bob@example.com").await;
    let err = accept_invitation_core(&invitation.token, &bob, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidInvitation));
}

#[tokio::test]
async fn test_cancel_invitation_of_other_project() {
    let f = fixture().await;
    let invitation = f.invite(&f.owner, "bob@example.com", "editor").await.unwrap();
    let other = f
        .ctx
        .database
        .create_project(project_access_core::types::CreateProject::new("Other", &f.owner.id))
        .await
        .unwrap();

    let err = cancel_invitation_core(&other, &invitation.id, &f.owner, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_cancel_expired_pending_invitation() {
    let f = fixture().await;
    let now = Utc::now();
    let invitation = match f
        .ctx
        .database
        .create_invitation_if_absent(
            CreateInvitation {
                project_id: f.project.id.clone(),
                email: "stale@example.com".into(),
                role_id: f.role("viewer").id.clone(),
                token: "s".repeat(64),
                invited_by: f.owner.id.clone(),
                expires_at: now - Duration::hours(2),
            },
            now - Duration::days(8),
        )
        .await
        .unwrap()
    {
        InvitationInsert::Created(invitation) => invitation,
        InvitationInsert::Existing(_) => panic!("expected a fresh invitation"),
    };
    assert!(invitation.is_expired());

    let cancelled = cancel_invitation_core(&f.project, &invitation.id, &f.owner, &f.ctx)
        .await
        .unwrap();
    assert_eq!(cancelled.status, InvitationStatus::Cancelled);
    assert!(f.audit.actions().contains(&AuditAction::InvitationCancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_yield_one_membership() {
    let f = fixture().await;
    let invitation = f.invite(&f.owner, "race@example.com", "editor").await.unwrap();
    let racer = f.user("race@example.com").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ctx = f.ctx.clone();
        let user = racer.clone();
        let token = invitation.token.clone();
        handles.push(tokio::spawn(async move {
            accept_invitation_core(&token, &user, &ctx).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let memberships = f
        .ctx
        .database
        .list_project_memberships(&f.project.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.user_id == racer.id)
        .count();
    assert_eq!(memberships, 1);
}

#[tokio::test]
async fn test_pending_invitations_for_user() {
    let f = fixture().await;
    f.invite(&f.owner, "bob@example.com", "editor").await.unwrap();
    let bob = f.user("Bob@Example.com").await;

    let pending = pending_invitations_for_core(&bob, &f.ctx).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].project_id, f.project.id);
}

// -----------------------------------------------------------------------
// Members
// -----------------------------------------------------------------------

#[tokio::test]
async fn test_update_member_role() {
    let f = fixture().await;
    let (_, membership) = f.member("vic@example.com", "viewer").await;

    let body = UpdateRoleRequest {
        role_id: f.role("scheduler").id.clone(),
    };
    let change = update_member_role_core(&f.project, &membership.id, &body, &f.owner, &f.ctx)
        .await
        .unwrap();
    assert_eq!(change.old_role.name, "viewer");
    assert_eq!(change.new_role.name, "scheduler");
    assert_eq!(change.membership.role_id, f.role("scheduler").id);
    assert_eq!(f.audit.actions(), vec![AuditAction::RoleUpdated]);
}

#[tokio::test]
async fn test_admin_cannot_manage_roles() {
    let f = fixture().await;
    let (admin, _) = f.member("ada@example.com", "admin").await;
    let (_, viewer) = f.member("vic@example.com", "viewer").await;

    let body = UpdateRoleRequest {
        role_id: f.role("editor").id.clone(),
    };
    let err = update_member_role_core(&f.project, &viewer.id, &body, &admin, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_update_role_to_owner_is_rejected_before_write() {
    let f = fixture().await;
    let (_, membership) = f.member("vic@example.com", "viewer").await;

    let body = UpdateRoleRequest {
        role_id: f.role("owner").id.clone(),
    };
    let err = update_member_role_core(&f.project, &membership.id, &body, &f.owner, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::OwnerRoleNotAssignable));

    let unchanged = f
        .ctx
        .database
        .get_membership_by_id(&membership.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.role_id, f.role("viewer").id);
}

#[tokio::test]
async fn test_owner_role_change_is_guarded() {
    let f = fixture().await;
    // A stray membership row for the owner must not open a path to demotion.
    let stray = f
        .ctx
        .database
        .create_membership(project_access_core::types::CreateMembership::active(
            &f.project.id,
            &f.owner.id,
            &f.role("viewer").id,
            &f.owner.id,
        ))
        .await
        .unwrap();

    let body = UpdateRoleRequest {
        role_id: f.role("viewer").id.clone(),
    };
    let err = update_member_role_core(&f.project, &stray.id, &body, &f.owner, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::OwnershipGuard { .. }));

    let err = remove_member_core(&f.project, &stray.id, &f.owner, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::OwnershipGuard { .. }));
}

#[tokio::test]
async fn test_remove_member() {
    let f = fixture().await;
    let (admin, admin_membership) = f.member("ada@example.com", "admin").await;
    let (_, editor) = f.member("ed@example.com", "editor").await;

    let removed = remove_member_core(&f.project, &editor.id, &admin, &f.ctx)
        .await
        .unwrap();
    assert_eq!(removed.removed_by, admin.id);
    assert!(
        f.ctx
            .database
            .get_membership_by_id(&editor.id)
            .await
            .unwrap()
            .is_none()
    );

    let err = remove_member_core(&f.project, &admin_membership.id, &admin, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_remove_requires_permission() {
    let f = fixture().await;
    let (editor, _) = f.member("ed@example.com", "editor").await;
    let (_, viewer) = f.member("vic@example.com", "viewer").await;

    let err = remove_member_core(&f.project, &viewer.id, &editor, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = remove_member_core(&f.project, "missing", &f.owner, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_leave_project() {
    let f = fixture().await;
    let (editor, _) = f.member("ed@example.com", "editor").await;

    leave_project_core(&f.project, &editor, &f.ctx).await.unwrap();
    assert!(
        !crate::rbac::has_access(f.ctx.database.as_ref(), &editor.id, &f.project)
            .await
            .unwrap()
    );

    let err = leave_project_core(&f.project, &editor, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = leave_project_core(&f.project, &f.owner, &f.ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::OwnershipGuard { .. }));
}

#[tokio::test]
async fn test_team_overview() {
    let f = fixture().await;
    let (admin, _) = f.member("ada@example.com", "admin").await;
    f.member("ed@example.com", "editor").await;
    f.invite(&f.owner, "new@example.com", "viewer").await.unwrap();

    let team = team_core(&f.project, &admin, &f.ctx).await.unwrap();
    assert_eq!(team.members.len(), 3);
    assert_eq!(team.summary.total_members, 3);
    assert_eq!(team.summary.active_members, 3);
    assert_eq!(team.summary.pending_invitations, 1);
    assert_eq!(team.summary.available_roles.len(), 4);

    let owner = &team.members[0];
    assert!(owner.is_owner);
    assert!(owner.membership_id.is_none());
    assert!(!owner.can_remove);
    assert_eq!(owner.role.name, "owner");

    let editor = team
        .members
        .iter()
        .find(|m| m.email.as_deref() == Some("ed@example.com"))
        .unwrap();
    assert!(editor.can_remove);
    let me = team.members.iter().find(|m| m.user_id == admin.id).unwrap();
    assert!(!me.can_remove);
    assert!(team.pending_invitations[0].can_cancel);

    let outsider = f.user("out@example.com").await;
    let err = team_core(&f.project, &outsider, &f.ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_available_roles() {
    let f = fixture().await;
    let (viewer, _) = f.member("vic@example.com", "viewer").await;

    let roles = available_roles_core(&f.project, &viewer, &f.ctx).await.unwrap();
    assert_eq!(roles.len(), 4);
    assert!(roles.iter().all(|r| !r.is_owner()));

    let outsider = f.user("out@example.com").await;
    assert!(
        available_roles_core(&f.project, &outsider, &f.ctx)
            .await
            .is_err()
    );
}

// -----------------------------------------------------------------------
// Projects
// -----------------------------------------------------------------------

#[tokio::test]
async fn test_capabilities() {
    let f = fixture().await;
    let (admin, _) = f.member("ada@example.com", "admin").await;
    let outsider = f.user("out@example.com").await;

    let owner_caps = capabilities_core(&f.project, &f.owner, &f.ctx).await.unwrap();
    assert!(owner_caps.is_owner && owner_caps.can_delete && owner_caps.can_manage_users);

    let admin_caps = capabilities_core(&f.project, &admin, &f.ctx).await.unwrap();
    assert!(!admin_caps.is_owner);
    assert!(admin_caps.can_edit);
    assert!(!admin_caps.can_delete);
    assert!(!admin_caps.can_manage_users);

    let none = capabilities_core(&f.project, &outsider, &f.ctx).await.unwrap();
    assert!(!none.is_owner && !none.can_edit && !none.can_delete && !none.can_manage_users);
}

#[tokio::test]
async fn test_create_project_rejects_blank_name() {
    let f = fixture().await;
    let body = CreateProjectRequest {
        name: "   ".into(),
        description: None,
    };
    let err = create_project_core(&body, &f.owner, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(projects_for_core(&f.owner, &f.ctx).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_and_delete_project() {
    let f = fixture().await;
    let body = CreateProjectRequest {
        name: "  Second  ".into(),
        description: Some("  ".into()),
    };
    let project = create_project_core(&body, &f.owner, &f.ctx).await.unwrap();
    assert_eq!(project.name, "Second");
    assert!(project.description.is_none());
    assert_eq!(project.owner_id, f.owner.id);

    let projects = projects_for_core(&f.owner, &f.ctx).await.unwrap();
    assert_eq!(projects.len(), 2);

    let (admin, _) = f.member("ada@example.com", "admin").await;
    let err = delete_project_core(&f.project, &admin, &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    f.invite(&f.owner, "bob@example.com", "viewer").await.unwrap();
    delete_project_core(&f.project, &f.owner, &f.ctx).await.unwrap();
    assert!(require_project(&f.project.id, &f.ctx).await.is_err());
    assert!(
        f.ctx
            .database
            .list_project_invitations(&f.project.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(projects_for_core(&admin, &f.ctx).await.unwrap().is_empty());
}
