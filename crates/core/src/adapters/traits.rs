use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entity::AccessUser;
use crate::error::AccessResult;
use crate::types::{
    CreateInvitation, CreateMembership, CreateProject, CreateRole, CreateUser, Invitation,
    InvitationStatus, Membership, Project, Role,
};

/// Outcome of [`InvitationOps::create_invitation_if_absent`].
#[derive(Debug, Clone)]
pub enum InvitationInsert {
    Created(Invitation),
    /// A live invitation for the same (project, email) already existed.
    Existing(Invitation),
}

/// User directory lookups.
#[async_trait]
pub trait UserOps: Send + Sync + 'static {
    type User: AccessUser;

    async fn create_user(&self, user: CreateUser) -> AccessResult<Self::User>;
    async fn get_user_by_id(&self, id: &str) -> AccessResult<Option<Self::User>>;
    /// Case-insensitive match on the stored email.
    async fn get_user_by_email(&self, email: &str) -> AccessResult<Option<Self::User>>;
}

/// Role catalogue persistence.
#[async_trait]
pub trait RoleOps: Send + Sync + 'static {
    /// Fails with a conflict if a role with the same name exists.
    async fn create_role(&self, role: CreateRole) -> AccessResult<Role>;
    async fn get_role_by_id(&self, id: &str) -> AccessResult<Option<Role>>;
    async fn get_role_by_name(&self, name: &str) -> AccessResult<Option<Role>>;
    async fn list_roles(&self) -> AccessResult<Vec<Role>>;
}

/// Project persistence.
#[async_trait]
pub trait ProjectOps: Send + Sync + 'static {
    async fn create_project(&self, project: CreateProject) -> AccessResult<Project>;
    async fn get_project_by_id(&self, id: &str) -> AccessResult<Option<Project>>;
    /// Projects the user owns or holds an active membership in.
    async fn list_user_projects(&self, user_id: &str) -> AccessResult<Vec<Project>>;
    /// Delete the project together with its memberships and invitations.
    async fn delete_project(&self, id: &str) -> AccessResult<()>;
}

/// Membership persistence.
#[async_trait]
pub trait MembershipOps: Send + Sync + 'static {
    /// Fails with a conflict if a row for (project, user) already exists.
    async fn create_membership(&self, membership: CreateMembership) -> AccessResult<Membership>;
    async fn get_membership_by_id(&self, id: &str) -> AccessResult<Option<Membership>>;
    async fn get_membership(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> AccessResult<Option<Membership>>;
    async fn update_membership_role(&self, id: &str, role_id: &str) -> AccessResult<Membership>;
    async fn delete_membership(&self, id: &str) -> AccessResult<()>;
    async fn list_project_memberships(&self, project_id: &str) -> AccessResult<Vec<Membership>>;

    async fn get_active_membership(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> AccessResult<Option<Membership>> {
        Ok(self
            .get_membership(project_id, user_id)
            .await?
            .filter(Membership::is_active))
    }
}

/// Invitation persistence, including the two multi-row state changes that
/// must be atomic.
#[async_trait]
pub trait InvitationOps: Send + Sync + 'static {
    /// Insert the invitation unless a pending, unexpired invitation for the
    /// same (project, email) exists at `now`. The check and the insert are
    /// one atomic step.
    async fn create_invitation_if_absent(
        &self,
        invitation: CreateInvitation,
        now: DateTime<Utc>,
    ) -> AccessResult<InvitationInsert>;

    async fn get_invitation_by_id(&self, id: &str) -> AccessResult<Option<Invitation>>;

    /// Pending invitation with this token that has not expired at `now`.
    async fn get_live_invitation_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AccessResult<Option<Invitation>>;

    /// Move a pending invitation to `status`. Returns `None` when the
    /// invitation is missing or no longer pending.
    async fn transition_pending_invitation(
        &self,
        id: &str,
        status: InvitationStatus,
    ) -> AccessResult<Option<Invitation>>;

    /// Mark the invitation accepted and create the membership as one
    /// atomic step. Fails with [`AccessError::InvalidInvitation`] when the
    /// invitation is no longer pending or has expired at `now`, and with a
    /// conflict when the membership already exists. Nothing is written on
    /// failure.
    ///
    /// [`AccessError::InvalidInvitation`]: crate::error::AccessError::InvalidInvitation
    async fn accept_invitation(
        &self,
        invitation_id: &str,
        membership: CreateMembership,
        now: DateTime<Utc>,
    ) -> AccessResult<(Membership, Invitation)>;

    async fn list_project_invitations(&self, project_id: &str) -> AccessResult<Vec<Invitation>>;

    /// Pending, unexpired invitations addressed to `email`.
    async fn list_live_invitations_for_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> AccessResult<Vec<Invitation>>;
}
