use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use project_access_core::types::{Invitation, Membership, MembershipStatus, Role};

/// Trim and lower-case an email address. Invitations store emails in this
/// form and acceptance compares against it.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(
        email(message = "Invalid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
    #[validate(length(min = 1, message = "Role is required"))]
    pub role_id: String,
}

impl InviteRequest {
    pub fn new(email: impl Into<String>, role_id: impl Into<String>) -> Self {
        Self {
            email: normalize_email(&email.into()),
            role_id: role_id.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, message = "Role is required"))]
    pub role_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

/// Result of a successful role change.
#[derive(Debug, Clone, Serialize)]
pub struct RoleChange {
    pub membership: Membership,
    pub old_role: Role,
    pub new_role: Role,
}

/// The membership row that was deleted and who deleted it.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedMember {
    pub membership: Membership,
    pub removed_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMember {
    /// `None` for the owner, who has no membership row.
    pub membership_id: Option<String>,
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub is_owner: bool,
    /// `None` for the owner.
    pub status: Option<MembershipStatus>,
    pub invited_by: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub can_remove: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingInvitationView {
    pub invitation: Invitation,
    pub role: Option<Role>,
    pub can_cancel: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamSummary {
    /// Owner plus active members.
    pub total_members: usize,
    pub active_members: usize,
    pub pending_invitations: usize,
    pub available_roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamOverview {
    pub members: Vec<TeamMember>,
    pub pending_invitations: Vec<PendingInvitationView>,
    pub summary: TeamSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectCapabilities {
    pub is_owner: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_manage_users: bool,
}
