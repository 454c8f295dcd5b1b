use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::entity::AccessUser;
use crate::error::{AccessError, AccessResult};
use crate::types::{
    CreateInvitation, CreateMembership, CreateProject, CreateRole, CreateUser, Invitation,
    InvitationStatus, Membership, Project, ProjectStatus, Role, User,
};

use super::traits::{
    InvitationInsert, InvitationOps, MembershipOps, ProjectOps, RoleOps, UserOps,
};

/// Construction for user entities stored in memory. Implement this on a
/// custom user type to use it with [`MemoryDatabaseAdapter`].
pub trait MemoryUser: AccessUser {
    fn from_create(id: String, create: &CreateUser, now: DateTime<Utc>) -> Self;
}

impl MemoryUser for User {
    fn from_create(id: String, create: &CreateUser, now: DateTime<Utc>) -> Self {
        User {
            id,
            name: create.name.clone(),
            email: create.email.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

fn lock<'a, T>(table: &'a Mutex<T>, name: &str) -> AccessResult<MutexGuard<'a, T>> {
    table
        .lock()
        .map_err(|_| AccessError::internal(format!("{} table lock poisoned", name)))
}

/// In-memory storage for tests and single-process use.
///
/// Each table sits behind its own mutex. Operations that touch several
/// tables take the locks in the order projects, memberships, invitations.
pub struct MemoryDatabaseAdapter<U = User> {
    users: Arc<Mutex<HashMap<String, U>>>,
    email_index: Arc<Mutex<HashMap<String, String>>>,
    roles: Arc<Mutex<HashMap<String, Role>>>,
    projects: Arc<Mutex<HashMap<String, Project>>>,
    memberships: Arc<Mutex<HashMap<String, Membership>>>,
    invitations: Arc<Mutex<HashMap<String, Invitation>>>,
}

impl<U> Clone for MemoryDatabaseAdapter<U> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            email_index: self.email_index.clone(),
            roles: self.roles.clone(),
            projects: self.projects.clone(),
            memberships: self.memberships.clone(),
            invitations: self.invitations.clone(),
        }
    }
}

impl<U> MemoryDatabaseAdapter<U> {
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
            email_index: Arc::new(Mutex::new(HashMap::new())),
            roles: Arc::new(Mutex::new(HashMap::new())),
            projects: Arc::new(Mutex::new(HashMap::new())),
            memberships: Arc::new(Mutex::new(HashMap::new())),
            invitations: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<U> Default for MemoryDatabaseAdapter<U> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<U: MemoryUser> UserOps for MemoryDatabaseAdapter<U> {
    type User = U;

    async fn create_user(&self, create_user: CreateUser) -> AccessResult<U> {
        let mut users = lock(&self.users, "users")?;
        let mut email_index = lock(&self.email_index, "users")?;

        let id = create_user
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if users.contains_key(&id) {
            return Err(AccessError::conflict("A user with this id already exists"));
        }

        let email_key = create_user.email.as_deref().map(str::to_lowercase);
        if let Some(key) = &email_key
            && email_index.contains_key(key)
        {
            return Err(AccessError::conflict("A user with this email already exists"));
        }

        let user = U::from_create(id.clone(), &create_user, Utc::now());

        users.insert(id.clone(), user.clone());
        if let Some(key) = email_key {
            email_index.insert(key, id);
        }

        Ok(user)
    }

    async fn get_user_by_id(&self, id: &str) -> AccessResult<Option<U>> {
        let users = lock(&self.users, "users")?;
        Ok(users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AccessResult<Option<U>> {
        let users = lock(&self.users, "users")?;
        let email_index = lock(&self.email_index, "users")?;
        Ok(email_index
            .get(&email.to_lowercase())
            .and_then(|id| users.get(id))
            .cloned())
    }
}

#[async_trait]
impl<U: MemoryUser> RoleOps for MemoryDatabaseAdapter<U> {
    async fn create_role(&self, create_role: CreateRole) -> AccessResult<Role> {
        let mut roles = lock(&self.roles, "roles")?;

        if roles.values().any(|r| r.name == create_role.name) {
            return Err(AccessError::conflict(format!(
                "Role '{}' already exists",
                create_role.name
            )));
        }

        let id = create_role
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let role = Role {
            id: id.clone(),
            name: create_role.name,
            display_name: create_role.display_name,
            description: create_role.description,
            is_system: create_role.is_system,
            permissions: create_role.permissions,
            created_at: Utc::now(),
        };

        roles.insert(id, role.clone());
        Ok(role)
    }

    async fn get_role_by_id(&self, id: &str) -> AccessResult<Option<Role>> {
        let roles = lock(&self.roles, "roles")?;
        Ok(roles.get(id).cloned())
    }

    async fn get_role_by_name(&self, name: &str) -> AccessResult<Option<Role>> {
        let roles = lock(&self.roles, "roles")?;
        Ok(roles.values().find(|r| r.name == name).cloned())
    }

    async fn list_roles(&self) -> AccessResult<Vec<Role>> {
        let roles = lock(&self.roles, "roles")?;
        let mut all: Vec<Role> = roles.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(all)
    }
}

#[async_trait]
impl<U: MemoryUser> ProjectOps for MemoryDatabaseAdapter<U> {
    async fn create_project(&self, create_project: CreateProject) -> AccessResult<Project> {
        let mut projects = lock(&self.projects, "projects")?;

        let id = create_project
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if projects.contains_key(&id) {
            return Err(AccessError::conflict("A project with this id already exists"));
        }

        let now = Utc::now();
        let project = Project {
            id: id.clone(),
            name: create_project.name,
            description: create_project.description,
            owner_id: create_project.owner_id,
            status: ProjectStatus::Active,
            created_at: now,
            updated_at: now,
        };

        projects.insert(id, project.clone());
        Ok(project)
    }

    async fn get_project_by_id(&self, id: &str) -> AccessResult<Option<Project>> {
        let projects = lock(&self.projects, "projects")?;
        Ok(projects.get(id).cloned())
    }

    async fn list_user_projects(&self, user_id: &str) -> AccessResult<Vec<Project>> {
        let projects = lock(&self.projects, "projects")?;
        let memberships = lock(&self.memberships, "memberships")?;

        let mut result: Vec<Project> = projects
            .values()
            .filter(|p| {
                p.is_owned_by(user_id)
                    || memberships
                        .values()
                        .any(|m| m.project_id == p.id && m.user_id == user_id && m.is_active())
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn delete_project(&self, id: &str) -> AccessResult<()> {
        let mut projects = lock(&self.projects, "projects")?;
        let mut memberships = lock(&self.memberships, "memberships")?;
        let mut invitations = lock(&self.invitations, "invitations")?;

        if projects.remove(id).is_none() {
            return Err(AccessError::not_found("Project not found"));
        }
        memberships.retain(|_, m| m.project_id != id);
        invitations.retain(|_, i| i.project_id != id);
        Ok(())
    }
}

fn insert_membership(
    memberships: &mut HashMap<String, Membership>,
    create: CreateMembership,
    now: DateTime<Utc>,
) -> AccessResult<Membership> {
    let exists = memberships
        .values()
        .any(|m| m.project_id == create.project_id && m.user_id == create.user_id);
    if exists {
        return Err(AccessError::conflict(
            "User is already a member of this project",
        ));
    }

    let id = Uuid::new_v4().to_string();
    let membership = Membership {
        id: id.clone(),
        project_id: create.project_id,
        user_id: create.user_id,
        role_id: create.role_id,
        status: create.status,
        invited_by: create.invited_by,
        invited_at: create.invited_at,
        joined_at: create.joined_at,
        expires_at: None,
        created_at: now,
        updated_at: now,
    };
    memberships.insert(id, membership.clone());
    Ok(membership)
}

#[async_trait]
impl<U: MemoryUser> MembershipOps for MemoryDatabaseAdapter<U> {
    async fn create_membership(&self, create: CreateMembership) -> AccessResult<Membership> {
        let mut memberships = lock(&self.memberships, "memberships")?;
        insert_membership(&mut memberships, create, Utc::now())
    }

    async fn get_membership_by_id(&self, id: &str) -> AccessResult<Option<Membership>> {
        let memberships = lock(&self.memberships, "memberships")?;
        Ok(memberships.get(id).cloned())
    }

    async fn get_membership(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> AccessResult<Option<Membership>> {
        let memberships = lock(&self.memberships, "memberships")?;
        Ok(memberships
            .values()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .cloned())
    }

    async fn update_membership_role(&self, id: &str, role_id: &str) -> AccessResult<Membership> {
        let mut memberships = lock(&self.memberships, "memberships")?;
        let membership = memberships
            .get_mut(id)
            .ok_or_else(|| AccessError::not_found("Membership not found"))?;
        membership.role_id = role_id.to_string();
        membership.updated_at = Utc::now();
        Ok(membership.clone())
    }

    async fn delete_membership(&self, id: &str) -> AccessResult<()> {
        let mut memberships = lock(&self.memberships, "memberships")?;
        memberships
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AccessError::not_found("Membership not found"))
    }

    async fn list_project_memberships(&self, project_id: &str) -> AccessResult<Vec<Membership>> {
        let memberships = lock(&self.memberships, "memberships")?;
        let mut result: Vec<Membership> = memberships
            .values()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }
}

#[async_trait]
impl<U: MemoryUser> InvitationOps for MemoryDatabaseAdapter<U> {
    async fn create_invitation_if_absent(
        &self,
        create: CreateInvitation,
        now: DateTime<Utc>,
    ) -> AccessResult<InvitationInsert> {
        let mut invitations = lock(&self.invitations, "invitations")?;

        if let Some(existing) = invitations.values().find(|i| {
            i.project_id == create.project_id && i.email == create.email && i.is_live_at(now)
        }) {
            return Ok(InvitationInsert::Existing(existing.clone()));
        }

        if invitations.values().any(|i| i.token == create.token) {
            return Err(AccessError::conflict("Invitation token collision"));
        }

        let id = Uuid::new_v4().to_string();
        let invitation = Invitation {
            id: id.clone(),
            project_id: create.project_id,
            email: create.email,
            role_id: create.role_id,
            token: create.token,
            status: InvitationStatus::Pending,
            invited_by: create.invited_by,
            expires_at: create.expires_at,
            created_at: now,
            updated_at: now,
        };
        invitations.insert(id, invitation.clone());
        Ok(InvitationInsert::Created(invitation))
    }

    async fn get_invitation_by_id(&self, id: &str) -> AccessResult<Option<Invitation>> {
        let invitations = lock(&self.invitations, "invitations")?;
        Ok(invitations.get(id).cloned())
    }

    async fn get_live_invitation_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AccessResult<Option<Invitation>> {
        let invitations = lock(&self.invitations, "invitations")?;
        Ok(invitations
            .values()
            .find(|i| i.token == token && i.is_live_at(now))
            .cloned())
    }

    async fn transition_pending_invitation(
        &self,
        id: &str,
        status: InvitationStatus,
    ) -> AccessResult<Option<Invitation>> {
        let mut invitations = lock(&self.invitations, "invitations")?;
        match invitations.get_mut(id) {
            Some(invitation) if invitation.is_pending() => {
                invitation.status = status;
                invitation.updated_at = Utc::now();
                Ok(Some(invitation.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn accept_invitation(
        &self,
        invitation_id: &str,
        create: CreateMembership,
        now: DateTime<Utc>,
    ) -> AccessResult<(Membership, Invitation)> {
        let mut memberships = lock(&self.memberships, "memberships")?;
        let mut invitations = lock(&self.invitations, "invitations")?;

        let invitation = invitations
            .get_mut(invitation_id)
            .filter(|i| i.is_live_at(now))
            .ok_or(AccessError::InvalidInvitation)?;

        // Insert first: a duplicate membership must leave the invitation pending.
        let membership = insert_membership(&mut memberships, create, now)?;

        invitation.status = InvitationStatus::Accepted;
        invitation.updated_at = now;
        Ok((membership, invitation.clone()))
    }

    async fn list_project_invitations(&self, project_id: &str) -> AccessResult<Vec<Invitation>> {
        let invitations = lock(&self.invitations, "invitations")?;
        let mut result: Vec<Invitation> = invitations
            .values()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_live_invitations_for_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> AccessResult<Vec<Invitation>> {
        let invitations = lock(&self.invitations, "invitations")?;
        let mut result: Vec<Invitation> = invitations
            .values()
            .filter(|i| i.email == email && i.is_live_at(now))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}
