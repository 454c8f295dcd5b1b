use std::sync::Arc;

use project_access_api::handlers;
use project_access_api::rbac::{self, Access};
use project_access_api::registry;
use project_access_api::types::{
    CreateProjectRequest, InviteRequest, ProjectCapabilities, RemovedMember, RoleChange,
    TeamOverview, UpdateRoleRequest,
};
use project_access_core::{
    AccessConfig, AccessContext, AccessResult, Action, AuditSink, DatabaseAdapter, Invitation,
    InvitationNotifier, Logger, Membership, Project, Resource, Role,
};

/// Project membership and permission service, generic over storage.
///
/// Every operation takes the acting user explicitly and authorizes it
/// against that user; nothing is read from ambient request state.
pub struct ProjectAccess<DB: DatabaseAdapter> {
    context: AccessContext<DB>,
}

/// Initial builder. Call `.database(adapter)` to obtain a
/// [`TypedAccessBuilder`].
pub struct AccessBuilder {
    config: AccessConfig,
}

/// Builder returned by [`AccessBuilder::database`].
pub struct TypedAccessBuilder<DB: DatabaseAdapter> {
    config: AccessConfig,
    database: Arc<DB>,
    seed_roles: bool,
}

impl AccessBuilder {
    pub fn new(config: AccessConfig) -> Self {
        Self { config }
    }

    pub fn database<DB: DatabaseAdapter>(self, database: DB) -> TypedAccessBuilder<DB> {
        TypedAccessBuilder {
            config: self.config,
            database: Arc::new(database),
            seed_roles: true,
        }
    }

    pub fn notifier<N: InvitationNotifier + 'static>(mut self, notifier: N) -> Self {
        self.config.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn audit_sink<S: AuditSink + 'static>(mut self, sink: S) -> Self {
        self.config.audit_sink = Some(Arc::new(sink));
        self
    }

    pub fn logger<L: Logger + 'static>(mut self, logger: L) -> Self {
        self.config.logger = Arc::new(logger);
        self
    }
}

impl<DB: DatabaseAdapter> TypedAccessBuilder<DB> {
    pub fn notifier<N: InvitationNotifier + 'static>(mut self, notifier: N) -> Self {
        self.config.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn audit_sink<S: AuditSink + 'static>(mut self, sink: S) -> Self {
        self.config.audit_sink = Some(Arc::new(sink));
        self
    }

    pub fn logger<L: Logger + 'static>(mut self, logger: L) -> Self {
        self.config.logger = Arc::new(logger);
        self
    }

    /// Skip seeding the system roles on build. Defaults to seeding.
    pub fn seed_roles(mut self, seed: bool) -> Self {
        self.seed_roles = seed;
        self
    }

    pub async fn build(self) -> AccessResult<ProjectAccess<DB>> {
        self.config.validate()?;

        if self.seed_roles {
            let roles = registry::seed_system_roles(self.database.as_ref()).await?;
            tracing::debug!(count = roles.len(), "system roles seeded");
        }

        let context = AccessContext::new(Arc::new(self.config), self.database);
        Ok(ProjectAccess { context })
    }
}

impl<DB: DatabaseAdapter> ProjectAccess<DB> {
    pub fn config(&self) -> &AccessConfig {
        &self.context.config
    }

    pub fn database(&self) -> &Arc<DB> {
        &self.context.database
    }

    pub fn context(&self) -> &AccessContext<DB> {
        &self.context
    }

    async fn project(&self, project_id: &str) -> AccessResult<Project> {
        handlers::require_project(project_id, &self.context).await
    }

    /// Insert any missing system role. Safe to call repeatedly.
    pub async fn seed_system_roles(&self) -> AccessResult<Vec<Role>> {
        registry::seed_system_roles(self.context.database.as_ref()).await
    }

    // --- Permission evaluation ---

    pub fn has_permission(role: &Role, resource: Resource, action: Action) -> bool {
        rbac::has_permission(role, resource, action)
    }

    /// `user_id`'s standing in `project_id`. A missing project yields
    /// [`Access::None`].
    pub async fn access_of(&self, user_id: &str, project_id: &str) -> AccessResult<Access> {
        let Some(project) = self.context.database.get_project_by_id(project_id).await? else {
            return Ok(Access::None);
        };
        rbac::access_of(self.context.database.as_ref(), user_id, &project).await
    }

    pub async fn role_of(&self, user_id: &str, project_id: &str) -> AccessResult<Option<Role>> {
        Ok(self.access_of(user_id, project_id).await?.into_role())
    }

    pub async fn has_access(&self, user_id: &str, project_id: &str) -> AccessResult<bool> {
        Ok(self.access_of(user_id, project_id).await?.has_access())
    }

    /// Whether `user_id` may perform `action` on `resource` in `project_id`.
    pub async fn can(
        &self,
        user_id: &str,
        project_id: &str,
        resource: Resource,
        action: Action,
    ) -> AccessResult<bool> {
        Ok(self
            .access_of(user_id, project_id)
            .await?
            .can(resource, action))
    }

    // --- Invitations ---

    pub async fn invite(
        &self,
        project_id: &str,
        issuer: &DB::User,
        email: &str,
        role_id: &str,
    ) -> AccessResult<Invitation> {
        let project = self.project(project_id).await?;
        let body = InviteRequest::new(email, role_id);
        handlers::invite_core(&project, issuer, &body, &self.context).await
    }

    pub async fn accept_invitation(&self, token: &str, user: &DB::User) -> AccessResult<Membership> {
        handlers::accept_invitation_core(token, user, &self.context).await
    }

    pub async fn reject_invitation(&self, token: &str, user: &DB::User) -> AccessResult<Invitation> {
        handlers::reject_invitation_core(token, user, &self.context).await
    }

    pub async fn cancel_invitation(
        &self,
        project_id: &str,
        invitation_id: &str,
        canceller: &DB::User,
    ) -> AccessResult<Invitation> {
        let project = self.project(project_id).await?;
        handlers::cancel_invitation_core(&project, invitation_id, canceller, &self.context).await
    }

    pub async fn pending_invitations_for(&self, user: &DB::User) -> AccessResult<Vec<Invitation>> {
        handlers::pending_invitations_for_core(user, &self.context).await
    }

    // --- Members ---

    pub async fn update_member_role(
        &self,
        project_id: &str,
        membership_id: &str,
        new_role_id: &str,
        actor: &DB::User,
    ) -> AccessResult<RoleChange> {
        let project = self.project(project_id).await?;
        let body = UpdateRoleRequest {
            role_id: new_role_id.to_string(),
        };
        handlers::update_member_role_core(&project, membership_id, &body, actor, &self.context)
            .await
    }

    pub async fn remove_member(
        &self,
        project_id: &str,
        membership_id: &str,
        actor: &DB::User,
    ) -> AccessResult<RemovedMember> {
        let project = self.project(project_id).await?;
        handlers::remove_member_core(&project, membership_id, actor, &self.context).await
    }

    pub async fn leave_project(&self, project_id: &str, actor: &DB::User) -> AccessResult<()> {
        let project = self.project(project_id).await?;
        handlers::leave_project_core(&project, actor, &self.context).await
    }

    pub async fn team(&self, project_id: &str, actor: &DB::User) -> AccessResult<TeamOverview> {
        let project = self.project(project_id).await?;
        handlers::team_core(&project, actor, &self.context).await
    }

    pub async fn available_roles(
        &self,
        project_id: &str,
        actor: &DB::User,
    ) -> AccessResult<Vec<Role>> {
        let project = self.project(project_id).await?;
        handlers::available_roles_core(&project, actor, &self.context).await
    }

    // --- Projects ---

    pub async fn create_project(
        &self,
        owner: &DB::User,
        name: &str,
        description: Option<&str>,
    ) -> AccessResult<Project> {
        let body = CreateProjectRequest {
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        handlers::create_project_core(&body, owner, &self.context).await
    }

    pub async fn delete_project(&self, project_id: &str, actor: &DB::User) -> AccessResult<()> {
        let project = self.project(project_id).await?;
        handlers::delete_project_core(&project, actor, &self.context).await
    }

    pub async fn projects_for(&self, user: &DB::User) -> AccessResult<Vec<Project>> {
        handlers::projects_for_core(user, &self.context).await
    }

    pub async fn capabilities(
        &self,
        project_id: &str,
        user: &DB::User,
    ) -> AccessResult<ProjectCapabilities> {
        let project = self.project(project_id).await?;
        handlers::capabilities_core(&project, user, &self.context).await
    }
}
