use serde_json::json;
use validator::Validate;

use project_access_core::adapters::DatabaseAdapter;
use project_access_core::audit::{AuditAction, AuditEntry};
use project_access_core::context::AccessContext;
use project_access_core::entity::AccessUser;
use project_access_core::error::{AccessError, AccessResult};
use project_access_core::permissions::{Action, Resource};
use project_access_core::types::{CreateProject, Project};

use crate::rbac;
use crate::types::{CreateProjectRequest, ProjectCapabilities};

/// Create a project owned by `owner`.
pub async fn create_project_core<DB: DatabaseAdapter>(
    body: &CreateProjectRequest,
    owner: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<Project> {
    let body = CreateProjectRequest {
        name: body.name.trim().to_string(),
        description: body
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
    };
    body.validate()?;

    let mut create = CreateProject::new(&body.name, owner.id());
    if let Some(description) = &body.description {
        create = create.with_description(description);
    }

    let project = ctx.database.create_project(create).await?;

    tracing::info!(project_id = %project.id, owner_id = %owner.id(), "project created");

    ctx.audit(
        AuditEntry::new(
            &project.id,
            owner.id(),
            AuditAction::ProjectCreated,
            "project",
            &project.id,
        )
        .with_new(json!({ "name": project.name })),
    )
    .await;

    Ok(project)
}

/// Delete `project` with all its memberships and invitations. Only the
/// owner may do this.
pub async fn delete_project_core<DB: DatabaseAdapter>(
    project: &Project,
    actor: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<()> {
    if !project.is_owned_by(actor.id()) {
        return Err(AccessError::forbidden(
            "Only the project owner can delete the project",
        ));
    }

    ctx.database.delete_project(&project.id).await?;

    tracing::info!(project_id = %project.id, actor_id = %actor.id(), "project deleted");

    ctx.audit(
        AuditEntry::new(
            &project.id,
            actor.id(),
            AuditAction::ProjectDeleted,
            "project",
            &project.id,
        )
        .with_old(json!({ "name": project.name, "owner_id": project.owner_id })),
    )
    .await;

    Ok(())
}

/// Projects `user` owns or is an active member of.
pub async fn projects_for_core<DB: DatabaseAdapter>(
    user: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<Vec<Project>> {
    ctx.database.list_user_projects(user.id()).await
}

/// What `user` may do with `project` itself. A user without access gets
/// all flags false.
pub async fn capabilities_core<DB: DatabaseAdapter>(
    project: &Project,
    user: &DB::User,
    ctx: &AccessContext<DB>,
) -> AccessResult<ProjectCapabilities> {
    let access = rbac::access_of(ctx.database.as_ref(), user.id(), project).await?;
    Ok(ProjectCapabilities {
        is_owner: access.is_owner(),
        can_edit: access.can(Resource::Project, Action::Edit),
        can_delete: access.can(Resource::Project, Action::Delete),
        can_manage_users: access.can(Resource::Users, Action::ManageRoles),
    })
}
