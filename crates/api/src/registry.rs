//! Catalogue of the fixed system roles.
//!
//! The five system roles are seeded once per store and treated as
//! immutable afterwards. `owner` is never granted through a membership;
//! it describes what a project's owner can do.

use project_access_core::adapters::RoleOps;
use project_access_core::error::{AccessError, AccessResult};
use project_access_core::permissions::{Action, PermissionSet, Resource};
use project_access_core::types::{CreateRole, OWNER_ROLE, Role};

use Action::*;
use Resource::*;

pub const ADMIN_ROLE: &str = "admin";
pub const EDITOR_ROLE: &str = "editor";
pub const SCHEDULER_ROLE: &str = "scheduler";
pub const VIEWER_ROLE: &str = "viewer";

fn owner_permissions() -> PermissionSet {
    PermissionSet::new()
        .grant(Contacts, &[View, Create, Edit, Delete])
        .grant(Appointments, &[View, Create, Edit, Delete, Assign])
        .grant(Users, &[View, Invite, Remove, ManageRoles])
        .grant(Project, &[View, Edit, Delete, Settings])
        .grant(Reports, &[View, Export])
}

fn owner_definition() -> CreateRole {
    CreateRole::new(OWNER_ROLE, "Propietario")
        .with_description("Acceso completo al proyecto")
        .with_permissions(owner_permissions())
        .system()
}

/// Definitions of every system role, in seeding order.
pub fn system_roles() -> Vec<CreateRole> {
    vec![
        owner_definition(),
        CreateRole::new(ADMIN_ROLE, "Administrador")
            .with_description("Gestión completa excepto eliminar proyecto")
            .with_permissions(
                PermissionSet::new()
                    .grant(Contacts, &[View, Create, Edit, Delete])
                    .grant(Appointments, &[View, Create, Edit, Delete, Assign])
                    .grant(Users, &[View, Invite, Remove])
                    .grant(Project, &[View, Edit, Settings])
                    .grant(Reports, &[View, Export]),
            )
            .system(),
        CreateRole::new(EDITOR_ROLE, "Editor")
            .with_description("Puede gestionar contactos y citas")
            .with_permissions(
                PermissionSet::new()
                    .grant(Contacts, &[View, Create, Edit, Delete])
                    .grant(Appointments, &[View, Create, Edit, Delete])
                    .grant(Users, &[View])
                    .grant(Project, &[View])
                    .grant(Reports, &[View]),
            )
            .system(),
        CreateRole::new(SCHEDULER_ROLE, "Agendador")
            .with_description("Solo puede crear y gestionar citas")
            .with_permissions(
                PermissionSet::new()
                    .grant(Contacts, &[View])
                    .grant(Appointments, &[View, Create, Edit])
                    .grant(Users, &[View])
                    .grant(Project, &[View])
                    .grant(Reports, &[View]),
            )
            .system(),
        CreateRole::new(VIEWER_ROLE, "Solo lectura")
            .with_description("Solo puede ver información")
            .with_permissions(
                PermissionSet::new()
                    .grant(Contacts, &[View])
                    .grant(Appointments, &[View])
                    .grant(Users, &[View])
                    .grant(Project, &[View])
                    .grant(Reports, &[View]),
            )
            .system(),
    ]
}

/// Insert any system role missing from the store. Existing rows are left
/// untouched, so running this repeatedly is harmless.
pub async fn seed_system_roles<DB: RoleOps + ?Sized>(db: &DB) -> AccessResult<Vec<Role>> {
    let mut seeded = Vec::new();
    for definition in system_roles() {
        let role = match db.get_role_by_name(&definition.name).await? {
            Some(existing) => existing,
            None => {
                let name = definition.name.clone();
                let role = db.create_role(definition).await?;
                tracing::info!(role = %name, role_id = %role.id, "seeded system role");
                role
            }
        };
        seeded.push(role);
    }
    Ok(seeded)
}

/// The owner role as stored, or the built-in definition when the store was
/// never seeded. Permission checks for owners therefore never depend on
/// seeding.
pub async fn owner_role<DB: RoleOps + ?Sized>(db: &DB) -> AccessResult<Role> {
    if let Some(role) = db.get_role_by_name(OWNER_ROLE).await? {
        return Ok(role);
    }
    let definition = owner_definition();
    Ok(Role {
        id: OWNER_ROLE.to_string(),
        name: definition.name,
        display_name: definition.display_name,
        description: definition.description,
        is_system: true,
        permissions: definition.permissions,
        created_at: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
    })
}

/// System roles that may be handed out through invitations or role
/// changes: every system role except `owner`.
pub async fn assignable_roles<DB: RoleOps + ?Sized>(db: &DB) -> AccessResult<Vec<Role>> {
    Ok(db
        .list_roles()
        .await?
        .into_iter()
        .filter(|r| r.is_system && !r.is_owner())
        .collect())
}

/// Look up a role a caller asked to assign. Unknown ids and the owner role
/// are validation failures.
pub async fn resolve_assignable_role<DB: RoleOps + ?Sized>(
    db: &DB,
    role_id: &str,
) -> AccessResult<Role> {
    let role = db
        .get_role_by_id(role_id)
        .await?
        .ok_or_else(|| AccessError::validation("The selected role does not exist"))?;
    crate::guard::ensure_role_assignable(&role)?;
    Ok(role)
}
