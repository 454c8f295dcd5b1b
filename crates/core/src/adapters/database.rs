pub use super::traits::{
    InvitationInsert, InvitationOps, MembershipOps, ProjectOps, RoleOps, UserOps,
};

/// Storage required by the access layer.
///
/// Any type implementing every sub-trait (`UserOps`, `RoleOps`, ...) gets
/// `DatabaseAdapter` through the blanket impl. Functions that only need a
/// subset should bound on the sub-traits directly.
pub trait DatabaseAdapter: UserOps + RoleOps + ProjectOps + MembershipOps + InvitationOps {}

impl<T> DatabaseAdapter for T where T: UserOps + RoleOps + ProjectOps + MembershipOps + InvitationOps
{}

#[cfg(feature = "sqlx-postgres")]
pub mod sqlx_adapter {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::entity::AccessUser;
    use crate::error::{AccessError, AccessResult, DatabaseError};
    use crate::types::{
        CreateInvitation, CreateMembership, CreateProject, CreateRole, CreateUser, Invitation,
        InvitationStatus, Membership, Project, Role, User,
    };
    use sqlx::postgres::PgRow;
    use sqlx::{PgPool, Postgres, Transaction};
    use std::marker::PhantomData;
    use uuid::Uuid;

    /// Bounds needed for a user type read through SQLx.
    ///
    /// Satisfied by any type with a `sqlx::FromRow` impl plus the usual
    /// marker traits.
    pub trait SqlxEntity:
        for<'r> sqlx::FromRow<'r, PgRow> + Send + Sync + Unpin + Clone + 'static
    {
    }

    impl<T> SqlxEntity for T where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Sync + Unpin + Clone + 'static
    {
    }

    /// PostgreSQL storage via SQLx.
    ///
    /// Generic over the user type so that a host application can read its
    /// own user table shape; the remaining tables are owned by this crate.
    pub struct SqlxAdapter<U = User> {
        pool: PgPool,
        _phantom: PhantomData<U>,
    }

    impl SqlxAdapter {
        pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
            let pool = PgPool::connect(database_url).await?;
            Ok(Self::from_pool(pool))
        }

        pub async fn with_config(
            database_url: &str,
            config: PoolConfig,
        ) -> Result<Self, sqlx::Error> {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(config.acquire_timeout)
                .idle_timeout(config.idle_timeout)
                .max_lifetime(config.max_lifetime)
                .connect(database_url)
                .await?;
            Ok(Self::from_pool(pool))
        }
    }

    impl<U> SqlxAdapter<U> {
        pub fn from_pool(pool: PgPool) -> Self {
            Self {
                pool,
                _phantom: PhantomData,
            }
        }

        /// Apply the bundled schema migrations.
        pub async fn migrate(&self) -> AccessResult<()> {
            sqlx::migrate!("./migrations").run(&self.pool).await?;
            Ok(())
        }

        pub fn pool(&self) -> &PgPool {
            &self.pool
        }

        pub async fn close(&self) {
            self.pool.close().await;
        }
    }

    #[derive(Debug, Clone)]
    pub struct PoolConfig {
        pub max_connections: u32,
        pub min_connections: u32,
        pub acquire_timeout: std::time::Duration,
        pub idle_timeout: Option<std::time::Duration>,
        pub max_lifetime: Option<std::time::Duration>,
    }

    impl Default for PoolConfig {
        fn default() -> Self {
            Self {
                max_connections: 10,
                min_connections: 0,
                acquire_timeout: std::time::Duration::from_secs(30),
                idle_timeout: Some(std::time::Duration::from_secs(600)),
                max_lifetime: Some(std::time::Duration::from_secs(1800)),
            }
        }
    }

    fn membership_conflict(err: sqlx::Error) -> AccessError {
        match DatabaseError::from(err) {
            DatabaseError::Constraint(_) => {
                AccessError::conflict("User is already a member of this project")
            }
            other => AccessError::Database(other),
        }
    }

    async fn insert_membership(
        tx: &mut Transaction<'_, Postgres>,
        create: &CreateMembership,
        now: DateTime<Utc>,
    ) -> AccessResult<Membership> {
        sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO project_memberships
                (id, project_id, user_id, role_id, status, invited_by, invited_at, joined_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&create.project_id)
        .bind(&create.user_id)
        .bind(&create.role_id)
        .bind(create.status.as_str())
        .bind(&create.invited_by)
        .bind(create.invited_at)
        .bind(create.joined_at)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
        .map_err(membership_conflict)
    }

    // -- UserOps --

    #[async_trait]
    impl<U> UserOps for SqlxAdapter<U>
    where
        U: AccessUser + SqlxEntity,
    {
        type User = U;

        async fn create_user(&self, create_user: CreateUser) -> AccessResult<U> {
            let id = create_user.id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let now = Utc::now();

            let user = sqlx::query_as::<_, U>(
                r#"
                INSERT INTO users (id, email, name, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                RETURNING *
                "#,
            )
            .bind(&id)
            .bind(&create_user.email)
            .bind(&create_user.name)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

            Ok(user)
        }

        async fn get_user_by_id(&self, id: &str) -> AccessResult<Option<U>> {
            let user = sqlx::query_as::<_, U>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(user)
        }

        async fn get_user_by_email(&self, email: &str) -> AccessResult<Option<U>> {
            let user = sqlx::query_as::<_, U>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
            Ok(user)
        }
    }

    // -- RoleOps --

    #[async_trait]
    impl<U> RoleOps for SqlxAdapter<U>
    where
        U: AccessUser + SqlxEntity,
    {
        async fn create_role(&self, create_role: CreateRole) -> AccessResult<Role> {
            let id = create_role.id.unwrap_or_else(|| Uuid::new_v4().to_string());

            let role = sqlx::query_as::<_, Role>(
                r#"
                INSERT INTO roles (id, name, display_name, description, is_system, permissions, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(&id)
            .bind(&create_role.name)
            .bind(&create_role.display_name)
            .bind(&create_role.description)
            .bind(create_role.is_system)
            .bind(sqlx::types::Json(&create_role.permissions))
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

            Ok(role)
        }

        async fn get_role_by_id(&self, id: &str) -> AccessResult<Option<Role>> {
            let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(role)
        }

        async fn get_role_by_name(&self, name: &str) -> AccessResult<Option<Role>> {
            let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
            Ok(role)
        }

        async fn list_roles(&self) -> AccessResult<Vec<Role>> {
            let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY created_at, name")
                .fetch_all(&self.pool)
                .await?;
            Ok(roles)
        }
    }

    // -- ProjectOps --

    #[async_trait]
    impl<U> ProjectOps for SqlxAdapter<U>
    where
        U: AccessUser + SqlxEntity,
    {
        async fn create_project(&self, create_project: CreateProject) -> AccessResult<Project> {
            let id = create_project
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            let project = sqlx::query_as::<_, Project>(
                r#"
                INSERT INTO projects (id, name, description, owner_id, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, 'active', $5, $5)
                RETURNING *
                "#,
            )
            .bind(&id)
            .bind(&create_project.name)
            .bind(&create_project.description)
            .bind(&create_project.owner_id)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

            Ok(project)
        }

        async fn get_project_by_id(&self, id: &str) -> AccessResult<Option<Project>> {
            let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(project)
        }

        async fn list_user_projects(&self, user_id: &str) -> AccessResult<Vec<Project>> {
            let projects = sqlx::query_as::<_, Project>(
                r#"
                SELECT p.* FROM projects p
                WHERE p.owner_id = $1
                   OR EXISTS (
                        SELECT 1 FROM project_memberships m
                        WHERE m.project_id = p.id AND m.user_id = $1 AND m.status = 'active'
                   )
                ORDER BY p.created_at DESC
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(projects)
        }

        async fn delete_project(&self, id: &str) -> AccessResult<()> {
            // Memberships and invitations go with the project via ON DELETE CASCADE.
            let result = sqlx::query("DELETE FROM projects WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(AccessError::not_found("Project not found"));
            }
            Ok(())
        }
    }

    // -- MembershipOps --

    #[async_trait]
    impl<U> MembershipOps for SqlxAdapter<U>
    where
        U: AccessUser + SqlxEntity,
    {
        async fn create_membership(&self, create: CreateMembership) -> AccessResult<Membership> {
            let mut tx = self.pool.begin().await?;
            let membership = insert_membership(&mut tx, &create, Utc::now()).await?;
            tx.commit().await?;
            Ok(membership)
        }

        async fn get_membership_by_id(&self, id: &str) -> AccessResult<Option<Membership>> {
            let membership =
                sqlx::query_as::<_, Membership>("SELECT * FROM project_memberships WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(membership)
        }

        async fn get_membership(
            &self,
            project_id: &str,
            user_id: &str,
        ) -> AccessResult<Option<Membership>> {
            let membership = sqlx::query_as::<_, Membership>(
                "SELECT * FROM project_memberships WHERE project_id = $1 AND user_id = $2",
            )
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(membership)
        }

        async fn update_membership_role(
            &self,
            id: &str,
            role_id: &str,
        ) -> AccessResult<Membership> {
            sqlx::query_as::<_, Membership>(
                "UPDATE project_memberships SET role_id = $1, updated_at = $2 WHERE id = $3 RETURNING *",
            )
            .bind(role_id)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AccessError::not_found("Membership not found"))
        }

        async fn delete_membership(&self, id: &str) -> AccessResult<()> {
            let result = sqlx::query("DELETE FROM project_memberships WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(AccessError::not_found("Membership not found"));
            }
            Ok(())
        }

        async fn list_project_memberships(
            &self,
            project_id: &str,
        ) -> AccessResult<Vec<Membership>> {
            let memberships = sqlx::query_as::<_, Membership>(
                "SELECT * FROM project_memberships WHERE project_id = $1 ORDER BY created_at",
            )
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(memberships)
        }
    }

    // -- InvitationOps --

    #[async_trait]
    impl<U> InvitationOps for SqlxAdapter<U>
    where
        U: AccessUser + SqlxEntity,
    {
        async fn create_invitation_if_absent(
            &self,
            create: CreateInvitation,
            now: DateTime<Utc>,
        ) -> AccessResult<InvitationInsert> {
            let mut tx = self.pool.begin().await?;

            // Serializes concurrent invites for the same (project, email).
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(format!("{}:{}", create.project_id, create.email))
                .execute(&mut *tx)
                .await?;

            let existing = sqlx::query_as::<_, Invitation>(
                r#"
                SELECT * FROM project_invitations
                WHERE project_id = $1 AND email = $2 AND status = 'pending' AND expires_at > $3
                LIMIT 1
                "#,
            )
            .bind(&create.project_id)
            .bind(&create.email)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(existing) = existing {
                tx.rollback().await?;
                return Ok(InvitationInsert::Existing(existing));
            }

            let invitation = sqlx::query_as::<_, Invitation>(
                r#"
                INSERT INTO project_invitations
                    (id, project_id, email, role_id, token, status, invited_by, expires_at, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $8)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&create.project_id)
            .bind(&create.email)
            .bind(&create.role_id)
            .bind(&create.token)
            .bind(&create.invited_by)
            .bind(create.expires_at)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(InvitationInsert::Created(invitation))
        }

        async fn get_invitation_by_id(&self, id: &str) -> AccessResult<Option<Invitation>> {
            let invitation =
                sqlx::query_as::<_, Invitation>("SELECT * FROM project_invitations WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(invitation)
        }

        async fn get_live_invitation_by_token(
            &self,
            token: &str,
            now: DateTime<Utc>,
        ) -> AccessResult<Option<Invitation>> {
            let invitation = sqlx::query_as::<_, Invitation>(
                "SELECT * FROM project_invitations WHERE token = $1 AND status = 'pending' AND expires_at > $2",
            )
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
            Ok(invitation)
        }

        async fn transition_pending_invitation(
            &self,
            id: &str,
            status: InvitationStatus,
        ) -> AccessResult<Option<Invitation>> {
            let invitation = sqlx::query_as::<_, Invitation>(
                r#"
                UPDATE project_invitations SET status = $1, updated_at = $2
                WHERE id = $3 AND status = 'pending'
                RETURNING *
                "#,
            )
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(invitation)
        }

        async fn accept_invitation(
            &self,
            invitation_id: &str,
            create: CreateMembership,
            now: DateTime<Utc>,
        ) -> AccessResult<(Membership, Invitation)> {
            let mut tx = self.pool.begin().await?;

            let invitation = sqlx::query_as::<_, Invitation>(
                r#"
                UPDATE project_invitations SET status = 'accepted', updated_at = $2
                WHERE id = $1 AND status = 'pending' AND expires_at > $2
                RETURNING *
                "#,
            )
            .bind(invitation_id)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AccessError::InvalidInvitation)?;

            // Dropping the transaction on error rolls the status change back.
            let membership = insert_membership(&mut tx, &create, now).await?;

            tx.commit().await?;
            Ok((membership, invitation))
        }

        async fn list_project_invitations(
            &self,
            project_id: &str,
        ) -> AccessResult<Vec<Invitation>> {
            let invitations = sqlx::query_as::<_, Invitation>(
                "SELECT * FROM project_invitations WHERE project_id = $1 ORDER BY created_at DESC",
            )
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(invitations)
        }

        async fn list_live_invitations_for_email(
            &self,
            email: &str,
            now: DateTime<Utc>,
        ) -> AccessResult<Vec<Invitation>> {
            let invitations = sqlx::query_as::<_, Invitation>(
                r#"
                SELECT * FROM project_invitations
                WHERE email = $1 AND status = 'pending' AND expires_at > $2
                ORDER BY created_at DESC
                "#,
            )
            .bind(email)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
            Ok(invitations)
        }
    }
}
