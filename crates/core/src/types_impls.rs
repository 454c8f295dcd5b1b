use crate::entity::AccessUser;
use crate::types::User;

impl AccessUser for User {
    fn id(&self) -> &str {
        &self.id
    }
    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(feature = "sqlx-postgres")]
mod postgres_impls {
    use crate::permissions::PermissionSet;
    use crate::types::{
        Invitation, InvitationStatus, Membership, MembershipStatus, Project, ProjectStatus, Role,
        User,
    };
    use sqlx::postgres::PgRow;
    use sqlx::{FromRow, Row};

    fn decode_status<T>(
        column: &str,
        value: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, sqlx::Error> {
        parse(value).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: format!("unknown status '{}'", value).into(),
        })
    }

    impl FromRow<'_, PgRow> for User {
        fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
            Ok(Self {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        }
    }

    impl FromRow<'_, PgRow> for Role {
        fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
            Ok(Self {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                display_name: row.try_get("display_name")?,
                description: row.try_get("description")?,
                is_system: row.try_get("is_system").unwrap_or(false),
                permissions: row
                    .try_get::<sqlx::types::Json<PermissionSet>, _>("permissions")?
                    .0,
                created_at: row.try_get("created_at")?,
            })
        }
    }

    impl FromRow<'_, PgRow> for Project {
        fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
            let status: String = row.try_get("status")?;
            Ok(Self {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                owner_id: row.try_get("owner_id")?,
                status: decode_status("status", &status, ProjectStatus::parse)?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        }
    }

    impl FromRow<'_, PgRow> for Membership {
        fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
            let status: String = row.try_get("status")?;
            Ok(Self {
                id: row.try_get("id")?,
                project_id: row.try_get("project_id")?,
                user_id: row.try_get("user_id")?,
                role_id: row.try_get("role_id")?,
                status: decode_status("status", &status, MembershipStatus::parse)?,
                invited_by: row.try_get("invited_by")?,
                invited_at: row.try_get("invited_at")?,
                joined_at: row.try_get("joined_at")?,
                expires_at: row.try_get("expires_at")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        }
    }

    impl FromRow<'_, PgRow> for Invitation {
        fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
            let status: String = row.try_get("status")?;
            Ok(Self {
                id: row.try_get("id")?,
                project_id: row.try_get("project_id")?,
                email: row.try_get("email")?,
                role_id: row.try_get("role_id")?,
                token: row.try_get("token")?,
                status: decode_status("status", &status, InvitationStatus::parse)?,
                invited_by: row.try_get("invited_by")?,
                expires_at: row.try_get("expires_at")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        }
    }
}
