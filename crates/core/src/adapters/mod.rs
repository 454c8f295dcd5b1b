pub mod database;
pub mod memory;
pub mod traits;

pub use database::{
    DatabaseAdapter, InvitationInsert, InvitationOps, MembershipOps, ProjectOps, RoleOps, UserOps,
};
pub use memory::{MemoryDatabaseAdapter, MemoryUser};

#[cfg(feature = "sqlx-postgres")]
pub use database::sqlx_adapter::{PoolConfig, SqlxAdapter, SqlxEntity};
