//! Membership operations.
//!
//! Every `*_core` function takes the acting user explicitly and performs
//! its own authorization; none of them trusts an ambient session.

pub mod invitation;
pub mod member;
pub mod project;

pub use invitation::*;
pub use member::*;
pub use project::*;

use project_access_core::adapters::DatabaseAdapter;
use project_access_core::context::AccessContext;
use project_access_core::error::{AccessError, AccessResult};
use project_access_core::types::Project;

/// Load a project by id, failing with `NotFound` when it does not exist.
pub async fn require_project<DB: DatabaseAdapter>(
    project_id: &str,
    ctx: &AccessContext<DB>,
) -> AccessResult<Project> {
    ctx.database
        .get_project_by_id(project_id)
        .await?
        .ok_or_else(|| AccessError::not_found("Project not found"))
}

#[cfg(test)]
mod tests;
