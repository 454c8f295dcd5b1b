//! Entity trait for the user directory.
//!
//! Projects, roles, memberships and invitations are owned by this crate and
//! use the concrete types in [`crate::types`]. Users live in a directory the
//! host application controls, so they are read through [`AccessUser`] and
//! the host may plug in its own user struct.

use serde::Serialize;

/// A user as seen by the access layer: an id and, usually, an email.
pub trait AccessUser: Clone + Send + Sync + Serialize + std::fmt::Debug + 'static {
    fn id(&self) -> &str;
    fn email(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;
}
