pub mod access;

pub use access::{AccessBuilder, ProjectAccess, TypedAccessBuilder};
