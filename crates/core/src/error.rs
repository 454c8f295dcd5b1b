use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::InvitationStatus;

/// Errors produced by permission checks and membership operations.
///
/// Every variant falls into one [`ErrorKind`] via [`AccessError::kind`], which
/// is what callers map onto their transport (HTTP status, exit code, ...).
#[derive(Error, Debug)]
pub enum AccessError {
    // --- NotFound ---
    #[error("{0}")]
    NotFound(String),

    /// Unknown token, expired, or no longer pending. Deliberately one
    /// message for all three.
    #[error("Invalid or expired invitation")]
    InvalidInvitation,

    // --- Forbidden ---
    #[error("{0}")]
    Forbidden(String),

    #[error("This invitation was sent to a different email address")]
    InvitationEmailMismatch,

    #[error("{message}")]
    OwnershipGuard { message: String, suggestion: String },

    // --- Conflict ---
    #[error("{0}")]
    Conflict(String),

    #[error("A pending invitation already exists for this email (role: {role}, expires {expires_at})")]
    PendingInvitationExists {
        expires_at: DateTime<Utc>,
        role: String,
    },

    #[error("Only pending invitations can be cancelled (current status: {status})")]
    InvitationNotPending { status: InvitationStatus },

    // --- Validation ---
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("The owner role cannot be assigned")]
    OwnerRoleNotAssignable,

    // --- Internal ---
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Transport-neutral classification of an [`AccessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    Validation,
    Internal,
}

impl AccessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::InvalidInvitation => ErrorKind::NotFound,
            Self::Forbidden(_) | Self::InvitationEmailMismatch | Self::OwnershipGuard { .. } => {
                ErrorKind::Forbidden
            }
            Self::Conflict(_)
            | Self::PendingInvitationExists { .. }
            | Self::InvitationNotPending { .. }
            | Self::Database(DatabaseError::Constraint(_)) => ErrorKind::Conflict,
            Self::Validation(_) | Self::OwnerRoleNotAssignable => ErrorKind::Validation,
            Self::Config(_) | Self::Database(_) | Self::Serialization(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Message safe to show to the caller. Internal failures are replaced
    /// with a generic text.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Remediation hint attached to ownership guard failures.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::OwnershipGuard { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    // --- Constructors ---

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn ownership(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::OwnershipGuard {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Transaction error: {0}")]
    Transaction(String),
}

#[cfg(feature = "sqlx-postgres")]
impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    DatabaseError::Constraint(db_err.to_string())
                } else {
                    DatabaseError::Query(db_err.to_string())
                }
            }
            sqlx::Error::PoolClosed => DatabaseError::Connection("Pool closed".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::Connection("Pool timed out".to_string()),
            _ => DatabaseError::Query(err.to_string()),
        }
    }
}

#[cfg(feature = "sqlx-postgres")]
impl From<sqlx::Error> for AccessError {
    fn from(err: sqlx::Error) -> Self {
        AccessError::Database(DatabaseError::from(err))
    }
}

#[cfg(feature = "sqlx-postgres")]
impl From<sqlx::migrate::MigrateError> for AccessError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AccessError::Database(DatabaseError::Migration(err.to_string()))
    }
}

impl From<validator::ValidationErrors> for AccessError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect();
        fields.sort();
        AccessError::Validation(fields.join("; "))
    }
}

pub type AccessResult<T> = Result<T, AccessError>;
