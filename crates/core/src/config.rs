use crate::audit::AuditSink;
use crate::error::AccessError;
use crate::logger::{Logger, TracingLogger};
use crate::notify::InvitationNotifier;
use chrono::Duration;
use std::sync::Arc;

/// Shortest invitation token accepted by [`AccessConfig::validate`].
pub const MIN_INVITATION_TOKEN_LENGTH: usize = 64;

/// Default lifetime of a freshly issued invitation.
pub const DEFAULT_INVITATION_TTL_DAYS: i64 = 7;

/// Runtime configuration for project access operations.
#[derive(Clone)]
pub struct AccessConfig {
    /// Application name, passed along to invitation notices.
    pub app_name: String,

    /// Public base URL used to build invitation accept/reject links.
    pub base_url: String,

    /// How long an invitation stays acceptable after it is issued.
    pub invitation_expires_in: Duration,

    /// Length of generated invitation tokens (alphanumeric characters).
    pub invitation_token_length: usize,

    /// Receives failures of best-effort side effects.
    pub logger: Arc<dyn Logger>,

    /// Delivery channel for new invitations. Nothing is sent when unset.
    pub notifier: Option<Arc<dyn InvitationNotifier>>,

    /// Receives an entry after every committed change. Nothing is recorded
    /// when unset.
    pub audit_sink: Option<Arc<dyn AuditSink>>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            app_name: "Project Access".to_string(),
            base_url: "http://localhost:3000".to_string(),
            invitation_expires_in: Duration::days(DEFAULT_INVITATION_TTL_DAYS),
            invitation_token_length: MIN_INVITATION_TOKEN_LENGTH,
            logger: Arc::new(TracingLogger),
            notifier: None,
            audit_sink: None,
        }
    }
}

impl AccessConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn invitation_expires_in(mut self, duration: Duration) -> Self {
        self.invitation_expires_in = duration;
        self
    }

    pub fn invitation_token_length(mut self, length: usize) -> Self {
        self.invitation_token_length = length;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn InvitationNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn validate(&self) -> Result<(), AccessError> {
        if self.base_url.trim().is_empty() {
            return Err(AccessError::config("Base URL cannot be empty"));
        }

        if self.invitation_token_length < MIN_INVITATION_TOKEN_LENGTH {
            return Err(AccessError::config(format!(
                "Invitation tokens must be at least {} characters",
                MIN_INVITATION_TOKEN_LENGTH
            )));
        }

        if self.invitation_expires_in <= Duration::zero() {
            return Err(AccessError::config(
                "Invitation lifetime must be positive",
            ));
        }

        Ok(())
    }
}
