use std::sync::Arc;

use crate::adapters::DatabaseAdapter;
use crate::audit::{AuditEntry, AuditSink};
use crate::config::AccessConfig;
use crate::notify::{InvitationNotice, InvitationNotifier};

/// Shared state handed to every operation: configuration plus storage.
pub struct AccessContext<DB: DatabaseAdapter> {
    pub config: Arc<AccessConfig>,
    pub database: Arc<DB>,
    pub notifier: Option<Arc<dyn InvitationNotifier>>,
    pub audit_sink: Option<Arc<dyn AuditSink>>,
}

impl<DB: DatabaseAdapter> Clone for AccessContext<DB> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            database: self.database.clone(),
            notifier: self.notifier.clone(),
            audit_sink: self.audit_sink.clone(),
        }
    }
}

impl<DB: DatabaseAdapter> AccessContext<DB> {
    pub fn new(config: Arc<AccessConfig>, database: Arc<DB>) -> Self {
        let notifier = config.notifier.clone();
        let audit_sink = config.audit_sink.clone();
        Self {
            config,
            database,
            notifier,
            audit_sink,
        }
    }

    /// Hand a committed invitation to the notifier, if any. Delivery errors
    /// are reported to the logger and otherwise ignored.
    pub async fn notify_invitation(&self, notice: &InvitationNotice) {
        let Some(notifier) = self.notifier.as_deref() else {
            return;
        };
        if let Err(err) = notifier.notify(notice).await {
            tracing::warn!(
                invitation_id = %notice.invitation_id,
                project_id = %notice.project_id,
                error = %err,
                "invitation notification failed"
            );
            self.config.logger.warn(&format!(
                "Failed to deliver invitation {} for project {}: {}",
                notice.invitation_id, notice.project_id, err
            ));
        }
    }

    /// Record an audit entry, if a sink is configured. Failures are logged.
    pub async fn audit(&self, entry: AuditEntry) {
        let Some(sink) = self.audit_sink.as_deref() else {
            return;
        };
        let action = entry.action;
        let subject_id = entry.subject_id.clone();
        if let Err(err) = sink.record(entry).await {
            tracing::warn!(
                action = action.as_str(),
                subject_id = %subject_id,
                error = %err,
                "audit record failed"
            );
            self.config.logger.warn(&format!(
                "Failed to record audit entry {} for {}: {}",
                action.as_str(),
                subject_id,
                err
            ));
        }
    }
}
