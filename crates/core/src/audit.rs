//! Audit trail for membership changes.
//!
//! Each mutating operation hands an [`AuditEntry`] to the configured
//! [`AuditSink`] after the change is committed. A failing sink is logged
//! and does not undo the change.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::error::{AccessError, AccessResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ProjectCreated,
    ProjectDeleted,
    InvitationSent,
    InvitationAccepted,
    InvitationRejected,
    InvitationCancelled,
    RoleUpdated,
    MemberRemoved,
    MemberLeft,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated => "project_created",
            Self::ProjectDeleted => "project_deleted",
            Self::InvitationSent => "invitation_sent",
            Self::InvitationAccepted => "invitation_accepted",
            Self::InvitationRejected => "invitation_rejected",
            Self::InvitationCancelled => "invitation_cancelled",
            Self::RoleUpdated => "role_updated",
            Self::MemberRemoved => "member_removed",
            Self::MemberLeft => "member_left",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub project_id: String,
    pub actor_id: String,
    pub action: AuditAction,
    pub subject_type: String,
    pub subject_id: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        project_id: impl Into<String>,
        actor_id: impl Into<String>,
        action: AuditAction,
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            actor_id: actor_id.into(),
            action,
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
            old_values: None,
            new_values: None,
            at: Utc::now(),
        }
    }

    pub fn with_old(mut self, values: serde_json::Value) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn with_new(mut self, values: serde_json::Value) -> Self {
        self.new_values = Some(values);
        self
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> AccessResult<()>;
}

/// Emits each entry as a `tracing` event on the `project_access::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) -> AccessResult<()> {
        let old = entry
            .old_values
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let new = entry
            .new_values
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        tracing::info!(
            target: "project_access::audit",
            project_id = %entry.project_id,
            actor_id = %entry.actor_id,
            action = entry.action.as_str(),
            subject_type = %entry.subject_type,
            subject_id = %entry.subject_id,
            old_values = old.as_deref().unwrap_or(""),
            new_values = new.as_deref().unwrap_or(""),
            "audit"
        );
        Ok(())
    }
}

/// Collects entries in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.entries().iter().map(|e| e.action).collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: AuditEntry) -> AccessResult<()> {
        self.entries
            .lock()
            .map_err(|_| AccessError::internal("audit log lock poisoned"))?
            .push(entry);
        Ok(())
    }
}
