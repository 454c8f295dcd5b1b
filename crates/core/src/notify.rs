use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AccessResult;

/// Everything a delivery channel needs to tell an invitee about an offer.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationNotice {
    pub invitation_id: String,
    pub email: String,
    pub project_id: String,
    pub project_name: String,
    pub project_description: Option<String>,
    pub inviter_id: String,
    pub inviter_name: Option<String>,
    pub role_name: String,
    pub expires_at: DateTime<Utc>,
    pub links: InvitationLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationLinks {
    pub accept: String,
    pub reject: String,
}

/// Build the accept and reject URLs for an invitation token.
pub fn invitation_links(base_url: &str, project_id: &str, token: &str) -> InvitationLinks {
    let base = format!(
        "{}/api/v1/projects/{}/invitations/{}",
        base_url.trim_end_matches('/'),
        project_id,
        token
    );
    InvitationLinks {
        accept: format!("{}/accept", base),
        reject: format!("{}/reject", base),
    }
}

/// Delivery channel for new invitations. Implement this to hand invitations
/// to a mailer or a job queue.
///
/// Called once the invitation is committed. An error is logged and never
/// rolls the invitation back.
#[async_trait]
pub trait InvitationNotifier: Send + Sync {
    async fn notify(&self, notice: &InvitationNotice) -> AccessResult<()>;
}

/// Development notifier that prints the invitation links to stderr.
pub struct ConsoleNotifier;

#[async_trait]
impl InvitationNotifier for ConsoleNotifier {
    async fn notify(&self, notice: &InvitationNotice) -> AccessResult<()> {
        eprintln!(
            "[INVITATION] To: {} | Project: {} | Role: {} | Accept: {} | Reject: {}",
            notice.email,
            notice.project_name,
            notice.role_name,
            notice.links.accept,
            notice.links.reject
        );
        Ok(())
    }
}
