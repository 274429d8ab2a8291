//! Notification trigger contract
//!
//! Delivery mechanics (email, WhatsApp) live outside this core; the writer
//! only fires the trigger on status change. Failures are logged and never
//! propagated into the transaction result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::SubmissionStatus;

/// Which message template the delivery layer should render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    SubmissionApproved,
    SubmissionRejected,
}

impl TemplateKind {
    /// Template for a status transition, if one is configured for it.
    pub fn for_status(status: SubmissionStatus) -> Option<Self> {
        match status {
            SubmissionStatus::Approved => Some(Self::SubmissionApproved),
            SubmissionStatus::Rejected => Some(Self::SubmissionRejected),
            SubmissionStatus::Pending => None,
        }
    }
}

/// Data available to the template renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub reference_code: String,
    pub applicant_name: String,
    pub branch_id: i64,
}

/// Fire-and-forget notification seam
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        recipient_contact: &str,
        template: TemplateKind,
        payload: &NotificationPayload,
    ) -> anyhow::Result<()>;
}

/// Default implementation: log the trigger and succeed. Deployments plug in
/// a real delivery client.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(
        &self,
        recipient_contact: &str,
        template: TemplateKind,
        payload: &NotificationPayload,
    ) -> anyhow::Result<()> {
        info!(
            "Notification {:?} for {} to {}",
            template, payload.reference_code, recipient_contact
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_terminal_statuses_have_templates() {
        assert_eq!(
            TemplateKind::for_status(SubmissionStatus::Approved),
            Some(TemplateKind::SubmissionApproved)
        );
        assert_eq!(
            TemplateKind::for_status(SubmissionStatus::Rejected),
            Some(TemplateKind::SubmissionRejected)
        );
        assert_eq!(TemplateKind::for_status(SubmissionStatus::Pending), None);
    }
}
