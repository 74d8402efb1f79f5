use domain::models::notification::{NotificationState, UpdateNotificationState};

use super::{
    client::KivoraClient,
    notification_poller::{NotificationPoller, NotificationSnapshot},
    submission::{SubmitError, Submitter},
    toast::ToastService,
};

/// User actions on notifications. The list itself is owned by the poller,
/// which is also what re-fetches after each change.
#[derive(Debug, Clone)]
pub struct NotificationOrchestrator {
    client: KivoraClient,
    submitter: Submitter,
    poller: NotificationPoller,
}

impl NotificationOrchestrator {
    pub fn new(client: KivoraClient, toasts: ToastService, poller: NotificationPoller) -> Self {
        Self {
            client,
            submitter: Submitter::new(toasts),
            poller,
        }
    }

    pub fn poller(&self) -> &NotificationPoller {
        &self.poller
    }

    pub fn is_loading(&self) -> bool {
        self.submitter.gate().is_loading()
    }

    pub async fn load(&self) -> Result<NotificationSnapshot, SubmitError> {
        Ok(self.poller.refresh_now().await?)
    }

    async fn reload(&self) {
        self.submitter
            .refresh("notifications", self.poller.refresh_quietly())
            .await;
    }

    async fn set_state(
        &self,
        notification_id: &str,
        state: NotificationState,
        success_message: &str,
    ) -> Result<(), SubmitError> {
        self.submitter
            .submit(
                success_message,
                self.client
                    .update_notification_state(notification_id, &UpdateNotificationState { state }),
            )
            .await?;
        self.reload().await;
        Ok(())
    }

    pub async fn mark_seen(&self, notification_id: &str) -> Result<(), SubmitError> {
        self.set_state(notification_id, NotificationState::Seen, "Marked as seen")
            .await
    }

    pub async fn archive(&self, notification_id: &str) -> Result<(), SubmitError> {
        self.set_state(notification_id, NotificationState::Archived, "Notification archived")
            .await
    }

    pub async fn delete(&self, notification_id: &str) -> Result<(), SubmitError> {
        self.set_state(notification_id, NotificationState::Deleted, "Notification deleted")
            .await
    }

    pub async fn mark_all_seen(&self) -> Result<(), SubmitError> {
        self.submitter
            .submit(
                "All notifications marked as seen",
                self.client.mark_all_notifications_seen(),
            )
            .await?;
        self.reload().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::services::{api::RequestBody, test_support::FakeTransport};

    #[tokio::test]
    async fn test_mark_seen_refreshes_snapshot_once() {
        let fake = FakeTransport::new();
        fake.respond(
            Method::PATCH,
            "notifications/n1",
            json!({"notification": {"_id": "n1", "title": "Nueva tarea", "state": "Vista"}}),
        );
        fake.respond(
            Method::GET,
            "notifications/",
            json!({"notifications": [{"_id": "n1", "title": "Nueva tarea", "state": "Vista"}]}),
        );
        let toasts = ToastService::new();
        let client = KivoraClient::new(fake.clone());
        let poller = NotificationPoller::new(client.clone(), toasts.clone(), Duration::from_secs(10));
        let notifications = NotificationOrchestrator::new(client, toasts, poller);

        notifications.mark_seen("n1").await.unwrap();

        let sent = fake.requests();
        let RequestBody::Json(body) = &sent[0].body else {
            panic!("expected json body");
        };
        assert_eq!(body, &json!({"state": "Vista"}));
        assert_eq!(fake.count(Method::GET, "notifications/"), 1);
        assert_eq!(notifications.poller().pending_count(), 0);
    }
}
