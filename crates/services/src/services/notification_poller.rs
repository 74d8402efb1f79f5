//! Keeps the pending-notification count fresh for every signed-in view.

use std::{sync::Arc, time::Duration};

use domain::models::notification::{Notification, pending_count};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use super::{api::ApiError, client::KivoraClient, periodic::Periodic, toast::ToastService};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub pending_count: usize,
}

impl NotificationSnapshot {
    pub fn new(notifications: Vec<Notification>) -> Self {
        let pending_count = pending_count(&notifications);
        Self {
            notifications,
            pending_count,
        }
    }
}

struct Inner {
    client: KivoraClient,
    toasts: ToastService,
    snapshot: watch::Sender<NotificationSnapshot>,
    /// Held for the duration of a fetch.
    fetching: Mutex<()>,
    periodic: Periodic,
}

impl Inner {
    /// Fetch and publish. Failures are left to the caller.
    async fn load(&self) -> Result<NotificationSnapshot, ApiError> {
        let notifications = self.client.list_notifications().await?;
        let snapshot = NotificationSnapshot::new(notifications);
        debug!(pending = snapshot.pending_count, "Notifications refreshed");
        self.snapshot.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    async fn fetch(&self) -> Result<NotificationSnapshot, ApiError> {
        self.load().await.inspect_err(|e| {
            warn!(error = %e, "Failed to fetch notifications");
            self.toasts.error(e.user_message());
        })
    }

    async fn tick(&self) {
        let Ok(_fetching) = self.fetching.try_lock() else {
            debug!("Notification fetch still in flight, skipping tick");
            return;
        };
        let _ = self.fetch().await;
    }
}

/// Single writer of the notification snapshot. Consumers read it through
/// `subscribe`.
#[derive(Clone)]
pub struct NotificationPoller {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for NotificationPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationPoller")
            .field("periodic", &self.inner.periodic)
            .field("pending_count", &self.pending_count())
            .finish()
    }
}

impl NotificationPoller {
    pub fn new(client: KivoraClient, toasts: ToastService, poll_interval: Duration) -> Self {
        let (snapshot, _) = watch::channel(NotificationSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                client,
                toasts,
                snapshot,
                fetching: Mutex::new(()),
                periodic: Periodic::new("notification poller", poll_interval),
            }),
        }
    }

    /// Begin polling. The first fetch happens immediately.
    pub fn start(&self) -> bool {
        let inner = Arc::downgrade(&self.inner);
        self.inner.periodic.start(move || {
            let inner = inner.upgrade();
            async move {
                if let Some(inner) = inner {
                    inner.tick().await;
                }
            }
        })
    }

    pub async fn stop(&self) {
        self.inner.periodic.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.inner.periodic.is_running()
    }

    pub fn set_visible(&self, visible: bool) {
        self.inner.periodic.set_visible(visible);
    }

    /// Fetch now, waiting for any fetch already in flight to finish first.
    pub async fn refresh_now(&self) -> Result<NotificationSnapshot, ApiError> {
        let _fetching = self.inner.fetching.lock().await;
        self.inner.fetch().await
    }

    /// Like `refresh_now`, without the error toast.
    pub async fn refresh_quietly(&self) -> Result<NotificationSnapshot, ApiError> {
        let _fetching = self.inner.fetching.lock().await;
        self.inner.load().await
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.snapshot.borrow().pending_count
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Forget everything fetched, e.g. on sign-out.
    pub fn reset(&self) {
        self.inner
            .snapshot
            .send_replace(NotificationSnapshot::default());
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::services::test_support::{FakeTransport, drain_toasts, error_toasts};

    fn notifications() -> serde_json::Value {
        json!({"notifications": [
            {"_id": "n1", "title": "Nueva tarea", "state": "Pendiente"},
            {"_id": "n2", "title": "Sprint iniciado", "state": "Vista"},
            {"_id": "n3", "title": "Daily", "state": "Pendiente"}
        ]})
    }

    fn poller(fake: &Arc<FakeTransport>, toasts: &ToastService) -> NotificationPoller {
        NotificationPoller::new(
            KivoraClient::new(fake.clone()),
            toasts.clone(),
            Duration::from_secs(10),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_and_publishes_pending_count() {
        let fake = FakeTransport::new();
        fake.respond(Method::GET, "notifications/", notifications());
        let poller = poller(&fake, &ToastService::new());
        let mut rx = poller.subscribe();

        poller.start();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().pending_count, 2);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(fake.count(Method::GET, "notifications/"), 3);

        poller.stop().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fake.count(Method::GET, "notifications/"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_toasts_and_keeps_polling() {
        let fake = FakeTransport::new();
        fake.fail(
            Method::GET,
            "notifications/",
            ApiError::Http {
                status: 502,
                message: None,
            },
        );
        let toasts = ToastService::new();
        let mut toast_rx = toasts.subscribe();
        let poller = poller(&fake, &toasts);

        poller.start();
        tokio::time::sleep(Duration::from_secs(15)).await;
        poller.stop().await;

        assert_eq!(fake.count(Method::GET, "notifications/"), 2);
        assert_eq!(error_toasts(&drain_toasts(&mut toast_rx)), 2);
        assert_eq!(poller.snapshot(), NotificationSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_is_never_overlapped() {
        let fake = FakeTransport::new();
        fake.respond(Method::GET, "notifications/", notifications());
        fake.set_delay(Duration::from_secs(25));
        let poller = poller(&fake, &ToastService::new());

        poller.start();
        tokio::time::sleep(Duration::from_secs(24)).await;
        assert_eq!(fake.count(Method::GET, "notifications/"), 1);
        poller.stop().await;
    }

    #[tokio::test]
    async fn test_refresh_now_and_reset() {
        let fake = FakeTransport::new();
        fake.respond(Method::GET, "notifications/", notifications());
        let poller = poller(&fake, &ToastService::new());

        let snapshot = poller.refresh_now().await.unwrap();
        assert_eq!(snapshot.notifications.len(), 3);
        assert_eq!(poller.pending_count(), 2);

        poller.reset();
        assert_eq!(poller.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_quietly_does_not_toast() {
        let fake = FakeTransport::new();
        fake.fail(Method::GET, "notifications/", ApiError::Timeout);
        let toasts = ToastService::new();
        let mut toast_rx = toasts.subscribe();
        let poller = poller(&fake, &toasts);

        assert!(matches!(poller.refresh_quietly().await, Err(ApiError::Timeout)));
        assert!(drain_toasts(&mut toast_rx).is_empty());

        assert!(poller.refresh_now().await.is_err());
        assert_eq!(error_toasts(&drain_toasts(&mut toast_rx)), 1);
    }
}
