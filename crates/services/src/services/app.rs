//! Wires config, transport, orchestrators and background services together.

use std::sync::Arc;

use domain::models::user::{AuthSession, LoginRequest};
use thiserror::Error;
use tracing::info;

use super::{
    api::{ApiError, Transport},
    auth::AuthOrchestrator,
    backlog::BacklogOrchestrator,
    client::KivoraClient,
    cluster::ClusterOrchestrator,
    config::{ClientConfig, ConfigError},
    event::EventOrchestrator,
    event_status::EventStatusSweeper,
    http_transport::HttpTransport,
    notification::NotificationOrchestrator,
    notification_poller::NotificationPoller,
    profile::ProfileOrchestrator,
    project::ProjectOrchestrator,
    session::{FileSessionStore, MemorySessionStore, SessionStore},
    sprint::SprintOrchestrator,
    submission::SubmitError,
    task::TaskOrchestrator,
    toast::ToastService,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// One instance per signed-in user interface.
#[derive(Debug, Clone)]
pub struct KivoraApp {
    config: ClientConfig,
    client: KivoraClient,
    toasts: ToastService,
    auth: AuthOrchestrator,
    profile: ProfileOrchestrator,
    clusters: ClusterOrchestrator,
    projects: ProjectOrchestrator,
    sprints: SprintOrchestrator,
    backlog: BacklogOrchestrator,
    tasks: TaskOrchestrator,
    events: EventOrchestrator,
    notifications: NotificationOrchestrator,
    sweeper: EventStatusSweeper,
}

impl KivoraApp {
    /// HTTP transport with the session persisted to disk.
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        config.validate()?;
        let session: Arc<dyn SessionStore> = match config
            .session_file
            .clone()
            .or_else(FileSessionStore::default_path)
        {
            Some(path) => Arc::new(FileSessionStore::new(path)),
            None => Arc::new(MemorySessionStore::new()),
        };
        let transport = HttpTransport::new(&config, session.clone())?;
        info!(base_url = %transport.base_url(), "Kivora client ready");
        Ok(Self::with_transport(config, Arc::new(transport), session))
    }

    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        let client = KivoraClient::new(transport);
        let toasts = ToastService::new();

        let poller = NotificationPoller::new(
            client.clone(),
            toasts.clone(),
            config.notification_poll_interval(),
        );
        let events = EventOrchestrator::new(client.clone(), toasts.clone());
        let sweeper = EventStatusSweeper::new(
            client.clone(),
            events.events().clone(),
            config.event_window(),
            config.event_sweep_interval(),
        );

        Self {
            auth: AuthOrchestrator::new(client.clone(), toasts.clone(), session.clone()),
            profile: ProfileOrchestrator::new(client.clone(), toasts.clone(), session),
            clusters: ClusterOrchestrator::new(client.clone(), toasts.clone()),
            projects: ProjectOrchestrator::new(client.clone(), toasts.clone()),
            sprints: SprintOrchestrator::new(client.clone(), toasts.clone()),
            backlog: BacklogOrchestrator::new(client.clone(), toasts.clone()),
            tasks: TaskOrchestrator::new(client.clone(), toasts.clone()),
            notifications: NotificationOrchestrator::new(client.clone(), toasts.clone(), poller),
            events,
            sweeper,
            config,
            client,
            toasts,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client(&self) -> &KivoraClient {
        &self.client
    }

    pub fn toasts(&self) -> &ToastService {
        &self.toasts
    }

    pub fn auth(&self) -> &AuthOrchestrator {
        &self.auth
    }

    pub fn profile(&self) -> &ProfileOrchestrator {
        &self.profile
    }

    pub fn clusters(&self) -> &ClusterOrchestrator {
        &self.clusters
    }

    pub fn projects(&self) -> &ProjectOrchestrator {
        &self.projects
    }

    pub fn sprints(&self) -> &SprintOrchestrator {
        &self.sprints
    }

    pub fn backlog(&self) -> &BacklogOrchestrator {
        &self.backlog
    }

    pub fn tasks(&self) -> &TaskOrchestrator {
        &self.tasks
    }

    pub fn events(&self) -> &EventOrchestrator {
        &self.events
    }

    pub fn notifications(&self) -> &NotificationOrchestrator {
        &self.notifications
    }

    pub fn poller(&self) -> &NotificationPoller {
        self.notifications.poller()
    }

    pub fn sweeper(&self) -> &EventStatusSweeper {
        &self.sweeper
    }

    /// Sign in and start the background services.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthSession, SubmitError> {
        let session = self.auth.login(credentials).await?;
        self.start_background();
        Ok(session)
    }

    /// Start the background services for a session persisted earlier.
    /// Returns false when nobody is signed in.
    pub fn resume(&self) -> bool {
        if self.auth.current().is_none() {
            return false;
        }
        self.start_background();
        true
    }

    fn start_background(&self) {
        self.poller().start();
        self.sweeper.start();
    }

    /// Stop background work, drop cached data and forget the session.
    pub async fn logout(&self) -> Result<(), SubmitError> {
        self.poller().stop().await;
        self.sweeper.stop().await;
        self.poller().reset();
        self.profile.profile().clear();
        self.clusters.clusters().clear();
        self.clusters.detail().clear();
        self.projects.projects().clear();
        self.projects.detail().clear();
        self.sprints.sprints().clear();
        self.backlog.items().clear();
        self.tasks.tasks().clear();
        self.events.events().clear();
        self.auth.logout()
    }

    /// Pause or resume the recurring work when the UI is hidden or shown.
    pub fn set_visible(&self, visible: bool) {
        self.poller().set_visible(visible);
        self.sweeper.set_visible(visible);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::services::test_support::FakeTransport;

    fn app(fake: &Arc<FakeTransport>) -> KivoraApp {
        KivoraApp::with_transport(
            ClientConfig::default(),
            fake.clone(),
            Arc::new(MemorySessionStore::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_starts_and_logout_stops_polling() {
        let fake = FakeTransport::new();
        fake.respond(
            Method::POST,
            "auth/login",
            json!({"userDetails": {"token": "jwt", "uid": "u1", "username": "ana"}}),
        );
        fake.respond(
            Method::GET,
            "notifications/",
            json!({"notifications": [{"_id": "n1", "title": "Hola", "state": "Pendiente"}]}),
        );
        let app = app(&fake);
        assert!(!app.resume());

        app.login(&LoginRequest {
            email: "ana@kinal.edu.gt".to_string(),
            password: "Secreta1!".to_string(),
        })
        .await
        .unwrap();
        assert!(app.poller().is_running());
        assert!(app.sweeper().is_running());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(app.poller().pending_count(), 1);

        app.logout().await.unwrap();
        assert!(!app.poller().is_running());
        assert!(!app.sweeper().is_running());
        assert_eq!(app.poller().pending_count(), 0);
        assert!(app.auth().current().is_none());

        let polled = fake.count(Method::GET, "notifications/");
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fake.count(Method::GET, "notifications/"), polled);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ClientConfig {
            api_base_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(KivoraApp::new(config), Err(AppError::Config(_))));
    }
}
