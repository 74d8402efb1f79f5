use std::sync::Arc;

use domain::models::user::{AuthSession, LoginRequest, RegisterUser, UserSummary};
use tracing::info;

use super::{
    client::KivoraClient,
    session::SessionStore,
    submission::{SubmitError, Submitter},
    toast::ToastService,
    validation::Validate,
};

#[derive(Clone)]
pub struct AuthOrchestrator {
    client: KivoraClient,
    submitter: Submitter,
    session: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for AuthOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOrchestrator")
            .field("signed_in", &self.current().is_some())
            .finish()
    }
}

impl AuthOrchestrator {
    pub fn new(client: KivoraClient, toasts: ToastService, session: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            submitter: Submitter::new(toasts),
            session,
        }
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.session.load()
    }

    pub fn is_loading(&self) -> bool {
        self.submitter.gate().is_loading()
    }

    pub async fn register(&self, user: &RegisterUser) -> Result<UserSummary, SubmitError> {
        user.validate()?;
        let created = self
            .submitter
            .submit("Account created, you can sign in now", self.client.register(user))
            .await?;
        info!(user_id = %created.id, "Account registered");
        Ok(created)
    }

    /// Sign in and persist the session for later requests.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthSession, SubmitError> {
        credentials.validate()?;
        let session = self
            .submitter
            .submit("Welcome back", async {
                let session = self.client.login(credentials).await?;
                self.session.save(&session)?;
                Ok::<_, SubmitError>(session)
            })
            .await?;
        info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    pub fn logout(&self) -> Result<(), SubmitError> {
        self.session.clear()?;
        info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::services::{
        session::{FileSessionStore, MemorySessionStore},
        submission::SESSION_SAVE_MESSAGE,
        test_support::{FakeTransport, drain_toasts},
        toast::ToastLevel,
    };

    fn setup() -> (Arc<FakeTransport>, AuthOrchestrator) {
        let fake = FakeTransport::new();
        let auth = AuthOrchestrator::new(
            KivoraClient::new(fake.clone()),
            ToastService::new(),
            Arc::new(MemorySessionStore::new()),
        );
        (fake, auth)
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let (fake, auth) = setup();
        fake.respond(
            Method::POST,
            "auth/login",
            json!({"message": "Bienvenido", "userDetails": {
                "token": "jwt", "uid": "u1", "username": "ana"
            }}),
        );

        let session = auth
            .login(&LoginRequest {
                email: "ana@kinal.edu.gt".to_string(),
                password: "Secreta1!".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user_id, "u1");
        assert_eq!(auth.current().unwrap().token, "jwt");

        auth.logout().unwrap();
        assert!(auth.current().is_none());
    }

    #[tokio::test]
    async fn test_unsaved_session_is_a_failed_login() {
        let fake = FakeTransport::new();
        fake.respond(
            Method::POST,
            "auth/login",
            json!({"userDetails": {"token": "jwt", "uid": "u1", "username": "ana"}}),
        );
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let toasts = ToastService::new();
        let mut rx = toasts.subscribe();
        let auth = AuthOrchestrator::new(
            KivoraClient::new(fake.clone()),
            toasts,
            Arc::new(FileSessionStore::new(blocker.path().join("session.json"))),
        );

        let err = auth
            .login(&LoginRequest {
                email: "ana@kinal.edu.gt".to_string(),
                password: "Secreta1!".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Session(_)));
        assert!(auth.current().is_none());

        let seen = drain_toasts(&mut rx);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].level, ToastLevel::Error);
        assert_eq!(seen[0].message, SESSION_SAVE_MESSAGE);
    }

    #[tokio::test]
    async fn test_weak_password_blocks_registration() {
        let (fake, auth) = setup();
        let err = auth
            .register(&RegisterUser {
                name: "Ana".to_string(),
                surname: "López".to_string(),
                username: "ana.lopez".to_string(),
                email: "ana@kinal.edu.gt".to_string(),
                phone: "55551234".to_string(),
                password: "abcdefgh".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.validation().unwrap().field, Some("password"));
        assert!(fake.requests().is_empty());
    }
}
