use std::sync::Arc;

use domain::models::{
    upload::FileUpload,
    user::{ChangePassword, DeleteAccount, UpdateProfile, User},
};

use super::{
    client::KivoraClient,
    session::SessionStore,
    submission::{Slot, SubmitError, Submitter},
    toast::ToastService,
    validation::{Validate, validate_profile_picture},
};

/// The signed-in user's own account.
#[derive(Clone)]
pub struct ProfileOrchestrator {
    client: KivoraClient,
    submitter: Submitter,
    session: Arc<dyn SessionStore>,
    profile: Slot<User>,
}

impl std::fmt::Debug for ProfileOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileOrchestrator")
            .field("profile", &self.profile.get().map(|u| u.id))
            .finish()
    }
}

impl ProfileOrchestrator {
    pub fn new(client: KivoraClient, toasts: ToastService, session: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            submitter: Submitter::new(toasts),
            session,
            profile: Slot::new(),
        }
    }

    pub fn profile(&self) -> &Slot<User> {
        &self.profile
    }

    pub fn is_loading(&self) -> bool {
        self.submitter.gate().is_loading()
    }

    pub async fn load(&self) -> Result<User, SubmitError> {
        let user = self.submitter.fetch(self.client.get_profile()).await?;
        self.profile.set(user.clone());
        Ok(user)
    }

    async fn reload(&self) {
        if let Some(user) = self
            .submitter
            .refresh("profile", self.client.get_profile())
            .await
        {
            self.profile.set(user);
        }
    }

    pub async fn update(&self, profile: &UpdateProfile) -> Result<User, SubmitError> {
        profile.validate()?;
        let user = self
            .submitter
            .submit("Profile updated", self.client.update_profile(profile))
            .await?;
        self.reload().await;
        Ok(user)
    }

    pub async fn change_password(&self, change: &ChangePassword) -> Result<(), SubmitError> {
        change.validate()?;
        self.submitter
            .submit("Password changed", self.client.change_password(change))
            .await?;
        Ok(())
    }

    pub async fn change_picture(&self, image: Option<FileUpload>) -> Result<User, SubmitError> {
        let image = validate_profile_picture(image.as_ref())?.clone();
        let user = self
            .submitter
            .submit(
                "Profile picture updated",
                self.client.update_profile_picture(image),
            )
            .await?;
        self.reload().await;
        Ok(user)
    }

    /// Delete the account and sign out.
    pub async fn delete_account(&self, confirm: &DeleteAccount) -> Result<(), SubmitError> {
        confirm.validate()?;
        self.submitter
            .submit("Account deleted", self.client.delete_account(confirm))
            .await?;
        self.profile.clear();
        self.session.clear()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::services::{
        session::MemorySessionStore, test_support::FakeTransport, validation::ValidationErrorCode,
    };

    fn setup() -> (Arc<FakeTransport>, ProfileOrchestrator) {
        let fake = FakeTransport::new();
        let profile = ProfileOrchestrator::new(
            KivoraClient::new(fake.clone()),
            ToastService::new(),
            Arc::new(MemorySessionStore::new()),
        );
        (fake, profile)
    }

    #[tokio::test]
    async fn test_same_password_is_rejected_locally() {
        let (fake, profile) = setup();
        let err = profile
            .change_password(&ChangePassword {
                old_password: "X1!aaaaa".to_string(),
                new_password: "X1!aaaaa".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.validation().unwrap().code, ValidationErrorCode::Unchanged);
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_picture_upload_refreshes_profile() {
        let (fake, profile) = setup();
        let user = json!({
            "_id": "u1", "name": "Ana", "surname": "López", "username": "ana",
            "email": "ana@kinal.edu.gt", "profilePicture": "https://cdn.example/u1.png"
        });
        fake.respond(Method::PUT, "user/profilePicture", json!({"user": user}));
        fake.respond(Method::GET, "user/profile", json!({"user": user}));

        let err = profile.change_picture(None).await.unwrap_err();
        assert_eq!(err.validation().unwrap().code, ValidationErrorCode::Required);

        profile
            .change_picture(Some(FileUpload::new("me.png", "image/png", vec![1u8; 16])))
            .await
            .unwrap();
        assert_eq!(fake.count(Method::GET, "user/profile"), 1);
        assert!(profile.profile().get().unwrap().profile_picture.is_some());
    }
}
