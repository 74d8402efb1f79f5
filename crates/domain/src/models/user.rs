use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{Identified, Ref};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id", alias = "uid")]
    pub id: String,
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// The subset of a user the server embeds when it populates a reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id", alias = "id", alias = "uid")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

impl Identified for UserSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

impl UserSummary {
    /// Best label for lists: username, then full name, then the raw id.
    pub fn display_name(&self) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return username.to_string();
        }
        match (&self.name, &self.surname) {
            (Some(name), Some(surname)) => format!("{name} {surname}"),
            (Some(name), None) => name.clone(),
            _ => self.id.clone(),
        }
    }
}

pub type UserRef = Ref<UserSummary>;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// What the login endpoint hands back and what the session store persists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub token: String,
    #[serde(alias = "uid", alias = "_id", alias = "id")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    pub phone: String,
}

impl From<&User> for UpdateProfile {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            surname: user.surname.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DeleteAccount {
    pub password: String,
}
