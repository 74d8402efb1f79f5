use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::Identified;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
pub enum NotificationState {
    #[default]
    #[serde(rename = "Pendiente")]
    #[strum(serialize = "Pendiente")]
    Pending,
    #[serde(rename = "Vista")]
    #[strum(serialize = "Vista")]
    Seen,
    #[serde(rename = "Archivada")]
    #[strum(serialize = "Archivada")]
    Archived,
    #[serde(rename = "Eliminada")]
    #[strum(serialize = "Eliminada")]
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub state: NotificationState,
    #[serde(rename = "type", default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Identified for Notification {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Notification {
    pub fn is_pending(&self) -> bool {
        self.state == NotificationState::Pending
    }
}

pub fn pending_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| n.is_pending()).count()
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateNotificationState {
    pub state: NotificationState,
}
