use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::{Identified, upload::FileUpload, user::UserRef};

pub const TASK_TITLE_MAX: usize = 50;
pub const TASK_DESCRIPTION_MAX: usize = 300;
pub const TASK_TAGS_MAX: usize = 30;
pub const TASK_ATTACHMENTS_MAX: usize = 4;
pub const TASK_ATTACHMENT_BYTES_MAX: usize = 25 * 1024 * 1024;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
pub enum TaskState {
    Late,
    #[default]
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    #[serde(rename = "In Review")]
    #[strum(serialize = "In Review")]
    InReview,
    #[serde(rename = "finalized")]
    #[strum(serialize = "finalized")]
    Finalized,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct TaskAttachment {
    pub url: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub assigned_to: UserRef,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default)]
    pub attachments: Vec<TaskAttachment>,
    /// Left by the Scrum Master during review.
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(alias = "sprintId")]
    pub sprint: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Identified for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Task {
    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assigned_to.id() == user_id
    }
}

/// Sent as multipart because of the attachments.
#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: String,
    pub tags: Vec<String>,
    pub is_urgent: bool,
    pub sprint: String,
    pub attachments: Vec<FileUpload>,
}

impl CreateTask {
    pub fn tags_len(&self) -> usize {
        combined_tags_len(&self.tags)
    }
}

/// Length of the tags as the UI renders them, comma separated.
pub fn combined_tags_len(tags: &[String]) -> usize {
    tags.iter().map(|t| t.chars().count()).sum::<usize>() + tags.len().saturating_sub(1)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_urgent: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ChangeTaskState {
    pub state: TaskState,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskComment {
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_state_wire_names() {
        assert_eq!(
            serde_json::to_value(TaskState::InReview).unwrap(),
            json!("In Review")
        );
        assert_eq!(
            serde_json::from_value::<TaskState>(json!("finalized")).unwrap(),
            TaskState::Finalized
        );
        assert_eq!(TaskState::InProgress.to_string(), "In Progress");
    }

    #[test]
    fn test_combined_tags_len_counts_separators() {
        let tags = vec!["api".to_string(), "ui".to_string()];
        assert_eq!(combined_tags_len(&tags), 6);
        assert_eq!(combined_tags_len(&[]), 0);
    }
}
