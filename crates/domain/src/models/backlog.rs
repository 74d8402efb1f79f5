use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;

use super::Identified;

pub const BACKLOG_TITLE_MAX: usize = 100;
pub const BACKLOG_DESCRIPTION_MAX: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid priority {0}, expected 1 (high), 2 (medium) or 3 (low)")]
pub struct InvalidPriority(pub u8);

/// Travels as a number on the wire: 1 = High, 2 = Medium, 3 = Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Default)]
pub enum Priority {
    High = 1,
    #[default]
    Medium = 2,
    Low = 3,
}

impl Priority {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = InvalidPriority;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            other => Err(InvalidPriority(other)),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Priority::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default)]
pub enum BacklogState {
    #[default]
    Pending,
    Assigned,
    Completed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct BacklogItem {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[ts(type = "number")]
    pub priority: Priority,
    #[serde(default)]
    pub state: BacklogState,
    #[serde(alias = "projectId")]
    pub project: String,
}

impl Identified for BacklogItem {
    fn id(&self) -> &str {
        &self.id
    }
}

impl BacklogItem {
    /// Only pending items may be pulled into a sprint.
    pub fn is_sprint_eligible(&self) -> bool {
        self.state == BacklogState::Pending
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateBacklogItem {
    pub title: String,
    pub description: Option<String>,
    #[ts(type = "number")]
    pub priority: Priority,
    pub project: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBacklogItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "number | null")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<BacklogState>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_priority_wire_format() {
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), json!(1));
        assert_eq!(
            serde_json::from_value::<Priority>(json!(3)).unwrap(),
            Priority::Low
        );
        assert!(serde_json::from_value::<Priority>(json!(7)).is_err());
    }

    #[test]
    fn test_unknown_state_is_not_eligible() {
        let item: BacklogItem = serde_json::from_value(json!({
            "_id": "b1",
            "title": "Login",
            "priority": 1,
            "state": "Archived",
            "project": "p1"
        }))
        .unwrap();
        assert_eq!(item.state, BacklogState::Other);
        assert!(!item.is_sprint_eligible());
    }
}
