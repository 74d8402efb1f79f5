use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::{Identified, user::UserRef};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
pub enum ProjectType {
    Academic,
    Informatic,
}

/// Role of the current user inside a project, used to gate UI actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProjectRole {
    ScrumMaster,
    ProductOwner,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub scrum_master: UserRef,
    pub product_owner: UserRef,
    #[serde(alias = "clusterId")]
    pub cluster: String,
}

impl Identified for Project {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Project {
    pub fn is_scrum_master(&self, user_id: &str) -> bool {
        self.scrum_master.id() == user_id
    }

    pub fn is_product_owner(&self, user_id: &str) -> bool {
        self.product_owner.id() == user_id
    }

    /// Scrum Master wins when one user holds both roles.
    pub fn role_of(&self, user_id: &str) -> ProjectRole {
        if self.is_scrum_master(user_id) {
            ProjectRole::ScrumMaster
        } else if self.is_product_owner(user_id) {
            ProjectRole::ProductOwner
        } else {
            ProjectRole::Member
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub scrum_master: String,
    pub product_owner: String,
    pub cluster: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrum_master: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_owner: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_role_resolution() {
        let project: Project = serde_json::from_value(json!({
            "_id": "p1",
            "title": "Kivora",
            "type": "Informatic",
            "startDate": "2026-01-10T00:00:00Z",
            "endDate": "2026-03-10T00:00:00Z",
            "scrumMaster": {"_id": "sm"},
            "productOwner": "po",
            "cluster": "c1"
        }))
        .unwrap();

        assert_eq!(project.role_of("sm"), ProjectRole::ScrumMaster);
        assert_eq!(project.role_of("po"), ProjectRole::ProductOwner);
        assert_eq!(project.role_of("dev"), ProjectRole::Member);
        assert_eq!(project.project_type, ProjectType::Informatic);
    }
}
