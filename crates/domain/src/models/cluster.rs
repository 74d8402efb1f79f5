use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::{Identified, upload::FileUpload, user::UserRef};

pub const CLUSTER_NAME_MAX: usize = 50;
pub const CLUSTER_DESCRIPTION_MAX: usize = 200;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberRole {
    Admin,
    #[default]
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct ClusterMember {
    pub user: UserRef,
    #[serde(default)]
    pub role: MemberRole,
}

/// A team workspace. The single `admin` member is the owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub members: Vec<ClusterMember>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Identified for Cluster {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Cluster {
    pub fn owner(&self) -> Option<&ClusterMember> {
        self.members.iter().find(|m| m.role == MemberRole::Admin)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner().is_some_and(|m| m.user.id() == user_id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user.id() == user_id)
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.user.id())
    }
}

/// Sent as multipart because of the optional image.
#[derive(Debug, Clone, Default)]
pub struct CreateCluster {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<FileUpload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateCluster {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AddMember {
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cluster() -> Cluster {
        serde_json::from_value(json!({
            "_id": "c1",
            "name": "Equipo Uno",
            "members": [
                {"user": {"_id": "owner", "username": "lead"}, "role": "admin"},
                {"user": "u2", "role": "member"},
                {"user": "u3"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_owner_is_admin_member() {
        let cluster = cluster();
        assert!(cluster.is_owner("owner"));
        assert!(!cluster.is_owner("u2"));
        assert_eq!(cluster.members[2].role, MemberRole::Member);
    }

    #[test]
    fn test_membership() {
        let cluster = cluster();
        assert!(cluster.is_member("u3"));
        assert!(!cluster.is_member("stranger"));
        assert_eq!(cluster.member_ids().count(), 3);
    }
}
