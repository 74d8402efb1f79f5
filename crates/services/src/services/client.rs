//! Typed Kivora REST client. One method per endpoint; every JSON answer goes
//! through the envelope before it is decoded.

use std::sync::Arc;

use bytes::Bytes;
use domain::models::{
    backlog::{BacklogItem, CreateBacklogItem, UpdateBacklogItem},
    cluster::{AddMember, Cluster, CreateCluster, UpdateCluster},
    event::{CreateEvent, Event, MarkAttendance, UpdateEvent},
    notification::{Notification, UpdateNotificationState},
    project::{CreateProject, Project, UpdateProject},
    sprint::{CreateSprint, Sprint, UpdateSprint},
    task::{ChangeTaskState, CreateTask, Task, TaskComment, UpdateTask},
    upload::FileUpload,
    user::{
        AuthSession, ChangePassword, DeleteAccount, LoginRequest, RegisterUser, UpdateProfile,
        User, UserSummary,
    },
};
use serde::de::DeserializeOwned;
use utils::response::Envelope;

use super::api::{ApiError, ApiRequest, MultipartForm, Transport};

fn seg(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

#[derive(Clone)]
pub struct KivoraClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for KivoraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KivoraClient").finish_non_exhaustive()
    }
}

impl KivoraClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        key: &str,
    ) -> Result<T, ApiError> {
        let body = self.transport.execute(request).await?;
        Ok(Envelope::new(body)?.take(key)?)
    }

    async fn acknowledge(&self, request: ApiRequest) -> Result<Option<String>, ApiError> {
        let body = self.transport.execute(request).await?;
        Ok(Envelope::new(body)?.acknowledge()?)
    }

    // auth

    pub async fn register(&self, user: &RegisterUser) -> Result<UserSummary, ApiError> {
        self.fetch(ApiRequest::post("auth/register").json(user)?, "userDetails")
            .await
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthSession, ApiError> {
        self.fetch(ApiRequest::post("auth/login").json(credentials)?, "userDetails")
            .await
    }

    // user

    pub async fn get_profile(&self) -> Result<User, ApiError> {
        self.fetch(ApiRequest::get("user/profile"), "user").await
    }

    pub async fn update_profile(&self, profile: &UpdateProfile) -> Result<User, ApiError> {
        self.fetch(ApiRequest::put("user/profile").json(profile)?, "user")
            .await
    }

    pub async fn change_password(
        &self,
        change: &ChangePassword,
    ) -> Result<Option<String>, ApiError> {
        self.acknowledge(ApiRequest::put("user/updatePassword").json(change)?)
            .await
    }

    pub async fn update_profile_picture(&self, image: FileUpload) -> Result<User, ApiError> {
        let form = MultipartForm::new().file("profilePicture", image);
        self.fetch(ApiRequest::put("user/profilePicture").multipart(form), "user")
            .await
    }

    pub async fn delete_account(&self, confirm: &DeleteAccount) -> Result<Option<String>, ApiError> {
        self.acknowledge(ApiRequest::delete("user/profile").json(confirm)?)
            .await
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, ApiError> {
        self.fetch(ApiRequest::get("user/search").query("query", query), "users")
            .await
    }

    // cluster

    pub async fn create_cluster(&self, cluster: &CreateCluster) -> Result<Cluster, ApiError> {
        let mut form = MultipartForm::new()
            .text("name", cluster.name.trim())
            .text_opt("description", cluster.description.as_deref().map(str::trim));
        if let Some(image) = &cluster.image {
            form = form.file("image", image.clone());
        }
        self.fetch(ApiRequest::post("cluster/").multipart(form), "cluster")
            .await
    }

    pub async fn list_clusters(&self) -> Result<Vec<Cluster>, ApiError> {
        self.fetch(ApiRequest::get("cluster/"), "clusters").await
    }

    pub async fn search_clusters(&self, query: &str) -> Result<Vec<Cluster>, ApiError> {
        self.fetch(ApiRequest::get("cluster/search").query("query", query), "clusters")
            .await
    }

    pub async fn get_cluster(&self, cluster_id: &str) -> Result<Cluster, ApiError> {
        self.fetch(ApiRequest::get(format!("cluster/{}", seg(cluster_id))), "cluster")
            .await
    }

    pub async fn update_cluster(
        &self,
        cluster_id: &str,
        update: &UpdateCluster,
    ) -> Result<Cluster, ApiError> {
        self.fetch(
            ApiRequest::put(format!("cluster/{}", seg(cluster_id))).json(update)?,
            "cluster",
        )
        .await
    }

    pub async fn add_member(&self, cluster_id: &str, member: &AddMember) -> Result<Cluster, ApiError> {
        self.fetch(
            ApiRequest::put(format!("cluster/{}/members", seg(cluster_id))).json(member)?,
            "cluster",
        )
        .await
    }

    pub async fn remove_member(&self, cluster_id: &str, user_id: &str) -> Result<Cluster, ApiError> {
        self.fetch(
            ApiRequest::delete(format!(
                "cluster/{}/members/{}",
                seg(cluster_id),
                seg(user_id)
            )),
            "cluster",
        )
        .await
    }

    pub async fn delete_cluster(&self, cluster_id: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(ApiRequest::delete(format!("cluster/{}", seg(cluster_id))))
            .await
    }

    // project

    pub async fn create_project(&self, project: &CreateProject) -> Result<Project, ApiError> {
        self.fetch(ApiRequest::post("project/").json(project)?, "project")
            .await
    }

    pub async fn list_projects(&self, cluster_id: &str) -> Result<Vec<Project>, ApiError> {
        self.fetch(
            ApiRequest::get(format!("project/cluster/{}", seg(cluster_id))),
            "projects",
        )
        .await
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Project, ApiError> {
        self.fetch(ApiRequest::get(format!("project/{}", seg(project_id))), "project")
            .await
    }

    pub async fn update_project(
        &self,
        project_id: &str,
        update: &UpdateProject,
    ) -> Result<Project, ApiError> {
        self.fetch(
            ApiRequest::put(format!("project/{}", seg(project_id))).json(update)?,
            "project",
        )
        .await
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(ApiRequest::delete(format!("project/{}", seg(project_id))))
            .await
    }

    // sprint

    pub async fn create_sprint(&self, sprint: &CreateSprint) -> Result<Sprint, ApiError> {
        self.fetch(ApiRequest::post("sprint/").json(sprint)?, "sprint")
            .await
    }

    pub async fn list_sprints(&self, project_id: &str) -> Result<Vec<Sprint>, ApiError> {
        self.fetch(
            ApiRequest::get(format!("sprint/project/{}", seg(project_id))),
            "sprints",
        )
        .await
    }

    pub async fn update_sprint(
        &self,
        sprint_id: &str,
        update: &UpdateSprint,
    ) -> Result<Sprint, ApiError> {
        self.fetch(
            ApiRequest::put(format!("sprint/{}", seg(sprint_id))).json(update)?,
            "sprint",
        )
        .await
    }

    pub async fn delete_sprint(&self, sprint_id: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(ApiRequest::delete(format!("sprint/{}", seg(sprint_id))))
            .await
    }

    // backlog

    pub async fn create_backlog_item(
        &self,
        item: &CreateBacklogItem,
    ) -> Result<BacklogItem, ApiError> {
        self.fetch(ApiRequest::post("backlog/").json(item)?, "backlog")
            .await
    }

    pub async fn list_backlog(&self, project_id: &str) -> Result<Vec<BacklogItem>, ApiError> {
        self.fetch(
            ApiRequest::get(format!("backlog/project/{}", seg(project_id))),
            "backlogs",
        )
        .await
    }

    pub async fn update_backlog_item(
        &self,
        item_id: &str,
        update: &UpdateBacklogItem,
    ) -> Result<BacklogItem, ApiError> {
        self.fetch(
            ApiRequest::put(format!("backlog/{}", seg(item_id))).json(update)?,
            "backlog",
        )
        .await
    }

    pub async fn delete_backlog_item(&self, item_id: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(ApiRequest::delete(format!("backlog/{}", seg(item_id))))
            .await
    }

    pub async fn export_backlog_pdf(&self, project_id: &str) -> Result<Bytes, ApiError> {
        self.transport
            .download(ApiRequest::get(format!(
                "backlog/exportBacklogToPDF/{}",
                seg(project_id)
            )))
            .await
    }

    // task

    pub async fn create_task(&self, task: &CreateTask) -> Result<Task, ApiError> {
        let mut form = MultipartForm::new()
            .text("title", task.title.trim())
            .text_opt("description", task.description.as_deref().map(str::trim))
            .text("assignedTo", task.assigned_to.as_str())
            .text("isUrgent", task.is_urgent.to_string())
            .text("sprint", task.sprint.as_str());
        for tag in &task.tags {
            form = form.text("tags", tag.as_str());
        }
        for file in &task.attachments {
            form = form.file("attachments", file.clone());
        }
        self.fetch(ApiRequest::post("task/").multipart(form), "task")
            .await
    }

    pub async fn list_tasks(&self, sprint_id: &str) -> Result<Vec<Task>, ApiError> {
        self.fetch(ApiRequest::get(format!("task/sprint/{}", seg(sprint_id))), "tasks")
            .await
    }

    pub async fn update_task(&self, task_id: &str, update: &UpdateTask) -> Result<Task, ApiError> {
        self.fetch(
            ApiRequest::put(format!("task/{}", seg(task_id))).json(update)?,
            "task",
        )
        .await
    }

    pub async fn change_task_state(
        &self,
        task_id: &str,
        change: &ChangeTaskState,
    ) -> Result<Task, ApiError> {
        self.fetch(
            ApiRequest::put(format!("task/{}/state", seg(task_id))).json(change)?,
            "task",
        )
        .await
    }

    pub async fn comment_task(&self, task_id: &str, comment: &TaskComment) -> Result<Task, ApiError> {
        self.fetch(
            ApiRequest::put(format!("task/{}/comment", seg(task_id))).json(comment)?,
            "task",
        )
        .await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(ApiRequest::delete(format!("task/{}", seg(task_id))))
            .await
    }

    // event

    pub async fn create_event(&self, event: &CreateEvent) -> Result<Event, ApiError> {
        self.fetch(ApiRequest::post("event/").json(event)?, "event")
            .await
    }

    pub async fn list_events(&self, sprint_id: &str) -> Result<Vec<Event>, ApiError> {
        self.fetch(ApiRequest::get(format!("event/sprint/{}", seg(sprint_id))), "events")
            .await
    }

    pub async fn update_event(&self, event_id: &str, update: &UpdateEvent) -> Result<Event, ApiError> {
        self.fetch(
            ApiRequest::put(format!("event/{}", seg(event_id))).json(update)?,
            "event",
        )
        .await
    }

    pub async fn mark_attendance(
        &self,
        event_id: &str,
        attendance: &MarkAttendance,
    ) -> Result<Event, ApiError> {
        self.fetch(
            ApiRequest::put(format!("event/{}/attendance", seg(event_id))).json(attendance)?,
            "event",
        )
        .await
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<Option<String>, ApiError> {
        self.acknowledge(ApiRequest::delete(format!("event/{}", seg(event_id))))
            .await
    }

    // notifications

    pub async fn list_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.fetch(ApiRequest::get("notifications/"), "notifications")
            .await
    }

    pub async fn update_notification_state(
        &self,
        notification_id: &str,
        update: &UpdateNotificationState,
    ) -> Result<Notification, ApiError> {
        self.fetch(
            ApiRequest::patch(format!("notifications/{}", seg(notification_id))).json(update)?,
            "notification",
        )
        .await
    }

    pub async fn mark_all_notifications_seen(&self) -> Result<Option<String>, ApiError> {
        self.acknowledge(ApiRequest::patch("notifications/markAllAsSeen"))
            .await
    }
}
