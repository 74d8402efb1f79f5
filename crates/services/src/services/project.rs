use domain::models::{
    cluster::Cluster,
    project::{CreateProject, Project, UpdateProject},
};

use super::{
    client::KivoraClient,
    submission::{Collection, Slot, SubmitError, Submitter},
    toast::ToastService,
    validation::{Validate, forms::check_project_roles},
};

/// Projects of one cluster. Role assignments are checked against the
/// cluster's members before anything is sent.
#[derive(Debug, Clone)]
pub struct ProjectOrchestrator {
    client: KivoraClient,
    submitter: Submitter,
    projects: Collection<Project>,
    detail: Slot<Project>,
}

impl ProjectOrchestrator {
    pub fn new(client: KivoraClient, toasts: ToastService) -> Self {
        Self {
            client,
            submitter: Submitter::new(toasts),
            projects: Collection::new(),
            detail: Slot::new(),
        }
    }

    pub fn projects(&self) -> &Collection<Project> {
        &self.projects
    }

    pub fn detail(&self) -> &Slot<Project> {
        &self.detail
    }

    pub fn is_loading(&self) -> bool {
        self.submitter.gate().is_loading()
    }

    pub async fn load(&self, cluster_id: &str) -> Result<Vec<Project>, SubmitError> {
        let projects = self
            .submitter
            .fetch(self.client.list_projects(cluster_id))
            .await?;
        self.projects.replace(projects.clone());
        Ok(projects)
    }

    pub async fn open(&self, project_id: &str) -> Result<Project, SubmitError> {
        let project = self
            .submitter
            .fetch(self.client.get_project(project_id))
            .await?;
        self.detail.set(project.clone());
        Ok(project)
    }

    async fn reload(&self, cluster_id: &str) {
        if let Some(projects) = self
            .submitter
            .refresh("projects", self.client.list_projects(cluster_id))
            .await
        {
            self.projects.replace(projects);
        }
    }

    pub async fn create(
        &self,
        project: &CreateProject,
        cluster: &Cluster,
    ) -> Result<Project, SubmitError> {
        project.validate()?;
        check_project_roles(
            Some(&project.scrum_master),
            Some(&project.product_owner),
            cluster,
        )?;
        let created = self
            .submitter
            .submit("Project created", self.client.create_project(project))
            .await?;
        self.reload(&project.cluster).await;
        Ok(created)
    }

    pub async fn edit(
        &self,
        project_id: &str,
        update: &UpdateProject,
        cluster: &Cluster,
    ) -> Result<Project, SubmitError> {
        update.validate()?;
        check_project_roles(
            update.scrum_master.as_deref(),
            update.product_owner.as_deref(),
            cluster,
        )?;
        let updated = self
            .submitter
            .submit(
                "Project updated",
                self.client.update_project(project_id, update),
            )
            .await?;
        if self.detail.get().is_some_and(|open| open.id == project_id) {
            self.detail.set(updated.clone());
        }
        self.reload(&cluster.id).await;
        Ok(updated)
    }

    pub async fn delete(&self, project_id: &str, cluster_id: &str) -> Result<(), SubmitError> {
        self.submitter
            .submit("Project deleted", self.client.delete_project(project_id))
            .await?;
        self.reload(cluster_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use domain::models::project::{ProjectRole, ProjectType};
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::services::{
        test_support::FakeTransport, validation::ValidationErrorCode,
    };

    fn cluster() -> Cluster {
        serde_json::from_value(json!({
            "_id": "c1",
            "name": "Equipo",
            "members": [{"user": "sm", "role": "admin"}, {"user": "po"}]
        }))
        .unwrap()
    }

    fn payload(product_owner: &str) -> CreateProject {
        CreateProject {
            title: "Kivora".to_string(),
            description: None,
            project_type: ProjectType::Informatic,
            start_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
            scrum_master: "sm".to_string(),
            product_owner: product_owner.to_string(),
            cluster: "c1".to_string(),
        }
    }

    fn project_json() -> serde_json::Value {
        json!({
            "_id": "p1",
            "title": "Kivora",
            "type": "Informatic",
            "startDate": "2026-01-01T00:00:00Z",
            "endDate": "2026-06-01T00:00:00Z",
            "scrumMaster": {"_id": "sm", "username": "ana"},
            "productOwner": "po",
            "cluster": "c1"
        })
    }

    #[tokio::test]
    async fn test_outsider_product_owner_is_blocked() {
        let fake = FakeTransport::new();
        let projects = ProjectOrchestrator::new(KivoraClient::new(fake.clone()), ToastService::new());

        let err = projects
            .create(&payload("stranger"), &cluster())
            .await
            .unwrap_err();
        assert_eq!(err.validation().unwrap().code, ValidationErrorCode::NotMember);
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_reloads_cluster_projects() {
        let fake = FakeTransport::new();
        fake.respond(Method::POST, "project/", json!({"project": project_json()}));
        fake.respond(
            Method::GET,
            "project/cluster/c1",
            json!({"projects": [project_json()]}),
        );
        let projects = ProjectOrchestrator::new(KivoraClient::new(fake.clone()), ToastService::new());

        let created = projects.create(&payload("po"), &cluster()).await.unwrap();
        assert_eq!(created.role_of("sm"), ProjectRole::ScrumMaster);
        assert_eq!(created.role_of("po"), ProjectRole::ProductOwner);
        assert_eq!(fake.count(Method::GET, "project/cluster/c1"), 1);
        assert_eq!(projects.projects().len(), 1);
    }
}
