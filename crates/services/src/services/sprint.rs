use domain::models::{
    backlog::BacklogItem,
    sprint::{CreateSprint, Sprint, UpdateSprint},
};

use super::{
    client::KivoraClient,
    submission::{Collection, SubmitError, Submitter},
    toast::ToastService,
    validation::{Validate, forms::check_sprint_backlog},
};

#[derive(Debug, Clone)]
pub struct SprintOrchestrator {
    client: KivoraClient,
    submitter: Submitter,
    sprints: Collection<Sprint>,
}

impl SprintOrchestrator {
    pub fn new(client: KivoraClient, toasts: ToastService) -> Self {
        Self {
            client,
            submitter: Submitter::new(toasts),
            sprints: Collection::new(),
        }
    }

    pub fn sprints(&self) -> &Collection<Sprint> {
        &self.sprints
    }

    pub fn is_loading(&self) -> bool {
        self.submitter.gate().is_loading()
    }

    pub async fn load(&self, project_id: &str) -> Result<Vec<Sprint>, SubmitError> {
        let sprints = self
            .submitter
            .fetch(self.client.list_sprints(project_id))
            .await?;
        self.sprints.replace(sprints.clone());
        Ok(sprints)
    }

    async fn reload(&self, project_id: &str) {
        if let Some(sprints) = self
            .submitter
            .refresh("sprints", self.client.list_sprints(project_id))
            .await
        {
            self.sprints.replace(sprints);
        }
    }

    /// `backlog` is the project's current backlog; selected items must be
    /// pending in it.
    pub async fn create(
        &self,
        sprint: &CreateSprint,
        backlog: &[BacklogItem],
    ) -> Result<Sprint, SubmitError> {
        sprint.validate()?;
        check_sprint_backlog(&sprint.backlog_items, backlog)?;
        let created = self
            .submitter
            .submit("Sprint created", self.client.create_sprint(sprint))
            .await?;
        self.reload(&sprint.project).await;
        Ok(created)
    }

    pub async fn edit(
        &self,
        sprint_id: &str,
        update: &UpdateSprint,
        backlog: &[BacklogItem],
    ) -> Result<Sprint, SubmitError> {
        update.validate()?;
        if let Some(selected) = &update.backlog_items {
            // Items already in this sprint are no longer pending.
            let current = self.sprints.get(sprint_id);
            let added: Vec<String> = selected
                .iter()
                .filter(|id| {
                    !current
                        .as_ref()
                        .is_some_and(|s| s.backlog_items.iter().any(|b| b.id() == id.as_str()))
                })
                .cloned()
                .collect();
            check_sprint_backlog(&added, backlog)?;
        }
        let updated = self
            .submitter
            .submit("Sprint updated", self.client.update_sprint(sprint_id, update))
            .await?;
        self.reload(&updated.project).await;
        Ok(updated)
    }

    pub async fn delete(&self, sprint_id: &str, project_id: &str) -> Result<(), SubmitError> {
        self.submitter
            .submit("Sprint deleted", self.client.delete_sprint(sprint_id))
            .await?;
        self.reload(project_id).await;
        Ok(())
    }
}
