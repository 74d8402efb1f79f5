use bytes::Bytes;
use domain::models::backlog::{BacklogItem, CreateBacklogItem, UpdateBacklogItem};
use tracing::info;

use super::{
    client::KivoraClient,
    submission::{Collection, SubmitError, Submitter},
    toast::ToastService,
    validation::Validate,
};

/// Product backlog of one project at a time.
#[derive(Debug, Clone)]
pub struct BacklogOrchestrator {
    client: KivoraClient,
    submitter: Submitter,
    items: Collection<BacklogItem>,
}

impl BacklogOrchestrator {
    pub fn new(client: KivoraClient, toasts: ToastService) -> Self {
        Self {
            client,
            submitter: Submitter::new(toasts),
            items: Collection::new(),
        }
    }

    pub fn items(&self) -> &Collection<BacklogItem> {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.submitter.gate().is_loading()
    }

    pub async fn load(&self, project_id: &str) -> Result<Vec<BacklogItem>, SubmitError> {
        let items = self
            .submitter
            .fetch(self.client.list_backlog(project_id))
            .await?;
        self.items.replace(items.clone());
        Ok(items)
    }

    async fn reload(&self, project_id: &str) {
        if let Some(items) = self
            .submitter
            .refresh("backlog", self.client.list_backlog(project_id))
            .await
        {
            self.items.replace(items);
        }
    }

    pub async fn create(&self, item: &CreateBacklogItem) -> Result<BacklogItem, SubmitError> {
        item.validate()?;
        let created = self
            .submitter
            .submit(
                "Backlog item added",
                self.client.create_backlog_item(item),
            )
            .await?;
        info!(project = %item.project, item = %created.id, "Backlog item created");
        self.reload(&item.project).await;
        Ok(created)
    }

    pub async fn update(
        &self,
        item_id: &str,
        update: &UpdateBacklogItem,
    ) -> Result<BacklogItem, SubmitError> {
        update.validate()?;
        let updated = self
            .submitter
            .submit(
                "Backlog item updated",
                self.client.update_backlog_item(item_id, update),
            )
            .await?;
        self.reload(&updated.project).await;
        Ok(updated)
    }

    pub async fn delete(&self, item_id: &str, project_id: &str) -> Result<(), SubmitError> {
        self.submitter
            .submit(
                "Backlog item deleted",
                self.client.delete_backlog_item(item_id),
            )
            .await?;
        self.reload(project_id).await;
        Ok(())
    }

    /// PDF of the project's backlog, ready to be written to disk.
    pub async fn export_pdf(&self, project_id: &str) -> Result<Bytes, SubmitError> {
        self.submitter
            .submit(
                "Backlog exported",
                self.client.export_backlog_pdf(project_id),
            )
            .await
    }
}
