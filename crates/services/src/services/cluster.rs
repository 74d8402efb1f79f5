use domain::models::cluster::{AddMember, Cluster, CreateCluster, UpdateCluster};
use tracing::info;

use super::{
    client::KivoraClient,
    submission::{Collection, Slot, SubmitError, Submitter},
    toast::ToastService,
    validation::Validate,
};

/// The user's groups plus the one currently opened.
#[derive(Debug, Clone)]
pub struct ClusterOrchestrator {
    client: KivoraClient,
    submitter: Submitter,
    clusters: Collection<Cluster>,
    detail: Slot<Cluster>,
}

impl ClusterOrchestrator {
    pub fn new(client: KivoraClient, toasts: ToastService) -> Self {
        Self {
            client,
            submitter: Submitter::new(toasts),
            clusters: Collection::new(),
            detail: Slot::new(),
        }
    }

    pub fn clusters(&self) -> &Collection<Cluster> {
        &self.clusters
    }

    pub fn detail(&self) -> &Slot<Cluster> {
        &self.detail
    }

    pub fn is_loading(&self) -> bool {
        self.submitter.gate().is_loading()
    }

    pub async fn load(&self) -> Result<Vec<Cluster>, SubmitError> {
        let clusters = self.submitter.fetch(self.client.list_clusters()).await?;
        self.clusters.replace(clusters.clone());
        Ok(clusters)
    }

    /// Search results are returned, not cached.
    pub async fn search(&self, query: &str) -> Result<Vec<Cluster>, SubmitError> {
        self.submitter
            .fetch(self.client.search_clusters(query.trim()))
            .await
    }

    pub async fn open(&self, cluster_id: &str) -> Result<Cluster, SubmitError> {
        let cluster = self.submitter.fetch(self.client.get_cluster(cluster_id)).await?;
        self.detail.set(cluster.clone());
        Ok(cluster)
    }

    async fn reload_list(&self) {
        if let Some(clusters) = self
            .submitter
            .refresh("clusters", self.client.list_clusters())
            .await
        {
            self.clusters.replace(clusters);
        }
    }

    async fn reload_detail(&self, cluster_id: &str) {
        if let Some(cluster) = self
            .submitter
            .refresh("cluster detail", self.client.get_cluster(cluster_id))
            .await
        {
            self.detail.set(cluster);
        }
    }

    pub async fn create(&self, cluster: &CreateCluster) -> Result<Cluster, SubmitError> {
        cluster.validate()?;
        let created = self
            .submitter
            .submit("Group created", self.client.create_cluster(cluster))
            .await?;
        info!(cluster = %created.id, "Cluster created");
        self.reload_list().await;
        Ok(created)
    }

    pub async fn edit(
        &self,
        cluster_id: &str,
        update: &UpdateCluster,
    ) -> Result<Cluster, SubmitError> {
        update.validate()?;
        let updated = self
            .submitter
            .submit("Group updated", self.client.update_cluster(cluster_id, update))
            .await?;
        self.reload_detail(cluster_id).await;
        self.reload_list().await;
        Ok(updated)
    }

    /// Save only the description, then refresh the opened group.
    pub async fn save_description(
        &self,
        cluster_id: &str,
        description: &str,
    ) -> Result<Cluster, SubmitError> {
        let update = UpdateCluster {
            description: Some(description.trim().to_string()),
            ..Default::default()
        };
        update.validate()?;
        let updated = self
            .submitter
            .submit(
                "Description saved",
                self.client.update_cluster(cluster_id, &update),
            )
            .await?;
        self.reload_detail(cluster_id).await;
        Ok(updated)
    }

    pub async fn add_member(&self, cluster_id: &str, user_id: &str) -> Result<Cluster, SubmitError> {
        let member = AddMember {
            user_id: user_id.to_string(),
        };
        let updated = self
            .submitter
            .submit("Member added", self.client.add_member(cluster_id, &member))
            .await?;
        self.reload_detail(cluster_id).await;
        Ok(updated)
    }

    pub async fn remove_member(
        &self,
        cluster_id: &str,
        user_id: &str,
    ) -> Result<Cluster, SubmitError> {
        let updated = self
            .submitter
            .submit(
                "Member removed",
                self.client.remove_member(cluster_id, user_id),
            )
            .await?;
        self.reload_detail(cluster_id).await;
        Ok(updated)
    }

    /// Only the owner may delete a group; anyone else is refused locally.
    pub async fn delete(&self, cluster: &Cluster, current_user_id: &str) -> Result<(), SubmitError> {
        if !cluster.is_owner(current_user_id) {
            return Err(SubmitError::Forbidden(
                "only the group owner can delete it".to_string(),
            ));
        }
        self.submitter
            .submit("Group deleted", self.client.delete_cluster(&cluster.id))
            .await?;
        if self.detail.get().is_some_and(|open| open.id == cluster.id) {
            self.detail.clear();
        }
        self.reload_list().await;
        Ok(())
    }
}
