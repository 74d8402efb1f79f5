use domain::models::task::{ChangeTaskState, CreateTask, Task, TaskComment, TaskState, UpdateTask};

use super::{
    client::KivoraClient,
    submission::{Collection, SubmitError, Submitter},
    toast::ToastService,
    validation::Validate,
};

/// Tasks of one sprint.
#[derive(Debug, Clone)]
pub struct TaskOrchestrator {
    client: KivoraClient,
    submitter: Submitter,
    tasks: Collection<Task>,
}

impl TaskOrchestrator {
    pub fn new(client: KivoraClient, toasts: ToastService) -> Self {
        Self {
            client,
            submitter: Submitter::new(toasts),
            tasks: Collection::new(),
        }
    }

    pub fn tasks(&self) -> &Collection<Task> {
        &self.tasks
    }

    pub fn is_loading(&self) -> bool {
        self.submitter.gate().is_loading()
    }

    pub async fn load(&self, sprint_id: &str) -> Result<Vec<Task>, SubmitError> {
        let tasks = self.submitter.fetch(self.client.list_tasks(sprint_id)).await?;
        self.tasks.replace(tasks.clone());
        Ok(tasks)
    }

    async fn reload(&self, sprint_id: &str) {
        if let Some(tasks) = self
            .submitter
            .refresh("tasks", self.client.list_tasks(sprint_id))
            .await
        {
            self.tasks.replace(tasks);
        }
    }

    pub async fn create(&self, task: &CreateTask) -> Result<Task, SubmitError> {
        task.validate()?;
        let created = self
            .submitter
            .submit("Task created", self.client.create_task(task))
            .await?;
        self.reload(&task.sprint).await;
        Ok(created)
    }

    pub async fn edit(&self, task_id: &str, update: &UpdateTask) -> Result<Task, SubmitError> {
        update.validate()?;
        let updated = self
            .submitter
            .submit("Task updated", self.client.update_task(task_id, update))
            .await?;
        self.reload(&updated.sprint).await;
        Ok(updated)
    }

    pub async fn change_state(&self, task_id: &str, state: TaskState) -> Result<Task, SubmitError> {
        let updated = self
            .submitter
            .submit(
                "Task state updated",
                self.client
                    .change_task_state(task_id, &ChangeTaskState { state }),
            )
            .await?;
        self.reload(&updated.sprint).await;
        Ok(updated)
    }

    pub async fn comment(&self, task_id: &str, comment: &TaskComment) -> Result<Task, SubmitError> {
        comment.validate()?;
        let updated = self
            .submitter
            .submit("Comment saved", self.client.comment_task(task_id, comment))
            .await?;
        self.reload(&updated.sprint).await;
        Ok(updated)
    }

    pub async fn delete(&self, task_id: &str, sprint_id: &str) -> Result<(), SubmitError> {
        self.submitter
            .submit("Task deleted", self.client.delete_task(task_id))
            .await?;
        self.reload(sprint_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use domain::models::upload::FileUpload;
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::services::{test_support::FakeTransport, validation::ValidationErrorCode};

    fn task_json(state: &str) -> serde_json::Value {
        json!({"_id": "t1", "title": "API", "assignedTo": "u1", "state": state, "sprint": "s1"})
    }

    #[tokio::test]
    async fn test_fifth_attachment_is_rejected() {
        let fake = FakeTransport::new();
        let tasks = TaskOrchestrator::new(KivoraClient::new(fake.clone()), ToastService::new());
        let task = CreateTask {
            title: "API".to_string(),
            assigned_to: "u1".to_string(),
            sprint: "s1".to_string(),
            attachments: (0..5)
                .map(|i| FileUpload::new(format!("{i}.txt"), "text/plain", vec![0u8]))
                .collect(),
            ..Default::default()
        };

        let err = tasks.create(&task).await.unwrap_err();
        assert_eq!(err.validation().unwrap().code, ValidationErrorCode::TooMany);
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_change_state_reloads_sprint_tasks() {
        let fake = FakeTransport::new();
        fake.respond(Method::PUT, "task/t1/state", json!({"task": task_json("In Review")}));
        fake.respond(
            Method::GET,
            "task/sprint/s1",
            json!({"tasks": [task_json("In Review")]}),
        );
        let tasks = TaskOrchestrator::new(KivoraClient::new(fake.clone()), ToastService::new());

        let updated = tasks.change_state("t1", TaskState::InReview).await.unwrap();
        assert_eq!(updated.state, TaskState::InReview);
        assert_eq!(fake.count(Method::GET, "task/sprint/s1"), 1);
        assert_eq!(tasks.tasks().get("t1").unwrap().state, TaskState::InReview);
    }
}
