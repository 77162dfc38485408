//! Tasks and their lifecycle transitions (`tasks.task.*`).

use std::sync::Arc;

use serde_json::{json, Value};

use super::ListQuery;
use crate::client::{Params, Transport};
use crate::envelope::Envelope;
use crate::error::ToolError;
use crate::normalize::{apply_limit, parse_field_list, parse_object, parse_object_or_none};
use crate::response::ResponseShape;

/// Single-call lifecycle transitions on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Complete,
    Approve,
    Start,
    Renew,
    StartWatching,
    Disapprove,
}

impl TaskAction {
    pub fn method(self) -> &'static str {
        match self {
            TaskAction::Complete => "tasks.task.complete",
            TaskAction::Approve => "tasks.task.approve",
            TaskAction::Start => "tasks.task.start",
            TaskAction::Renew => "tasks.task.renew",
            TaskAction::StartWatching => "tasks.task.startwatch",
            TaskAction::Disapprove => "tasks.task.disapprove",
        }
    }

    fn messages(self) -> (&'static str, &'static str) {
        match self {
            TaskAction::Complete => ("Task completed successfully", "Failed to complete task"),
            TaskAction::Approve => ("Task approved successfully", "Failed to approve task"),
            TaskAction::Start => ("Task started successfully", "Failed to start task"),
            TaskAction::Renew => ("Task renewed successfully", "Failed to renew task"),
            TaskAction::StartWatching => (
                "Started watching task successfully",
                "Failed to start watching task",
            ),
            TaskAction::Disapprove => {
                ("Task disapproved successfully", "Failed to disapprove task")
            }
        }
    }

    fn verb(self) -> &'static str {
        match self {
            TaskAction::Complete => "completing",
            TaskAction::Approve => "approving",
            TaskAction::Start => "starting",
            TaskAction::Renew => "renewing",
            TaskAction::StartWatching => "starting to watch",
            TaskAction::Disapprove => "disapproving",
        }
    }
}

#[derive(Clone)]
pub struct TaskTools {
    client: Arc<dyn Transport>,
}

impl TaskTools {
    pub fn new(client: Arc<dyn Transport>) -> Self {
        Self { client }
    }

    /// List tasks. `tasks.task.list` is fetched page by page, so a
    /// caller-supplied order is rejected.
    pub async fn list(&self, query: &ListQuery) -> Envelope {
        Envelope::settle(self.try_list(query).await, "getting tasks")
    }

    async fn try_list(&self, query: &ListQuery) -> Result<Envelope, ToolError> {
        let mut params = Params::new();

        if let Some(filter) = parse_object_or_none(query.filter.as_deref(), "filter_params")? {
            if !filter.is_empty() {
                params.insert("filter".to_string(), Value::Object(filter));
            }
        }
        if let Some(select) = parse_field_list(query.select.as_deref()) {
            params.insert("select".to_string(), select.into());
        }
        let order = parse_object_or_none(query.order.as_deref(), "order")?;
        if order.is_some_and(|o| !o.is_empty()) {
            return Err(ToolError::UnsupportedOrder { entity: "tasks" });
        }

        let tasks = self.client.get_all("tasks.task.list", params).await?;
        Ok(Envelope::list("tasks", apply_limit(tasks, query.limit)))
    }

    pub async fn get(&self, task_id: &str) -> Envelope {
        let operation = format!("getting task {}", task_id);
        Envelope::settle(self.try_get(task_id).await, &operation)
    }

    async fn try_get(&self, task_id: &str) -> Result<Envelope, ToolError> {
        let response = self
            .client
            .call("tasks.task.get", task_params(task_id))
            .await?;
        match ResponseShape::classify(response).into_record() {
            Some(task) => Ok(Envelope::record("task", task)),
            None => Err(ToolError::not_found("Task", task_id)),
        }
    }

    /// Create a task. The new id is read from `task.id` of the response.
    pub async fn create(&self, fields: &str) -> Envelope {
        Envelope::settle(self.try_create(fields).await, "creating task")
    }

    async fn try_create(&self, fields: &str) -> Result<Envelope, ToolError> {
        let fields = parse_object(fields, "fields")?;
        let mut params = Params::new();
        params.insert("fields".to_string(), Value::Object(fields));

        let response = self.client.call("tasks.task.add", params).await?;
        let id = ResponseShape::classify(response).created_id(&["task", "id"]);
        Ok(Envelope::created("task_id", id, "Task"))
    }

    pub async fn update(&self, task_id: &str, fields: &str) -> Envelope {
        let operation = format!("updating task {}", task_id);
        Envelope::settle(self.try_update(task_id, fields).await, &operation)
    }

    async fn try_update(&self, task_id: &str, fields: &str) -> Result<Envelope, ToolError> {
        let fields = parse_object(fields, "fields")?;
        let mut params = task_params(task_id);
        params.insert("fields".to_string(), Value::Object(fields));

        let response = self.client.call("tasks.task.update", params).await?;
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("task_id", task_id)
            .with_message("Task updated successfully", "Failed to update task"))
    }

    /// Field metadata. `tasks.task.getFields` nests the mapping under `fields`.
    pub async fn fields(&self) -> Envelope {
        Envelope::settle(self.try_fields().await, "getting task fields")
    }

    async fn try_fields(&self) -> Result<Envelope, ToolError> {
        let response = self
            .client
            .call("tasks.task.getFields", Params::new())
            .await?;
        let fields = match ResponseShape::classify(response).into_value() {
            Some(Value::Object(mut obj)) if obj.get("fields").is_some_and(Value::is_object) => {
                obj.remove("fields").unwrap_or_else(|| json!({}))
            }
            Some(other) => other,
            None => json!({}),
        };
        Ok(Envelope::record("fields", fields))
    }

    pub async fn perform(&self, action: TaskAction, task_id: &str) -> Envelope {
        let operation = format!("{} task {}", action.verb(), task_id);
        Envelope::settle(self.try_perform(action, task_id).await, &operation)
    }

    async fn try_perform(&self, action: TaskAction, task_id: &str) -> Result<Envelope, ToolError> {
        let response = self.client.call(action.method(), task_params(task_id)).await?;
        let (succeeded, failed) = action.messages();
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("task_id", task_id)
            .with_message(succeeded, failed))
    }

    pub async fn delegate(&self, task_id: &str, user_id: &str) -> Envelope {
        let operation = format!("delegating task {} to user {}", task_id, user_id);
        Envelope::settle(self.try_delegate(task_id, user_id).await, &operation)
    }

    async fn try_delegate(&self, task_id: &str, user_id: &str) -> Result<Envelope, ToolError> {
        let mut params = task_params(task_id);
        params.insert("userId".to_string(), json!(user_id));

        let response = self.client.call("tasks.task.delegate", params).await?;
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("task_id", task_id)
            .with("user_id", user_id)
            .with_message("Task delegated successfully", "Failed to delegate task"))
    }
}

fn task_params(task_id: &str) -> Params {
    let mut params = Params::new();
    params.insert("taskId".to_string(), json!(task_id));
    params
}
