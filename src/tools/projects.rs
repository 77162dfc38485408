//! Projects (workgroups) and their membership (`sonet_group.*`).

use std::sync::Arc;

use serde_json::{json, Value};

use super::ListQuery;
use crate::client::{Params, Transport};
use crate::envelope::Envelope;
use crate::error::ToolError;
use crate::normalize::{apply_limit, non_empty, parse_object, parse_object_or_none};
use crate::response::ResponseShape;

/// Role assigned by `add_member` when the caller gives none.
pub const DEFAULT_ROLE: &str = "member";

#[derive(Clone)]
pub struct ProjectTools {
    client: Arc<dyn Transport>,
}

impl ProjectTools {
    pub fn new(client: Arc<dyn Transport>) -> Self {
        Self { client }
    }

    /// List projects. `sonet_group.get` is fetched page by page, so a
    /// caller-supplied order is rejected. `select` is not used.
    pub async fn list(&self, query: &ListQuery) -> Envelope {
        Envelope::settle(self.try_list(query).await, "getting projects")
    }

    async fn try_list(&self, query: &ListQuery) -> Result<Envelope, ToolError> {
        let mut params = Params::new();
        if let Some(filter) = parse_object_or_none(query.filter.as_deref(), "filter_params")? {
            if !filter.is_empty() {
                params.insert("FILTER".to_string(), Value::Object(filter));
            }
        }
        let order = parse_object_or_none(query.order.as_deref(), "order")?;
        if order.is_some_and(|o| !o.is_empty()) {
            return Err(ToolError::UnsupportedOrder { entity: "projects" });
        }

        let projects = apply_limit(
            self.client.get_all("sonet_group.get", params).await?,
            query.limit,
        );
        Ok(Envelope::ok()
            .with("total", projects.len())
            .with("count", projects.len())
            .with("projects", projects))
    }

    pub async fn create(&self, fields: &str) -> Envelope {
        Envelope::settle(self.try_create(fields).await, "creating project")
    }

    async fn try_create(&self, fields: &str) -> Result<Envelope, ToolError> {
        let fields = parse_object(fields, "fields")?;
        let response = self.client.call("sonet_group.create", fields).await?;
        let id = ResponseShape::classify(response).created_id(&[]);
        Ok(Envelope::created("project_id", id, "Project"))
    }

    /// Update a project. Keys in `fields` are sent alongside `GROUP_ID`
    /// and win over it.
    pub async fn update(&self, project_id: &str, fields: &str) -> Envelope {
        let operation = format!("updating project {}", project_id);
        Envelope::settle(self.try_update(project_id, fields).await, &operation)
    }

    async fn try_update(&self, project_id: &str, fields: &str) -> Result<Envelope, ToolError> {
        let fields = parse_object(fields, "fields")?;
        let mut params = group_params(project_id);
        params.extend(fields);

        let response = self.client.call("sonet_group.update", params).await?;
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("project_id", project_id)
            .with_message("Project updated successfully", "Failed to update project"))
    }

    pub async fn tasks(&self, project_id: &str, limit: i64) -> Envelope {
        let operation = format!("getting project tasks for {}", project_id);
        Envelope::settle(self.try_tasks(project_id, limit).await, &operation)
    }

    async fn try_tasks(&self, project_id: &str, limit: i64) -> Result<Envelope, ToolError> {
        let mut params = Params::new();
        params.insert("filter".to_string(), json!({ "GROUP_ID": project_id }));

        let tasks = apply_limit(self.client.get_all("tasks.task.list", params).await?, limit);
        Ok(Envelope::ok()
            .with("project_id", project_id)
            .with("count", tasks.len())
            .with("tasks", tasks))
    }

    pub async fn add_member(
        &self,
        project_id: &str,
        user_id: &str,
        role: Option<&str>,
    ) -> Envelope {
        let operation = format!("adding user {} to project {}", user_id, project_id);
        Envelope::settle(
            self.try_add_member(project_id, user_id, role).await,
            &operation,
        )
    }

    async fn try_add_member(
        &self,
        project_id: &str,
        user_id: &str,
        role: Option<&str>,
    ) -> Result<Envelope, ToolError> {
        let role = non_empty(role).unwrap_or(DEFAULT_ROLE);
        let mut params = member_params(project_id, user_id);
        params.insert("ROLE".to_string(), json!(role));

        let response = self.client.call("sonet_group.user.add", params).await?;
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("project_id", project_id)
            .with("user_id", user_id)
            .with("role", role)
            .with_message("Member added successfully", "Failed to add member"))
    }

    pub async fn members(&self, project_id: &str) -> Envelope {
        let operation = format!("getting project members for {}", project_id);
        Envelope::settle(self.try_members(project_id).await, &operation)
    }

    async fn try_members(&self, project_id: &str) -> Result<Envelope, ToolError> {
        let mut params = Params::new();
        params.insert("ID".to_string(), json!(project_id));

        let members = self.client.get_all("sonet_group.user.get", params).await?;
        Ok(Envelope::ok()
            .with("project_id", project_id)
            .with("count", members.len())
            .with("members", members))
    }

    pub async fn expel_member(&self, project_id: &str, user_id: &str) -> Envelope {
        let operation = format!("expelling user {} from project {}", user_id, project_id);
        Envelope::settle(self.try_expel_member(project_id, user_id).await, &operation)
    }

    async fn try_expel_member(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<Envelope, ToolError> {
        let response = self
            .client
            .call("sonet_group.user.expel", member_params(project_id, user_id))
            .await?;
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("project_id", project_id)
            .with("user_id", user_id)
            .with_message("Member expelled successfully", "Failed to expel member"))
    }

    pub async fn request_join(&self, project_id: &str, message: Option<&str>) -> Envelope {
        let operation = format!("requesting to join project {}", project_id);
        Envelope::settle(self.try_request_join(project_id, message).await, &operation)
    }

    async fn try_request_join(
        &self,
        project_id: &str,
        message: Option<&str>,
    ) -> Result<Envelope, ToolError> {
        let message = non_empty(message);
        let mut params = group_params(project_id);
        if let Some(text) = message {
            params.insert("MESSAGE".to_string(), json!(text));
        }

        let response = self.client.call("sonet_group.user.request", params).await?;
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("project_id", project_id)
            .with("request_message", message)
            .with_message("Join request sent successfully", "Failed to send join request"))
    }

    pub async fn invite(&self, project_id: &str, user_id: &str, message: Option<&str>) -> Envelope {
        let operation = format!("inviting user {} to project {}", user_id, project_id);
        Envelope::settle(
            self.try_invite(project_id, user_id, message).await,
            &operation,
        )
    }

    async fn try_invite(
        &self,
        project_id: &str,
        user_id: &str,
        message: Option<&str>,
    ) -> Result<Envelope, ToolError> {
        let message = non_empty(message);
        let mut params = member_params(project_id, user_id);
        if let Some(text) = message {
            params.insert("MESSAGE".to_string(), json!(text));
        }

        let response = self.client.call("sonet_group.user.invite", params).await?;
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("project_id", project_id)
            .with("user_id", user_id)
            .with("invitation_message", message)
            .with_message("Invitation sent successfully", "Failed to send invitation"))
    }
}

fn group_params(project_id: &str) -> Params {
    let mut params = Params::new();
    params.insert("GROUP_ID".to_string(), json!(project_id));
    params
}

fn member_params(project_id: &str, user_id: &str) -> Params {
    let mut params = group_params(project_id);
    params.insert("USER_ID".to_string(), json!(user_id));
    params
}
