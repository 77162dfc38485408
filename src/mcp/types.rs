//! Request types for MCP tools.
//!
//! Structured values travel as JSON text. Optional strings default to empty,
//! which the tool groups treat the same as absent.

use rmcp::schemars::JsonSchema;
use serde::Deserialize;

use crate::tools::{EventQuery, ListQuery, NearestEventsQuery, DEFAULT_LIMIT};

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

fn default_calendar_type() -> String {
    "user".to_string()
}

fn default_days() -> i64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_role() -> String {
    "member".to_string()
}

fn optional(raw: String) -> Option<String> {
    (!raw.trim().is_empty()).then_some(raw)
}

// ============================================================
// Shared
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListRecordsRequest {
    #[schemars(description = "JSON object with filter conditions, e.g. '{\"STATUS_ID\": \"NEW\"}'")]
    #[serde(default)]
    pub filter_params: String,
    #[schemars(description = "Comma-separated field names, e.g. 'ID,TITLE,NAME'")]
    #[serde(default)]
    pub select_fields: String,
    #[schemars(
        description = "JSON object with sort conditions, e.g. '{\"DATE_CREATE\": \"DESC\"}'. Only contacts support ordering; other entities return an error when it is set"
    )]
    #[serde(default)]
    pub order: String,
    #[schemars(description = "Maximum number of records to return (default: 50, 0 = all)")]
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl From<ListRecordsRequest> for ListQuery {
    fn from(req: ListRecordsRequest) -> Self {
        ListQuery {
            filter: optional(req.filter_params),
            select: optional(req.select_fields),
            order: optional(req.order),
            limit: req.limit,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateRecordRequest {
    #[schemars(description = "JSON object with the field values of the new record")]
    pub fields: String,
}

// ============================================================
// CRM
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LeadIdRequest {
    #[schemars(description = "Lead ID")]
    pub lead_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateLeadRequest {
    #[schemars(description = "Lead ID to update")]
    pub lead_id: String,
    #[schemars(description = "JSON object with fields to update, e.g. '{\"STATUS_ID\": \"IN_PROCESS\"}'")]
    pub fields: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DealIdRequest {
    #[schemars(description = "Deal ID")]
    pub deal_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateDealRequest {
    #[schemars(description = "Deal ID to update")]
    pub deal_id: String,
    #[schemars(description = "JSON object with fields to update, e.g. '{\"STAGE_ID\": \"WON\"}'")]
    pub fields: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ContactIdRequest {
    #[schemars(description = "Contact ID")]
    pub contact_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateContactRequest {
    #[schemars(description = "Contact ID to update")]
    pub contact_id: String,
    #[schemars(description = "JSON object with fields to update")]
    pub fields: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompanyIdRequest {
    #[schemars(description = "Company ID")]
    pub company_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateCompanyRequest {
    #[schemars(description = "Company ID to update")]
    pub company_id: String,
    #[schemars(description = "JSON object with fields to update")]
    pub fields: String,
}

// ============================================================
// Tasks
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TaskIdRequest {
    #[schemars(description = "Task ID")]
    pub task_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTaskRequest {
    #[schemars(description = "Task ID to update")]
    pub task_id: String,
    #[schemars(description = "JSON object with fields to update, e.g. '{\"STATUS\": \"5\"}'")]
    pub fields: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DelegateTaskRequest {
    #[schemars(description = "Task ID to delegate")]
    pub task_id: String,
    #[schemars(description = "User ID of the new responsible person")]
    pub user_id: String,
}

// ============================================================
// Calendar
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalendarEventsRequest {
    #[schemars(description = "JSON object with filter conditions, e.g. '{\"type\": \"user\", \"ownerId\": 1}'")]
    #[serde(default)]
    pub filter_params: String,
    #[schemars(description = "Start date (YYYY-MM-DD)")]
    #[serde(default)]
    pub date_from: String,
    #[schemars(description = "End date (YYYY-MM-DD)")]
    #[serde(default)]
    pub date_to: String,
    #[schemars(description = "Maximum number of events to return (default: 50, 0 = all)")]
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[schemars(description = "JSON list or comma-separated calendar section IDs")]
    #[serde(default)]
    pub sections: String,
}

impl From<CalendarEventsRequest> for EventQuery {
    fn from(req: CalendarEventsRequest) -> Self {
        EventQuery {
            filter: optional(req.filter_params),
            date_from: optional(req.date_from),
            date_to: optional(req.date_to),
            limit: req.limit,
            sections: optional(req.sections),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EventIdRequest {
    #[schemars(description = "Calendar event ID")]
    pub event_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateEventRequest {
    #[schemars(description = "Calendar event ID to update")]
    pub event_id: String,
    #[schemars(description = "JSON object with fields to update, e.g. '{\"name\": \"Updated Event\"}'")]
    pub fields: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalendarListRequest {
    #[schemars(description = "JSON object with section parameters, e.g. '{\"type\": \"user\", \"ownerId\": 1}'")]
    #[serde(default)]
    pub filter_params: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NearestEventsRequest {
    #[schemars(description = "Calendar type: 'user', 'group' or 'company_calendar' (default: user)")]
    #[serde(default = "default_calendar_type")]
    pub calendar_type: String,
    #[schemars(description = "Calendar owner ID (user or group ID)")]
    #[serde(default)]
    pub owner_id: String,
    #[schemars(description = "Number of days to look ahead (default: 60)")]
    #[serde(default = "default_days")]
    pub days: i64,
    #[schemars(description = "Only events of the current user (default: true)")]
    #[serde(default = "default_true")]
    pub for_current_user: bool,
    #[schemars(description = "Maximum number of events (0 = no limit)")]
    #[serde(default)]
    pub max_events_count: i64,
    #[schemars(description = "Calendar detail URL template")]
    #[serde(default)]
    pub detail_url: String,
}

impl From<NearestEventsRequest> for NearestEventsQuery {
    fn from(req: NearestEventsRequest) -> Self {
        NearestEventsQuery {
            calendar_type: req.calendar_type,
            owner_id: optional(req.owner_id),
            days: req.days,
            for_current_user: req.for_current_user,
            max_events_count: req.max_events_count,
            detail_url: optional(req.detail_url),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetMeetingStatusRequest {
    #[schemars(description = "Calendar event ID")]
    pub event_id: String,
    #[schemars(description = "Participation status: 'Y' (accept), 'N' (decline) or 'Q' (pending)")]
    pub status: String,
}

// ============================================================
// Projects
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListProjectsRequest {
    #[schemars(description = "JSON object with filter conditions, e.g. '{\"ACTIVE\": \"Y\"}'")]
    #[serde(default)]
    pub filter_params: String,
    #[schemars(description = "Not supported for projects; leave empty")]
    #[serde(default)]
    pub order: String,
    #[schemars(description = "Maximum number of projects to return (default: 50, 0 = all)")]
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl From<ListProjectsRequest> for ListQuery {
    fn from(req: ListProjectsRequest) -> Self {
        ListQuery {
            filter: optional(req.filter_params),
            select: None,
            order: optional(req.order),
            limit: req.limit,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectIdRequest {
    #[schemars(description = "Project (workgroup) ID")]
    pub project_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateProjectRequest {
    #[schemars(description = "Project ID to update")]
    pub project_id: String,
    #[schemars(description = "JSON object with fields to update, e.g. '{\"NAME\": \"Renamed\"}'")]
    pub fields: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectTasksRequest {
    #[schemars(description = "Project ID")]
    pub project_id: String,
    #[schemars(description = "Maximum number of tasks to return (default: 50, 0 = all)")]
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddProjectMemberRequest {
    #[schemars(description = "Project ID")]
    pub project_id: String,
    #[schemars(description = "User ID to add")]
    pub user_id: String,
    #[schemars(description = "Role of the new member (default: member)")]
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectMemberRequest {
    #[schemars(description = "Project ID")]
    pub project_id: String,
    #[schemars(description = "User ID")]
    pub user_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RequestJoinProjectRequest {
    #[schemars(description = "Project ID to join")]
    pub project_id: String,
    #[schemars(description = "Message sent with the request")]
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InviteProjectMemberRequest {
    #[schemars(description = "Project ID")]
    pub project_id: String,
    #[schemars(description = "User ID to invite")]
    pub user_id: String,
    #[schemars(description = "Personal message sent with the invitation")]
    #[serde(default)]
    pub message: String,
}
