//! MCP server exposing the Bitrix24 tool groups.

mod types;

use std::sync::Arc;

pub use types::*;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo, Tool},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};

use crate::config::McpConfig;
use crate::envelope::Envelope;
use crate::tools::{AppContext, EventQuery, ListQuery, NearestEventsQuery, TaskAction};

#[derive(Clone)]
pub struct BitrixMcpServer {
    context: Arc<AppContext>,
    server_name: String,
    tool_router: ToolRouter<Self>,
}

impl BitrixMcpServer {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self::with_name(context, McpConfig::default().server_name)
    }

    pub fn with_name(context: Arc<AppContext>, server_name: impl Into<String>) -> Self {
        Self {
            context,
            server_name: server_name.into(),
            tool_router: Self::tool_router(),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Every registered tool with its title, description and schema.
    pub fn tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    /// Names of every registered tool.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }
}

/// Render an envelope as a tool result. Failure envelopes are flagged as
/// errors but carry the same JSON text.
fn respond(envelope: Envelope) -> Result<CallToolResult, McpError> {
    let text = envelope.to_json();
    if envelope.is_success() {
        Ok(CallToolResult::success(vec![Content::text(text)]))
    } else {
        Ok(CallToolResult::error(vec![Content::text(text)]))
    }
}

#[tool_router]
impl BitrixMcpServer {
    // ============================================================
    // Leads
    // ============================================================

    #[tool(
        title = "Get Leads",
        description = "Retrieve Bitrix24 leads with optional filters. Example: get_leads(filter_params='{\"STATUS_ID\": \"NEW\"}', select_fields='ID,TITLE,NAME', limit=10). Ordering is not supported for leads. Returns JSON with success, count and leads."
    )]
    pub async fn get_leads(
        &self,
        params: Parameters<ListRecordsRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.leads.list(&ListQuery::from(params.0)).await)
    }

    #[tool(
        title = "Get Lead",
        description = "Retrieve a single Bitrix24 lead by ID. Returns JSON with success and lead, or an error when the lead does not exist."
    )]
    pub async fn get_lead(
        &self,
        params: Parameters<LeadIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.leads.get(&params.0.lead_id).await)
    }

    #[tool(
        title = "Create Lead",
        description = "Create a new Bitrix24 lead. fields is a JSON object and must include TITLE, e.g. '{\"TITLE\": \"ИП Титов\", \"NAME\": \"Глеб\", \"STATUS_ID\": \"NEW\"}'. Returns JSON with lead_id."
    )]
    pub async fn create_lead(
        &self,
        params: Parameters<CreateRecordRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.leads.create(&params.0.fields).await)
    }

    #[tool(
        title = "Update Lead",
        description = "Update an existing Bitrix24 lead. Example: update_lead(lead_id=\"123\", fields='{\"STATUS_ID\": \"IN_PROCESS\"}')."
    )]
    pub async fn update_lead(
        &self,
        params: Parameters<UpdateLeadRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(self.context.leads.update(&req.lead_id, &req.fields).await)
    }

    #[tool(
        title = "Get Lead Fields",
        description = "Retrieve metadata about available Bitrix24 lead fields."
    )]
    pub async fn get_lead_fields(&self) -> Result<CallToolResult, McpError> {
        respond(self.context.leads.fields().await)
    }

    // ============================================================
    // Deals
    // ============================================================

    #[tool(
        title = "Get Deals",
        description = "List Bitrix24 deals with optional filters. Example: get_deals(filter_params='{\"STAGE_ID\": \"NEW\"}', select_fields='ID,TITLE,OPPORTUNITY', limit=10). Ordering is not supported for deals."
    )]
    pub async fn get_deals(
        &self,
        params: Parameters<ListRecordsRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.deals.list(&ListQuery::from(params.0)).await)
    }

    #[tool(
        title = "Get Deal",
        description = "Retrieve a single Bitrix24 deal by ID."
    )]
    pub async fn get_deal(
        &self,
        params: Parameters<DealIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.deals.get(&params.0.deal_id).await)
    }

    #[tool(
        title = "Create Deal",
        description = "Create a new Bitrix24 deal, e.g. fields='{\"TITLE\": \"Новая сделка\", \"STAGE_ID\": \"PREPARATION\", \"OPPORTUNITY\": 100000}'. Returns JSON with deal_id."
    )]
    pub async fn create_deal(
        &self,
        params: Parameters<CreateRecordRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.deals.create(&params.0.fields).await)
    }

    #[tool(
        title = "Update Deal",
        description = "Update an existing Bitrix24 deal. Example: update_deal(deal_id=\"123\", fields='{\"STAGE_ID\": \"WON\"}')."
    )]
    pub async fn update_deal(
        &self,
        params: Parameters<UpdateDealRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(self.context.deals.update(&req.deal_id, &req.fields).await)
    }

    #[tool(
        title = "Get Deal Fields",
        description = "Retrieve metadata about available Bitrix24 deal fields."
    )]
    pub async fn get_deal_fields(&self) -> Result<CallToolResult, McpError> {
        respond(self.context.deals.fields().await)
    }

    // ============================================================
    // Contacts
    // ============================================================

    #[tool(
        title = "Get Contacts",
        description = "List Bitrix24 contacts with optional filters and ordering. Example: get_contacts(filter_params='{\"HAS_EMAIL\": \"Y\"}', order='{\"DATE_CREATE\": \"DESC\"}', limit=10)."
    )]
    pub async fn get_contacts(
        &self,
        params: Parameters<ListRecordsRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.contacts.list(&ListQuery::from(params.0)).await)
    }

    #[tool(
        title = "Get Contact",
        description = "Retrieve a single Bitrix24 contact by ID."
    )]
    pub async fn get_contact(
        &self,
        params: Parameters<ContactIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.contacts.get(&params.0.contact_id).await)
    }

    #[tool(
        title = "Create Contact",
        description = "Create a new Bitrix24 contact, e.g. fields='{\"NAME\": \"John\", \"LAST_NAME\": \"Doe\", \"EMAIL\": [{\"VALUE\": \"john@example.com\", \"VALUE_TYPE\": \"WORK\"}]}'. Returns JSON with contact_id."
    )]
    pub async fn create_contact(
        &self,
        params: Parameters<CreateRecordRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.contacts.create(&params.0.fields).await)
    }

    #[tool(
        title = "Update Contact",
        description = "Update an existing Bitrix24 contact."
    )]
    pub async fn update_contact(
        &self,
        params: Parameters<UpdateContactRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(self.context.contacts.update(&req.contact_id, &req.fields).await)
    }

    #[tool(
        title = "Get Contact Fields",
        description = "Retrieve metadata about available Bitrix24 contact fields."
    )]
    pub async fn get_contact_fields(&self) -> Result<CallToolResult, McpError> {
        respond(self.context.contacts.fields().await)
    }

    // ============================================================
    // Companies
    // ============================================================

    #[tool(
        title = "Get Companies",
        description = "List Bitrix24 companies with optional filters. Example: get_companies(filter_params='{\"INDUSTRY\": \"IT\"}', select_fields='ID,TITLE', limit=10). Ordering is not supported for companies."
    )]
    pub async fn get_companies(
        &self,
        params: Parameters<ListRecordsRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.companies.list(&ListQuery::from(params.0)).await)
    }

    #[tool(
        title = "Get Company",
        description = "Retrieve a single Bitrix24 company by ID."
    )]
    pub async fn get_company(
        &self,
        params: Parameters<CompanyIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.companies.get(&params.0.company_id).await)
    }

    #[tool(
        title = "Create Company",
        description = "Create a new Bitrix24 company, e.g. fields='{\"TITLE\": \"ACME\"}'. Returns JSON with company_id."
    )]
    pub async fn create_company(
        &self,
        params: Parameters<CreateRecordRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.companies.create(&params.0.fields).await)
    }

    #[tool(
        title = "Update Company",
        description = "Update an existing Bitrix24 company."
    )]
    pub async fn update_company(
        &self,
        params: Parameters<UpdateCompanyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(self.context.companies.update(&req.company_id, &req.fields).await)
    }

    #[tool(
        title = "Get Company Fields",
        description = "Retrieve metadata about available Bitrix24 company fields."
    )]
    pub async fn get_company_fields(&self) -> Result<CallToolResult, McpError> {
        respond(self.context.companies.fields().await)
    }

    // ============================================================
    // Tasks
    // ============================================================

    #[tool(
        title = "Get Tasks",
        description = "List Bitrix24 tasks with optional filters. Example: get_tasks(filter_params='{\"STATUS\": \"2\"}', select_fields='ID,TITLE,RESPONSIBLE_ID', limit=10). Ordering is not supported for tasks."
    )]
    pub async fn get_tasks(
        &self,
        params: Parameters<ListRecordsRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.tasks.list(&ListQuery::from(params.0)).await)
    }

    #[tool(
        title = "Get Task by ID",
        description = "Retrieve a Bitrix24 task by ID with all its fields."
    )]
    pub async fn get_task_by_id(
        &self,
        params: Parameters<TaskIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.tasks.get(&params.0.task_id).await)
    }

    #[tool(
        title = "Create Task",
        description = "Create a new Bitrix24 task. fields must include TITLE and RESPONSIBLE_ID, e.g. '{\"TITLE\": \"Подготовить отчет\", \"RESPONSIBLE_ID\": 1, \"DEADLINE\": \"2024-12-31T23:59:59\"}'. Returns JSON with task_id."
    )]
    pub async fn create_task(
        &self,
        params: Parameters<CreateRecordRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.tasks.create(&params.0.fields).await)
    }

    #[tool(
        title = "Update Task",
        description = "Update an existing Bitrix24 task. Example: update_task(task_id=\"123\", fields='{\"STATUS\": \"5\", \"MARK\": \"P\"}')."
    )]
    pub async fn update_task(
        &self,
        params: Parameters<UpdateTaskRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(self.context.tasks.update(&req.task_id, &req.fields).await)
    }

    #[tool(
        title = "Get Task Fields",
        description = "Retrieve metadata about available Bitrix24 task fields."
    )]
    pub async fn get_task_fields(&self) -> Result<CallToolResult, McpError> {
        respond(self.context.tasks.fields().await)
    }

    #[tool(
        title = "Complete Task",
        description = "Mark a Bitrix24 task as completed."
    )]
    pub async fn complete_task(
        &self,
        params: Parameters<TaskIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.tasks.perform(TaskAction::Complete, &params.0.task_id).await)
    }

    #[tool(
        title = "Approve Task",
        description = "Approve a Bitrix24 task that is awaiting control."
    )]
    pub async fn approve_task(
        &self,
        params: Parameters<TaskIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.tasks.perform(TaskAction::Approve, &params.0.task_id).await)
    }

    #[tool(
        title = "Start Task",
        description = "Start work on a Bitrix24 task."
    )]
    pub async fn start_task(
        &self,
        params: Parameters<TaskIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.tasks.perform(TaskAction::Start, &params.0.task_id).await)
    }

    #[tool(
        title = "Delegate Task",
        description = "Delegate a Bitrix24 task to another user."
    )]
    pub async fn delegate_task(
        &self,
        params: Parameters<DelegateTaskRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(self.context.tasks.delegate(&req.task_id, &req.user_id).await)
    }

    #[tool(
        title = "Renew Task",
        description = "Renew a completed Bitrix24 task."
    )]
    pub async fn renew_task(
        &self,
        params: Parameters<TaskIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.tasks.perform(TaskAction::Renew, &params.0.task_id).await)
    }

    #[tool(
        title = "Start Watching Task",
        description = "Start watching a Bitrix24 task as an auditor."
    )]
    pub async fn start_watching_task(
        &self,
        params: Parameters<TaskIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            self.context
                .tasks
                .perform(TaskAction::StartWatching, &params.0.task_id)
                .await,
        )
    }

    #[tool(
        title = "Disapprove Task",
        description = "Disapprove a Bitrix24 task and send it back to the responsible person."
    )]
    pub async fn disapprove_task(
        &self,
        params: Parameters<TaskIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.tasks.perform(TaskAction::Disapprove, &params.0.task_id).await)
    }

    // ============================================================
    // Calendar
    // ============================================================

    #[tool(
        title = "Get Calendar Events",
        description = "List Bitrix24 calendar events. Example: get_calendar_events(date_from=\"2024-01-01\", date_to=\"2024-01-31\", sections=\"21,44\", limit=10). Section IDs may also be given as a 'section' key of filter_params; both sources are merged."
    )]
    pub async fn get_calendar_events(
        &self,
        params: Parameters<CalendarEventsRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.calendar.events(&EventQuery::from(params.0)).await)
    }

    #[tool(
        title = "Create Calendar Event",
        description = "Create a Bitrix24 calendar event, e.g. fields='{\"type\": \"user\", \"ownerId\": 2, \"name\": \"New Event\", \"from\": \"2024-06-14\", \"to\": \"2024-06-14\", \"section\": 5}'. Returns JSON with event_id."
    )]
    pub async fn create_calendar_event(
        &self,
        params: Parameters<CreateRecordRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.calendar.create_event(&params.0.fields).await)
    }

    #[tool(
        title = "Update Calendar Event",
        description = "Update an existing Bitrix24 calendar event."
    )]
    pub async fn update_calendar_event(
        &self,
        params: Parameters<UpdateEventRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(self.context.calendar.update_event(&req.event_id, &req.fields).await)
    }

    #[tool(
        title = "Delete Calendar Event",
        description = "Delete a Bitrix24 calendar event by ID."
    )]
    pub async fn delete_calendar_event(
        &self,
        params: Parameters<EventIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.calendar.delete_event(&params.0.event_id).await)
    }

    #[tool(
        title = "Get Calendar List",
        description = "List Bitrix24 calendars (sections). Example: get_calendar_list(filter_params='{\"type\": \"user\", \"ownerId\": 1}'). type defaults to 'user'."
    )]
    pub async fn get_calendar_list(
        &self,
        params: Parameters<CalendarListRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            self.context
                .calendar
                .calendars(Some(params.0.filter_params.as_str()))
                .await,
        )
    }

    #[tool(
        title = "Get Calendar Event by ID",
        description = "Retrieve a Bitrix24 calendar event by ID, including participants and recurrence rules."
    )]
    pub async fn get_calendar_event_by_id(
        &self,
        params: Parameters<EventIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.calendar.event(&params.0.event_id).await)
    }

    #[tool(
        title = "Get Nearest Calendar Events",
        description = "Retrieve upcoming Bitrix24 calendar events. Example: get_nearest_calendar_events(calendar_type=\"user\", days=30, max_events_count=10)."
    )]
    pub async fn get_nearest_calendar_events(
        &self,
        params: Parameters<NearestEventsRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.calendar.nearest(&NearestEventsQuery::from(params.0)).await)
    }

    #[tool(
        title = "Get Meeting Status",
        description = "Get the current user's participation status for a meeting: Y (accepted), N (declined) or Q (pending)."
    )]
    pub async fn get_meeting_status(
        &self,
        params: Parameters<EventIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.calendar.meeting_status(&params.0.event_id).await)
    }

    #[tool(
        title = "Set Meeting Status",
        description = "Set the current user's participation status for a meeting. status must be Y, N or Q."
    )]
    pub async fn set_meeting_status(
        &self,
        params: Parameters<SetMeetingStatusRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(
            self.context
                .calendar
                .set_meeting_status(&req.event_id, &req.status)
                .await,
        )
    }

    // ============================================================
    // Projects
    // ============================================================

    #[tool(
        title = "Get Projects",
        description = "List Bitrix24 projects (workgroups). Example: get_projects(filter_params='{\"ACTIVE\": \"Y\"}', limit=10). Ordering is not supported for projects. Returns JSON with total, count and projects."
    )]
    pub async fn get_projects(
        &self,
        params: Parameters<ListProjectsRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.projects.list(&ListQuery::from(params.0)).await)
    }

    #[tool(
        title = "Create Project",
        description = "Create a Bitrix24 project (workgroup), e.g. fields='{\"NAME\": \"Project\", \"VISIBLE\": \"Y\", \"OPENED\": \"N\"}'. Returns JSON with project_id."
    )]
    pub async fn create_project(
        &self,
        params: Parameters<CreateRecordRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.projects.create(&params.0.fields).await)
    }

    #[tool(
        title = "Update Project",
        description = "Update an existing Bitrix24 project (workgroup)."
    )]
    pub async fn update_project(
        &self,
        params: Parameters<UpdateProjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(self.context.projects.update(&req.project_id, &req.fields).await)
    }

    #[tool(
        title = "Get Project Tasks",
        description = "List the tasks of a Bitrix24 project."
    )]
    pub async fn get_project_tasks(
        &self,
        params: Parameters<ProjectTasksRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(self.context.projects.tasks(&req.project_id, req.limit).await)
    }

    #[tool(
        title = "Add Project Member",
        description = "Add a user to a Bitrix24 project with the given role (default: member)."
    )]
    pub async fn add_project_member(
        &self,
        params: Parameters<AddProjectMemberRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(
            self.context
                .projects
                .add_member(&req.project_id, &req.user_id, Some(req.role.as_str()))
                .await,
        )
    }

    #[tool(
        title = "Get Project Members",
        description = "List the members of a Bitrix24 project."
    )]
    pub async fn get_project_members(
        &self,
        params: Parameters<ProjectIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.context.projects.members(&params.0.project_id).await)
    }

    #[tool(
        title = "Expel Project Member",
        description = "Remove a user from a Bitrix24 project."
    )]
    pub async fn expel_project_member(
        &self,
        params: Parameters<ProjectMemberRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(self.context.projects.expel_member(&req.project_id, &req.user_id).await)
    }

    #[tool(
        title = "Request to Join Project",
        description = "Send a request to join a Bitrix24 project, with an optional message."
    )]
    pub async fn request_join_project(
        &self,
        params: Parameters<RequestJoinProjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(
            self.context
                .projects
                .request_join(&req.project_id, Some(req.message.as_str()))
                .await,
        )
    }

    #[tool(
        title = "Invite Project Member",
        description = "Invite a user to a Bitrix24 project, with an optional personal message."
    )]
    pub async fn invite_project_member(
        &self,
        params: Parameters<InviteProjectMemberRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        respond(
            self.context
                .projects
                .invite(&req.project_id, &req.user_id, Some(req.message.as_str()))
                .await,
        )
    }
}

#[tool_handler]
impl ServerHandler for BitrixMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: self.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            instructions: Some(
                r#"Tools for a Bitrix24 portal: CRM leads, deals, contacts and companies, tasks, calendar events and projects (workgroups).

CONVENTIONS:
- Structured arguments (filter_params, order, fields) are JSON objects passed as text.
- select_fields is a comma-separated list of field names.
- limit defaults to 50; 0 returns every record.
- Only get_contacts accepts order. Other list tools return an error when order is set.

RESULTS:
Every tool returns a JSON object with "success" first.
- Lists: {"success": true, "count": N, "<entities>": [...]}
- Single records: {"success": true, "<entity>": {...}}
- Creates: {"success": true, "<entity>_id": ID, "message": "..."}
- Updates and actions: "success" is the portal's own answer, with a message
- Failures: {"success": false, "error": "..."}; a missing record reads "<Entity> with ID <id> not found"

DISCOVERY:
Call get_<entity>_fields (e.g. get_lead_fields, get_task_fields) to learn field names before filtering or creating records."#
                    .into(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio_server(context: Arc<AppContext>, config: &McpConfig) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("Starting MCP server via stdio");

    let service = BitrixMcpServer::with_name(context, config.server_name.clone());
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}

/// Serve the streamable HTTP transport at `/mcp` until ctrl-c.
pub async fn run_http_server(context: Arc<AppContext>, config: &McpConfig) -> anyhow::Result<()> {
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpService,
    };
    use tower_http::{cors::CorsLayer, trace::TraceLayer};

    let server = BitrixMcpServer::with_name(context, config.server_name.clone());
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let app = axum::Router::new()
        .nest_service("/mcp", service)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("MCP server listening on http://{}/mcp", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("MCP server stopped");
    Ok(())
}
