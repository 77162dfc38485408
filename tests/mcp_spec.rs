//! MCP server integration tests.
//!
//! Tools are called directly on the server with a recording transport
//! standing in for the portal.

mod support;

use std::sync::Arc;

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ServerHandler;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use bitrix_mcp::mcp::BitrixMcpServer;
use support::{api_error, context, StubTransport};

/// Helper to create a server bound to `stub`.
fn setup(stub: &Arc<StubTransport>) -> BitrixMcpServer {
    BitrixMcpServer::new(Arc::new(context(stub)))
}

/// Build tool arguments the way the MCP layer does, defaults included.
fn args<T: DeserializeOwned>(value: Value) -> Parameters<T> {
    Parameters(serde_json::from_value(value).expect("Invalid tool arguments"))
}

/// The envelope carried as the text of a tool result.
fn envelope(result: &CallToolResult) -> Value {
    let raw = serde_json::to_value(result).expect("Failed to encode result");
    let text = raw["content"][0]["text"]
        .as_str()
        .expect("Expected text content");
    serde_json::from_str(text).expect("Expected JSON in text")
}

fn is_error(result: &CallToolResult) -> bool {
    result.is_error.unwrap_or(false)
}

mod registry {
    use super::*;

    #[test]
    fn registers_every_tool() {
        let server = setup(&StubTransport::new());
        let names = server.tool_names();

        let expected = [
            "get_leads",
            "get_lead",
            "create_lead",
            "update_lead",
            "get_lead_fields",
            "get_deals",
            "get_deal",
            "create_deal",
            "update_deal",
            "get_deal_fields",
            "get_contacts",
            "get_contact",
            "create_contact",
            "update_contact",
            "get_contact_fields",
            "get_companies",
            "get_company",
            "create_company",
            "update_company",
            "get_company_fields",
            "get_tasks",
            "get_task_by_id",
            "create_task",
            "update_task",
            "get_task_fields",
            "complete_task",
            "approve_task",
            "start_task",
            "delegate_task",
            "renew_task",
            "start_watching_task",
            "disapprove_task",
            "get_calendar_events",
            "create_calendar_event",
            "update_calendar_event",
            "delete_calendar_event",
            "get_calendar_list",
            "get_calendar_event_by_id",
            "get_nearest_calendar_events",
            "get_meeting_status",
            "set_meeting_status",
            "get_projects",
            "create_project",
            "update_project",
            "get_project_tasks",
            "add_project_member",
            "get_project_members",
            "expel_project_member",
            "request_join_project",
            "invite_project_member",
        ];

        for name in expected {
            assert!(names.iter().any(|n| n == name), "missing tool {}", name);
        }
        assert_eq!(names.len(), expected.len());
    }

    #[test]
    fn every_tool_has_a_title() {
        let server = setup(&StubTransport::new());

        for tool in server.tools() {
            let title = tool.title.as_deref().unwrap_or_default();
            assert!(!title.is_empty(), "tool {} has no title", tool.name);
        }
    }

    #[test]
    fn titles_read_as_plain_words() {
        let server = setup(&StubTransport::new());
        let title_of = |name: &str| {
            server
                .tools()
                .into_iter()
                .find(|tool| tool.name == name)
                .and_then(|tool| tool.title)
        };

        assert_eq!(title_of("get_leads").as_deref(), Some("Get Leads"));
        assert_eq!(title_of("get_task_by_id").as_deref(), Some("Get Task by ID"));
        assert_eq!(
            title_of("request_join_project").as_deref(),
            Some("Request to Join Project")
        );
    }

    #[test]
    fn server_info_uses_configured_name() {
        let server =
            BitrixMcpServer::with_name(Arc::new(context(&StubTransport::new())), "crm-portal");
        let info = server.get_info();

        assert_eq!(info.server_info.name, "crm-portal");
        assert!(info.capabilities.tools.is_some());
        let instructions = info.instructions.expect("Expected instructions");
        assert!(instructions.contains("get_lead_fields"));
    }

    #[test]
    fn default_name() {
        let server = setup(&StubTransport::new());
        assert_eq!(server.get_info().server_info.name, "bitrix24-mcp");
    }
}

mod crm_tools {
    use super::*;

    #[tokio::test]
    async fn get_leads_applies_defaults() {
        let stub = StubTransport::returning(vec![json!({"ID": "1"})]);
        let server = setup(&stub);

        let result = server.get_leads(args(json!({}))).await.expect("Tool failed");

        assert!(!is_error(&result));
        assert_eq!(
            envelope(&result),
            json!({"success": true, "count": 1, "leads": [{"ID": "1"}]})
        );
        assert_eq!(stub.only_call().params, json!({}));
    }

    #[tokio::test]
    async fn get_contacts_passes_order() {
        let stub = StubTransport::new();
        let server = setup(&stub);

        let result = server
            .get_contacts(args(json!({"order": "{\"LAST_NAME\": \"ASC\"}", "limit": 5})))
            .await
            .expect("Tool failed");

        assert!(!is_error(&result));
        assert_eq!(stub.only_call().params, json!({"order": {"LAST_NAME": "ASC"}}));
    }

    #[tokio::test]
    async fn failure_is_flagged_and_keeps_envelope() {
        let stub = StubTransport::new();
        let server = setup(&stub);

        let result = server
            .create_deal(args(json!({"fields": "not json"})))
            .await
            .expect("Tool failed");

        assert!(is_error(&result));
        let body = envelope(&result);
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].as_str().unwrap().contains("fields"));
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn remote_error_is_flagged() {
        let stub = StubTransport::failing(api_error("ACCESS_DENIED", "Access denied"));
        let server = setup(&stub);

        let result = server
            .get_company(args(json!({"company_id": "3"})))
            .await
            .expect("Tool failed");

        assert!(is_error(&result));
        assert_eq!(
            envelope(&result),
            json!({"success": false, "error": "ACCESS_DENIED: Access denied"})
        );
    }

    #[tokio::test]
    async fn text_is_pretty_printed_with_success_first() {
        let stub = StubTransport::returning(vec![json!({"ID": "4", "TITLE": "Сделка"})]);
        let server = setup(&stub);

        let result = server
            .get_deal(args(json!({"deal_id": "4"})))
            .await
            .expect("Tool failed");

        let raw = serde_json::to_value(&result).unwrap();
        let text = raw["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("{\n  \"success\": true"));
        assert!(text.contains("Сделка"));
    }
}

mod task_tools {
    use super::*;

    #[tokio::test]
    async fn start_watching_task_calls_startwatch() {
        let stub = StubTransport::returning(vec![json!(true)]);
        let server = setup(&stub);

        let result = server
            .start_watching_task(args(json!({"task_id": "11"})))
            .await
            .expect("Tool failed");

        assert!(!is_error(&result));
        assert_eq!(stub.only_call().method, "tasks.task.startwatch");
    }

    #[tokio::test]
    async fn delegate_task_sends_user() {
        let stub = StubTransport::returning(vec![json!(true)]);
        let server = setup(&stub);

        server
            .delegate_task(args(json!({"task_id": "11", "user_id": "4"})))
            .await
            .expect("Tool failed");

        assert_eq!(stub.only_call().params, json!({"taskId": "11", "userId": "4"}));
    }
}

mod calendar_tools {
    use super::*;

    #[tokio::test]
    async fn nearest_events_defaults() {
        let stub = StubTransport::new();
        let server = setup(&stub);

        let result = server
            .get_nearest_calendar_events(args(json!({})))
            .await
            .expect("Tool failed");

        assert!(!is_error(&result));
        assert_eq!(stub.only_call().params, json!({"type": "user"}));
    }

    #[tokio::test]
    async fn invalid_meeting_status_is_flagged() {
        let stub = StubTransport::new();
        let server = setup(&stub);

        let result = server
            .set_meeting_status(args(json!({"event_id": "1", "status": "maybe"})))
            .await
            .expect("Tool failed");

        assert!(is_error(&result));
        assert!(envelope(&result)["error"]
            .as_str()
            .unwrap()
            .contains("Y, N, Q"));
        assert!(stub.calls().is_empty());
    }
}

mod project_tools {
    use super::*;

    #[tokio::test]
    async fn add_member_defaults_role() {
        let stub = StubTransport::returning(vec![json!(true)]);
        let server = setup(&stub);

        let result = server
            .add_project_member(args(json!({"project_id": "2", "user_id": "8"})))
            .await
            .expect("Tool failed");

        assert_eq!(envelope(&result)["role"], json!("member"));
        assert_eq!(
            stub.only_call().params,
            json!({"GROUP_ID": "2", "USER_ID": "8", "ROLE": "member"})
        );
    }

    #[tokio::test]
    async fn get_projects_uses_uppercase_filter() {
        let stub = StubTransport::new();
        let server = setup(&stub);

        server
            .get_projects(args(json!({"filter_params": "{\"CLOSED\": \"N\"}"})))
            .await
            .expect("Tool failed");

        assert_eq!(stub.only_call().params, json!({"FILTER": {"CLOSED": "N"}}));
    }
}
