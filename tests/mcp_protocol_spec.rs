//! MCP protocol integration tests.
//!
//! These tests spawn the actual `bitrix-mcp` process and communicate via
//! JSON-RPC over stdio. The portal URL points nowhere; only tools that fail
//! before reaching the portal are called.
//!
//! The rmcp library uses line-delimited JSON (each message is one line):
//! ```
//! {"jsonrpc":"2.0","id":1,"method":"initialize",...}\n
//! {"jsonrpc":"2.0","id":1,"result":{...}}\n
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JsonRpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

/// MCP test client that spawns and communicates with the server
struct McpTestClient {
    child: Child,
    request_id: u64,
    reader: BufReader<std::process::ChildStdout>,
}

impl McpTestClient {
    /// Spawn a new MCP server process in an empty directory so no `.env`
    /// is picked up.
    fn spawn() -> Self {
        Self::spawn_with_env(&[])
    }

    /// Spawn with extra environment variables set for the server.
    fn spawn_with_env(vars: &[(&str, &str)]) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut child = Command::new(env!("CARGO_BIN_EXE_bitrix-mcp"))
            .args(["--transport", "stdio"])
            .current_dir(temp_dir.path())
            .env("BITRIX24_WEBHOOK_URL", "http://127.0.0.1:9/rest/1/secret/")
            .env("MCP_SERVER_NAME", "bitrix24-test")
            .env_remove("BITRIX24_ACCESS_TOKEN")
            .env_remove("MCP_TRANSPORT")
            .env_remove("RUST_LOG")
            .envs(vars.iter().copied())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn bitrix-mcp");

        let stdout = child.stdout.take().expect("Failed to get stdout");
        let reader = BufReader::new(stdout);

        // Keep temp_dir alive by leaking it (tests are short-lived anyway)
        std::mem::forget(temp_dir);

        Self {
            child,
            request_id: 0,
            reader,
        }
    }

    /// Send a message as line-delimited JSON
    fn send_message(&mut self, content: &str) {
        let stdin = self.child.stdin.as_mut().expect("Failed to get stdin");
        writeln!(stdin, "{}", content).expect("Failed to write message");
        stdin.flush().expect("Failed to flush stdin");
    }

    /// Read a message as line-delimited JSON
    fn read_message(&mut self) -> String {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .expect("Failed to read line");
        line.trim().to_string()
    }

    /// Send a JSON-RPC request and get the response
    fn request(&mut self, method: &str, params: Option<Value>) -> JsonRpcResponse {
        self.request_id += 1;
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id,
            method: method.to_string(),
            params,
        };

        let request_json = serde_json::to_string(&request).expect("Failed to serialize request");
        self.send_message(&request_json);

        let response_json = self.read_message();
        serde_json::from_str(&response_json).expect("Failed to parse response")
    }

    /// Send initialize request and initialized notification (required first messages)
    fn initialize(&mut self) -> JsonRpcResponse {
        let response = self.request(
            "initialize",
            Some(json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {
                    "name": "test-client",
                    "version": "1.0.0"
                }
            })),
        );

        // Send initialized notification (required by MCP protocol)
        let notification = json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        });
        self.send_message(&notification.to_string());

        response
    }

    /// List available tools
    fn list_tools(&mut self) -> JsonRpcResponse {
        self.request("tools/list", None)
    }

    /// Call a tool with parameters
    fn call_tool(&mut self, name: &str, arguments: Value) -> JsonRpcResponse {
        self.request(
            "tools/call",
            Some(json!({
                "name": name,
                "arguments": arguments
            })),
        )
    }
}

impl Drop for McpTestClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ============================================================
// Protocol Tests
// ============================================================

mod protocol {
    use super::*;

    #[test]
    fn initialize_returns_server_info() {
        let mut client = McpTestClient::spawn();
        let response = client.initialize();

        assert!(response.error.is_none(), "Expected success, got error");
        let result = response.result.expect("Expected result");

        assert_eq!(result["serverInfo"]["name"].as_str(), Some("bitrix24-test"));
        assert!(result["capabilities"].get("tools").is_some());
        assert!(result.get("instructions").is_some());
    }

    #[test]
    fn transport_flag_overrides_unknown_env_transport() {
        let mut client = McpTestClient::spawn_with_env(&[("MCP_TRANSPORT", "bogus")]);
        let response = client.initialize();

        assert!(response.error.is_none(), "Expected success, got error");
        assert!(response.result.is_some());
    }

    #[test]
    fn tools_list_returns_all_tools() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let response = client.list_tools();
        assert!(response.error.is_none(), "Expected success, got error");

        let result = response.result.expect("Expected result");
        let tools_array = result
            .get("tools")
            .and_then(|t| t.as_array())
            .expect("Expected tools array");

        assert_eq!(
            tools_array.len(),
            50,
            "Expected 50 tools, got {}",
            tools_array.len()
        );

        let tool_names: Vec<&str> = tools_array
            .iter()
            .filter_map(|t| t.get("name").and_then(|n| n.as_str()))
            .collect();

        for name in [
            "get_leads",
            "get_contacts",
            "get_company_fields",
            "get_task_by_id",
            "start_watching_task",
            "get_calendar_events",
            "get_nearest_calendar_events",
            "set_meeting_status",
            "get_projects",
            "invite_project_member",
        ] {
            assert!(tool_names.contains(&name), "missing tool {}", name);
        }
    }

    #[test]
    fn tools_have_descriptions_and_schemas() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let response = client.list_tools();
        let result = response.result.expect("Expected result");
        let tools = result
            .get("tools")
            .expect("Expected tools")
            .as_array()
            .expect("Tools should be array");

        for tool in tools {
            let name = tool.get("name").and_then(|n| n.as_str()).unwrap_or("?");
            assert!(
                tool.get("description").is_some(),
                "Tool {} missing description",
                name
            );
            assert!(
                tool.get("title").and_then(|t| t.as_str()).is_some(),
                "Tool {} missing title",
                name
            );
            assert!(
                tool.get("inputSchema").is_some(),
                "Tool {} missing inputSchema",
                name
            );
        }
    }

    #[test]
    fn list_schema_describes_arguments() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let result = client.list_tools().result.expect("Expected result");
        let get_leads = result["tools"]
            .as_array()
            .and_then(|tools| tools.iter().find(|t| t["name"] == "get_leads"))
            .expect("Expected get_leads");

        let properties = &get_leads["inputSchema"]["properties"];
        for argument in ["filter_params", "select_fields", "order", "limit"] {
            assert!(properties.get(argument).is_some(), "missing {}", argument);
        }
    }
}

// ============================================================
// Tool Call Tests
// ============================================================

mod tool_calls {
    use super::*;

    #[test]
    fn invalid_json_argument_returns_failure_envelope() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let response = client.call_tool(
            "get_leads",
            json!({ "filter_params": "{not json" }),
        );

        assert!(response.error.is_none(), "Expected tool result, got error");
        let result = response.result.as_ref().expect("Expected result");
        assert_eq!(result.get("isError").and_then(|e| e.as_bool()), Some(true));

        let envelope: Value =
            serde_json::from_str(&extract_text_content(&response)).expect("Expected JSON in text");
        assert_eq!(envelope["success"], json!(false));
        assert!(envelope["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid filter_params JSON"));
    }

    #[test]
    fn invalid_meeting_status_is_rejected_locally() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let response = client.call_tool(
            "set_meeting_status",
            json!({ "event_id": "5", "status": "X" }),
        );

        let envelope: Value = serde_json::from_str(&extract_text_content(&response)).unwrap();
        assert_eq!(
            envelope,
            json!({"success": false, "error": "Invalid status 'X'. Must be one of: Y, N, Q"})
        );
    }

    #[test]
    fn unsupported_order_is_rejected_locally() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let response = client.call_tool(
            "get_deals",
            json!({ "order": "{\"DATE_CREATE\": \"DESC\"}" }),
        );

        let envelope: Value = serde_json::from_str(&extract_text_content(&response)).unwrap();
        assert_eq!(envelope["success"], json!(false));
        assert!(envelope["error"].as_str().unwrap().contains("deals"));
    }

    /// Helper to extract text content from MCP tool response
    fn extract_text_content(response: &JsonRpcResponse) -> String {
        response
            .result
            .as_ref()
            .and_then(|r| r.get("content"))
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str())
            .expect("Expected text content in response")
            .to_string()
    }
}

// ============================================================
// Error Handling Tests
// ============================================================

mod errors {
    use super::*;

    #[test]
    fn invalid_tool_name_returns_error() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        let response = client.call_tool("nonexistent_tool", json!({}));

        assert!(response.error.is_some(), "Expected error for invalid tool");
    }

    #[test]
    fn missing_required_param_returns_error() {
        let mut client = McpTestClient::spawn();
        client.initialize();

        // get_lead requires 'lead_id'
        let response = client.call_tool("get_lead", json!({}));

        assert!(
            response.error.is_some() || {
                response
                    .result
                    .as_ref()
                    .and_then(|r| r.get("isError"))
                    .and_then(|e| e.as_bool())
                    .unwrap_or(false)
            }
        );
    }
}
