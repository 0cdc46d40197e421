//! MCP (Model Context Protocol) server implementation

use crawlify::screenshot::spawn_sweeper;
use crawlify::{
    CrawlRequest, SearchRequest, Settings, Tool, ToolBuilder, CRAWL_TOOL_DESCRIPTION,
    SEARCH_TOOL_DESCRIPTION,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// JSON-RPC 2.0 request
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Tool result content: pretty JSON text, flagged when it is an error body
fn tool_result(value: &impl Serialize, is_error: bool) -> Value {
    let text = serde_json::to_string_pretty(value).unwrap_or_default();
    let mut result = json!({
        "content": [{ "type": "text", "text": text }]
    });
    if is_error {
        result["isError"] = Value::Bool(true);
    }
    result
}

/// MCP Server implementation
struct McpServer {
    tool: Tool,
}

impl McpServer {
    fn new(tool: Tool) -> Self {
        Self { tool }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            _ => JsonRpcResponse::error(
                request.id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "crawlify",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "tools": [
                    {
                        "name": "crawl",
                        "description": CRAWL_TOOL_DESCRIPTION,
                        "inputSchema": self.tool.crawl_input_schema()
                    },
                    {
                        "name": "search",
                        "description": SEARCH_TOOL_DESCRIPTION,
                        "inputSchema": self.tool.search_input_schema()
                    }
                ]
            }),
        )
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let tool_name = params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        match tool_name {
            "crawl" => {
                let request: CrawlRequest = match serde_json::from_value(arguments) {
                    Ok(req) => req,
                    Err(e) => {
                        return JsonRpcResponse::error(id, -32602, format!("Invalid arguments: {}", e))
                    }
                };
                let result = match self.tool.crawl(request).await {
                    Ok(result) => tool_result(&result, false),
                    Err(e) => tool_result(&e.body(), true),
                };
                JsonRpcResponse::success(id, result)
            }
            "search" => {
                let request: SearchRequest = match serde_json::from_value(arguments) {
                    Ok(req) => req,
                    Err(e) => {
                        return JsonRpcResponse::error(id, -32602, format!("Invalid arguments: {}", e))
                    }
                };
                let result = match self.tool.search(request).await {
                    Ok(result) => tool_result(&result, false),
                    Err(e) => tool_result(&e.body(), true),
                };
                JsonRpcResponse::success(id, result)
            }
            other => JsonRpcResponse::error(id, -32602, format!("Unknown tool: {}", other)),
        }
    }
}

/// Run the MCP server over stdio
pub async fn run_server(settings: Settings) {
    let screenshots = &settings.screenshots;
    let sweeper = spawn_sweeper(
        screenshots.directory.clone(),
        screenshots.ttl,
        screenshots.sweep_interval,
    );

    let server = McpServer::new(ToolBuilder::from_settings(&settings).build());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => {
                // Notifications get no response
                if request.id.is_none() && request.method.starts_with("notifications/") {
                    continue;
                }
                server.handle_request(request).await
            }
            Err(e) => JsonRpcResponse::error(None, -32700, format!("Parse error: {}", e)),
        };

        let mut json = serde_json::to_string(&response).unwrap_or_default();
        json.push('\n');
        if let Err(e) = stdout.write_all(json.as_bytes()).await {
            tracing::error!("Error writing to stdout: {}", e);
            break;
        }
        let _ = stdout.flush().await;
    }

    sweeper.abort();
}
