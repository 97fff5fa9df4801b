//! MCP protocol types
//!
//! Hand-written JSON-RPC 2.0 messages for the Model Context Protocol over stdio.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Requests without an id are notifications and get no response
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
            }),
        }
    }
}

// MCP Protocol Types

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server capabilities. Only tools are offered, and the tool list is fixed.
#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

/// Server info for initialize response
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Initialize result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

impl InitializeResult {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: name.to_string(),
                version: version.to_string(),
            },
        }
    }
}

/// Tool definition
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// List tools result
#[derive(Debug, Serialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// Call tool request params
#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

/// Tool result content
#[derive(Debug, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// Call tool result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<TextContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    pub fn text(text: String) -> Self {
        Self {
            content: vec![TextContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            content: vec![TextContent {
                content_type: "text".to_string(),
                text: message,
            }],
            is_error: Some(true),
        }
    }
}

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy)]
pub enum ParamType {
    String,
    Boolean,
    /// Integer in `1..=max`
    Integer { max: u32 },
    StringArray,
    Enum(&'static [&'static str]),
    EnumArray(&'static [&'static str]),
    /// Array of objects whose listed string fields are all required
    ObjectArray(&'static [&'static str]),
}

impl ParamType {
    fn schema(self, description: &str) -> Value {
        match self {
            ParamType::String => serde_json::json!({
                "type": "string",
                "description": description
            }),
            ParamType::Boolean => serde_json::json!({
                "type": "boolean",
                "description": description
            }),
            ParamType::Integer { max } => serde_json::json!({
                "type": "integer",
                "minimum": 1,
                "maximum": max,
                "description": description
            }),
            ParamType::StringArray => serde_json::json!({
                "type": "array",
                "items": {"type": "string"},
                "description": description
            }),
            ParamType::Enum(values) => serde_json::json!({
                "type": "string",
                "enum": values,
                "description": description
            }),
            ParamType::EnumArray(values) => serde_json::json!({
                "type": "array",
                "items": {"type": "string", "enum": values},
                "description": description
            }),
            ParamType::ObjectArray(fields) => {
                let properties: Map<String, Value> = fields
                    .iter()
                    .map(|f| (f.to_string(), serde_json::json!({"type": "string"})))
                    .collect();
                serde_json::json!({
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": properties,
                        "required": fields
                    },
                    "description": description
                })
            }
        }
    }
}

/// Create a JSON Schema for tool parameters
pub fn create_tool_schema(properties: Vec<(&str, &str, ParamType, bool)>) -> Value {
    let mut props = Map::new();
    let mut required = Vec::new();

    for (name, description, param_type, is_required) in properties {
        props.insert(name.to_string(), param_type.schema(description));
        if is_required {
            required.push(name.to_string());
        }
    }

    serde_json::json!({
        "type": "object",
        "properties": props,
        "required": required
    })
}
