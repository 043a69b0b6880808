// Wire types: newline-delimited JSON-RPC 2.0, one message per line.
// Method names and result shapes follow the MCP tool conventions
// (initialize, tools/list, tools/call).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::catalog::OperationDescriptor;
use crate::dispatch::ResponseEnvelope;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications. An explicit `null` id is still a request
    /// and is answered with `id: null`.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

// Keeps `"id": null` apart from a missing id
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl RpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error<S: Into<String>>(id: Value, code: i64, message: S) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// `tools/call` parameters
#[derive(Debug, Clone, Deserialize)]
pub struct CallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

pub fn initialize_result(server_name: &str, server_version: &str) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": { "name": server_name, "version": server_version },
    })
}

pub fn tool_entry(descriptor: &OperationDescriptor) -> Value {
    json!({
        "name": descriptor.name,
        "description": descriptor.description,
        "inputSchema": descriptor.input_schema(),
    })
}

pub fn tools_list_result(descriptors: &[OperationDescriptor]) -> Value {
    json!({ "tools": descriptors.iter().map(tool_entry).collect::<Vec<_>>() })
}

pub fn tool_call_result(envelope: &ResponseEnvelope) -> Value {
    let mut text = envelope.message.clone();
    if !envelope.success && !envelope.diagnostics.trim().is_empty() {
        text.push_str("\n\n");
        text.push_str(envelope.diagnostics.trim_end());
    }
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": !envelope.success,
        "structuredContent": envelope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FailureKind;

    #[test]
    fn test_notification_has_no_id() {
        let request: RpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(request.is_notification());
        assert_eq!(request.params, Value::Null);
    }

    #[test]
    fn test_null_id_is_a_request() {
        let request: RpcRequest = serde_json::from_str(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap();
        assert!(!request.is_notification());
        assert_eq!(request.id, Some(Value::Null));
    }

    #[test]
    fn test_error_response_omits_result() {
        let response = RpcResponse::error(json!(7), METHOD_NOT_FOUND, "no such method");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["code"], -32601);
        assert!(value.get("result").is_none());
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn test_failed_call_includes_diagnostics_text() {
        let envelope = ResponseEnvelope::failure(
            FailureKind::ExternalToolFailure,
            "Trim failed",
            "Invalid duration specification\n".into(),
        );
        let result = tool_call_result(&envelope);
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Trim failed\n\nInvalid duration specification");
        assert_eq!(result["structuredContent"]["error"], "external_tool_failure");
    }

    #[test]
    fn test_successful_call_keeps_message_only() {
        let envelope = ResponseEnvelope::success("Wrote b.mp4", "frame=1".into());
        let result = tool_call_result(&envelope);
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["text"], "Wrote b.mp4");
        assert_eq!(result["structuredContent"]["diagnostics"], "frame=1");
    }
}
