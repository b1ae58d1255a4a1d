//! JSON-RPC 2.0 envelope codec for the MCP handshake.
//!
//! This module decodes inbound request envelopes and encodes the two
//! mutually exclusive reply shapes (result or error).
//!
//! # Leniency
//!
//! Real-world senders of this protocol are sloppy, so decoding tolerates:
//!
//! - A missing `jsonrpc` tag (a present tag must still be `"2.0"`)
//! - A missing `id`, replaced by the sentinel [`SENTINEL_ID`]
//! - A missing or `null` `params`, replaced by an empty object
//!
//! Any JSON value is accepted as an `id` and echoed back verbatim.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// The only accepted value of the `jsonrpc` tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "ooottt";

/// One-line summary shown by the discovery routes.
pub const SERVER_DESCRIPTION: &str = "OTT subscription planning tools";

/// Request id substituted when a sender omits one.
pub const SENTINEL_ID: i64 = 1;

/// A JSON-RPC 2.0 request ID.
///
/// Integers and strings are the common cases. Anything else a sender puts in
/// the `id` slot is kept as raw JSON so it can be echoed unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
    /// Any other JSON value (float, `null`, ...).
    Other(Value),
}

impl RequestId {
    /// Classifies a raw JSON `id` value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Self::String(s),
            other => other.as_i64().map_or(Self::Other(other), Self::Number),
        }
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::Number(SENTINEL_ID)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

/// A decoded request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Correlation id, echoed in the reply.
    pub id: RequestId,
    /// The method to invoke.
    pub method: String,
    /// Method parameters; an empty object when the sender omitted them.
    pub params: Value,
}

impl Envelope {
    /// Creates an envelope with empty params.
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            params: Value::Object(Map::new()),
        }
    }

    /// Replaces the params.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// Why an inbound payload could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not well-formed JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// The payload is JSON but not a usable request envelope.
    #[error("Invalid Request: {reason}")]
    Malformed {
        /// Id recovered from the payload, or the sentinel.
        id: RequestId,
        /// What is wrong with the envelope.
        reason: &'static str,
    },
}

impl DecodeError {
    /// Returns the id the error reply should carry.
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Parse(_) => RequestId::default(),
            Self::Malformed { id, .. } => id.clone(),
        }
    }

    /// Converts the failure into its error reply.
    #[must_use]
    pub fn into_reply(self) -> Reply {
        let error = match self {
            Self::Parse(_) => JsonRpcError::parse_error(RequestId::default()),
            Self::Malformed { id, reason } => JsonRpcError::invalid_request(id, reason),
        };
        Reply::Error(error)
    }
}

/// Decodes raw bytes into a request envelope.
///
/// # Errors
///
/// Returns [`DecodeError::Parse`] when the bytes are not JSON, and
/// [`DecodeError::Malformed`] when the JSON is not an object, carries a wrong
/// `jsonrpc` tag, or lacks a non-empty string `method`.
pub fn decode(raw: &[u8]) -> Result<Envelope, DecodeError> {
    let value: Value = serde_json::from_slice(raw).map_err(DecodeError::Parse)?;

    let Value::Object(mut obj) = value else {
        return Err(DecodeError::Malformed {
            id: RequestId::default(),
            reason: "request must be a JSON object",
        });
    };

    let id = obj
        .remove("id")
        .map_or_else(RequestId::default, RequestId::from_value);

    if let Some(tag) = obj.get("jsonrpc") {
        if tag.as_str() != Some(JSONRPC_VERSION) {
            return Err(DecodeError::Malformed {
                id,
                reason: "jsonrpc field must be \"2.0\"",
            });
        }
    }

    let method = match obj.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        Some(Value::String(_)) => {
            return Err(DecodeError::Malformed {
                id,
                reason: "method field cannot be empty",
            })
        }
        Some(_) => {
            return Err(DecodeError::Malformed {
                id,
                reason: "method field must be a string",
            })
        }
        None => {
            return Err(DecodeError::Malformed {
                id,
                reason: "method field is required",
            })
        }
    };

    let params = match obj.remove("params") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(params) => params,
    };

    Ok(Envelope { id, method, params })
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// Error codes this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    /// Unknown method, and also unknown tool name in `tools/call`.
    MethodNotFound = -32601,
    InvalidParams = -32602,
    /// Also used for handler failures and panics.
    InternalError = -32603,
}

impl ErrorCode {
    /// Wire value of the code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// The `error` member of an error reply.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    pub code: i32,
    pub message: String,
}

impl JsonRpcErrorData {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
        }
    }

    /// The error for a tool name that is not registered.
    #[must_use]
    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorCode::MethodNotFound, format!("Unknown tool: {name}"))
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to.
    pub id: RequestId,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: RequestId, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error,
        }
    }

    /// Creates a parse error response.
    #[must_use]
    pub fn parse_error(id: RequestId) -> Self {
        Self::new(id, JsonRpcErrorData::new(ErrorCode::ParseError, "Parse error"))
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: RequestId, reason: &str) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::new(
                ErrorCode::InvalidRequest,
                format!("Invalid Request: {reason}"),
            ),
        )
    }

    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::new(
                ErrorCode::MethodNotFound,
                format!("Method not found: {method}"),
            ),
        )
    }

    /// Creates an invalid params error response.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::new(ErrorCode::InvalidParams, message),
        )
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::new(ErrorCode::InternalError, message),
        )
    }
}

/// One encoded reply: a result or an error, never both.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// A successful result.
    Success(JsonRpcResponse),
    /// An error.
    Error(JsonRpcError),
}

impl Reply {
    /// Returns the id this reply echoes.
    #[must_use]
    pub const fn id(&self) -> &RequestId {
        match self {
            Self::Success(response) => &response.id,
            Self::Error(error) => &error.id,
        }
    }

    /// Returns the error code, if this is an error reply.
    #[must_use]
    pub const fn error_code(&self) -> Option<i32> {
        match self {
            Self::Success(_) => None,
            Self::Error(error) => Some(error.error.code),
        }
    }

    /// Serialises the reply to a single-line JSON string.
    ///
    /// Serialisation of these types cannot realistically fail, but if it
    /// does the caller still gets a well-formed internal error envelope.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, id = %self.id(), "Failed to serialise reply");
            let id = serde_json::to_string(self.id()).unwrap_or_else(|_| SENTINEL_ID.to_string());
            format!(
                r#"{{"jsonrpc":"2.0","id":{id},"error":{{"code":{},"message":"Internal error: failed to serialise reply"}}}}"#,
                ErrorCode::InternalError.code()
            )
        })
    }
}

/// Encodes a success reply.
#[must_use]
pub fn encode(id: RequestId, result: Value) -> Reply {
    Reply::Success(JsonRpcResponse::success(id, result))
}

/// Encodes an error reply.
#[must_use]
pub fn encode_error(id: RequestId, code: ErrorCode, message: impl Into<String>) -> Reply {
    Reply::Error(JsonRpcError::new(
        id,
        JsonRpcErrorData::new(code, message),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_valid_request() {
        let json = br#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let envelope = decode(json).unwrap();

        assert_eq!(envelope.id, RequestId::Number(1));
        assert_eq!(envelope.method, "initialize");
        assert_eq!(envelope.params, serde_json::json!({}));
    }

    #[test]
    fn decode_without_tag_id_or_params() {
        let envelope = decode(br#"{"method": "tools/list"}"#).unwrap();

        assert_eq!(envelope.id, RequestId::Number(SENTINEL_ID));
        assert_eq!(envelope.method, "tools/list");
        assert!(envelope.params.as_object().is_some_and(Map::is_empty));
    }

    #[test]
    fn decode_null_params_becomes_empty_object() {
        let envelope = decode(br#"{"id": 3, "method": "ping", "params": null}"#).unwrap();
        assert_eq!(envelope.params, serde_json::json!({}));
    }

    #[test]
    fn decode_string_id() {
        let envelope = decode(br#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#).unwrap();
        assert_eq!(envelope.id, RequestId::String("abc-123".to_string()));
    }

    #[test]
    fn decode_keeps_unusual_ids_verbatim() {
        let envelope = decode(br#"{"id": 2.5, "method": "ping"}"#).unwrap();
        assert_eq!(envelope.id, RequestId::Other(serde_json::json!(2.5)));

        let envelope = decode(br#"{"id": null, "method": "ping"}"#).unwrap();
        assert_eq!(envelope.id, RequestId::Other(Value::Null));
    }

    #[test]
    fn decode_invalid_json() {
        let err = decode(b"not valid json").unwrap_err();
        assert!(matches!(err, DecodeError::Parse(_)));
        assert_eq!(err.id(), RequestId::Number(SENTINEL_ID));
        assert_eq!(
            err.into_reply().error_code(),
            Some(ErrorCode::ParseError.code())
        );
    }

    #[test]
    fn decode_non_object() {
        let err = decode(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn decode_missing_method_keeps_id() {
        let err = decode(br#"{"id": 9, "params": {}}"#).unwrap_err();
        assert_eq!(err.id(), RequestId::Number(9));

        let reply = err.into_reply();
        assert_eq!(reply.id(), &RequestId::Number(9));
        assert_eq!(reply.error_code(), Some(ErrorCode::InvalidRequest.code()));
    }

    #[test]
    fn decode_non_string_method() {
        let err = decode(br#"{"id": 4, "method": 42}"#).unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn decode_wrong_jsonrpc_version() {
        let err = decode(br#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn serialise_success_response() {
        let reply = encode(RequestId::Number(1), serde_json::json!({"ok": true}));
        let json = reply.to_json();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
        assert!(!json.contains("error"));
    }

    #[test]
    fn serialise_error_response() {
        let reply = Reply::Error(JsonRpcError::method_not_found(
            RequestId::Number(1),
            "unknown/method",
        ));
        let json = reply.to_json();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
        assert!(!json.contains("result"));
    }

    #[test]
    fn encode_error_uses_code() {
        let reply = encode_error(
            RequestId::String("x".to_string()),
            ErrorCode::InternalError,
            "boom",
        );
        assert_eq!(reply.error_code(), Some(-32603));
        assert!(reply.to_json().contains(r#""id":"x""#));
    }

    #[test]
    fn serialised_reply_has_no_newlines() {
        let reply = encode(
            RequestId::Number(1),
            serde_json::json!({"text": "line one\nline two"}),
        );
        assert!(!reply.to_json().contains('\n'));
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::Number(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
        assert_eq!(format!("{}", RequestId::Other(Value::Null)), "null");
    }
}
