//! Method routing for decoded envelopes.
//!
//! The protocol is conceptually `UNINITIALIZED → READY`, but the server is
//! lenient: `tools/list` and `tools/call` work without a prior `initialize`,
//! and `initialize` may be repeated. No state is kept between requests, so a
//! single [`Dispatcher`] is shared by every connection.
//!
//! Nothing raised by a tool escapes [`Dispatcher::dispatch`]: handler errors
//! and panics become error envelopes carrying the request id.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::mcp::protocol::{
    decode, encode, Envelope, ErrorCode, JsonRpcError, JsonRpcErrorData, Reply, RequestId,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::registry::{ToolCallResult, ToolError, ToolOutput, ToolRegistry};

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// A top-level method name, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method<'a> {
    /// `initialize`
    Initialize,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// `ping`
    Ping,
    /// Any `notifications/*` method.
    Notification(&'a str),
    /// Anything else.
    Unknown(&'a str),
}

impl<'a> Method<'a> {
    /// Classifies a method string.
    #[must_use]
    pub fn parse(method: &'a str) -> Self {
        match method {
            "initialize" => Self::Initialize,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            "ping" => Self::Ping,
            other if other.starts_with("notifications/") => Self::Notification(other),
            other => Self::Unknown(other),
        }
    }
}

/// Routes envelopes to protocol handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl Dispatcher {
    /// Creates a dispatcher over a finished registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            server_info: ServerInfo::default(),
        }
    }

    /// Returns the registry this dispatcher resolves tools in.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Returns the advertised server identity.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Decodes a raw payload and dispatches it.
    pub async fn handle_raw(&self, raw: &[u8]) -> Reply {
        match decode(raw) {
            Ok(envelope) => self.dispatch(envelope).await,
            Err(error) => {
                tracing::debug!(error = %error, "Rejected undecodable request");
                error.into_reply()
            }
        }
    }

    /// Dispatches one decoded envelope. Always returns a reply.
    pub async fn dispatch(&self, envelope: Envelope) -> Reply {
        let Envelope { id, method, params } = envelope;
        tracing::debug!(%id, %method, "Dispatching request");

        match Method::parse(&method) {
            Method::Initialize => encode(id, self.initialize_result()),
            Method::ToolsList => encode(id, json!({ "tools": self.registry.definitions() })),
            Method::ToolsCall => self.call_tool(id, params).await,
            Method::Ping => encode(id, json!({})),
            Method::Notification(name) => {
                tracing::debug!(notification = name, "Acknowledged notification");
                encode(id, json!({}))
            }
            Method::Unknown(name) => {
                tracing::debug!(method = name, "Unknown method");
                Reply::Error(JsonRpcError::method_not_found(id, name))
            }
        }
    }

    /// The fixed `initialize` result.
    #[must_use]
    pub fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": self.server_info,
        })
    }

    /// Handles `tools/call`.
    async fn call_tool(&self, id: RequestId, params: Value) -> Reply {
        let ToolCallParams { name, arguments } = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(e) => {
                return Reply::Error(JsonRpcError::invalid_params(
                    id,
                    format!("Invalid tool call params: {e}"),
                ))
            }
        };

        let result = match self.run_tool(&name, arguments).await {
            Ok(result) => result,
            Err(error) => return Reply::Error(JsonRpcError::new(id, error)),
        };

        match serde_json::to_value(&result) {
            Ok(value) => encode(id, value),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialise tool call result");
                Reply::Error(JsonRpcError::internal_error(
                    id,
                    "Internal error: failed to serialise result",
                ))
            }
        }
    }

    /// Resolves and runs one tool, outside any envelope.
    ///
    /// `null` arguments count as `{}`. Handler errors and panics come back as
    /// the error object a `tools/call` reply would carry.
    ///
    /// # Errors
    ///
    /// Returns `MethodNotFound` for an unregistered name, `InvalidParams` for
    /// rejected arguments and `InternalError` for handler failures, panics and
    /// empty results.
    pub async fn run_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, JsonRpcErrorData> {
        let arguments = if arguments.is_null() {
            Value::Object(Map::new())
        } else {
            arguments
        };

        let Ok(descriptor) = self.registry.resolve(name) else {
            tracing::warn!(tool = %name, "Call to unknown tool");
            return Err(JsonRpcErrorData::unknown_tool(name));
        };

        let started = Instant::now();
        let outcome = AssertUnwindSafe(descriptor.handler.invoke(arguments))
            .catch_unwind()
            .await;
        let elapsed_ms = started.elapsed().as_millis();

        match outcome {
            Ok(Ok(output)) => {
                if let ToolOutput::Fallback { ref reason, .. } = output {
                    tracing::warn!(tool = %name, reason = %reason, "Tool returned fallback answer");
                }
                tracing::info!(tool = %name, elapsed_ms, "Tool call completed");
                let result = match output {
                    ToolOutput::Primary(result) | ToolOutput::Fallback { result, .. } => result,
                };
                if result.content.is_empty() {
                    return Err(JsonRpcErrorData::new(
                        ErrorCode::InternalError,
                        format!("Tool {name} returned no content"),
                    ));
                }
                Ok(result)
            }
            Ok(Err(ToolError::InvalidArguments(message))) => {
                tracing::info!(tool = %name, %message, "Tool call rejected");
                Err(JsonRpcErrorData::new(
                    ErrorCode::InvalidParams,
                    format!("Invalid arguments for {name}: {message}"),
                ))
            }
            Ok(Err(error)) => {
                tracing::error!(tool = %name, error = %error, "Tool call failed");
                Err(JsonRpcErrorData::new(ErrorCode::InternalError, error.to_string()))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(tool = %name, panic = %message, "Tool handler panicked");
                Err(JsonRpcErrorData::new(ErrorCode::InternalError, message))
            }
        }
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool handler panicked".to_string())
}
