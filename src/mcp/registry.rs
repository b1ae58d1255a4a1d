//! Tool registry: name → {description, input schema, handler}.
//!
//! The registry is filled once at startup and then shared read-only as
//! `Arc<ToolRegistry>`. `tools/list` advertises entries in registration order.
//!
//! Tools are usually registered through the typed [`Tool`] trait. Its adapter
//! checks the schema's `required` keys and deserialises `arguments` into the
//! tool's own parameter struct before the handler runs, so handlers never
//! pick fields out of raw JSON.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a successful tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool, in order.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Creates a single-block text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }

    /// Concatenates all text blocks, separated by newlines.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// What a handler produced.
///
/// A handler that depends on an upstream service returns `Fallback` with a
/// degraded answer when that service is unavailable, instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    /// The full answer.
    Primary(ToolCallResult),
    /// A documented degraded answer.
    Fallback {
        /// The degraded answer sent to the caller.
        result: ToolCallResult,
        /// Why the primary answer was unavailable (logged, not sent).
        reason: String,
    },
}

impl ToolOutput {
    /// Returns the answer regardless of provenance.
    #[must_use]
    pub const fn result(&self) -> &ToolCallResult {
        match self {
            Self::Primary(result) | Self::Fallback { result, .. } => result,
        }
    }

    /// Returns `true` for a fallback answer.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

impl From<ToolCallResult> for ToolOutput {
    fn from(result: ToolCallResult) -> Self {
        Self::Primary(result)
    }
}

/// Errors a tool handler can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// The arguments do not match the tool's input schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The handler failed.
    #[error("{0}")]
    Failed(String),
}

/// Object-safe handler stored in the registry.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool with the raw `arguments` object from `tools/call`.
    async fn invoke(&self, arguments: Value) -> Result<ToolOutput, ToolError>;
}

/// A tool with a typed parameter struct.
///
/// Default values for optional parameters belong on `Params` (via
/// `#[serde(default)]`), not in the dispatcher.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    /// Parameters deserialised from `arguments`.
    type Params: DeserializeOwned + Send;

    /// Unique tool name.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// JSON Schema for `Params`.
    fn input_schema(&self) -> Value;

    /// Runs the tool.
    async fn call(&self, params: Self::Params) -> Result<ToolOutput, ToolError>;
}

/// Adapts a [`Tool`] into a [`ToolHandler`].
struct Typed<T> {
    tool: T,
    required: Vec<String>,
}

#[async_trait]
impl<T: Tool> ToolHandler for Typed<T> {
    async fn invoke(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let params = validate_arguments::<T::Params>(&self.required, arguments)?;
        self.tool.call(params).await
    }
}

/// Returns the `required` keys declared by an object schema.
#[must_use]
pub fn required_keys(schema: &Value) -> Vec<String> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|keys| {
            keys.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Checks `arguments` against the required keys and deserialises it.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArguments`] if `arguments` is not an object,
/// misses a required key, or does not fit `P`.
pub fn validate_arguments<P: DeserializeOwned>(
    required: &[String],
    arguments: Value,
) -> Result<P, ToolError> {
    let Some(object) = arguments.as_object() else {
        return Err(ToolError::InvalidArguments(
            "arguments must be a JSON object".to_string(),
        ));
    };

    let missing: Vec<&str> = required
        .iter()
        .filter(|key| !object.contains_key(key.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(ToolError::InvalidArguments(format!(
            "missing required argument(s): {}",
            missing.join(", ")
        )));
    }

    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// A registry entry.
#[derive(Clone)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
    /// The handler invoked by `tools/call`.
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// Creates a descriptor from its parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    /// Returns the advertised `{name, description, inputSchema}` triple.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

/// Lookup of an unregistered tool name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown tool: {name}")]
pub struct ToolNotFound {
    /// The name that was looked up.
    pub name: String,
}

/// Ordered collection of tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor, replacing any entry with the same name.
    ///
    /// A replaced entry keeps its original position in [`list`](Self::list).
    /// Returns the replaced descriptor, if any.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Option<ToolDescriptor> {
        let replaced = self.tools.insert(descriptor.name.clone(), descriptor);
        if let Some(ref old) = replaced {
            tracing::warn!(tool = %old.name, "Tool registered twice, keeping the later handler");
        }
        replaced
    }

    /// Registers a typed tool.
    pub fn register_tool<T: Tool>(&mut self, tool: T) -> Option<ToolDescriptor> {
        let input_schema = tool.input_schema();
        let required = required_keys(&input_schema);
        let descriptor = ToolDescriptor::new(
            tool.name(),
            tool.description(),
            input_schema,
            Arc::new(Typed { tool, required }),
        );
        self.register(descriptor)
    }

    /// Returns all entries in registration order.
    pub fn list(&self) -> impl ExactSizeIterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Returns the advertised definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.list().map(ToolDescriptor::definition).collect()
    }

    /// Returns the registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Looks up a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolNotFound`] if no tool has that name.
    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, ToolNotFound> {
        self.tools.get(name).ok_or_else(|| ToolNotFound {
            name: name.to_string(),
        })
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
