//! HTTP bindings for the dispatcher.
//!
//! # Routes
//!
//! | Mode | Route | Behaviour |
//! |------|-------|-----------|
//! | http | `POST <rpc>` | one envelope in, one reply out |
//! | http | `GET <rpc>` | static server descriptor |
//! | sse  | `GET <rpc>` | event stream: `endpoint` frame, then keep-alives |
//! | sse  | `POST <rpc>/message`, `POST <rpc>` | one envelope in, one reply out |
//! | all  | `POST <rpc>/tools/{tool}` | arguments object in, `{"result": text}` out |
//! | all  | `GET /health` | liveness check |
//! | all  | `GET /` | server summary |
//!
//! Envelope replies always travel in the POST response body with status 200.
//! The event stream only announces where to POST and keeps the connection
//! warm. The per-tool route skips the envelope and uses HTTP statuses.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::{ServerConfig, TransportMode};
use crate::error::ServerError;
use crate::mcp::access;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::protocol::{ErrorCode, MCP_PROTOCOL_VERSION, SERVER_DESCRIPTION};

/// Route suffix for envelopes in sse mode.
pub const MESSAGE_SUFFIX: &str = "/message";

/// Route segment of the per-tool binding.
pub const TOOLS_SEGMENT: &str = "/tools";

/// Liveness check route.
pub const HEALTH_PATH: &str = "/health";

/// Text of the periodic SSE comment frame.
pub const KEEP_ALIVE_TEXT: &str = "keep-alive";

/// The subset of server settings the HTTP layer needs.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Route carrying envelopes (and the event stream in sse mode).
    pub rpc_path: String,
    /// Which HTTP binding to expose.
    pub transport: TransportMode,
    /// Interval between keep-alive frames.
    pub keep_alive: Duration,
    /// Externally visible base URL, if configured.
    pub public_url: Option<String>,
}

impl HttpSettings {
    /// Extracts HTTP settings from the server configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            rpc_path: config.rpc_path.clone(),
            transport: config.transport,
            keep_alive: Duration::from_secs(config.keep_alive_secs),
            public_url: config.public_url.clone(),
        }
    }

    /// Route for envelopes in sse mode.
    #[must_use]
    pub fn message_path(&self) -> String {
        format!("{}{MESSAGE_SUFFIX}", self.rpc_path)
    }

    /// Route pattern of the per-tool binding.
    #[must_use]
    pub fn tool_route(&self) -> String {
        format!("{}{TOOLS_SEGMENT}/{{tool}}", self.rpc_path)
    }

    /// Absolute URL clients should POST envelopes to.
    ///
    /// Prefers the configured public URL; otherwise reconstructs the origin
    /// from proxy headers, then `Host`.
    #[must_use]
    pub fn message_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.public_url {
            return format!("{}{}", base.trim_end_matches('/'), self.message_path());
        }

        let proto = first_header_value(headers, "x-forwarded-proto").unwrap_or("http");
        let host = first_header_value(headers, "x-forwarded-host")
            .or_else(|| first_header_value(headers, HOST.as_str()))
            .unwrap_or("localhost");
        format!("{proto}://{host}{}", self.message_path())
    }
}

/// First comma-separated element of a header, trimmed.
fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    settings: Arc<HttpSettings>,
}

impl AppState {
    /// Creates handler state.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, settings: HttpSettings) -> Self {
        Self {
            dispatcher,
            settings: Arc::new(settings),
        }
    }
}

/// Builds the router for the configured mode.
///
/// `stdio` has no HTTP surface of its own; it gets the plain `http` routes.
pub fn router(state: AppState) -> Router {
    let rpc_path = state.settings.rpc_path.clone();

    let routes = match state.settings.transport {
        TransportMode::Sse => Router::new()
            .route(&rpc_path, get(open_stream).post(handle_envelope))
            .route(&state.settings.message_path(), post(handle_envelope)),
        TransportMode::Http | TransportMode::Stdio => {
            Router::new().route(&rpc_path, post(handle_envelope).get(describe))
        }
    };

    let routes = routes
        .route(&state.settings.tool_route(), post(call_named_tool))
        .route(HEALTH_PATH, get(health))
        .route("/", get(summary))
        .fallback(not_found);

    access::apply(routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `router` on an already-bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the accept loop fails.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Io)
}

/// One envelope in, one reply out.
async fn handle_envelope(State(state): State<AppState>, body: Bytes) -> Response {
    let reply = state.dispatcher.handle_raw(&body).await;
    if let Some(code) = reply.error_code() {
        tracing::debug!(id = %reply.id(), code, "Replying with error");
    }
    ([(CONTENT_TYPE, "application/json")], reply.to_json()).into_response()
}

/// Runs one tool with the request body as its arguments object.
async fn call_named_tool(
    State(state): State<AppState>,
    Path(tool): Path<String>,
    body: Bytes,
) -> Response {
    let arguments = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(arguments) => arguments,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("Invalid JSON body: {e}") })),
                )
                    .into_response();
            }
        }
    };

    match state.dispatcher.run_tool(&tool, arguments).await {
        Ok(result) => Json(json!({ "result": result.joined_text() })).into_response(),
        Err(error) => {
            let status = match error.code {
                code if code == ErrorCode::MethodNotFound.code() => StatusCode::NOT_FOUND,
                code if code == ErrorCode::InvalidParams.code() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": error.message }))).into_response()
        }
    }
}

/// Static descriptor: identity plus the tool catalogue.
async fn describe(State(state): State<AppState>) -> Json<Value> {
    let info = state.dispatcher.server_info();
    Json(json!({
        "name": info.name,
        "version": info.version,
        "description": SERVER_DESCRIPTION,
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "tools": state.dispatcher.registry().definitions(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Human-oriented summary of the deployment.
async fn summary(State(state): State<AppState>) -> Json<Value> {
    let info = state.dispatcher.server_info();
    let settings = &state.settings;
    let endpoints = match settings.transport {
        TransportMode::Sse => json!({
            "events": settings.rpc_path,
            "messages": settings.message_path(),
            "tool": settings.tool_route(),
            "health": HEALTH_PATH,
        }),
        TransportMode::Http | TransportMode::Stdio => json!({
            "rpc": settings.rpc_path,
            "tool": settings.tool_route(),
            "health": HEALTH_PATH,
        }),
    };
    let tools: Vec<&str> = state.dispatcher.registry().names().collect();

    Json(json!({
        "name": info.name,
        "version": info.version,
        "description": SERVER_DESCRIPTION,
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "transport": settings.transport.to_string(),
        "endpoints": endpoints,
        "tools": tools,
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found" })),
    )
}

/// Logs connection lifetime; dropped when the client goes away.
struct ConnectionGuard {
    id: Uuid,
    opened: Instant,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        tracing::info!(
            connection = %self.id,
            duration_secs = self.opened.elapsed().as_secs(),
            "Event stream closed"
        );
    }
}

/// Opens the event stream: an `endpoint` frame, then keep-alives only.
async fn open_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let guard = ConnectionGuard {
        id: Uuid::new_v4(),
        opened: Instant::now(),
    };
    let endpoint = state.settings.message_url(&headers);
    tracing::info!(connection = %guard.id, endpoint = %endpoint, "Event stream opened");

    let announce = Event::default().event("endpoint").data(endpoint);
    let events = stream::once(async move { Ok::<_, Infallible>(announce) })
        .chain(stream::pending())
        .map(move |event| {
            let _connection = &guard;
            event
        });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.settings.keep_alive)
            .text(KEEP_ALIVE_TEXT),
    )
}
