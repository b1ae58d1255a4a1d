//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes the tool registry to MCP clients over JSON-RPC 2.0.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            MCP Server                            │
//! │                                                                  │
//! │   ┌──────────────┐    ┌─────────────┐    ┌──────────────┐        │
//! │   │  Transport   │───▶│ Dispatcher  │───▶│   Registry   │        │
//! │   │ http/sse/io  │    │  (routing)  │    │   (tools)    │        │
//! │   └──────────────┘    └─────────────┘    └──────────────┘        │
//! │          │                  │                                    │
//! │          ▼                  ▼                                    │
//! │   ┌──────────────┐    ┌──────────────────────────────┐           │
//! │   │ Access layer │    │  Envelope codec (protocol)   │           │
//! │   └──────────────┘    └──────────────────────────────┘           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod access;
pub mod dispatcher;
pub mod http;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use protocol::{decode, encode, Envelope, JsonRpcError, Reply, RequestId, MCP_PROTOCOL_VERSION};
pub use registry::{Tool, ToolCallResult, ToolError, ToolOutput, ToolRegistry};
pub use server::McpServer;
pub use transport::StdioTransport;
