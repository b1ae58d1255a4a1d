//! ooottt-mcp: MCP server for OTT subscription planning
//!
//! This library exposes a small set of named tools to chat assistants over a
//! JSON-RPC 2.0 handshake (`initialize`, `tools/list`, `tools/call`).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about OTT services:
//!
//! - **Envelope codec**: lenient decoding, result/error encoding
//! - **Dispatcher**: method routing, handler panics contained
//! - **Transports**: HTTP POST, SSE with keep-alives, or stdio
//!
//! The tools plug into a [`mcp::registry::ToolRegistry`] built once at
//! startup:
//!
//! - Subscription usage arithmetic over a configurable fee table
//! - Short-content, search and expiry tables
//! - A weekly trend report from TMDB, degrading to a fallback answer
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol implementation
//! - [`ott`]: Fee catalogue and TMDB client
//! - [`tools`]: The OTT tool set

pub mod config;
pub mod error;
pub mod mcp;
pub mod ott;
pub mod tools;
