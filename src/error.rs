//! Error types for ooottt-mcp.
//!
//! Protocol-level failures never surface here: the dispatcher turns them into
//! error envelopes. These types cover process-level concerns that can stop the
//! server from starting or serving.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read {path}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or has unknown keys.
    #[error("{path} is not a valid config file")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// The underlying JSON error, with line and column.
        #[source]
        source: serde_json::Error,
    },

    /// An explicitly named file does not exist.
    #[error("no config file at {path}")]
    NotFound {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// A value parsed but is out of range.
    #[error("invalid {setting}: {reason}")]
    Invalid {
        /// Dotted key of the offending setting, e.g. `server.rpc_path`.
        setting: &'static str,
        /// What is wrong with the value.
        reason: String,
    },
}

/// Errors that stop a transport from serving.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listen address could not be parsed.
    #[error("invalid listen address: {address}")]
    InvalidAddress {
        /// The `host:port` string that failed to parse.
        address: String,
    },

    /// Binding the TCP listener failed.
    #[error("failed to bind {addr}")]
    Bind {
        /// Address the server tried to bind.
        addr: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Installing a shutdown signal handler failed.
    #[error("failed to install signal handler")]
    Signal(#[source] std::io::Error),

    /// Transport I/O failed while serving.
    #[error("transport I/O error")]
    Io(#[from] std::io::Error),

    /// The outbound HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}
