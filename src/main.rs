//! ooottt-mcp: MCP server for OTT subscription planning
//!
//! Serves the OTT tool set over HTTP, SSE or stdio.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use ooottt_mcp::config::{self, Config, TransportMode};
use ooottt_mcp::mcp::server::McpServer;
use ooottt_mcp::ott::{SubscriptionCatalog, TmdbClient};
use ooottt_mcp::tools;

/// MCP server for OTT subscription planning.
///
/// Exposes subscription-usage, recommendation and trend tools to AI
/// assistants over JSON-RPC.
#[derive(Parser, Debug)]
#[command(name = "ooottt-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Interface to bind
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// TCP port to bind
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Transport binding
    #[arg(long, env = "OOOTTT_TRANSPORT", value_enum)]
    transport: Option<TransportMode>,

    /// TMDB API key for the trend report
    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    tmdb_api_key: Option<String>,

    /// Externally visible base URL, announced to SSE clients
    #[arg(long, env = "PUBLIC_URL")]
    public_url: Option<String>,
}

impl Args {
    /// Layers CLI flags and environment variables over file values.
    fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(host) = &self.host {
            cfg.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
        if let Some(transport) = self.transport {
            cfg.server.transport = transport;
        }
        if let Some(public_url) = &self.public_url {
            cfg.server.public_url = Some(public_url.clone());
        }
    }
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Logs always go to stderr; stdout belongs to the stdio transport.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Copyright, warranty and source notice shown at startup.
fn license_notice() -> String {
    format!(
        "ooottt-mcp {}  Copyright (C) 2026  {}\n\
         This program comes with ABSOLUTELY NO WARRANTY.\n\
         This is free software, licensed under GPL-3.0-or-later.\n\
         Source: {}\n",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_AUTHORS"),
        env!("CARGO_PKG_REPOSITORY"),
    )
}

/// Entry point for the ooottt-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig read from: {}", default_path.display());
                    eprintln!("See config/example-config.json for the format");
                }
            }
            return ExitCode::FAILURE;
        }
    };
    args.apply_overrides(&mut cfg);
    if let Err(e) = cfg.validate() {
        eprintln!("Configuration error: {e}");
        return ExitCode::FAILURE;
    }

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // GPLv3 section 5d: interactive startup notice
    eprintln!("{}", license_notice());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = %cfg.server.transport,
        "Starting ooottt-mcp server"
    );

    let trends = match TmdbClient::new(&cfg.tmdb, args.tmdb_api_key.clone()) {
        Ok(client) => {
            if !client.has_credential() {
                info!("TMDB_API_KEY not set, trend report will use its fallback answer");
            }
            client
        }
        Err(e) => {
            error!(error = %e, "Failed to set up TMDB client");
            return ExitCode::FAILURE;
        }
    };

    let catalog = SubscriptionCatalog::from_config(&cfg.subscriptions);
    let registry = tools::registry(catalog, Arc::new(trends));
    let server = McpServer::new(cfg, registry);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
