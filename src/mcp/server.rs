//! Server lifecycle: transport selection, binding and graceful shutdown.
//!
//! 1. **Startup**: the registry is finished and frozen behind an `Arc`
//! 2. **Operation**: the configured transport feeds envelopes to the dispatcher
//! 3. **Shutdown**: SIGINT/SIGTERM (Ctrl+C elsewhere) or stdin EOF

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::{Config, TransportMode};
use crate::error::ServerError;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::http::{self, AppState, HttpSettings};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::transport::StdioTransport;

/// The MCP server for OTT subscription planning.
pub struct McpServer {
    config: Config,
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    /// Creates a server over a finished tool registry.
    #[must_use]
    pub fn new(config: Config, registry: ToolRegistry) -> Self {
        Self {
            config,
            dispatcher: Arc::new(Dispatcher::new(Arc::new(registry))),
        }
    }

    /// Returns the shared dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Builds the HTTP router for the configured mode.
    #[must_use]
    pub fn router(&self) -> Router {
        http::router(AppState::new(
            self.dispatcher(),
            HttpSettings::from_config(&self.config.server),
        ))
    }

    /// The `host:port` this server listens on.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured host and port do not form a socket
    /// address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ServerError> {
        let address = format!("{}:{}", self.config.server.host, self.config.server.port);
        address
            .parse()
            .map_err(|_| ServerError::InvalidAddress { address })
    }

    /// Binds the TCP listener for the HTTP transports.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or already in use.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.listen_addr()?;
        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Runs the configured transport until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if signal handlers cannot be installed, the listener
    /// cannot be bound, or transport I/O fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::install()?;

        match self.config.server.transport {
            TransportMode::Stdio => self.run_stdio(shutdown).await,
            TransportMode::Http | TransportMode::Sse => {
                let listener = self.bind().await?;
                self.serve(listener, shutdown.recv()).await
            }
        }
    }

    /// Serves HTTP on an already-bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept loop fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        tracing::info!(
            address = %local,
            transport = %self.config.server.transport,
            rpc_path = %self.config.server.rpc_path,
            tools = self.dispatcher.registry().len(),
            "Listening"
        );

        http::serve(listener, self.router(), shutdown).await?;
        tracing::info!("HTTP transport stopped");
        Ok(())
    }

    /// Serves newline-delimited JSON on stdin/stdout.
    async fn run_stdio(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        tracing::info!(
            tools = self.dispatcher.registry().len(),
            "Serving on stdio"
        );

        let mut transport = StdioTransport::stdio();
        tokio::select! {
            () = shutdown.recv() => Ok(()),
            result = transport.serve(&self.dispatcher) => result.map_err(ServerError::Io),
        }
    }
}

/// Process termination signals, installed up front so failures surface
/// before any transport starts.
pub struct ShutdownSignal {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Installs the handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses the signal registration.
    #[cfg(unix)]
    pub fn install() -> Result<Self, ServerError> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt()).map_err(ServerError::Signal)?,
            sigterm: signal(SignalKind::terminate()).map_err(ServerError::Signal)?,
        })
    }

    /// Installs the handlers.
    ///
    /// # Errors
    ///
    /// Never fails on this platform; Ctrl+C registration happens on first poll.
    #[cfg(not(unix))]
    #[allow(clippy::unnecessary_wraps)]
    pub fn install() -> Result<Self, ServerError> {
        Ok(Self {})
    }

    /// Resolves when the process is asked to stop.
    #[cfg(unix)]
    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = self.sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
        }
    }

    /// Resolves when the process is asked to stop.
    #[cfg(not(unix))]
    pub async fn recv(self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_from_config() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 8080;
        let server = McpServer::new(config, ToolRegistry::new());
        assert_eq!(
            server.listen_addr().unwrap(),
            "127.0.0.1:8080".parse().unwrap()
        );
    }

    #[test]
    fn bad_host_is_invalid_address() {
        let mut config = Config::default();
        config.server.host = "not a host".to_string();
        let server = McpServer::new(config, ToolRegistry::new());
        assert!(matches!(
            server.listen_addr(),
            Err(ServerError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        let server = McpServer::new(config, ToolRegistry::new());
        let listener = server.bind().await.unwrap();

        let result = server.serve(listener, async {}).await;
        assert!(result.is_ok());
    }
}
