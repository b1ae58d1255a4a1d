//! Newline-delimited JSON transport.
//!
//! Used for `--transport stdio`:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends replies to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! Notifications are dispatched but get no reply line, as a line-oriented
//! peer has no response slot waiting for them.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::dispatcher::{Dispatcher, Method};
use crate::mcp::protocol::{decode, Reply};

/// A line-oriented transport over any async reader/writer pair.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

/// The transport wired to the process's stdin and stdout.
pub type StdioTransport = LineTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a transport over stdin/stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over the given halves.
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` at EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    /// Writes one reply, newline-terminated.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub async fn write_reply(&mut self, reply: &Reply) -> io::Result<()> {
        let json = reply.to_json();
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Handles one input line, writing a reply when one is due.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the reply fails.
    pub async fn handle_line(&mut self, dispatcher: &Dispatcher, line: &str) -> io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let reply = match decode(line.as_bytes()) {
            Ok(envelope) => {
                let is_notification =
                    matches!(Method::parse(&envelope.method), Method::Notification(_));
                let reply = dispatcher.dispatch(envelope).await;
                if is_notification {
                    return Ok(());
                }
                reply
            }
            Err(error) => {
                tracing::debug!(error = %error, "Rejected undecodable line");
                error.into_reply()
            }
        };

        self.write_reply(&reply).await
    }

    /// Serves lines until EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve(&mut self, dispatcher: &Dispatcher) -> io::Result<()> {
        while let Some(line) = self.read_line().await? {
            self.handle_line(dispatcher, &line).await?;
        }
        tracing::info!("Input closed, stopping line transport");
        Ok(())
    }

    /// Consumes the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}
