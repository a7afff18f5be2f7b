// Module declarations
#[cfg(test)]
pub(crate) mod mock;
mod websocket;

// Public API exports
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::Result;

/// Which wire transport a socket should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Let the client pick; currently resolves to WebSocket.
    #[default]
    Auto,
    WebSocket,
    /// HTTP long-polling; requires a caller-supplied transport implementation.
    LongPoll,
}

/// Close details reported by a transport.
#[derive(Debug, Clone, Default)]
pub struct CloseInfo {
    pub code: Option<u16>,
    pub reason: String,
}

/// Events a transport emits after a successful `open`.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// One inbound text frame.
    Message(String),
    /// Transport-level failure; the connection may or may not survive it.
    Error(String),
    /// The underlying connection is gone.
    Closed(CloseInfo),
}

/// Abstract duplex channel carrying the wire protocol.
///
/// Implementations own their I/O tasks. `open` completes once the connection
/// is established, after which events flow on the supplied sender. `close`
/// emits a final `Closed` event when the connection was still up, so the
/// socket driver observes client-initiated closes the same way it observes
/// server-initiated ones.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, url: &str, events: mpsc::Sender<TransportEvent>) -> Result<()>;
    async fn send(&self, text: String) -> Result<()>;
    async fn close(&self);
}
