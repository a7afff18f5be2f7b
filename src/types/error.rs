use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when driving a socket or one of its channels.
#[derive(Error, Debug)]
pub enum SocketError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Transport failure surfaced through the transport event stream
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server rejected a join or push; carries the server-supplied reason
    #[error("Server rejected request: {0}")]
    ErrorReply(Value),

    /// No reply arrived within the caller-specified deadline
    #[error("Timeout error")]
    Timeout,

    /// A join was issued while a previous join is outstanding or accepted
    #[error("Channel is already joining or joined")]
    AlreadyJoined,

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for `Result<T, SocketError>`.
pub type Result<T> = std::result::Result<T, SocketError>;
