//! # phoenix-socket-rs
//!
//! A client for Phoenix-style channel sockets: one persistent duplex
//! connection, subdivided into topic-scoped channels, with framed
//! request/reply pushes and a declarative effect protocol for lifecycle
//! handling.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use phoenix_socket_rs::{
//!     ResponseEffect, SocketConnection, SocketEvent, TransportOptions,
//! };
//!
//! #[tokio::main]
//! async fn main() -> phoenix_socket_rs::Result<()> {
//!     let socket = SocketConnection::new(
//!         "wss://example.com/socket/websocket",
//!         TransportOptions {
//!             reconnect_after_ms: Some(vec![1000, 2000, 5000]),
//!             on_state_change: Some(Arc::new(|event: SocketEvent| match event {
//!                 SocketEvent::Error(_) => ResponseEffect::Disconnect,
//!                 _ => ResponseEffect::Ignore,
//!             })),
//!             ..Default::default()
//!         },
//!     )?;
//!
//!     socket.connect().await?;
//!
//!     let channel = socket.channel("room:lobby", Default::default()).await;
//!     let reply = channel.try_join(std::time::Duration::from_secs(5)).await?;
//!     println!("joined: {}", reply);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod effect;
pub mod infrastructure;
pub mod messaging;
pub mod socket;
pub mod transport;
pub mod types;

pub use channel::{ChannelConnection, ChannelOptions, ChannelStatus, PendingOperation, PushOutcome};
pub use effect::{
    ChannelEvent, ChannelEventHandler, MessageHandler, ResponseEffect, SocketEvent,
    SocketEventHandler, Task, TaskExecutor, TokioExecutor,
};
pub use infrastructure::{BackoffSchedule, LogEntry, LoggerPolicy};
pub use messaging::{Event, SystemEvent};
pub use socket::{ConnectionState, SocketConnection, TransportFactory, TransportOptions};
pub use transport::{CloseInfo, Transport, TransportEvent, TransportKind, WebSocketTransport};
pub use types::{PushMessage, Result, SocketError};
