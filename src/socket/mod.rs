// Module declarations
mod builder;
mod connection;
mod core;
mod state;

// Public API exports
pub use builder::{SocketBuilder, TransportFactory, TransportOptions};
pub use connection::{ConnectionManager, ConnectionState};
pub use self::core::SocketConnection;
pub use state::SocketState;
