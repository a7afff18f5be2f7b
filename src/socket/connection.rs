use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use crate::transport::{Transport, TransportEvent};
use crate::types::{PushMessage, Result, SocketError};

/// Socket lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    Closing,
    Errored,
}

/// Owns the live transport and serializes outbound traffic to it.
pub struct ConnectionManager {
    transport: RwLock<Option<Arc<dyn Transport>>>,
    state: RwLock<ConnectionState>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            transport: RwLock::new(None),
            state: RwLock::new(ConnectionState::Closed),
        }
    }

    /// Opens the transport and returns the event stream feeding the driver.
    pub async fn open(
        &self,
        transport: Arc<dyn Transport>,
        url: &str,
    ) -> Result<mpsc::Receiver<TransportEvent>> {
        let (events_tx, events_rx) = mpsc::channel(100);
        transport.open(url, events_tx).await?;
        *self.transport.write().await = Some(transport);
        Ok(events_rx)
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }

    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Open
    }

    /// Sends a message through the transport
    pub async fn send_message(&self, message: PushMessage) -> Result<()> {
        let json = serde_json::to_string(&message)?;

        let guard = self.transport.read().await;
        match guard.as_ref() {
            Some(transport) => transport.send(json).await,
            None => Err(SocketError::NotConnected),
        }
    }

    /// Closes the transport
    pub async fn close(&self) {
        self.set_state(ConnectionState::Closing).await;

        let transport = self.transport.write().await.take();
        if let Some(transport) = transport {
            transport.close().await;
        }

        self.set_state(ConnectionState::Closed).await;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
