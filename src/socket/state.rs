use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use super::connection::ConnectionState;
use super::core::ConnectOutcome;
use crate::channel::ChannelConnection;
use crate::channel::push::PendingOperation;
use crate::infrastructure::TaskManager;

/// Consolidated mutable state for a SocketConnection.
/// Using a single struct reduces lock contention.
pub struct SocketState {
    /// Current ref counter for message IDs
    pub ref_counter: u64,

    /// Pending heartbeat ref (if any)
    pub pending_heartbeat_ref: Option<String>,

    /// All channels owned by this socket; topics are not deduplicated
    pub channels: Vec<Arc<ChannelConnection>>,

    /// Background task manager
    pub task_manager: TaskManager,

    /// Whether the disconnect was manual (prevents auto-reconnect)
    pub was_manual_disconnect: bool,

    /// Reconnect attempts since the last successful open
    pub reconnect_attempts: u32,

    /// Connection params appended to the endpoint URL at the next (re)connect
    pub params: Option<Value>,

    /// Single-fire race armed by `try_connect`
    pub(crate) pending_connect: Option<Arc<PendingOperation<ConnectOutcome>>>,

    /// Sender for state change notifications
    pub state_change_tx: Option<watch::Sender<(ConnectionState, bool)>>,
}

impl SocketState {
    pub fn new(params: Option<Value>) -> Self {
        Self {
            ref_counter: 0,
            pending_heartbeat_ref: None,
            channels: Vec::new(),
            task_manager: TaskManager::new(),
            was_manual_disconnect: false,
            reconnect_attempts: 0,
            params,
            pending_connect: None,
            state_change_tx: None,
        }
    }

    /// Generate next message reference
    pub fn make_ref(&mut self) -> String {
        self.ref_counter += 1;
        self.ref_counter.to_string()
    }

    /// Notify state change watchers
    pub fn notify_state_change(&self, state: ConnectionState, manual: bool) {
        if let Some(tx) = &self.state_change_tx
            && tx.send((state, manual)).is_err()
        {
            tracing::debug!(
                "state change watcher disconnected, could not notify state: {:?}",
                state
            );
        }
    }
}

impl Default for SocketState {
    fn default() -> Self {
        Self::new(None)
    }
}
