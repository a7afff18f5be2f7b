use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{RwLock, mpsc, watch};

use super::connection::{ConnectionManager, ConnectionState};
use super::core::SocketConnection;
use super::state::SocketState;
use crate::effect::{SocketEventHandler, TaskExecutor, TokioExecutor};
use crate::infrastructure::{BackoffSchedule, LoggerPolicy, SocketLogger};
use crate::transport::{Transport, TransportKind, WebSocketTransport};
use crate::types::{Result, SocketError};

/// Creates a fresh transport for every connection attempt.
pub type TransportFactory = Arc<dyn Fn() -> Arc<dyn Transport> + Send + Sync>;

/// Configuration for a SocketConnection.
#[derive(Clone, Default)]
pub struct TransportOptions {
    /// Which wire transport to use. Auto currently resolves to WebSocket.
    pub transport: TransportKind,
    /// Heartbeat period; defaults to 25 seconds.
    pub heartbeat_interval_ms: Option<u64>,
    /// Reconnect delays consulted by attempt index, clamped to the last
    /// entry. Must be non-empty when present.
    pub reconnect_after_ms: Option<Vec<u64>>,
    /// Protocol logging policy; silent when absent.
    pub logger: Option<LoggerPolicy>,
    /// Carried for long-poll transports; the WebSocket transport ignores it.
    pub longpoll_timeout_ms: Option<u64>,
    /// Connection params appended to the endpoint URL query string.
    pub params: Option<Value>,
    /// Lifecycle handler; its returned effect is interpreted immediately.
    pub on_state_change: Option<SocketEventHandler>,
    /// Sink for SendMessage effects; they are dropped with a warning when
    /// no bus is configured.
    pub message_bus: Option<mpsc::UnboundedSender<Value>>,
    /// Executor for PerformTask effects; defaults to spawning on tokio.
    pub task_executor: Option<Arc<dyn TaskExecutor>>,
    /// Overrides the built-in transport; required for LongPoll.
    pub transport_factory: Option<TransportFactory>,
}

/// Builder for SocketConnection that validates options and spawns the
/// reconnect watcher.
pub struct SocketBuilder {
    endpoint: String,
    options: TransportOptions,
}

impl SocketBuilder {
    pub fn new(endpoint: impl Into<String>, options: TransportOptions) -> Result<Self> {
        if let Some(delays) = &options.reconnect_after_ms {
            if delays.is_empty() {
                return Err(SocketError::Config(
                    "reconnect_after_ms must be non-empty when set".to_string(),
                ));
            }
        }

        if options.transport == TransportKind::LongPoll && options.transport_factory.is_none() {
            return Err(SocketError::Config(
                "long-poll transport is not built in; supply a transport_factory".to_string(),
            ));
        }

        Ok(Self {
            endpoint: endpoint.into(),
            options,
        })
    }

    /// Build the socket and spawn the reconnect watcher task
    pub fn build(self) -> SocketConnection {
        let backoff = match &self.options.reconnect_after_ms {
            Some(delays) => BackoffSchedule::new(delays.clone()),
            None => BackoffSchedule::default(),
        };

        let factory: TransportFactory = match &self.options.transport_factory {
            Some(factory) => Arc::clone(factory),
            None => Arc::new(|| Arc::new(WebSocketTransport::new()) as Arc<dyn Transport>),
        };

        let logger = SocketLogger::new(self.options.logger.clone());
        let executor: Arc<dyn TaskExecutor> = self
            .options
            .task_executor
            .clone()
            .unwrap_or_else(|| Arc::new(TokioExecutor));

        let mut socket_state = SocketState::new(self.options.params.clone());

        // Initialize state watcher channel
        let (state_tx, state_rx) = watch::channel((ConnectionState::Closed, false));
        socket_state.state_change_tx = Some(state_tx);

        let socket = SocketConnection {
            endpoint: self.endpoint,
            options: self.options,
            connection: Arc::new(ConnectionManager::new()),
            state: Arc::new(RwLock::new(socket_state)),
            backoff: Arc::new(backoff),
            factory,
            logger,
            executor,
        };

        // Spawn reconnection watcher task
        let socket_for_watcher = socket.clone();
        tokio::spawn(async move {
            let mut rx = state_rx;

            while rx.changed().await.is_ok() {
                let (state, was_manual) = *rx.borrow_and_update();

                if matches!(state, ConnectionState::Closed | ConnectionState::Errored)
                    && !was_manual
                {
                    tracing::info!("state watcher observed disconnect, scheduling reconnect");

                    if let Err(e) = socket_for_watcher.try_reconnect().await {
                        tracing::error!("reconnection watcher failed: {}", e);
                    }
                }
            }
            tracing::debug!("reconnection watcher finished");
        });

        socket
    }
}
