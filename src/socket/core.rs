use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use url::Url;

use super::builder::{SocketBuilder, TransportFactory, TransportOptions};
use super::connection::{ConnectionManager, ConnectionState};
use super::state::SocketState;
use crate::channel::push::PendingOperation;
use crate::channel::{ChannelConnection, ChannelOptions};
use crate::effect::{ResponseEffect, SocketEvent, Task, TaskExecutor};
use crate::infrastructure::{BackoffSchedule, HeartbeatManager, SocketLogger};
use crate::messaging::MessageRouter;
use crate::transport::TransportEvent;
use crate::types::constants::{HEARTBEAT_INTERVAL, VSN};
use crate::types::{PushMessage, Result, SocketError};

/// Outcome of the single-fire connect race armed by `try_connect`.
#[derive(Debug, Clone)]
pub(crate) enum ConnectOutcome {
    Open,
    Error(String),
}

/// One persistent duplex connection to a server endpoint.
///
/// The socket owns the transport, drives the connect/reconnect state machine
/// and multiplexes inbound traffic to its channels by topic. Lifecycle
/// transitions are reported to the optional state-change handler, whose
/// returned [`ResponseEffect`] is interpreted immediately.
///
/// # Example
///
/// ```no_run
/// use phoenix_socket_rs::{SocketConnection, TransportOptions};
///
/// # async fn example() -> phoenix_socket_rs::Result<()> {
/// let socket = SocketConnection::new(
///     "wss://example.com/socket/websocket",
///     TransportOptions::default(),
/// )?;
///
/// socket.connect().await?;
/// let channel = socket.channel("room:lobby", Default::default()).await;
/// channel.join().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SocketConnection {
    pub(crate) endpoint: String,
    pub(crate) options: TransportOptions,

    // Connection manager
    pub(crate) connection: Arc<ConnectionManager>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<SocketState>>,

    pub(crate) backoff: Arc<BackoffSchedule>,
    pub(crate) factory: TransportFactory,
    pub(crate) logger: SocketLogger,
    pub(crate) executor: Arc<dyn TaskExecutor>,
}

impl SocketConnection {
    /// Creates a new socket without connecting it. Fails when the options
    /// are invalid (empty reconnect sequence, long-poll without a custom
    /// transport).
    pub fn new(endpoint: impl Into<String>, options: TransportOptions) -> Result<Self> {
        SocketBuilder::new(endpoint, options).map(|builder| builder.build())
    }

    /// Set connection state and notify watchers
    async fn set_state(&self, new_state: ConnectionState) {
        self.connection.set_state(new_state).await;

        let state = self.state.read().await;
        state.notify_state_change(new_state, state.was_manual_disconnect);
    }

    /// Set manual disconnect flag and notify watchers
    async fn set_manual_disconnect(&self, manual: bool) {
        let mut state = self.state.write().await;
        state.was_manual_disconnect = manual;

        let conn_state = self.connection.state().await;
        state.notify_state_change(conn_state, manual);
    }

    /// Establishes the connection; idempotent while Open or Connecting.
    ///
    /// Resolves once the transport handshake completes. Transport failures
    /// after that point are reported through the state-change handler and
    /// the automatic reconnect path.
    pub async fn connect(&self) -> Result<()> {
        {
            let state = self.connection.state().await;
            if state == ConnectionState::Open || state == ConnectionState::Connecting {
                return Ok(());
            }
        }

        let url = self.build_endpoint_url().await?;
        self.set_state(ConnectionState::Connecting).await;

        // clear out tasks and heartbeat state from the previous epoch
        {
            let mut state = self.state.write().await;
            state.task_manager.abort_all();
            state.pending_heartbeat_ref = None;
        }

        tracing::info!("connecting to {}", self.endpoint);
        self.logger
            .log("socket", &format!("connecting to {}", self.endpoint), None);

        let transport = (self.factory)();
        let events = match self.connection.open(transport, &url).await {
            Ok(events) => events,
            Err(e) => {
                self.set_state(ConnectionState::Errored).await;
                self.dispatch_lifecycle(SocketEvent::Error(e.to_string()))
                    .await;
                return Err(e);
            }
        };

        // driver task: pumps transport events into routing and lifecycle
        // dispatch
        let driver = self.clone();
        {
            let mut state = self.state.write().await;
            state.task_manager.spawn(async move {
                driver.drive(events).await;
            });
        }

        let heartbeat_interval = self
            .options
            .heartbeat_interval_ms
            .unwrap_or(HEARTBEAT_INTERVAL);
        let heartbeat = HeartbeatManager::new(Arc::downgrade(&self.connection))
            .with_interval(Duration::from_millis(heartbeat_interval));
        heartbeat.spawn_on(&self.state).await;

        self.set_manual_disconnect(false).await;
        self.set_state(ConnectionState::Open).await;
        self.state.write().await.reconnect_attempts = 0;
        self.dispatch_lifecycle(SocketEvent::Open).await;

        tracing::info!("socket open");
        Ok(())
    }

    /// Connects and resolves exactly once: success on the first open,
    /// failure (after disconnecting) on the first transport error. Later
    /// raw events cannot flip the result.
    pub async fn try_connect(&self) -> Result<()> {
        let (operation, rx) = PendingOperation::new();
        self.state.write().await.pending_connect = Some(Arc::clone(&operation));

        match self.connect().await {
            Ok(()) => {
                operation.resolve(ConnectOutcome::Open);
            }
            Err(e) => {
                operation.resolve(ConnectOutcome::Error(e.to_string()));
            }
        }

        let outcome = rx
            .await
            .unwrap_or_else(|_| ConnectOutcome::Error("connection torn down".to_string()));
        self.state.write().await.pending_connect = None;

        match outcome {
            ConnectOutcome::Open => Ok(()),
            ConnectOutcome::Error(detail) => {
                self.disconnect().await?;
                Err(SocketError::Transport(detail))
            }
        }
    }

    async fn drive(&self, mut events: mpsc::Receiver<TransportEvent>) {
        let router = MessageRouter::new(Arc::clone(&self.state));

        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Message(text) => {
                    match serde_json::from_str::<PushMessage>(&text) {
                        Ok(message) => {
                            self.logger.log(
                                "receive",
                                &format!("{} {}", message.topic, message.event),
                                Some(message.payload.clone()),
                            );
                            router.route(message).await;
                        }
                        Err(e) => {
                            tracing::error!("failed to parse message: {} - raw: {}", e, text);
                        }
                    }
                }
                TransportEvent::Error(detail) => {
                    tracing::error!("transport error: {}", detail);
                    self.set_state(ConnectionState::Errored).await;
                    self.dispatch_lifecycle(SocketEvent::Error(detail)).await;
                }
                TransportEvent::Closed(info) => {
                    tracing::warn!(
                        "transport closed: code={:?} reason='{}'",
                        info.code,
                        info.reason
                    );
                    self.set_state(ConnectionState::Closed).await;
                    self.dispatch_lifecycle(SocketEvent::Closed(info)).await;
                    break;
                }
            }
        }
        tracing::debug!("driver task finished");
    }

    pub(crate) async fn try_reconnect(&self) -> Result<()> {
        if self.state.read().await.was_manual_disconnect {
            tracing::info!("manual disconnect detected, will not attempt to reconnect");
            return Ok(());
        }

        loop {
            {
                let state = self.connection.state().await;
                if state == ConnectionState::Open || state == ConnectionState::Connecting {
                    tracing::info!("already connected or connecting, stopping reconnect attempts");
                    break;
                }
            }

            let attempt = {
                let mut state = self.state.write().await;
                state.reconnect_attempts += 1;
                state.reconnect_attempts
            };
            let delay = self.backoff.delay(attempt);
            tracing::info!("reconnect attempt {} in {:?}", attempt, delay);
            tokio::time::sleep(delay).await;

            // an explicit disconnect during the backoff wins
            if self.state.read().await.was_manual_disconnect {
                break;
            }

            match self.connect().await {
                Ok(()) => {
                    tracing::info!("reconnected successfully");
                    self.rejoin_channels().await;
                    break;
                }
                Err(e) => {
                    tracing::error!("reconnect attempt {} failed: {}", attempt, e);
                }
            }
        }
        Ok(())
    }

    /// Rejoins every channel that was joined before the connection dropped.
    async fn rejoin_channels(&self) {
        let channels = self.state.read().await.channels.clone();
        for channel in channels {
            if channel.was_joined().await {
                if let Err(e) = channel.rejoin().await {
                    tracing::error!("rejoin failed for {}: {}", channel.topic(), e);
                }
            }
        }
    }

    /// Creates a channel on `topic`. Channels are not deduplicated; two
    /// calls with the same topic yield two independent channels that both
    /// observe the topic's traffic.
    pub async fn channel(&self, topic: &str, options: ChannelOptions) -> Arc<ChannelConnection> {
        let channel = Arc::new(ChannelConnection::new(
            topic.to_string(),
            self.clone(),
            options,
        ));
        self.state.write().await.channels.push(Arc::clone(&channel));
        channel
    }

    /// Idempotent. Tears down the transport and suppresses auto-reconnect;
    /// no lifecycle event is dispatched for a close the caller asked for.
    pub async fn disconnect(&self) -> Result<()> {
        self.set_manual_disconnect(true).await;

        {
            let state = self.connection.state().await;
            if state == ConnectionState::Closed {
                return Ok(());
            }
        }

        tracing::info!("disconnecting");

        // abort the driver first so the transport close does not dispatch
        {
            let mut state = self.state.write().await;
            state.task_manager.abort_all();
            state.pending_heartbeat_ref = None;
        }

        self.connection.close().await;

        {
            let state = self.state.read().await;
            state.notify_state_change(ConnectionState::Closed, true);
        }

        tracing::info!("disconnected");
        Ok(())
    }

    /// Replaces the connection params; takes effect on the next reconnect,
    /// not retroactively on the live connection.
    pub async fn update_params(&self, params: Value) {
        self.state.write().await.params = Some(params);
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Generate next message reference
    pub async fn make_ref(&self) -> String {
        self.state.write().await.make_ref()
    }

    /// Sends one wire message. Channels build the envelopes.
    pub(crate) async fn push(&self, message: PushMessage) -> Result<()> {
        if !self.is_connected().await {
            return Err(SocketError::NotConnected);
        }

        self.logger.log(
            "push",
            &format!("{} {}", message.topic, message.event),
            Some(message.payload.clone()),
        );
        self.connection.send_message(message).await
    }

    pub(crate) async fn dispatch_lifecycle(&self, event: SocketEvent) {
        // resolve a racing try_connect first so later events are swallowed
        {
            let pending = self.state.read().await.pending_connect.clone();
            if let Some(operation) = pending {
                match &event {
                    SocketEvent::Open => {
                        operation.resolve(ConnectOutcome::Open);
                    }
                    SocketEvent::Error(detail) => {
                        operation.resolve(ConnectOutcome::Error(detail.clone()));
                    }
                    SocketEvent::Closed(_) => {}
                }
            }
        }

        let Some(handler) = &self.options.on_state_change else {
            return;
        };
        let effect = handler(event);
        self.apply_socket_effect(effect).await;
    }

    async fn apply_socket_effect(&self, effect: ResponseEffect) {
        match effect {
            ResponseEffect::Ignore => {}
            ResponseEffect::Disconnect => {
                // runs on its own task: dispatch happens inside the driver,
                // and disconnect aborts the driver
                let socket = self.clone();
                tokio::spawn(async move {
                    let _ = socket.disconnect().await;
                });
            }
            ResponseEffect::SendMessage(value) => {
                self.forward_message(value);
            }
            ResponseEffect::PerformTask(task) => {
                self.execute_task(task);
            }
            ResponseEffect::Reply { .. } | ResponseEffect::Leave => {
                tracing::warn!("channel-scoped effect returned by socket handler, ignoring");
            }
        }
    }

    pub(crate) fn forward_message(&self, value: Value) {
        match &self.options.message_bus {
            Some(bus) => {
                if bus.send(value).is_err() {
                    tracing::warn!("message bus receiver dropped, value discarded");
                }
            }
            None => {
                tracing::warn!("SendMessage effect with no message bus configured, dropping");
            }
        }
    }

    pub(crate) fn execute_task(&self, task: Task) {
        self.executor.execute(task);
    }

    /// Builds the endpoint URL, appending the protocol version and the
    /// current connection params as query pairs.
    async fn build_endpoint_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.endpoint)?;
        let params = self.state.read().await.params.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("vsn", VSN);

            if let Some(object) = params.as_ref().and_then(|p| p.as_object()) {
                for (key, value) in object {
                    match value.as_str() {
                        Some(s) => pairs.append_pair(key, s),
                        None => pairs.append_pair(key, &value.to_string()),
                    };
                }
            }
        }
        Ok(url.to_string())
    }
}

impl fmt::Display for SocketConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Socket<endpoint={}>", self.endpoint)
    }
}
