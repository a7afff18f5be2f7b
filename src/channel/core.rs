use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::{RwLock, oneshot};

use super::push::{PendingOperation, PushOutcome};
use super::state::{ChannelState, ChannelStatus, EventBinding};
use crate::effect::{ChannelEvent, ChannelEventHandler, MessageHandler, ResponseEffect};
use crate::messaging::{Event, SystemEvent};
use crate::socket::SocketConnection;
use crate::types::{PushMessage, Result, SocketError};

/// Configuration for a channel: join params, event hooks and the lifecycle
/// handler. Hooks are consulted in registration order.
#[derive(Default)]
pub struct ChannelOptions {
    pub params: Option<Value>,
    pub on: Vec<(String, MessageHandler)>,
    pub on_state_change: Option<ChannelEventHandler>,
}

/// A topic-scoped logical connection multiplexed over one socket.
///
/// A channel is inert until joined. The join handshake activates it on the
/// server; afterwards inbound events reach the registered hooks and pushes
/// flow out. Lifecycle transitions (Joined, Rejected, Left, Error) are
/// reported through the optional state-change handler, whose returned
/// [`ResponseEffect`] is interpreted in channel scope.
pub struct ChannelConnection {
    topic: String,
    socket: SocketConnection,
    pub(crate) state: Arc<RwLock<ChannelState>>,
    on_state_change: Option<ChannelEventHandler>,
}

impl ChannelConnection {
    pub(crate) fn new(topic: String, socket: SocketConnection, options: ChannelOptions) -> Self {
        let mut state = ChannelState::new(options.params);
        state.bindings = options
            .on
            .into_iter()
            .map(|(event, handler)| EventBinding { event, handler })
            .collect();

        Self {
            topic,
            socket,
            state: Arc::new(RwLock::new(state)),
            on_state_change: options.on_state_change,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn status(&self) -> ChannelStatus {
        self.state.read().await.status
    }

    pub async fn was_joined(&self) -> bool {
        self.state.read().await.status == ChannelStatus::Joined
    }

    /// Registers an event hook after construction. Hooks registered while
    /// joined receive subsequent traffic.
    pub async fn on(&self, event: impl Into<String>, handler: MessageHandler) {
        self.state.write().await.bindings.push(EventBinding {
            event: event.into(),
            handler,
        });
    }

    /// Replaces the join params; consulted at the next (re)join only.
    pub async fn update_params(&self, params: Value) {
        self.state.write().await.params = Some(params);
    }

    /// Starts the join handshake without waiting for its outcome.
    ///
    /// The outcome still reaches the state-change handler as a Joined or
    /// Rejected transition. A join issued while a previous one is outstanding
    /// or accepted fails with [`SocketError::AlreadyJoined`]; a failure to
    /// send the handshake is reported through the handler, not returned.
    pub async fn join(self: &Arc<Self>) -> Result<()> {
        match self.start_join().await {
            Ok((_, rx)) => {
                let channel = Arc::clone(self);
                tokio::spawn(async move {
                    if let Ok(outcome) = rx.await {
                        let _ = channel.settle_join(outcome).await;
                    }
                });
                Ok(())
            }
            Err(SocketError::AlreadyJoined) => Err(SocketError::AlreadyJoined),
            Err(e) => {
                self.fail_join(&e).await;
                Ok(())
            }
        }
    }

    /// Joins and waits for the first of {ok reply, error reply, timeout}.
    ///
    /// An accepted join resolves with the server reply payload. A timeout
    /// additionally issues `leave()` so the channel is not left half-joined;
    /// a late reply after that cannot flip the result. Lifecycle dispatch
    /// continues independently after resolution.
    pub async fn try_join(self: &Arc<Self>, timeout: Duration) -> Result<Value> {
        let (operation, rx) = self.start_join().await?;

        let timer = operation.schedule_timeout(timeout, PushOutcome::Timeout);
        let outcome = rx.await.unwrap_or(PushOutcome::Timeout);
        timer.abort();

        self.settle_join(outcome).await
    }

    /// Re-issues the join handshake after a reconnect.
    pub(crate) async fn rejoin(self: &Arc<Self>) -> Result<()> {
        self.state.write().await.status = ChannelStatus::Closed;
        self.join().await
    }

    async fn start_join(
        &self,
    ) -> Result<(Arc<PendingOperation>, oneshot::Receiver<PushOutcome>)> {
        let params = {
            let mut state = self.state.write().await;
            if matches!(state.status, ChannelStatus::Joining | ChannelStatus::Joined) {
                return Err(SocketError::AlreadyJoined);
            }
            state.status = ChannelStatus::Joining;
            state.params.clone().unwrap_or_else(|| json!({}))
        };

        let join_ref = self.socket.make_ref().await;
        let (operation, rx) = PendingOperation::new();
        {
            let mut state = self.state.write().await;
            state.join_ref = Some(join_ref.clone());
            state
                .pending_pushes
                .insert(join_ref.clone(), Arc::clone(&operation));
        }

        let message = PushMessage::new(self.topic.clone(), Event::System(SystemEvent::Join), params)
            .with_ref(join_ref.clone())
            .with_join_ref(join_ref.clone());

        if let Err(e) = self.socket.push(message).await {
            let mut state = self.state.write().await;
            state.pending_pushes.remove(&join_ref);
            state.status = ChannelStatus::Errored;
            return Err(e);
        }

        Ok((operation, rx))
    }

    async fn settle_join(self: &Arc<Self>, outcome: PushOutcome) -> Result<Value> {
        match outcome {
            PushOutcome::Ok(reply) => {
                self.state.write().await.status = ChannelStatus::Joined;
                self.dispatch_transition(ChannelEvent::Joined(reply.clone()))
                    .await;
                Ok(reply)
            }
            PushOutcome::ErrorReply(reason) => {
                self.state.write().await.status = ChannelStatus::Errored;
                self.dispatch_transition(ChannelEvent::Rejected(reason.clone()))
                    .await;
                Err(SocketError::ErrorReply(reason))
            }
            PushOutcome::Timeout => {
                // deregister so a late reply cannot resurface
                {
                    let mut state = self.state.write().await;
                    if let Some(join_ref) = state.join_ref.clone() {
                        state.pending_pushes.remove(&join_ref);
                    }
                    state.status = ChannelStatus::Errored;
                }
                self.leave().await;
                Err(SocketError::Timeout)
            }
        }
    }

    async fn fail_join(self: &Arc<Self>, error: &SocketError) {
        tracing::warn!("join on {} not issued: {}", self.topic, error);
        self.dispatch_transition(ChannelEvent::Error(json!(error.to_string())))
            .await;
    }

    /// Fire-and-forget push; no acknowledgement is tracked and delivery
    /// failures surface only through logging.
    pub async fn push(&self, event: impl Into<Event>, payload: Value) {
        let event = event.into();
        let join_ref = self.state.read().await.join_ref.clone();

        let mut message = PushMessage::new(self.topic.clone(), event, payload);
        if let Some(join_ref) = join_ref {
            message = message.with_join_ref(join_ref);
        }

        if let Err(e) = self.socket.push(message).await {
            tracing::warn!("push on {} dropped: {}", self.topic, e);
        }
    }

    /// Pushes and waits for the first of {ok reply, error reply, timeout}.
    ///
    /// Unlike [`try_join`](Self::try_join), a timeout does not leave the
    /// channel; message timeouts do not imply channel abandonment.
    pub async fn try_push(
        &self,
        event: impl Into<Event>,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value> {
        let ref_id = uuid::Uuid::new_v4().to_string();
        let (operation, rx) = PendingOperation::new();

        let join_ref = {
            let mut state = self.state.write().await;
            state
                .pending_pushes
                .insert(ref_id.clone(), Arc::clone(&operation));
            state.join_ref.clone()
        };

        let mut message =
            PushMessage::new(self.topic.clone(), event.into(), payload).with_ref(ref_id.clone());
        if let Some(join_ref) = join_ref {
            message = message.with_join_ref(join_ref);
        }

        if let Err(e) = self.socket.push(message).await {
            self.state.write().await.pending_pushes.remove(&ref_id);
            return Err(e);
        }

        let timer = operation.schedule_timeout(timeout, PushOutcome::Timeout);
        let outcome = rx.await.unwrap_or(PushOutcome::Timeout);
        timer.abort();

        match outcome {
            PushOutcome::Ok(reply) => Ok(reply),
            PushOutcome::ErrorReply(reason) => Err(SocketError::ErrorReply(reason)),
            PushOutcome::Timeout => {
                self.state.write().await.pending_pushes.remove(&ref_id);
                Err(SocketError::Timeout)
            }
        }
    }

    /// Idempotent. Signals intent to leave, transitions the channel to
    /// Closed and reports the Left transition exactly once.
    pub async fn leave(self: &Arc<Self>) {
        {
            let mut state = self.state.write().await;
            if matches!(state.status, ChannelStatus::Closed | ChannelStatus::Leaving) {
                return;
            }
            state.status = ChannelStatus::Leaving;
        }

        let message = PushMessage::new(
            self.topic.clone(),
            Event::System(SystemEvent::Leave),
            json!({}),
        );
        if let Err(e) = self.socket.push(message).await {
            tracing::debug!("leave push on {} not delivered: {}", self.topic, e);
        }

        self.state.write().await.status = ChannelStatus::Closed;
        self.dispatch_transition(ChannelEvent::Left).await;
    }

    /// Routes one inbound message on this channel's topic.
    pub(crate) async fn handle_message(
        self: &Arc<Self>,
        event: &Event,
        payload: Value,
        msg_ref: Option<&str>,
    ) {
        // replies resolve the pending operation registered under their ref;
        // replies with no pending counterpart are swallowed
        if matches!(event, Event::System(SystemEvent::Reply)) {
            if let Some(ref_id) = msg_ref {
                self.resolve_reply(ref_id, &payload).await;
            }
            return;
        }

        if self.state.read().await.status == ChannelStatus::Closed {
            return;
        }

        let handlers: Vec<MessageHandler> = {
            let state = self.state.read().await;
            state
                .bindings
                .iter()
                .filter(|binding| binding.event == event.as_str())
                .map(|binding| Arc::clone(&binding.handler))
                .collect()
        };
        for handler in handlers {
            let effect = handler(payload.clone());
            self.apply_channel_effect(effect).await;
        }

        match event {
            Event::System(SystemEvent::Close) => {
                let was_closed = {
                    let mut state = self.state.write().await;
                    let was = state.status == ChannelStatus::Closed;
                    state.status = ChannelStatus::Closed;
                    was
                };
                if !was_closed {
                    self.dispatch_transition(ChannelEvent::Left).await;
                }
            }
            Event::System(SystemEvent::Error) => {
                self.state.write().await.status = ChannelStatus::Errored;
                self.dispatch_transition(ChannelEvent::Error(payload)).await;
            }
            _ => {}
        }
    }

    async fn resolve_reply(&self, ref_id: &str, payload: &Value) -> bool {
        let operation = self.state.write().await.pending_pushes.remove(ref_id);
        let Some(operation) = operation else {
            return false;
        };

        let status = payload
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("error");
        let response = payload
            .get("response")
            .cloned()
            .unwrap_or(Value::Null);

        let outcome = if status == "ok" {
            PushOutcome::Ok(response)
        } else {
            PushOutcome::ErrorReply(response)
        };
        operation.resolve(outcome);
        true
    }

    fn dispatch_transition<'a>(
        self: &'a Arc<Self>,
        event: ChannelEvent,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let Some(handler) = &self.on_state_change else {
                return;
            };
            let effect = handler(event);
            self.apply_channel_effect(effect).await;
        })
    }

    fn apply_channel_effect<'a>(
        self: &'a Arc<Self>,
        effect: ResponseEffect,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
        match effect {
            ResponseEffect::Ignore => {}
            ResponseEffect::Disconnect => {
                // runs on its own task: effects are applied inside the
                // driver, and disconnect aborts the driver
                let socket = self.socket.clone();
                tokio::spawn(async move {
                    let _ = socket.disconnect().await;
                });
            }
            ResponseEffect::Reply { event, payload } => {
                self.push(event, payload).await;
            }
            ResponseEffect::Leave => {
                // run on its own task: leave re-enters effect dispatch for
                // the Left transition
                let channel = Arc::clone(self);
                tokio::spawn(async move {
                    channel.leave().await;
                });
            }
            ResponseEffect::SendMessage(value) => {
                self.socket.forward_message(value);
            }
            ResponseEffect::PerformTask(task) => {
                self.socket.execute_task(task);
            }
        }
        })
    }
}

impl fmt::Display for ChannelConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel<topic={}>", self.topic)
    }
}
