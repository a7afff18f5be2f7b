use std::sync::Arc;

use tokio::sync::RwLock;

use super::{Event, SystemEvent};
use crate::channel::ChannelConnection;
use crate::socket::SocketState;
use crate::types::constants::PHOENIX_TOPIC;
use crate::types::message::PushMessage;

/// Routes inbound messages to the appropriate handlers.
pub struct MessageRouter {
    state: Arc<RwLock<SocketState>>,
}

impl MessageRouter {
    pub fn new(state: Arc<RwLock<SocketState>>) -> Self {
        Self { state }
    }

    /// Routes a message to the appropriate handler(s)
    pub async fn route(&self, message: PushMessage) {
        if self.is_heartbeat_ack(&message) {
            self.handle_heartbeat_ack(&message).await;
            return;
        }

        self.route_to_channels(message).await;
    }

    /// Checks if a message is a heartbeat acknowledgment
    fn is_heartbeat_ack(&self, message: &PushMessage) -> bool {
        message.topic == PHOENIX_TOPIC
            && matches!(
                message.event,
                Event::System(SystemEvent::Reply) | Event::System(SystemEvent::Heartbeat)
            )
    }

    /// Handles heartbeat acknowledgment by clearing the pending ref
    async fn handle_heartbeat_ack(&self, message: &PushMessage) {
        if let Some(msg_ref) = &message.r#ref {
            let state = self.state.read().await;
            if state.pending_heartbeat_ref.as_ref() == Some(msg_ref) {
                drop(state);
                self.state.write().await.pending_heartbeat_ref = None;
                tracing::debug!("received heartbeat ack for ref {}", msg_ref);
            }
        }
    }

    /// Routes a message to every channel on its topic.
    ///
    /// Topics are not exclusive; all channels sharing the topic observe the
    /// message independently.
    async fn route_to_channels(&self, message: PushMessage) {
        let channels: Vec<Arc<ChannelConnection>> = {
            let state = self.state.read().await;
            state
                .channels
                .iter()
                .filter(|channel| channel.topic() == message.topic)
                .cloned()
                .collect()
        };

        for channel in channels {
            channel
                .handle_message(
                    &message.event,
                    message.payload.clone(),
                    message.r#ref.as_deref(),
                )
                .await;
        }
    }
}
