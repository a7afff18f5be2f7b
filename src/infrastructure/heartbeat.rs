use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time;

use crate::messaging::{Event, SystemEvent};
use crate::socket::{ConnectionManager, SocketState};
use crate::types::constants::{HEARTBEAT_INTERVAL, PHOENIX_TOPIC};
use crate::types::message::PushMessage;

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(HEARTBEAT_INTERVAL);

/// Periodic keep-alive sender, active while the socket is open.
///
/// Each beat carries a fresh ref; the router clears it when the ack comes
/// back. A beat that finds the previous ref still pending closes the
/// connection, which hands control to the reconnect path.
pub struct HeartbeatManager {
    interval: Duration,
    connection: Weak<ConnectionManager>,
}

impl HeartbeatManager {
    pub fn new(connection: Weak<ConnectionManager>) -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            connection,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the heartbeat task, tracked by the socket's task manager.
    pub async fn spawn_on(self, state: &Arc<RwLock<SocketState>>) {
        let HeartbeatManager {
            interval,
            connection,
        } = self;
        let state_for_task = Arc::clone(state);

        let task = async move {
            // first beat one interval after open
            let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let Some(connection) = connection.upgrade() else {
                    break;
                };

                if !connection.is_connected().await {
                    break;
                }

                // an unacknowledged previous beat means the link is dead
                {
                    let mut state = state_for_task.write().await;
                    if state.pending_heartbeat_ref.take().is_some() {
                        drop(state);
                        tracing::warn!("heartbeat reply missing, closing connection");
                        connection.close().await;
                        continue;
                    }
                }

                let new_ref = state_for_task.write().await.make_ref();

                let heartbeat = PushMessage::new(
                    PHOENIX_TOPIC.to_string(),
                    Event::System(SystemEvent::Heartbeat),
                    serde_json::json!({}),
                )
                .with_ref(new_ref.clone());

                match connection.send_message(heartbeat).await {
                    Ok(()) => {
                        state_for_task.write().await.pending_heartbeat_ref = Some(new_ref.clone());
                        tracing::debug!("sent heartbeat with ref {}", new_ref);
                    }
                    Err(e) => {
                        tracing::error!("failed to send heartbeat: {}", e);
                    }
                }
            }
        };

        state.write().await.task_manager.spawn(task);
    }
}
