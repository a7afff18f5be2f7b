use async_trait::async_trait;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::{CloseInfo, Transport, TransportEvent};
use crate::types::constants::WS_CLOSE_NORMAL;
use crate::types::{Result, SocketError};

/// WebSocket transport backed by tokio-tungstenite.
pub struct WebSocketTransport {
    write_tx: RwLock<Option<mpsc::Sender<Message>>>,
    events_tx: RwLock<Option<mpsc::Sender<TransportEvent>>>,
    tasks: RwLock<Vec<JoinHandle<()>>>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self {
            write_tx: RwLock::new(None),
            events_tx: RwLock::new(None),
            tasks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str, events: mpsc::Sender<TransportEvent>) -> Result<()> {
        let (ws_stream, _response) = connect_async(url).await?;
        let (mut write_half, mut read_half) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<Message>(100);

        let read_events = events.clone();
        let read_task = tokio::spawn(async move {
            while let Some(msg_result) = read_half.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if read_events
                            .send(TransportEvent::Message(text))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let info = match frame {
                            Some(frame) => CloseInfo {
                                code: Some(frame.code.into()),
                                reason: frame.reason.to_string(),
                            },
                            None => CloseInfo::default(),
                        };
                        let _ = read_events.send(TransportEvent::Closed(info)).await;
                        return;
                    }
                    Ok(Message::Ping(data)) => {
                        tracing::debug!("received ping ({} bytes)", data.len());
                    }
                    Ok(Message::Pong(data)) => {
                        tracing::debug!("received pong ({} bytes)", data.len());
                    }
                    Ok(Message::Binary(data)) => {
                        tracing::warn!("ignoring unexpected binary frame ({} bytes)", data.len());
                    }
                    Ok(Message::Frame(_)) => {}
                    Err(e) => {
                        let _ = read_events.send(TransportEvent::Error(e.to_string())).await;
                        let _ = read_events
                            .send(TransportEvent::Closed(CloseInfo::default()))
                            .await;
                        return;
                    }
                }
            }
            let _ = read_events
                .send(TransportEvent::Closed(CloseInfo::default()))
                .await;
        });

        let write_task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = write_half.send(msg).await {
                    tracing::error!("WebSocket write error: {}", e);
                    break;
                }
            }
            tracing::debug!("write task finished");
        });

        *self.write_tx.write().await = Some(tx);
        *self.events_tx.write().await = Some(events);
        *self.tasks.write().await = vec![read_task, write_task];

        Ok(())
    }

    async fn send(&self, text: String) -> Result<()> {
        let tx = self.write_tx.read().await;
        let tx = tx.as_ref().ok_or(SocketError::NotConnected)?;
        tx.send(Message::Text(text))
            .await
            .map_err(|e| SocketError::Transport(format!("failed to queue outbound frame: {}", e)))
    }

    async fn close(&self) {
        if let Some(events) = self.events_tx.write().await.take() {
            let info = CloseInfo {
                code: Some(WS_CLOSE_NORMAL),
                reason: "client closed".to_string(),
            };
            let _ = events.send(TransportEvent::Closed(info)).await;
        }

        // dropping the sender ends the write task; the read task is aborted
        *self.write_tx.write().await = None;
        for task in self.tasks.write().await.drain(..) {
            task.abort();
        }
    }
}
