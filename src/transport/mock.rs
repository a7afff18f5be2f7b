use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::{CloseInfo, Transport, TransportEvent};
use crate::types::message::PushMessage;
use crate::types::{Result, SocketError};

/// Scriptable transport for socket and channel tests.
///
/// Records every opened URL and sent frame, and lets tests feed events to
/// the socket as if the wire produced them. Reusable across reconnect
/// attempts; each `open` replaces the event sender.
pub(crate) struct MockTransport {
    pub open_urls: Mutex<Vec<String>>,
    pub open_times: Mutex<Vec<tokio::time::Instant>>,
    pub sent: Mutex<Vec<String>>,
    pub replied: Mutex<Vec<String>>,
    pub fail_open: AtomicBool,
    pub closed: AtomicBool,
    events_tx: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            open_urls: Mutex::new(Vec::new()),
            open_times: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            replied: Mutex::new(Vec::new()),
            fail_open: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            events_tx: Mutex::new(None),
        })
    }

    /// Feed an event to the socket as if the wire produced it.
    pub async fn emit(&self, event: TransportEvent) {
        let tx = self.events_tx.lock().await.clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    pub async fn sent_messages(&self) -> Vec<PushMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|raw| serde_json::from_str(raw).ok())
            .collect()
    }

    /// Ref of the most recent sent message matching `event`, if any.
    pub async fn last_ref_for(&self, event: &str) -> Option<String> {
        self.sent_messages()
            .await
            .iter()
            .rev()
            .find(|m| m.event.as_str() == event)
            .and_then(|m| m.r#ref.clone())
    }

    /// Like `last_ref_for`, but skips refs that were already replied to.
    pub async fn last_unreplied_ref_for(&self, event: &str) -> Option<String> {
        let replied = self.replied.lock().await.clone();
        self.sent_messages()
            .await
            .iter()
            .rev()
            .filter(|m| m.event.as_str() == event)
            .filter_map(|m| m.r#ref.clone())
            .find(|r#ref| !replied.contains(r#ref))
    }

    /// Emit a phx_reply for `ref` on `topic` with the given status/response.
    pub async fn reply(&self, topic: &str, r#ref: &str, status: &str, response: serde_json::Value) {
        self.replied.lock().await.push(r#ref.to_string());
        let message = serde_json::json!({
            "topic": topic,
            "event": "phx_reply",
            "payload": {"status": status, "response": response},
            "ref": r#ref,
        });
        self.emit(TransportEvent::Message(message.to_string())).await;
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, url: &str, events: mpsc::Sender<TransportEvent>) -> Result<()> {
        self.open_urls.lock().await.push(url.to_string());
        self.open_times.lock().await.push(tokio::time::Instant::now());
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(SocketError::Transport("mock open refused".to_string()));
        }
        self.closed.store(false, Ordering::SeqCst);
        *self.events_tx.lock().await = Some(events);
        Ok(())
    }

    async fn send(&self, text: String) -> Result<()> {
        self.sent.lock().await.push(text);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(events) = self.events_tx.lock().await.take() {
            let info = CloseInfo {
                code: None,
                reason: "client closed".to_string(),
            };
            let _ = events.send(TransportEvent::Closed(info)).await;
        }
    }
}
