use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// One structured protocol log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Where protocol-level logging goes.
#[derive(Clone)]
pub enum LoggerPolicy {
    /// Emit through the tracing subscriber.
    Console,
    /// Ship entries to a caller-owned channel.
    Forward(mpsc::UnboundedSender<LogEntry>),
}

/// Protocol logger attached to a socket. With no policy configured,
/// protocol traffic is not logged; tracing diagnostics are unaffected.
#[derive(Clone, Default)]
pub struct SocketLogger {
    policy: Option<LoggerPolicy>,
}

impl SocketLogger {
    pub fn new(policy: Option<LoggerPolicy>) -> Self {
        Self { policy }
    }

    pub fn log(&self, kind: &str, message: &str, data: Option<Value>) {
        match &self.policy {
            None => {}
            Some(LoggerPolicy::Console) => {
                tracing::debug!(kind = kind, data = ?data, "{}", message);
            }
            Some(LoggerPolicy::Forward(tx)) => {
                let entry = LogEntry {
                    kind: kind.to_string(),
                    message: message.to_string(),
                    data,
                };
                if tx.send(entry).is_err() {
                    tracing::debug!("log receiver dropped, entry discarded");
                }
            }
        }
    }
}
