use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::transport::CloseInfo;

/// Opaque asynchronous unit of work handed back by a handler.
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Executes `PerformTask` effects on behalf of the core. The core never
/// awaits the task itself.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: Task);
}

/// Default executor: spawn on the ambient tokio runtime.
pub struct TokioExecutor;

impl TaskExecutor for TokioExecutor {
    fn execute(&self, task: Task) {
        tokio::spawn(task);
    }
}

/// What a handler wants the core to do in reaction to an event.
///
/// Exactly one variant is produced per handler invocation. `Reply` and
/// `Leave` only make sense in channel scope; a socket-level handler
/// returning them is logged and ignored.
pub enum ResponseEffect {
    /// No effect.
    Ignore,
    /// Tear down the socket.
    Disconnect,
    /// Channel scope: push `payload` as `event` on the same channel.
    Reply { event: String, payload: Value },
    /// Channel scope: begin the leave protocol.
    Leave,
    /// Hand a value to the caller's message bus, fire-and-forget.
    SendMessage(Value),
    /// Hand a task to the configured executor, fire-and-forget.
    PerformTask(Task),
}

/// Socket lifecycle events reported to the socket's state-change handler.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    Open,
    Closed(CloseInfo),
    Error(String),
}

/// Channel lifecycle events reported to the channel's state-change handler.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The server accepted the join; carries the server reply payload.
    Joined(Value),
    /// The server rejected the join; carries the server reason.
    Rejected(Value),
    /// The channel closed, by explicit leave or server close.
    Left,
    /// The server errored the channel.
    Error(Value),
}

/// Handler observing socket lifecycle transitions.
pub type SocketEventHandler = Arc<dyn Fn(SocketEvent) -> ResponseEffect + Send + Sync>;

/// Handler observing channel lifecycle transitions.
pub type ChannelEventHandler = Arc<dyn Fn(ChannelEvent) -> ResponseEffect + Send + Sync>;

/// Handler for one registered channel event hook.
pub type MessageHandler = Arc<dyn Fn(Value) -> ResponseEffect + Send + Sync>;
