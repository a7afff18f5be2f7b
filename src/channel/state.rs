use std::collections::HashMap;
use std::sync::Arc;

use crate::channel::push::PendingOperation;
use crate::effect::MessageHandler;

/// Join lifecycle of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Closed,
    Errored,
    Joined,
    Joining,
    Leaving,
}

/// One registered (event name, handler) hook.
pub struct EventBinding {
    pub event: String,
    pub handler: MessageHandler,
}

/// Mutable state for a ChannelConnection.
pub struct ChannelState {
    pub status: ChannelStatus,
    pub bindings: Vec<EventBinding>,
    /// In-flight requests keyed by their wire ref, join push included.
    pub pending_pushes: HashMap<String, Arc<PendingOperation>>,
    pub join_ref: Option<String>,
    /// Params sent with the next (re)join; edits never affect a live join.
    pub params: Option<serde_json::Value>,
}

impl ChannelState {
    pub fn new(params: Option<serde_json::Value>) -> Self {
        Self {
            status: ChannelStatus::Closed,
            bindings: Vec::new(),
            pending_pushes: HashMap::new(),
            join_ref: None,
            params,
        }
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new(None)
    }
}
