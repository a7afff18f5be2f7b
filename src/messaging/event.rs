use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::constants::phoenix_events;

/// Phoenix system events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemEvent {
    /// Join channel
    Join,
    /// Leave channel
    Leave,
    /// Reply to a message
    Reply,
    /// Close channel
    Close,
    /// Error event
    Error,
    /// Heartbeat
    Heartbeat,
}

impl SystemEvent {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            phoenix_events::JOIN => Some(Self::Join),
            phoenix_events::LEAVE => Some(Self::Leave),
            phoenix_events::REPLY => Some(Self::Reply),
            phoenix_events::CLOSE => Some(Self::Close),
            phoenix_events::ERROR => Some(Self::Error),
            phoenix_events::HEARTBEAT => Some(Self::Heartbeat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => phoenix_events::JOIN,
            Self::Leave => phoenix_events::LEAVE,
            Self::Reply => phoenix_events::REPLY,
            Self::Close => phoenix_events::CLOSE,
            Self::Error => phoenix_events::ERROR,
            Self::Heartbeat => phoenix_events::HEARTBEAT,
        }
    }
}

/// Wire-level event name, either a protocol event or a caller-defined one.
///
/// Serializes as its plain string form so the envelope carries `"phx_join"`,
/// `"my_event"`, etc.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// System events (phx_* and heartbeat)
    System(SystemEvent),
    /// Caller-defined event
    Custom(String),
}

impl Event {
    pub fn parse(s: &str) -> Self {
        match SystemEvent::parse(s) {
            Some(sys) => Self::System(sys),
            None => Self::Custom(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::System(sys) => sys.as_str(),
            Self::Custom(s) => s,
        }
    }
}

impl From<&str> for Event {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Event {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Event::parse(&s))
    }
}
