use std::time::Duration;

use crate::types::constants::RECONNECT_INTERVALS;

/// Maps a reconnect attempt number to the delay preceding that attempt.
///
/// Attempts are 1-indexed; attempts beyond the configured sequence reuse the
/// last configured delay indefinitely. No jitter is added at this layer;
/// callers wanting jitter encode it in the sequence. The attempt counter
/// itself lives on the socket, which resets it on every successful open.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    delays_ms: Vec<u64>,
}

impl BackoffSchedule {
    /// `delays_ms` must be non-empty; validated by the socket builder.
    pub fn new(delays_ms: Vec<u64>) -> Self {
        debug_assert!(!delays_ms.is_empty());
        Self { delays_ms }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let idx = (attempt as usize).min(self.delays_ms.len()).saturating_sub(1);
        Duration::from_millis(self.delays_ms[idx])
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new(RECONNECT_INTERVALS.to_vec())
    }
}
