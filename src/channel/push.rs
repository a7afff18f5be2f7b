use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Resolution of a request racing `ok`, `error` and timeout completions.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// Server replied with status "ok"; carries the reply payload.
    Ok(serde_json::Value),
    /// Server replied with an error status; carries the reason.
    ErrorReply(serde_json::Value),
    /// No reply before the deadline.
    Timeout,
}

/// One in-flight request awaiting exactly one resolution.
///
/// The first completion source to fire takes the latch and delivers its
/// outcome; every later firing, from any source, is a no-op. The receiver
/// half observes the winning outcome.
pub struct PendingOperation<T = PushOutcome> {
    slot: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T: Send + 'static> PendingOperation<T> {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                slot: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }

    /// Fires one completion source. Returns whether this call resolved the
    /// operation; `false` means another source already won.
    pub fn resolve(&self, outcome: T) -> bool {
        let sender = self.slot.lock().unwrap().take();
        match sender {
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.lock().unwrap().is_none()
    }

    /// Arms the timeout source. The returned handle must be aborted once
    /// another source wins so a lingering timer cannot fire later.
    pub fn schedule_timeout(self: &Arc<Self>, after: Duration, outcome: T) -> JoinHandle<()> {
        let operation = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            operation.resolve(outcome);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes() -> [PushOutcome; 3] {
        [
            PushOutcome::Ok(serde_json::json!({"winner": "ok"})),
            PushOutcome::ErrorReply(serde_json::json!("nope")),
            PushOutcome::Timeout,
        ]
    }

    #[tokio::test]
    async fn test_first_completion_wins_in_every_order() {
        let permutations: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for permutation in permutations {
            let (operation, rx) = PendingOperation::new();
            let fired = outcomes();

            let mut resolutions = 0;
            for &i in &permutation {
                if operation.resolve(fired[i].clone()) {
                    resolutions += 1;
                }
            }

            assert_eq!(resolutions, 1, "exactly one source may win");
            assert_eq!(rx.await.unwrap(), fired[permutation[0]]);
        }
    }

    #[tokio::test]
    async fn test_repeat_firing_from_winner_is_noop() {
        let (operation, rx) = PendingOperation::new();
        assert!(operation.resolve(PushOutcome::Timeout));
        assert!(!operation.resolve(PushOutcome::Timeout));
        assert!(operation.is_resolved());
        assert_eq!(rx.await.unwrap(), PushOutcome::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_source_fires_after_deadline() {
        let (operation, rx) = PendingOperation::new();
        operation.schedule_timeout(Duration::from_millis(500), PushOutcome::Timeout);

        assert_eq!(rx.await.unwrap(), PushOutcome::Timeout);
        assert!(operation.is_resolved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_timer_never_resolves() {
        let (operation, rx) = PendingOperation::new();
        let timer = operation.schedule_timeout(Duration::from_millis(500), PushOutcome::Timeout);

        operation.resolve(PushOutcome::Ok(serde_json::json!({})));
        timer.abort();

        assert_eq!(rx.await.unwrap(), PushOutcome::Ok(serde_json::json!({})));
        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(!operation.resolve(PushOutcome::Timeout));
    }
}
