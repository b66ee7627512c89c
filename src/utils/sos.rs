//! Cooperative shutdown signal
//!
//! One clonable handle shared by the engine loop, the transport tasks and
//! the Ctrl-C hook. Cancelling it tears the whole connection down; every
//! periodic timer lives inside a task spawned through this signal, so
//! nothing keeps firing after teardown.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct SignalOfStop {
    token: CancellationToken,
}

impl SignalOfStop {
    pub fn new() -> SignalOfStop {
        SignalOfStop {
            token: CancellationToken::new(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn wait_cancellation(&self) {
        self.token.cancelled().await;
    }

    /// Spawn a task that is dropped as soon as the signal fires.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future + Send + 'static,
        F::Output: Send,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = fut => {}
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_propagates_to_clones() {
        let sos = SignalOfStop::new();
        let clone = sos.clone();
        assert!(!clone.cancelled());

        sos.cancel();
        assert!(clone.cancelled());
        clone.wait_cancellation().await; // returns immediately
    }

    #[tokio::test]
    async fn test_spawned_task_stops_on_cancel() {
        let sos = SignalOfStop::new();
        let handle = sos.spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        sos.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should end promptly")
            .unwrap();
    }
}
