//! Run deadline and external abort.
//!
//! A [`RunBudget`] combines a deadline with an abort signal. Work run under
//! it resolves to `None` as soon as either fires.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Fires the abort signal for every budget derived from it.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// Deadline plus abort signal.
#[derive(Debug, Clone)]
pub struct RunBudget {
    deadline: Instant,
    abort: watch::Receiver<bool>,
}

impl RunBudget {
    /// Budget expiring `timeout` from now, with its abort handle.
    pub fn new(timeout: Duration) -> (Self, AbortHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                deadline: Instant::now() + timeout,
                abort: rx,
            },
            AbortHandle { tx },
        )
    }

    /// Budget sharing this abort signal, optionally with an earlier deadline.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match timeout {
            Some(t) => self.deadline.min(Instant::now() + t),
            None => self.deadline,
        };
        Self {
            deadline,
            abort: self.abort.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.abort.borrow() || Instant::now() >= self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Drive `fut` to completion unless the budget runs out first.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }
        let mut abort = self.abort.clone();
        tokio::select! {
            biased;
            _ = async {
                if abort.wait_for(|aborted| *aborted).await.is_err() {
                    std::future::pending::<()>().await;
                }
            } => None,
            _ = tokio::time::sleep_until(self.deadline) => None,
            out = fut => Some(out),
        }
    }
}
