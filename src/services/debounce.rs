//! Cancel-and-restart delayed execution.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::managers::lock;

/// Runs at most one pending job: scheduling a new job cancels the one still
/// waiting. Once a job's delay has elapsed it runs to completion even if it is
/// superseded while running.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let waiter = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(job);
        });
        if let Some(previous) = lock(&self.pending).replace(waiter) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(previous) = lock(&self.pending).take() {
            previous.abort();
        }
    }

    /// Whether a job is still waiting out its delay.
    pub fn is_pending(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .is_some_and(|waiter| !waiter.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
