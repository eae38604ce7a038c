//! Cooperative cancellation between the monitor and a running unit
//!
//! The monitor holds a [`TaskHandle`] and may only request cancellation.
//! The worker holds the matching [`CancelSignal`] and polls it at safe points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Returned from a safe point once cancellation was requested
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Execution cancelled")]
pub struct Cancelled;

/// Handle to the asynchronous task running a unit
#[derive(Debug)]
pub struct TaskHandle {
    cancel_tx: watch::Sender<bool>,
    running: Arc<AtomicBool>,
}

/// Worker-side view of a [`TaskHandle`]
#[derive(Clone, Debug)]
pub struct CancelSignal {
    cancel_rx: watch::Receiver<bool>,
    running: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Create a handle in the running state together with its worker signal
    pub fn new() -> (Self, CancelSignal) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let running = Arc::new(AtomicBool::new(true));
        let handle = Self {
            cancel_tx,
            running: running.clone(),
        };
        (handle, CancelSignal { cancel_rx, running })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Request cooperative cancellation; the task may ignore it
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Completes once cancellation is requested
    pub async fn cancelled(&mut self) {
        // An Err means the handle is gone, which can never cancel us
        let closed = self.cancel_rx.wait_for(|c| *c).await.is_err();
        if closed {
            futures::future::pending::<()>().await;
        }
    }

    /// Sleep that wakes early with [`Cancelled`]
    pub async fn sleep(&mut self, duration: Duration) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancelled() => Err(Cancelled),
        }
    }

    /// Safe-point check for synchronous loops
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Mark the task as finished; the monitor stops ticking it
    pub fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }
}
