//! Cancellable repeating timer.
//!
//! Every fixed-cadence loop in the engine (meditation clock check, posture
//! watchdog) runs through [`RepeatingTimer`] so that "every exit path
//! clears every timer" is a single mechanically checkable invariant: hold
//! the handle, cancel the token. A dropped handle cancels its task.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Control decision returned by a timer tick callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Keep ticking.
    Continue,
    /// Stop the timer from inside the callback.
    Stop,
}

/// Handle for a spawned repeating timer task.
///
/// The background loop runs the tick callback at a fixed period until the
/// cancellation token fires, the callback returns [`Tick::Stop`], or the
/// handle is dropped.
pub struct RepeatingTimer {
    name: &'static str,
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl RepeatingTimer {
    /// Spawn a repeating timer. The first tick fires immediately.
    #[must_use]
    pub fn spawn<F, Fut>(
        name: &'static str,
        period: Duration,
        cancel: CancellationToken,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Tick> + Send + 'static,
    {
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        debug!(timer = name, "repeating timer cancelled");
                        return;
                    }
                    _ = interval.tick() => {}
                }
                if tick().await == Tick::Stop {
                    debug!(timer = name, "repeating timer stopped by callback");
                    return;
                }
            }
        });

        Self {
            name,
            cancel,
            join: Some(join),
        }
    }

    /// Signal the timer loop to stop. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the background loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel the timer and wait for its task to exit.
    pub async fn await_completion(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }

    /// Timer name, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for RepeatingTimer {
    /// Cancel the background loop when the handle is dropped.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
