//! Heartbeat timer
//!
//! A single repeating task. Rearming aborts the previous task before the new
//! one is spawned, under one lock, so two timers never run at once.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Owns the heartbeat task for a session
#[derive(Debug, Default)]
pub struct HeartbeatTimer {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any running timer and start a new one.
    ///
    /// `tick` runs once after `first_delay`, then every `interval` measured
    /// from the moment of rearming.
    pub fn rearm<F, Fut>(&self, interval: Duration, first_delay: Duration, tick: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut task = self.task.lock();
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let armed_at = Instant::now();
        *task = Some(tokio::spawn(async move {
            time::sleep_until(armed_at + first_delay).await;
            tick().await;

            let mut ticker = time::interval_at(armed_at + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick().await;
            }
        }));
    }

    /// Stop the timer if one is running
    pub fn cancel(&self) {
        if let Some(previous) = self.task.lock().take() {
            previous.abort();
        }
    }

    /// Whether a timer task is alive
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for HeartbeatTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
