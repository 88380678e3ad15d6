//! Wall-clock-aligned refresh scheduling.
//!
//! Refreshes fire at multiples of the interval within the minute (a 30 s
//! interval fires at :00 and :30) rather than at a fixed offset from "now",
//! so boundaries stay consistent across restarts and no drift accumulates
//! from task latency. The loop is explicit: sleep until the next boundary,
//! await the task to completion, recompute. A slow task therefore pushes
//! the next fire to the next available multiple and never double-fires.
//!
//! All timers spawned for a session belong to a [`TimerGroup`] and are torn
//! down as one unit when the session suspends or switches modes.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Timelike, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Delay from `now` to the next wall-clock multiple of `interval`.
///
/// Falls back to the full interval when the next boundary is less than a
/// millisecond away (including sitting exactly on a boundary), so a fire at
/// :30 never immediately re-fires at :30. A zero interval has no boundaries
/// to align to and is returned unchanged.
pub fn aligned_delay<T: TimeZone>(now: DateTime<T>, interval: Duration) -> Duration {
    if interval.is_zero() {
        return interval;
    }

    let step = interval.as_secs_f64();
    let now_seconds = f64::from(now.second()) + f64::from(now.nanosecond()) / 1e9;
    let delay = (now_seconds / step).ceil() * step - now_seconds;

    if delay < 0.001 {
        interval
    } else {
        Duration::from_secs_f64(delay)
    }
}

/// Run `task` at wall-clock multiples of `interval` until shutdown.
///
/// The interval is between scheduled fire times, not between task
/// completions; the next boundary is computed only after the previous task
/// finishes.
pub async fn run_aligned<F, Fut>(mut task: F, interval: Duration, mut shutdown: watch::Receiver<bool>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let delay = aligned_delay(Utc::now(), interval);
        debug!(delay_ms = delay.as_millis() as u64, "next refresh scheduled");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => return,
        }

        task().await;
    }
}

/// Run `task` every `period` (first fire one period from now) until
/// shutdown. Used for the fast countdown re-render tick, which recomputes
/// minutes from already-fetched data without network access.
pub async fn run_tick<F, Fut>(mut task: F, period: Duration, mut shutdown: watch::Receiver<bool>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = shutdown.changed() => return,
        }

        task().await;
    }
}

/// A group of timer tasks torn down as a single unit.
pub struct TimerGroup {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl TimerGroup {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    /// A shutdown receiver for a loop that should stop with this group.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Spawn a task owned by the group.
    pub fn spawn(&mut self, fut: impl Future<Output = ()> + Send + 'static) {
        self.handles.push(tokio::spawn(fut));
    }

    /// Signal every member to stop and wait for them to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
    }
}

impl Default for TimerGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerGroup {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
