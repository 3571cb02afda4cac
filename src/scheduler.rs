//! Periodic refresh timer.
//!
//! At most one timer task exists at a time. Starting, re-starting or
//! changing the interval always tears down the previous task first.
//! Ticks are delivered on a channel; the receiver decides what a tick
//! reloads. Stopping the timer does not touch reloads already in flight.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// One timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// Choices offered by the interval selector.
pub const INTERVAL_CHOICES: [Duration; 4] = [
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(30),
    Duration::from_secs(60),
];

struct Timer {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Timer {
    fn cancel(self) {
        let _ = self.stop_tx.send(true);
        self.task.abort();
    }
}

/// Drives periodic reloads.
pub struct RefreshScheduler {
    tick_tx: mpsc::UnboundedSender<Tick>,
    interval: Duration,
    enabled: bool,
    timer: Option<Timer>,
}

impl RefreshScheduler {
    /// Create a stopped scheduler and the receiving end of its ticks.
    pub fn new(interval: Duration) -> (Self, mpsc::UnboundedReceiver<Tick>) {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tick_tx,
            interval,
            enabled: false,
            timer: None,
        };
        (scheduler, tick_rx)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a timer task is currently active.
    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.task.is_finished())
    }

    /// Start ticking every `interval`, replacing any existing timer.
    ///
    /// The first tick fires one full interval after the call. Must be
    /// called from within a tokio runtime.
    pub fn start(&mut self, interval: Duration) {
        self.cancel_timer();
        self.interval = interval;
        self.enabled = true;

        if interval.is_zero() {
            tracing::warn!("refusing to start a zero refresh interval");
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let tick_tx = self.tick_tx.clone();

        let task = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        if tick_tx.send(Tick).is_err() {
                            break;
                        }
                    }
                    changed = stop_rx.changed() => {
                        // A dropped sender also means stop
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        tracing::debug!(interval_ms = interval.as_millis() as u64, "refresh timer started");
        self.timer = Some(Timer { stop_tx, task });
    }

    /// Stop future ticks.
    pub fn stop(&mut self) {
        self.enabled = false;
        if self.timer.is_some() {
            self.cancel_timer();
            tracing::debug!("refresh timer stopped");
        }
    }

    /// Change the interval, restarting the timer if it is enabled.
    pub fn set_interval(&mut self, interval: Duration) {
        if self.enabled {
            self.start(interval);
        } else {
            self.interval = interval;
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        match (enabled, self.enabled) {
            (true, false) => self.start(self.interval),
            (false, true) => self.stop(),
            _ => {}
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("interval", &self.interval)
            .field("enabled", &self.enabled)
            .field("running", &self.is_running())
            .finish()
    }
}

/// The interval selector entry after `current`.
pub fn next_interval(current: Duration) -> Duration {
    INTERVAL_CHOICES
        .iter()
        .copied()
        .find(|choice| *choice > current)
        .unwrap_or(INTERVAL_CHOICES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<Tick>) -> usize {
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_keeps_one_timer() {
        let (mut scheduler, mut rx) = RefreshScheduler::new(Duration::from_secs(10));
        scheduler.start(Duration::from_secs(5));
        scheduler.start(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_millis(20_500)).await;
        assert_eq!(drain(&mut rx), 4);
        assert!(scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_stops_ticks() {
        let (mut scheduler, mut rx) = RefreshScheduler::new(Duration::from_secs(5));
        scheduler.set_enabled(true);
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(drain(&mut rx), 1);

        scheduler.set_enabled(false);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(drain(&mut rx), 0);
        assert!(!scheduler.is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_interval_restarts_timer() {
        let (mut scheduler, mut rx) = RefreshScheduler::new(Duration::from_secs(60));
        scheduler.start(Duration::from_secs(60));
        scheduler.set_interval(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(drain(&mut rx), 3);
        assert_eq!(scheduler.interval(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_interval_while_disabled_does_not_start() {
        let (mut scheduler, mut rx) = RefreshScheduler::new(Duration::from_secs(10));
        scheduler.set_interval(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(drain(&mut rx), 0);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_next_interval_cycles() {
        assert_eq!(next_interval(Duration::from_secs(5)), Duration::from_secs(10));
        assert_eq!(next_interval(Duration::from_secs(10)), Duration::from_secs(30));
        assert_eq!(next_interval(Duration::from_secs(60)), Duration::from_secs(5));
        assert_eq!(next_interval(Duration::from_secs(15)), Duration::from_secs(30));
    }
}
