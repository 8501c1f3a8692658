//! A periodic (or one-shot) callback run on its own dedicated thread, the way
//! channel heartbeats and session retries are scheduled.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

/// A running timer. Dropping the handle does not stop the timer; call
/// [`ProtocolTimer::stop`] explicitly. Cloning shares the same underlying thread:
/// stopping one handle stops every clone.
#[derive(Clone)]
pub struct ProtocolTimer {
    stopped: Arc<AtomicBool>,
    reset: Sender<Duration>,
}

impl ProtocolTimer {
    /// Spawn a timer named `name` that waits `period` then calls `callback`.
    ///
    /// If `perpetual` is `true`, the timer reschedules itself after every call,
    /// using the period from the most recent [`ProtocolTimer::reset`] (or the
    /// original `period` if never reset). If `false`, the timer calls `callback` at
    /// most once, then exits.
    pub fn spawn<F>(name: &'static str, period: Duration, perpetual: bool, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let (reset_tx, reset_rx) = bounded::<Duration>(1);

        let stopped_thread = stopped.clone();
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut wait = period;
                loop {
                    match reset_rx.recv_timeout(wait) {
                        Ok(new_period) => {
                            wait = new_period;
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => return,
                        Err(RecvTimeoutError::Timeout) => {
                            if stopped_thread.load(Ordering::SeqCst) {
                                return;
                            }
                            callback();
                            if !perpetual {
                                return;
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn timer thread");

        Self { stopped, reset: reset_tx }
    }

    /// Rearm the timer's wait to `period`, counted from now.
    pub fn reset(&self, period: Duration) {
        let _ = self.reset.send(period);
    }

    /// Stop the timer before its next firing. A callback already in progress still
    /// completes.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        // Wake the thread immediately rather than waiting out whatever period is
        // already in flight.
        let _ = self.reset.send(Duration::from_millis(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn perpetual_timer_fires_repeatedly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let timer = ProtocolTimer::spawn("test-timer", Duration::from_millis(10), true, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(60));
        timer.stop();
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn one_shot_timer_fires_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let _timer = ProtocolTimer::spawn("test-timer-once", Duration::from_millis(10), false, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(80));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
