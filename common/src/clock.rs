//! Wall-clock time, injected so tests can control it.
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of the current time, expressed as unsigned seconds since the Unix epoch.
///
/// `version.timestamp` is specified here as unsigned seconds since epoch (see
/// DESIGN.md for why the source's mixed signed/unsigned handling was not carried
/// over).
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current time, in seconds since the Unix epoch.
    fn now(&self) -> u32;
}

/// The real system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }
}

/// A clock that always reports a fixed time, for deterministic tests.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn now(&self) -> u32 {
        self.0
    }
}
