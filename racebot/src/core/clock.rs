use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// Clock provides the two time sources of a race. The monotonic reading is used exclusively for
/// elapsed-time arithmetic (start, pause, finish times), the wall-clock reading exclusively for
/// reporting the race start. Neither is ever derived from the other.
pub trait Clock: Debug + Send + Sync {
    /// Monotonic reading relative to an arbitrary but fixed origin.
    fn monotonic(&self) -> Duration;

    fn wall(&self) -> DateTime<Utc>;
}

#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl Clock for SystemClock {
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// ManualClock only moves when advanced explicitly, which makes finish and pause times
/// reproducible.
#[derive(Debug)]
pub struct ManualClock {
    monotonic: Mutex<Duration>,
    wall: DateTime<Utc>,
}

impl ManualClock {
    pub fn new(wall: DateTime<Utc>) -> ManualClock {
        ManualClock {
            monotonic: Mutex::new(Duration::ZERO),
            wall,
        }
    }

    pub fn advance(&self, step: Duration) {
        *self.monotonic.lock() += step;
    }

    pub fn advance_centis(&self, centis: u32) {
        self.advance(Duration::from_millis(centis as u64 * 10))
    }
}

impl Clock for ManualClock {
    fn monotonic(&self) -> Duration {
        *self.monotonic.lock()
    }

    fn wall(&self) -> DateTime<Utc> {
        self.wall
    }
}
