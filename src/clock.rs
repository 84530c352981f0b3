use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of wall-clock time for the quiz engine.
///
/// Every deadline in the engine is computed against this trait so tests can
/// drive a session with a manual clock instead of sleeping.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Production clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually advanced clock for unit and headless integration tests
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Starts at the unix epoch; absolute position is irrelevant to the engine
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            millis: AtomicU64::new(0),
        })
    }

    pub fn advance(&self, delta: Duration) {
        self.millis
            .fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}
