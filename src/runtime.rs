use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Cadence of the countdown/progress tick
pub const TICK_RATE_MS: u64 = 50;

/// Unified event type consumed by the app loop
#[derive(Clone, Debug)]
pub enum QuizEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError>;
}

/// Production event source using crossterm. Only key presses are forwarded;
/// release/repeat events from enhanced terminals would double-submit answers.
pub struct CrosstermEventSource {
    rx: Receiver<QuizEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.send(QuizEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(QuizEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-backed event source for headless tests
pub struct TestEventSource {
    rx: Receiver<QuizEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<QuizEvent>) -> Self {
        Self { rx }
    }

    /// A source plus the sender that feeds it
    pub fn paired() -> (Sender<QuizEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Pump that interleaves input events with the countdown cadence.
///
/// The countdown deadline and the progress gauge both live on the 50 ms tick,
/// so ticks take priority: once the interval has elapsed, `step` hands back a
/// `Tick` even while keys are queued. Input latency is bounded by one tick.
pub struct Runner<E: EventSource> {
    events: E,
    tick_interval: Duration,
    last_tick: Instant,
}

impl<E: EventSource> Runner<E> {
    pub fn new(events: E) -> Self {
        Self::with_tick_interval(events, Duration::from_millis(TICK_RATE_MS))
    }

    pub fn with_tick_interval(events: E, tick_interval: Duration) -> Self {
        Self {
            events,
            tick_interval,
            last_tick: Instant::now(),
        }
    }

    /// Next event to apply: the overdue tick if the cadence has lapsed,
    /// otherwise an input event, otherwise the tick once the interval expires.
    pub fn step(&mut self) -> QuizEvent {
        let elapsed = self.last_tick.elapsed();
        if elapsed >= self.tick_interval {
            self.last_tick = Instant::now();
            return QuizEvent::Tick;
        }

        match self.events.recv_timeout(self.tick_interval - elapsed) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                self.last_tick = Instant::now();
                QuizEvent::Tick
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, es) = TestEventSource::paired();
        let mut runner = Runner::with_tick_interval(es, Duration::from_millis(1));

        assert_matches!(runner.step(), QuizEvent::Tick);
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, es) = TestEventSource::paired();
        tx.send(QuizEvent::Resize).unwrap();
        let mut runner = Runner::with_tick_interval(es, Duration::from_millis(50));

        assert_matches!(runner.step(), QuizEvent::Resize);
    }

    #[test]
    fn overdue_tick_preempts_queued_input() {
        let (tx, es) = TestEventSource::paired();
        let mut runner = Runner::with_tick_interval(es, Duration::from_millis(2));

        std::thread::sleep(Duration::from_millis(5));
        tx.send(QuizEvent::Resize).unwrap();

        // The cadence lapsed while input queued up: tick first, input next
        assert_matches!(runner.step(), QuizEvent::Tick);
        assert_matches!(runner.step(), QuizEvent::Resize);
    }

    #[test]
    fn default_runner_uses_the_progress_cadence() {
        let (_tx, es) = TestEventSource::paired();
        let runner = Runner::new(es);
        assert_eq!(runner.tick_interval, Duration::from_millis(TICK_RATE_MS));
    }
}
