use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use rand::Rng;

/// Suspends the caller. Injected so tests can run typing and backoff without
/// wall-clock waits.
pub trait Delay {
    fn pause(&self, duration: Duration);
}

/// Blocks the current thread for the requested time.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn pause(&self, _duration: Duration) {}
}

/// Returns immediately and remembers every requested pause.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Delay for RecordingDelay {
    fn pause(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
    }
}

impl<D: Delay + ?Sized> Delay for std::sync::Arc<D> {
    fn pause(&self, duration: Duration) {
        (**self).pause(duration)
    }
}

/// Per-keystroke pause range for simulated typing, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingCadence {
    min_ms: u64,
    max_ms: u64,
}

impl Default for TypingCadence {
    fn default() -> Self {
        Self {
            min_ms: 30,
            max_ms: 80,
        }
    }
}

impl TypingCadence {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Uniformly random keystroke gap within the range.
    pub fn next_gap(&self) -> Duration {
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}
