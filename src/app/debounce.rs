use std::time::{Duration, Instant};

/// Trailing-edge debounce: every mark restarts the window, and a pending
/// mark fires exactly once after the window has elapsed since the last one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_mark: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_mark: None,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_mark = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_mark.is_some()
    }

    /// Consumes the pending mark if its window has elapsed at `now`.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.last_mark {
            Some(mark) if now.saturating_duration_since(mark) >= self.window => {
                self.last_mark = None;
                true
            }
            _ => false,
        }
    }

    /// Consumes the pending mark regardless of the window.
    pub fn take(&mut self) -> bool {
        self.last_mark.take().is_some()
    }
}
