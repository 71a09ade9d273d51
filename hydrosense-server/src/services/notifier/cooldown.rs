use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::Signal;

/// Last alert time per signal; an alert only fires once the window has elapsed.
#[derive(Debug)]
pub struct CooldownTimers {
    window: Duration,
    last_alert: HashMap<Signal, Instant>,
}

impl CooldownTimers {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_alert: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Claim the right to alert on `signal` at `now`, advancing its timer on success.
    pub fn try_acquire(&mut self, signal: Signal, now: Instant) -> bool {
        if let Some(last) = self.last_alert.get(&signal) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        self.last_alert.insert(signal, now);
        true
    }
}
