//! Bounded retry timer - polls for a completion signal that never arrives on its own.
//!
//! Some backends have no "attached" event: the plugin object just becomes
//! interactive at some point. The backend checks for it at a fixed interval,
//! giving up after `max_attempts` failed checks:
//! 1. `schedule(now)` arms the next check
//! 2. `tick(now)` in the update loop reports when the check is due
//! 3. the caller runs the check and reports `record_failure(now)` or `cancel()`
//!
//! No threads, no sleeping: time comes from the caller (see [`Clock`](super::clock::Clock)).

use std::time::Duration;

/// Result of a failed check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Next check armed
    Rescheduled,
    /// Attempt budget used up, nothing armed
    Exhausted,
}

/// Fixed-interval retry timer with an attempt ceiling.
///
/// # Usage
/// ```ignore
/// timer.schedule(clock.now());
///
/// // In update loop:
/// if timer.tick(clock.now()) {
///     if !object.is_interactive() {
///         if timer.record_failure(clock.now()) == RetryOutcome::Exhausted {
///             // fatal
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RetryTimer {
    /// Delay between checks
    interval: Duration,
    /// Failed checks allowed before giving up
    max_attempts: u32,
    /// Failed checks so far
    attempts: u32,
    /// Time at which the next check is due
    due_at: Option<Duration>,
}

impl Default for RetryTimer {
    fn default() -> Self {
        Self::new(50, 60)
    }
}

impl RetryTimer {
    /// Create with interval and attempt ceiling
    pub fn new(interval_ms: u64, max_attempts: u32) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            max_attempts: max_attempts.max(1),
            attempts: 0,
            due_at: None,
        }
    }

    /// Get interval in milliseconds
    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Failed checks recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Arm the next check one interval after `now`.
    /// If already armed, the deadline moves. No-op once exhausted.
    pub fn schedule(&mut self, now: Duration) {
        if self.is_exhausted() {
            return;
        }
        self.due_at = Some(now + self.interval);
        log::trace!(
            "RetryTimer: check #{} scheduled in {}ms",
            self.attempts + 1,
            self.interval.as_millis()
        );
    }

    /// Disarm. Pending checks never fire.
    pub fn cancel(&mut self) {
        if self.due_at.is_some() {
            log::trace!("RetryTimer: cancelled pending check");
        }
        self.due_at = None;
    }

    /// Returns true once when the armed check is due, disarming it.
    pub fn tick(&mut self, now: Duration) -> bool {
        match self.due_at {
            Some(due) if now >= due => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }

    /// Count a failed check and re-arm unless the budget is used up.
    pub fn record_failure(&mut self, now: Duration) -> RetryOutcome {
        self.attempts = self.attempts.saturating_add(1);
        if self.is_exhausted() {
            self.due_at = None;
            RetryOutcome::Exhausted
        } else {
            self.schedule(now);
            RetryOutcome::Rescheduled
        }
    }

    /// Check if a check is armed
    pub fn is_pending(&self) -> bool {
        self.due_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_not_due_before_interval() {
        let mut timer = RetryTimer::new(50, 3);
        timer.schedule(ms(0));
        assert!(timer.is_pending());
        assert!(!timer.tick(ms(49)));
        assert!(timer.tick(ms(50)));
        // Fires once per arm
        assert!(!timer.tick(ms(100)));
    }

    #[test]
    fn test_exhausts_after_max_attempts() {
        let mut timer = RetryTimer::new(50, 3);
        assert_eq!(timer.record_failure(ms(0)), RetryOutcome::Rescheduled);
        assert_eq!(timer.record_failure(ms(50)), RetryOutcome::Rescheduled);
        assert_eq!(timer.record_failure(ms(100)), RetryOutcome::Exhausted);
        assert!(!timer.is_pending());
        assert_eq!(timer.attempts(), 3);

        // Exhausted timers can't be re-armed
        timer.schedule(ms(150));
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut timer = RetryTimer::new(10, 5);
        timer.schedule(ms(0));
        timer.cancel();
        assert!(!timer.tick(ms(1000)));
    }

    #[test]
    fn test_reschedule_moves_deadline() {
        let mut timer = RetryTimer::new(50, 5);
        timer.schedule(ms(0));
        timer.schedule(ms(30));
        assert!(!timer.tick(ms(50)));
        assert!(timer.tick(ms(80)));
    }
}
