//! Commands waiting for the backend to become able to run them.
//!
//! A command issued before readiness is parked here with the signal it waits
//! for. When that signal fires the backend takes every command parked on it,
//! in issue order, and re-runs each one exactly once. A command that still
//! can't run when re-run parks itself again (on the same or another signal);
//! since `take` hands out a detached batch, that never loops within one drain.

use std::collections::VecDeque;

/// Signal a deferred command waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WakeOn {
    /// PLAYBACK_READY
    Ready,
    /// PLAYBACK_BUFFERFULL
    BufferFull,
}

/// Deferrable playback command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    /// Percentage of duration (0-100)
    Seek(f64),
    /// Absolute position in seconds
    SeekSeconds(f64),
    /// Volume 0-100
    Volume(u8),
    /// Seek to the offset embedded in the page URL
    InitialSeek,
}

/// FIFO of (wake signal, command) pairs.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    entries: VecDeque<(WakeOn, Command)>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a command until `wake` fires
    pub fn defer(&mut self, wake: WakeOn, command: Command) {
        log::debug!("Deferring {:?} until {:?}", command, wake);
        self.entries.push_back((wake, command));
    }

    /// Detach every command waiting on `wake`, oldest first.
    /// Commands waiting on other signals keep their relative order.
    pub fn take(&mut self, wake: WakeOn) -> Vec<Command> {
        let mut taken = Vec::new();
        self.entries.retain(|(w, command)| {
            if *w == wake {
                taken.push(*command);
                false
            } else {
                true
            }
        });
        if !taken.is_empty() {
            log::debug!("Draining {} command(s) waiting on {:?}", taken.len(), wake);
        }
        taken
    }

    /// Number of commands waiting on `wake`
    pub fn waiting_on(&self, wake: WakeOn) -> usize {
        self.entries.iter().filter(|(w, _)| *w == wake).count()
    }

    /// Check if `command` is already parked on `wake`
    pub fn contains(&self, wake: WakeOn, command: Command) -> bool {
        self.entries.iter().any(|(w, c)| *w == wake && *c == command)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything (teardown)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_preserves_issue_order() {
        let mut queue = PendingQueue::new();
        queue.defer(WakeOn::Ready, Command::Volume(10));
        queue.defer(WakeOn::Ready, Command::Play);
        queue.defer(WakeOn::Ready, Command::Volume(20));

        assert_eq!(
            queue.take(WakeOn::Ready),
            vec![Command::Volume(10), Command::Play, Command::Volume(20)]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_take_only_matching_signal() {
        let mut queue = PendingQueue::new();
        queue.defer(WakeOn::BufferFull, Command::InitialSeek);
        queue.defer(WakeOn::Ready, Command::Play);
        queue.defer(WakeOn::BufferFull, Command::Seek(50.0));

        assert_eq!(queue.take(WakeOn::Ready), vec![Command::Play]);
        assert_eq!(queue.waiting_on(WakeOn::BufferFull), 2);
        assert_eq!(
            queue.take(WakeOn::BufferFull),
            vec![Command::InitialSeek, Command::Seek(50.0)]
        );
    }

    #[test]
    fn test_redefer_during_drain_waits_for_next_signal() {
        let mut queue = PendingQueue::new();
        queue.defer(WakeOn::Ready, Command::Seek(25.0));

        let batch = queue.take(WakeOn::Ready);
        for command in batch {
            // Still can't run: park again
            queue.defer(WakeOn::Ready, command);
        }
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take(WakeOn::Ready), vec![Command::Seek(25.0)]);
    }

    #[test]
    fn test_take_empty() {
        let mut queue = PendingQueue::new();
        assert!(queue.take(WakeOn::BufferFull).is_empty());
    }
}
