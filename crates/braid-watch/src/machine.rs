//! Watch loop states.
//!
//! | From        | Event            | To                      |
//! |-------------|------------------|-------------------------|
//! | Idle        | change           | Debouncing              |
//! | Debouncing  | change           | Debouncing (reset)      |
//! | Debouncing  | deadline         | Resolving               |
//! | Resolving   | change           | Resolving (dirty)       |
//! | Resolving   | done, dirty      | Debouncing              |
//! | Resolving   | done, ok         | Idle                    |
//! | Resolving   | done, error      | Failed                  |
//! | Failed      | change           | Debouncing              |
//!
//! Time is passed in, so transitions are deterministic under test.

use std::time::{Duration, Instant};

/// Current phase of the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for changes.
    Idle,
    /// Changes seen; a pass starts at `deadline` unless more arrive.
    Debouncing {
        /// When the pass starts.
        deadline: Instant,
    },
    /// A pass is running.
    Resolving {
        /// Changes arrived during the pass.
        dirty: bool,
    },
    /// The last pass failed; the previous site is still served.
    Failed,
}

/// Debounce state machine guaranteeing at most one pass in flight and at
/// most one queued.
#[derive(Debug)]
pub struct WatchMachine {
    state: WatchState,
    debounce: Duration,
}

impl WatchMachine {
    /// Create an idle machine.
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: WatchState::Idle,
            debounce,
        }
    }

    /// Current state.
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Quiet period applied to new changes.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Change the quiet period for subsequent changes.
    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    /// Record a relevant change observed at `now`.
    pub fn on_change(&mut self, now: Instant) {
        self.state = match self.state {
            WatchState::Resolving { .. } => WatchState::Resolving { dirty: true },
            WatchState::Idle | WatchState::Debouncing { .. } | WatchState::Failed => {
                WatchState::Debouncing {
                    deadline: now + self.debounce,
                }
            }
        };
    }

    /// Start a pass if the debounce deadline has passed.
    ///
    /// Returns `true` when the caller must run a pass and then call
    /// [`WatchMachine::finish`].
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            WatchState::Debouncing { deadline } if now >= deadline => {
                self.state = WatchState::Resolving { dirty: false };
                true
            }
            _ => false,
        }
    }

    /// Start a pass now if one is pending, ignoring the deadline.
    pub fn flush(&mut self) -> bool {
        match self.state {
            WatchState::Debouncing { .. } => {
                self.state = WatchState::Resolving { dirty: false };
                true
            }
            _ => false,
        }
    }

    /// When the pending pass is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            WatchState::Debouncing { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Leave `Resolving` after a pass.
    ///
    /// Changes seen during the pass start a new debounce cycle regardless of
    /// the outcome.
    pub fn finish(&mut self, succeeded: bool, now: Instant) {
        let WatchState::Resolving { dirty } = self.state else {
            return;
        };
        self.state = if dirty {
            WatchState::Debouncing {
                deadline: now + self.debounce,
            }
        } else if succeeded {
            WatchState::Idle
        } else {
            WatchState::Failed
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(100);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_rapid_changes_trigger_one_pass() {
        let start = Instant::now();
        let mut machine = WatchMachine::new(DEBOUNCE);
        let mut passes = 0;

        for i in 0..10 {
            let now = start + ms(i * 10);
            machine.on_change(now);
            if machine.poll(now) {
                passes += 1;
            }
        }
        assert_eq!(passes, 0);
        assert_eq!(machine.next_deadline(), Some(start + ms(90) + DEBOUNCE));

        assert!(!machine.poll(start + ms(150)));
        assert!(machine.poll(start + ms(190)));
        passes += 1;
        machine.finish(true, start + ms(200));
        assert!(!machine.poll(start + ms(1000)));

        assert_eq!(passes, 1);
        assert_eq!(machine.state(), WatchState::Idle);
    }

    #[test]
    fn test_change_during_pass_queues_one_more() {
        let start = Instant::now();
        let mut machine = WatchMachine::new(DEBOUNCE);
        machine.on_change(start);
        assert!(machine.poll(start + DEBOUNCE));

        machine.on_change(start + ms(110));
        machine.on_change(start + ms(120));
        assert_eq!(machine.state(), WatchState::Resolving { dirty: true });
        assert!(!machine.poll(start + ms(130)));

        machine.finish(true, start + ms(150));
        assert_eq!(
            machine.state(),
            WatchState::Debouncing {
                deadline: start + ms(150) + DEBOUNCE
            }
        );
    }

    #[test]
    fn test_failure_then_change_recovers() {
        let start = Instant::now();
        let mut machine = WatchMachine::new(DEBOUNCE);
        machine.on_change(start);
        assert!(machine.poll(start + DEBOUNCE));
        machine.finish(false, start + ms(120));
        assert_eq!(machine.state(), WatchState::Failed);
        assert_eq!(machine.next_deadline(), None);

        machine.on_change(start + ms(500));
        assert!(matches!(machine.state(), WatchState::Debouncing { .. }));
        assert!(machine.poll(start + ms(600)));
    }

    #[test]
    fn test_flush_skips_deadline() {
        let start = Instant::now();
        let mut machine = WatchMachine::new(DEBOUNCE);
        assert!(!machine.flush());
        machine.on_change(start);
        assert!(machine.flush());
        assert_eq!(machine.state(), WatchState::Resolving { dirty: false });
    }

    #[test]
    fn test_finish_outside_pass_is_ignored() {
        let mut machine = WatchMachine::new(DEBOUNCE);
        machine.finish(false, Instant::now());
        assert_eq!(machine.state(), WatchState::Idle);
    }
}
