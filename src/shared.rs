//! Coordination state shared by the edge handler and the alarm handler.
//!
//! Both cells live behind `critical_section::Mutex`, so every read and
//! write made from one context is complete before the other context can
//! observe it. Mutation is crate-private and takes a [`CriticalSection`]
//! token, which lets the controller make the check and the claim one
//! indivisible step.

use core::cell::Cell;
use critical_section::{CriticalSection, Mutex};

use crate::guard::Rejection;
use crate::time::{TimeDuration, TimeInstant};

/// Busy flag plus the instant of the most recently accepted press.
///
/// Invariants:
/// - only the guard sets `busy`, only the final chain step clears it
/// - `last_accepted` changes only on acceptance, never on rejection
pub struct SharedState<I: TimeInstant> {
    busy: Mutex<Cell<bool>>,
    last_accepted: Mutex<Cell<Option<I>>>,
}

impl<I: TimeInstant> SharedState<I> {
    /// Creates idle state: not busy, no press accepted yet.
    pub const fn new() -> Self {
        Self {
            busy: Mutex::new(Cell::new(false)),
            last_accepted: Mutex::new(Cell::new(None)),
        }
    }

    /// Returns true while a sequence is in progress.
    pub fn is_busy(&self) -> bool {
        critical_section::with(|cs| self.busy.borrow(cs).get())
    }

    /// Instant of the most recently accepted press, if any.
    pub fn last_accepted(&self) -> Option<I> {
        critical_section::with(|cs| self.last_accepted.borrow(cs).get())
    }

    pub(crate) fn is_busy_in(&self, cs: CriticalSection<'_>) -> bool {
        self.busy.borrow(cs).get()
    }

    /// Checks whether a press at `now` may start a sequence. Mutates nothing.
    ///
    /// The press is admitted iff no sequence is running and more than
    /// `window` has elapsed since the last accepted press.
    pub(crate) fn admit(
        &self,
        cs: CriticalSection<'_>,
        now: I,
        window: I::Duration,
    ) -> Result<(), Rejection> {
        if self.busy.borrow(cs).get() {
            return Err(Rejection::Busy);
        }

        if let Some(last) = self.last_accepted.borrow(cs).get() {
            if now.duration_since(last).as_millis() <= window.as_millis() {
                return Err(Rejection::Bounce);
            }
        }

        Ok(())
    }

    /// Marks a sequence as started at `now`.
    pub(crate) fn claim(&self, cs: CriticalSection<'_>, now: I) {
        self.busy.borrow(cs).set(true);
        self.last_accepted.borrow(cs).set(Some(now));
    }

    /// Marks the running sequence as finished.
    pub(crate) fn release(&self, cs: CriticalSection<'_>) {
        self.busy.borrow(cs).set(false);
    }
}

impl<I: TimeInstant> Default for SharedState<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{BootMillis, Millis};

    #[test]
    fn first_press_is_admitted_even_at_boot() {
        let state = SharedState::<BootMillis>::new();
        let result = critical_section::with(|cs| state.admit(cs, BootMillis(0), Millis(250)));
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn press_inside_window_is_bounce() {
        let state = SharedState::<BootMillis>::new();
        critical_section::with(|cs| {
            state.claim(cs, BootMillis(1000));
            state.release(cs);
        });

        let at_edge = critical_section::with(|cs| state.admit(cs, BootMillis(1250), Millis(250)));
        let past_edge = critical_section::with(|cs| state.admit(cs, BootMillis(1251), Millis(250)));

        assert_eq!(at_edge, Err(Rejection::Bounce));
        assert_eq!(past_edge, Ok(()));
    }

    #[test]
    fn busy_wins_over_elapsed_time() {
        let state = SharedState::<BootMillis>::new();
        critical_section::with(|cs| state.claim(cs, BootMillis(0)));

        let result = critical_section::with(|cs| state.admit(cs, BootMillis(60_000), Millis(250)));

        assert_eq!(result, Err(Rejection::Busy));
        assert!(state.is_busy());
        assert_eq!(state.last_accepted(), Some(BootMillis(0)));
    }
}
