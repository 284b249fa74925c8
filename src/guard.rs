//! Input debounce guard.
//!
//! Screens falling-edge events from the button line. A press is accepted
//! only when it comes from the configured line, no sequence is running, and
//! more than [`DEBOUNCE_MS`](crate::DEBOUNCE_MS) has passed since the last
//! accepted press. Everything else is dropped without side effects.

use critical_section::CriticalSection;

use crate::DEBOUNCE_MS;
use crate::alarm::{AlarmId, ScheduleError};
use crate::shared::SharedState;
use crate::time::{TimeDuration, TimeInstant};

/// Identity of an input line (GPIO number on most targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonLine(pub u8);

/// Why an edge event did not start a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rejection {
    /// The edge came from a line other than the configured button.
    ForeignLine(ButtonLine),
    /// A sequence is already in progress.
    Busy,
    /// The edge arrived within the debounce window of the last accepted press.
    Bounce,
    /// The first stage alarm could not be armed.
    SchedulerUnavailable(ScheduleError),
}

/// Result of feeding one edge event to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeOutcome {
    /// Sequence started; the first stage alarm is pending under this handle.
    Accepted(AlarmId),
    /// Event dropped. No state was changed.
    Rejected(Rejection),
}

impl EdgeOutcome {
    /// Returns true if the event started a sequence.
    pub fn is_accepted(&self) -> bool {
        matches!(self, EdgeOutcome::Accepted(_))
    }
}

/// Decides whether an edge event may start a sequence.
pub struct DebounceGuard<I: TimeInstant> {
    line: ButtonLine,
    window: I::Duration,
}

impl<I: TimeInstant> DebounceGuard<I> {
    /// Creates a guard for `line` with the standard debounce window.
    pub fn new(line: ButtonLine) -> Self {
        Self {
            line,
            window: I::Duration::from_millis(DEBOUNCE_MS),
        }
    }

    /// The configured button line.
    pub fn line(&self) -> ButtonLine {
        self.line
    }

    /// Screens an event. Mutates nothing; the caller claims on `Ok`.
    pub(crate) fn screen(
        &self,
        cs: CriticalSection<'_>,
        shared: &SharedState<I>,
        line: ButtonLine,
        now: I,
    ) -> Result<(), Rejection> {
        if line != self.line {
            return Err(Rejection::ForeignLine(line));
        }

        shared.admit(cs, now, self.window)
    }
}
