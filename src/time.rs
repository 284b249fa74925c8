//! Time abstraction traits for platform-agnostic timing.
//!
//! The controller never reads a clock on its own: callers pass the current
//! instant into the edge handler, and [`AlarmQueue`](crate::alarm::AlarmQueue)
//! reads a [`TimeSource`] when arming and firing alarms.

/// Trait for abstracting time sources.
pub trait TimeSource<I: TimeInstant> {
    /// Returns the current time instant.
    fn now(&self) -> I;
}

/// Trait abstraction for duration types.
pub trait TimeDuration: Copy + PartialEq {
    /// Zero duration constant.
    const ZERO: Self;

    /// Converts duration to milliseconds.
    fn as_millis(&self) -> u64;

    /// Creates duration from milliseconds.
    fn from_millis(millis: u64) -> Self;

    /// Saturating subtraction (returns ZERO on underflow).
    fn saturating_sub(self, other: Self) -> Self;
}

/// Trait abstraction for monotonic instant types.
pub trait TimeInstant: Copy {
    /// Duration type for this instant.
    type Duration: TimeDuration;

    /// Calculates duration since an earlier instant.
    fn duration_since(&self, earlier: Self) -> Self::Duration;
}

/// Millisecond duration on a 32-bit counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(pub u32);

impl TimeDuration for Millis {
    const ZERO: Self = Millis(0);

    fn as_millis(&self) -> u64 {
        self.0 as u64
    }

    fn from_millis(millis: u64) -> Self {
        Millis(millis.min(u32::MAX as u64) as u32)
    }

    fn saturating_sub(self, other: Self) -> Self {
        Millis(self.0.saturating_sub(other.0))
    }
}

/// Milliseconds since boot on a free-running 32-bit counter.
///
/// Wraps after ~49.7 days. Differences use wrapping arithmetic, so an
/// interval spanning the wrap is still measured correctly as long as it is
/// shorter than the full counter period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootMillis(pub u32);

impl BootMillis {
    /// Returns the instant as milliseconds since startup.
    pub fn as_millis(&self) -> u32 {
        self.0
    }
}

impl TimeInstant for BootMillis {
    type Duration = Millis;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        Millis(self.0.wrapping_sub(earlier.0))
    }
}
