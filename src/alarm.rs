//! One-shot alarm facility.
//!
//! [`AlarmScheduler`] is the seam between the controller and whatever
//! timer the target runtime offers. [`AlarmQueue`] is a fixed-capacity
//! software implementation over any [`TimeSource`], for runtimes that only
//! provide a single hardware compare register (or none at all) and for
//! host-side simulation.

use core::cmp::Reverse;

use crate::chain::StepMarker;
use crate::time::{TimeDuration, TimeInstant, TimeSource};

/// Handle for an armed alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmId(pub u16);

/// Errors that can occur while arming an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// Every alarm slot is already pending.
    QueueFull,
    /// The delay cannot be represented by the underlying timer.
    DelayOutOfRange,
}

impl core::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ScheduleError::QueueFull => write!(f, "no free alarm slot"),
            ScheduleError::DelayOutOfRange => {
                write!(f, "alarm delay exceeds timer range")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScheduleError {}

/// What an alarm callback asks of the facility once it has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rearm<D> {
    /// Single-shot: the alarm is finished.
    Never,
    /// Fire the same marker again after the given delay.
    After(D),
}

/// Trait for abstracting a one-shot timer facility.
///
/// Implementations must fire the alarm no earlier than `delay` after the
/// call, exactly once, handing the marker back to the controller. Arming
/// must not block; it is called from interrupt context.
pub trait AlarmScheduler<D: TimeDuration> {
    /// Arms a single-shot alarm carrying `marker`.
    fn schedule_once(&mut self, delay: D, marker: StepMarker) -> Result<AlarmId, ScheduleError>;
}

struct PendingAlarm<I: TimeInstant> {
    id: AlarmId,
    armed_at: I,
    delay: I::Duration,
    marker: StepMarker,
}

impl<I: TimeInstant> PendingAlarm<I> {
    fn remaining(&self, now: I) -> I::Duration {
        self.delay.saturating_sub(now.duration_since(self.armed_at))
    }

    fn is_due(&self, now: I) -> bool {
        now.duration_since(self.armed_at).as_millis() >= self.delay.as_millis()
    }
}

/// Software one-shot alarm pool.
///
/// Holds up to `N` pending alarms, each recorded as "armed at, fire after"
/// so that due checks are correct on wrapping counters.
///
/// # Type Parameters
/// * `'t` - Lifetime of the time source reference
/// * `I` - Time instant type
/// * `T` - Time source implementation type
/// * `N` - Maximum number of pending alarms
pub struct AlarmQueue<'t, I: TimeInstant, T: TimeSource<I>, const N: usize> {
    time_source: &'t T,
    pending: heapless::Vec<PendingAlarm<I>, N>,
    next_id: u16,
    dropped_rearms: u32,
}

impl<'t, I: TimeInstant, T: TimeSource<I>, const N: usize> AlarmQueue<'t, I, T, N> {
    /// Creates an empty queue.
    pub fn new(time_source: &'t T) -> Self {
        Self {
            time_source,
            pending: heapless::Vec::new(),
            next_id: 0,
            dropped_rearms: 0,
        }
    }

    /// Re-arm requests dropped by [`dispatch_due`](Self::dispatch_due)
    /// because the queue was full.
    pub fn dropped_rearms(&self) -> u32 {
        self.dropped_rearms
    }

    /// Number of pending alarms.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no alarm is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Markers of all pending alarms, in arming order.
    pub fn pending_markers(&self) -> impl Iterator<Item = StepMarker> + '_ {
        self.pending.iter().map(|alarm| alarm.marker)
    }

    /// Time until the earliest pending alarm is due.
    ///
    /// # Returns
    /// * `Some(Duration::ZERO)` - At least one alarm is already due
    /// * `Some(duration)` - Sleep this long before dispatching
    /// * `None` - Nothing pending
    pub fn time_until_next(&self) -> Option<I::Duration> {
        let now = self.time_source.now();
        self.pending
            .iter()
            .map(|alarm| alarm.remaining(now))
            .min_by_key(|remaining| remaining.as_millis())
    }

    /// Removes and returns the most overdue alarm, if any is due.
    ///
    /// Alarms overdue by the same amount pop in arming order.
    pub fn pop_due(&mut self) -> Option<(AlarmId, StepMarker)> {
        let now = self.time_source.now();
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, alarm)| alarm.is_due(now))
            .min_by_key(|(_, alarm)| {
                Reverse(
                    now.duration_since(alarm.armed_at)
                        .as_millis()
                        .saturating_sub(alarm.delay.as_millis()),
                )
            })
            .map(|(idx, _)| idx)?;

        // `remove` keeps arming order for the remaining entries
        let alarm = self.pending.remove(idx);
        Some((alarm.id, alarm.marker))
    }

    /// Fires every alarm that is due, oldest deadline first.
    ///
    /// The handler gets the queue back so it can arm successors. At most as
    /// many alarms fire as were pending on entry, so a handler that re-arms
    /// with a zero delay cannot spin this loop.
    ///
    /// A [`Rearm::After`] that finds the queue full is dropped and counted in
    /// [`dropped_rearms`](Self::dropped_rearms).
    ///
    /// # Returns
    /// The number of alarms fired.
    pub fn dispatch_due<F>(&mut self, mut handler: F) -> usize
    where
        F: FnMut(StepMarker, &mut Self) -> Rearm<I::Duration>,
    {
        let budget = self.pending.len();
        let mut fired = 0;

        while fired < budget {
            let Some((_id, marker)) = self.pop_due() else {
                break;
            };
            fired += 1;

            if let Rearm::After(delay) = handler(marker, self) {
                if let Err(_err) = self.schedule_once(delay, marker) {
                    self.dropped_rearms = self.dropped_rearms.saturating_add(1);
                    #[cfg(feature = "defmt")]
                    defmt::warn!("dropping re-arm of {}: {}", marker, _err);
                }
            }
        }

        fired
    }
}

impl<I: TimeInstant, T: TimeSource<I>, const N: usize> AlarmScheduler<I::Duration>
    for AlarmQueue<'_, I, T, N>
{
    fn schedule_once(
        &mut self,
        delay: I::Duration,
        marker: StepMarker,
    ) -> Result<AlarmId, ScheduleError> {
        let id = AlarmId(self.next_id);
        let alarm = PendingAlarm {
            id,
            armed_at: self.time_source.now(),
            delay,
            marker,
        };

        self.pending
            .push(alarm)
            .map_err(|_| ScheduleError::QueueFull)?;
        self.next_id = self.next_id.wrapping_add(1);

        Ok(id)
    }
}
