//! Reaction controller tying the guard, the shared state and the chain
//! together.
//!
//! Provides [`ReactionController`], the single object both execution
//! contexts hold a shared reference to. The edge interrupt calls
//! [`handle_edge`](ReactionController::handle_edge); the alarm context calls
//! [`handle_alarm`](ReactionController::handle_alarm) (or
//! [`service_alarms`](ReactionController::service_alarms) when the
//! [`AlarmQueue`] is the timer facility). Every call runs to completion in
//! one critical section and never blocks.

use core::cell::RefCell;
use critical_section::Mutex;
use palette::Srgb;

use crate::STAGE_DELAY_MS;
use crate::alarm::{AlarmQueue, AlarmScheduler, Rearm};
use crate::chain::{Phase, StepMarker};
use crate::guard::{ButtonLine, DebounceGuard, EdgeOutcome, Rejection};
use crate::indicator::{Channel, Indicator, Levels};
use crate::shared::SharedState;
use crate::time::{TimeDuration, TimeInstant, TimeSource};

struct Lamps<L: Indicator> {
    indicator: L,
    phase: Phase,
}

impl<L: Indicator> Lamps<L> {
    fn assert_all(&mut self) {
        for channel in Channel::ALL {
            self.indicator.set_channel(channel, true);
        }
        self.phase = Phase::AllAsserted;
    }

    fn run_step(&mut self, marker: StepMarker) {
        self.indicator.set_channel(marker.channel(), false);
        self.phase = marker.phase_after();
    }

    /// Deasserts whatever is still on and returns to idle.
    fn shut_down(&mut self) {
        let levels = self.phase.levels();
        for channel in Channel::ALL.into_iter().filter(|&ch| levels.get(ch)) {
            self.indicator.set_channel(channel, false);
        }
        self.phase = Phase::Idle;
    }
}

/// Button-triggered staged shutdown of a three-line RGB indicator.
///
/// A press on the configured line turns all three outputs on and arms a
/// one-shot alarm; each alarm turns one output off (A, then B, then C)
/// [`STAGE_DELAY_MS`] apart, and the last one releases the controller for
/// the next press.
///
/// # Type Parameters
/// * `I` - Time instant type
/// * `L` - Indicator implementation type
pub struct ReactionController<I: TimeInstant, L: Indicator> {
    guard: DebounceGuard<I>,
    shared: SharedState<I>,
    lamps: Mutex<RefCell<Lamps<L>>>,
    stage_delay: I::Duration,
}

impl<I: TimeInstant, L: Indicator> ReactionController<I, L> {
    /// Creates an idle controller with every output turned off.
    pub fn new(button: ButtonLine, mut indicator: L) -> Self {
        for channel in Channel::ALL {
            indicator.set_channel(channel, false);
        }

        Self {
            guard: DebounceGuard::new(button),
            shared: SharedState::new(),
            lamps: Mutex::new(RefCell::new(Lamps {
                indicator,
                phase: Phase::Idle,
            })),
            stage_delay: I::Duration::from_millis(STAGE_DELAY_MS),
        }
    }

    /// Handles a falling edge on `line` observed at `now`.
    ///
    /// On acceptance the first stage alarm is armed, the busy flag and the
    /// press timestamp are updated, and all three outputs are turned on.
    /// On rejection nothing changes.
    pub fn handle_edge<S>(&self, line: ButtonLine, now: I, alarms: &mut S) -> EdgeOutcome
    where
        S: AlarmScheduler<I::Duration>,
    {
        let outcome = critical_section::with(|cs| {
            if let Err(rejection) = self.guard.screen(cs, &self.shared, line, now) {
                return EdgeOutcome::Rejected(rejection);
            }

            let alarm = match alarms.schedule_once(self.stage_delay, StepMarker::FIRST) {
                Ok(alarm) => alarm,
                Err(err) => return EdgeOutcome::Rejected(Rejection::SchedulerUnavailable(err)),
            };

            self.shared.claim(cs, now);
            self.lamps.borrow_ref_mut(cs).assert_all();

            EdgeOutcome::Accepted(alarm)
        });

        #[cfg(feature = "defmt")]
        match outcome {
            EdgeOutcome::Accepted(alarm) => defmt::debug!("press accepted, armed {}", alarm),
            EdgeOutcome::Rejected(Rejection::SchedulerUnavailable(err)) => {
                defmt::warn!("press dropped, cannot arm first stage: {}", err)
            }
            EdgeOutcome::Rejected(rejection) => defmt::trace!("press ignored: {}", rejection),
        }

        outcome
    }

    /// Runs one stage of the shutdown chain.
    ///
    /// Deasserts the marker's output and arms the successor, or releases the
    /// busy flag when the marker is [`StepMarker::Complete`]. A marker that
    /// is not the one the current phase expects (stray, duplicated or out of
    /// order) is ignored. If the
    /// successor cannot be armed, the remaining outputs are turned off at
    /// once and the controller is released, so a sequence always ends.
    ///
    /// # Returns
    /// Always [`Rearm::Never`]: every stage is single-shot.
    pub fn handle_alarm<S>(&self, marker: StepMarker, alarms: &mut S) -> Rearm<I::Duration>
    where
        S: AlarmScheduler<I::Duration>,
    {
        critical_section::with(|cs| {
            let mut lamps = self.lamps.borrow_ref_mut(cs);
            if !self.shared.is_busy_in(cs) || lamps.phase.expected_marker() != Some(marker) {
                #[cfg(feature = "defmt")]
                defmt::warn!("stray {} in {}", marker, lamps.phase);
                return;
            }

            lamps.run_step(marker);

            let Some(next) = marker.successor() else {
                self.shared.release(cs);
                #[cfg(feature = "defmt")]
                defmt::debug!("sequence complete");
                return;
            };

            if let Err(_err) = alarms.schedule_once(self.stage_delay, next) {
                #[cfg(feature = "defmt")]
                defmt::warn!("cannot arm {}: {}, shutting down now", next, _err);
                lamps.shut_down();
                self.shared.release(cs);
            }
        });

        Rearm::Never
    }

    /// Fires every due alarm in `queue` through [`handle_alarm`](Self::handle_alarm).
    ///
    /// # Returns
    /// The number of stages run.
    pub fn service_alarms<T, const N: usize>(&self, queue: &mut AlarmQueue<'_, I, T, N>) -> usize
    where
        T: TimeSource<I>,
    {
        queue.dispatch_due(|marker, alarms| self.handle_alarm(marker, alarms))
    }

    /// The configured button line.
    pub fn button(&self) -> ButtonLine {
        self.guard.line()
    }

    /// Current phase of the reaction cycle.
    pub fn phase(&self) -> Phase {
        critical_section::with(|cs| self.lamps.borrow_ref(cs).phase)
    }

    /// Current output levels.
    pub fn levels(&self) -> Levels {
        self.phase().levels()
    }

    /// Color currently shown by the indicator.
    pub fn color(&self) -> Srgb {
        self.levels().color()
    }

    /// Returns true while a sequence is in progress.
    pub fn is_busy(&self) -> bool {
        self.shared.is_busy()
    }

    /// Instant of the most recently accepted press, if any.
    pub fn last_accepted(&self) -> Option<I> {
        self.shared.last_accepted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmId, ScheduleError};
    use crate::time::{BootMillis, Millis};

    const BUTTON: ButtonLine = ButtonLine(5);

    #[derive(Default)]
    struct RecordingIndicator {
        levels: Levels,
    }

    impl Indicator for RecordingIndicator {
        fn set_channel(&mut self, channel: Channel, asserted: bool) {
            self.levels.set(channel, asserted);
        }
    }

    /// Scheduler that records requests and can be told to refuse them.
    #[derive(Default)]
    struct ScriptedScheduler {
        armed: heapless::Vec<(Millis, StepMarker), 8>,
        refuse: bool,
    }

    impl AlarmScheduler<Millis> for ScriptedScheduler {
        fn schedule_once(
            &mut self,
            delay: Millis,
            marker: StepMarker,
        ) -> Result<AlarmId, ScheduleError> {
            if self.refuse {
                return Err(ScheduleError::QueueFull);
            }
            self.armed
                .push((delay, marker))
                .map_err(|_| ScheduleError::QueueFull)?;
            Ok(AlarmId(self.armed.len() as u16 - 1))
        }
    }

    fn controller() -> ReactionController<BootMillis, RecordingIndicator> {
        ReactionController::new(BUTTON, RecordingIndicator::default())
    }

    #[test]
    fn accepted_press_arms_first_stage_and_lights_everything() {
        let ctl = controller();
        let mut alarms = ScriptedScheduler::default();

        let outcome = ctl.handle_edge(BUTTON, BootMillis(0), &mut alarms);

        assert_eq!(outcome, EdgeOutcome::Accepted(AlarmId(0)));
        assert_eq!(alarms.armed.as_slice(), &[(Millis(3000), StepMarker::Stage1Target)]);
        assert_eq!(ctl.levels(), Levels::ALL_ON);
        assert_eq!(ctl.phase(), Phase::AllAsserted);
        assert!(ctl.is_busy());
        assert_eq!(ctl.last_accepted(), Some(BootMillis(0)));
    }

    #[test]
    fn each_alarm_arms_exactly_one_successor() {
        let ctl = controller();
        let mut alarms = ScriptedScheduler::default();
        ctl.handle_edge(BUTTON, BootMillis(0), &mut alarms);

        assert_eq!(ctl.handle_alarm(StepMarker::Stage1Target, &mut alarms), Rearm::Never);
        assert_eq!(ctl.handle_alarm(StepMarker::Stage2Target, &mut alarms), Rearm::Never);
        assert_eq!(ctl.handle_alarm(StepMarker::Complete, &mut alarms), Rearm::Never);

        assert_eq!(
            alarms.armed.as_slice(),
            &[
                (Millis(3000), StepMarker::Stage1Target),
                (Millis(3000), StepMarker::Stage2Target),
                (Millis(3000), StepMarker::Complete),
            ]
        );
        assert_eq!(ctl.phase(), Phase::Idle);
        assert!(!ctl.is_busy());
    }

    #[test]
    fn refused_first_alarm_leaves_state_untouched() {
        let ctl = controller();
        let mut alarms = ScriptedScheduler {
            refuse: true,
            ..Default::default()
        };

        let outcome = ctl.handle_edge(BUTTON, BootMillis(0), &mut alarms);

        assert_eq!(
            outcome,
            EdgeOutcome::Rejected(Rejection::SchedulerUnavailable(ScheduleError::QueueFull))
        );
        assert_eq!(ctl.levels(), Levels::OFF);
        assert!(!ctl.is_busy());
        assert_eq!(ctl.last_accepted(), None);
    }

    #[test]
    fn refused_successor_finishes_shutdown_immediately() {
        let ctl = controller();
        let mut alarms = ScriptedScheduler::default();
        ctl.handle_edge(BUTTON, BootMillis(0), &mut alarms);

        alarms.refuse = true;
        ctl.handle_alarm(StepMarker::Stage1Target, &mut alarms);

        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.levels(), Levels::OFF);
        assert!(!ctl.is_busy());
    }

    #[test]
    fn press_inside_window_after_aborted_sequence_is_bounce() {
        let ctl = controller();
        let mut alarms = ScriptedScheduler::default();
        ctl.handle_edge(BUTTON, BootMillis(1000), &mut alarms);

        alarms.refuse = true;
        ctl.handle_alarm(StepMarker::Stage1Target, &mut alarms);
        alarms.refuse = false;

        let outcome = ctl.handle_edge(BUTTON, BootMillis(1200), &mut alarms);
        assert_eq!(outcome, EdgeOutcome::Rejected(Rejection::Bounce));
        assert_eq!(ctl.last_accepted(), Some(BootMillis(1000)));

        assert!(ctl.handle_edge(BUTTON, BootMillis(1251), &mut alarms).is_accepted());
    }

    #[test]
    fn stray_alarm_while_idle_is_ignored() {
        let ctl = controller();
        let mut alarms = ScriptedScheduler::default();

        ctl.handle_alarm(StepMarker::Stage2Target, &mut alarms);

        assert_eq!(ctl.phase(), Phase::Idle);
        assert!(alarms.armed.is_empty());
    }

    #[test]
    fn out_of_order_alarm_mid_sequence_is_ignored() {
        let ctl = controller();
        let mut alarms = ScriptedScheduler::default();
        ctl.handle_edge(BUTTON, BootMillis(0), &mut alarms);

        ctl.handle_alarm(StepMarker::Complete, &mut alarms);

        let shown = critical_section::with(|cs| ctl.lamps.borrow_ref(cs).indicator.levels);
        assert_eq!(shown, Levels::ALL_ON);
        assert_eq!(ctl.levels(), shown);
        assert_eq!(ctl.phase(), Phase::AllAsserted);
        assert!(ctl.is_busy());
        assert_eq!(alarms.armed.len(), 1);
    }

    #[test]
    fn duplicated_alarm_does_not_fork_the_chain() {
        let ctl = controller();
        let mut alarms = ScriptedScheduler::default();
        ctl.handle_edge(BUTTON, BootMillis(0), &mut alarms);

        ctl.handle_alarm(StepMarker::Stage1Target, &mut alarms);
        ctl.handle_alarm(StepMarker::Stage1Target, &mut alarms);

        assert_eq!(
            alarms.armed.as_slice(),
            &[
                (Millis(3000), StepMarker::Stage1Target),
                (Millis(3000), StepMarker::Stage2Target),
            ]
        );
        assert_eq!(ctl.phase(), Phase::Stage1Done);

        let shown = critical_section::with(|cs| ctl.lamps.borrow_ref(cs).indicator.levels);
        assert_eq!(shown, ctl.levels());
    }

    #[test]
    fn construction_turns_outputs_off() {
        let indicator = RecordingIndicator {
            levels: Levels::ALL_ON,
        };
        let ctl = ReactionController::<BootMillis, _>::new(BUTTON, indicator);

        let shown = critical_section::with(|cs| ctl.lamps.borrow_ref(cs).indicator.levels);
        assert_eq!(shown, Levels::OFF);
        assert_eq!(ctl.button(), BUTTON);
    }
}
