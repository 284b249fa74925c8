//! Shared test infrastructure for rgb-lamp-timer integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use core::cell::{Cell, RefCell};
use rgb_lamp_timer::{
    AlarmQueue, ButtonLine, Channel, EdgeOutcome, Indicator, ReactionController, TimeDuration,
    TimeInstant, TimeSource,
};

pub const BUTTON: ButtonLine = ButtonLine(5);

// ============================================================================
// Mock Time Types
// ============================================================================

/// Mock duration type for testing (wraps milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestDuration(pub u64);

impl TimeDuration for TestDuration {
    const ZERO: Self = TestDuration(0);

    fn as_millis(&self) -> u64 {
        self.0
    }

    fn from_millis(millis: u64) -> Self {
        TestDuration(millis)
    }

    fn saturating_sub(self, other: Self) -> Self {
        TestDuration(self.0.saturating_sub(other.0))
    }
}

/// Mock instant type for testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub u64);

impl TimeInstant for TestInstant {
    type Duration = TestDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        TestDuration(self.0 - earlier.0)
    }
}

// ============================================================================
// Mock Time Source
// ============================================================================

/// Mock time source with controllable time advancement
pub struct MockTimeSource {
    current_time: Cell<TestInstant>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self {
            current_time: Cell::new(TestInstant(0)),
        }
    }

    /// Advance time by the given duration
    pub fn advance(&self, duration: TestDuration) {
        let current = self.current_time.get();
        self.current_time.set(TestInstant(current.0 + duration.0));
    }

    pub fn set_time(&self, time: TestInstant) {
        self.current_time.set(time);
    }
}

impl TimeSource<TestInstant> for MockTimeSource {
    fn now(&self) -> TestInstant {
        self.current_time.get()
    }
}

// ============================================================================
// Mock Indicator
// ============================================================================

/// One write to an output line, stamped with the simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWrite {
    pub at: u64,
    pub channel: Channel,
    pub asserted: bool,
}

/// Records every line write into a log owned by the test.
pub struct MockIndicator<'a> {
    time_source: &'a MockTimeSource,
    log: &'a RefCell<heapless::Vec<LineWrite, 128>>,
}

impl<'a> MockIndicator<'a> {
    pub fn new(time_source: &'a MockTimeSource, log: &'a RefCell<heapless::Vec<LineWrite, 128>>) -> Self {
        Self { time_source, log }
    }
}

impl Indicator for MockIndicator<'_> {
    fn set_channel(&mut self, channel: Channel, asserted: bool) {
        let write = LineWrite {
            at: self.time_source.now().0,
            channel,
            asserted,
        };
        let _ = self.log.borrow_mut().push(write);
    }
}

// ============================================================================
// Simulation Rig
// ============================================================================

pub type Controller<'a> = ReactionController<TestInstant, MockIndicator<'a>>;
pub type Queue<'a> = AlarmQueue<'a, TestInstant, MockTimeSource, 4>;

/// Advances the clock to `target`, firing each alarm at its exact due time.
///
/// # Returns
/// The number of stages run on the way.
pub fn run_until(clock: &MockTimeSource, controller: &Controller<'_>, queue: &mut Queue<'_>, target: u64) -> usize {
    let mut fired = 0;

    while let Some(wait) = queue.time_until_next() {
        let due_at = clock.now().0 + wait.0;
        if due_at > target {
            break;
        }
        clock.set_time(TestInstant(due_at));
        fired += controller.service_alarms(queue);
    }

    clock.set_time(TestInstant(target));
    fired
}

/// Advances to `at` and presses the button there.
pub fn press_at(
    clock: &MockTimeSource,
    controller: &Controller<'_>,
    queue: &mut Queue<'_>,
    at: u64,
) -> EdgeOutcome {
    run_until(clock, controller, queue, at);
    controller.handle_edge(BUTTON, clock.now(), queue)
}

/// Writes that turned a line off, in order.
pub fn deassertions(log: &RefCell<heapless::Vec<LineWrite, 128>>) -> heapless::Vec<LineWrite, 128> {
    log.borrow().iter().copied().filter(|w| !w.asserted).collect()
}
