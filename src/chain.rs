//! The staged shutdown chain.
//!
//! Each link is a one-shot alarm carrying a [`StepMarker`]. When the alarm
//! fires, exactly one output is deasserted and, unless the marker is
//! [`StepMarker::Complete`], exactly one successor alarm is armed. The marker
//! only ever lives inside the pending alarm.

use crate::indicator::{Channel, Levels};

/// Which stage a pending alarm will perform when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepMarker {
    /// Deassert channel A.
    Stage1Target,
    /// Deassert channel B.
    Stage2Target,
    /// Deassert channel C and release the guard.
    Complete,
}

impl StepMarker {
    /// Marker armed by the guard on acceptance.
    pub const FIRST: StepMarker = StepMarker::Stage1Target;

    /// The output this step deasserts.
    pub const fn channel(self) -> Channel {
        match self {
            StepMarker::Stage1Target => Channel::A,
            StepMarker::Stage2Target => Channel::B,
            StepMarker::Complete => Channel::C,
        }
    }

    /// The step to arm after this one, or `None` when the chain terminates.
    pub const fn successor(self) -> Option<StepMarker> {
        match self {
            StepMarker::Stage1Target => Some(StepMarker::Stage2Target),
            StepMarker::Stage2Target => Some(StepMarker::Complete),
            StepMarker::Complete => None,
        }
    }

    /// The sequence phase once this step has run.
    pub const fn phase_after(self) -> Phase {
        match self {
            StepMarker::Stage1Target => Phase::Stage1Done,
            StepMarker::Stage2Target => Phase::Stage2Done,
            StepMarker::Complete => Phase::Idle,
        }
    }
}

/// Where the indicator is in its reaction cycle.
///
/// `Idle` is both the initial and the terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No sequence in progress. All outputs off.
    #[default]
    Idle,
    /// Accepted press; all outputs on.
    AllAsserted,
    /// A off; B and C on.
    Stage1Done,
    /// A and B off; C on.
    Stage2Done,
}

impl Phase {
    /// Output levels this phase displays.
    pub const fn levels(self) -> Levels {
        match self {
            Phase::Idle => Levels::OFF,
            Phase::AllAsserted => Levels::ALL_ON,
            Phase::Stage1Done => Levels {
                a: false,
                b: true,
                c: true,
            },
            Phase::Stage2Done => Levels {
                a: false,
                b: false,
                c: true,
            },
        }
    }

    /// True while a sequence holds the guard.
    pub const fn is_active(self) -> bool {
        !matches!(self, Phase::Idle)
    }

    /// The only marker that may run next from this phase.
    ///
    /// # Returns
    /// `None` when idle: no alarm is legitimately pending.
    pub const fn expected_marker(self) -> Option<StepMarker> {
        match self {
            Phase::Idle => None,
            Phase::AllAsserted => Some(StepMarker::Stage1Target),
            Phase::Stage1Done => Some(StepMarker::Stage2Target),
            Phase::Stage2Done => Some(StepMarker::Complete),
        }
    }
}
