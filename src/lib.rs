#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`ReactionController`**: Owns the indicator and the coordination state; entry point for both execution contexts
//! - **`DebounceGuard`**: Screens button edges (line identity, debounce window, busy flag)
//! - **`StepMarker`**: The stage a pending alarm will run (`Stage1Target`, `Stage2Target`, `Complete`)
//! - **`Phase`**: Where the indicator is in its cycle (`Idle`, `AllAsserted`, `Stage1Done`, `Stage2Done`)
//! - **`Indicator`**: Trait to implement for your three output lines
//! - **`AlarmScheduler`**: Trait to implement for your one-shot timer facility
//! - **`AlarmQueue`**: Software `AlarmScheduler` over any `TimeSource`
//! - **`TimeSource`**: Trait to implement for your timing system
//!
//! All shared state is guarded with `critical-section`, so the target must
//! provide a critical section implementation (e.g. `cortex-m`'s
//! `critical-section-single-core` or `rp2040-hal`'s `critical-section-impl`).

// Re-export Srgb from palette for user convenience
pub use palette::Srgb;

pub mod alarm;
pub mod chain;
pub mod controller;
pub mod guard;
pub mod indicator;
pub mod shared;
pub mod time;

pub use alarm::{AlarmId, AlarmQueue, AlarmScheduler, Rearm, ScheduleError};
pub use chain::{Phase, StepMarker};
pub use controller::ReactionController;
pub use guard::{ButtonLine, DebounceGuard, EdgeOutcome, Rejection};
pub use indicator::{Channel, Indicator, Levels, PinIndicator};
pub use shared::SharedState;
pub use time::{BootMillis, Millis, TimeDuration, TimeInstant, TimeSource};

/// Minimum time between accepted presses, in milliseconds. A press must
/// arrive strictly later than this after the previous accepted one.
pub const DEBOUNCE_MS: u64 = 250;

/// Delay between consecutive shutdown stages, in milliseconds.
pub const STAGE_DELAY_MS: u64 = 3000;

/// Number of shutdown stages per accepted press.
pub const STAGE_COUNT: usize = Channel::ALL.len();

pub const COLOR_OFF: Srgb = Srgb::new(0.0, 0.0, 0.0);
