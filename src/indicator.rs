//! The three-line RGB indicator driven by the controller.
//!
//! Provides the [`Indicator`] trait for hardware abstraction, a
//! [`PinIndicator`] adapter over `embedded-hal` output pins, and [`Levels`],
//! a snapshot of which lines are currently asserted.

use embedded_hal::digital::OutputPin;
use palette::Srgb;

/// One of the three independently controlled output lines.
///
/// Lines are released in declaration order: `A` first, `C` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Blue element. First to turn off.
    A,
    /// Red element.
    B,
    /// Green element. Last to turn off.
    C,
}

impl Channel {
    /// All channels, in shutdown order.
    pub const ALL: [Channel; 3] = [Channel::A, Channel::B, Channel::C];

    /// Color contributed by this channel when asserted.
    pub const fn color(self) -> Srgb {
        match self {
            Channel::A => Srgb::new(0.0, 0.0, 1.0),
            Channel::B => Srgb::new(1.0, 0.0, 0.0),
            Channel::C => Srgb::new(0.0, 1.0, 0.0),
        }
    }
}

/// Trait for abstracting the indicator hardware.
///
/// Implement this for your output lines (GPIO, shift register, PWM, ...).
pub trait Indicator {
    /// Drives a single line to its "on" (`true`) or "off" (`false`) state.
    ///
    /// Called from interrupt context, so implementations must not block.
    /// Handle any hardware errors internally - this method cannot fail.
    fn set_channel(&mut self, channel: Channel, asserted: bool);
}

/// Snapshot of the three output levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Levels {
    pub a: bool,
    pub b: bool,
    pub c: bool,
}

impl Levels {
    /// All lines deasserted.
    pub const OFF: Levels = Levels {
        a: false,
        b: false,
        c: false,
    };

    /// All lines asserted.
    pub const ALL_ON: Levels = Levels {
        a: true,
        b: true,
        c: true,
    };

    /// Returns the level of a single channel.
    pub fn get(&self, channel: Channel) -> bool {
        match channel {
            Channel::A => self.a,
            Channel::B => self.b,
            Channel::C => self.c,
        }
    }

    /// Sets the level of a single channel.
    pub fn set(&mut self, channel: Channel, asserted: bool) {
        match channel {
            Channel::A => self.a = asserted,
            Channel::B => self.b = asserted,
            Channel::C => self.c = asserted,
        }
    }

    /// Number of asserted lines.
    pub fn asserted_count(&self) -> usize {
        Channel::ALL.iter().filter(|&&ch| self.get(ch)).count()
    }

    /// Renders the levels as the additive color the indicator shows.
    pub fn color(&self) -> Srgb {
        Channel::ALL
            .iter()
            .filter(|&&ch| self.get(ch))
            .fold(Srgb::new(0.0, 0.0, 0.0), |acc, &ch| {
                let c = ch.color();
                Srgb::new(acc.red + c.red, acc.green + c.green, acc.blue + c.blue)
            })
    }
}

/// Indicator implementation over three digital output pins.
///
/// Handles active-high (common cathode) and active-low (common anode)
/// wiring.
pub struct PinIndicator<A, B, C>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
{
    a: A,
    b: B,
    c: C,
    active_low: bool,
}

impl<A, B, C> PinIndicator<A, B, C>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
{
    /// Create a new pin indicator
    ///
    /// # Arguments
    /// * `a` - pin for channel A (blue)
    /// * `b` - pin for channel B (red)
    /// * `c` - pin for channel C (green)
    /// * `active_low` - true for common anode LED (inverted logic), false for common cathode
    pub fn new(a: A, b: B, c: C, active_low: bool) -> Self {
        Self {
            a,
            b,
            c,
            active_low,
        }
    }

    /// Releases the pins.
    pub fn free(self) -> (A, B, C) {
        (self.a, self.b, self.c)
    }

    fn drive<P: OutputPin>(pin: &mut P, high: bool) {
        let _ = if high { pin.set_high() } else { pin.set_low() };
    }
}

impl<A, B, C> Indicator for PinIndicator<A, B, C>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
{
    fn set_channel(&mut self, channel: Channel, asserted: bool) {
        let high = asserted != self.active_low;
        match channel {
            Channel::A => Self::drive(&mut self.a, high),
            Channel::B => Self::drive(&mut self.b, high),
            Channel::C => Self::drive(&mut self.c, high),
        }
    }
}
