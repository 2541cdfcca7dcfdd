//! Module power control
//!
//! Boards either wire the module's enable line to a GPIO, or leave the
//! module permanently powered. [`EnablePin`] drives the line with the
//! configured [`Polarity`]; [`AlwaysOn`] (or `None::<EnablePin<_>>`)
//! stands in when there is no line to drive.

use core::convert::Infallible;

use embedded_hal::digital::{OutputPin, PinState};

/// Level of the enable line that turns the module on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// High = module on
    #[default]
    ActiveHigh,
    /// Low = module on
    ActiveLow,
}

impl Polarity {
    /// Physical line level for the logical `enabled` state.
    pub fn level(self, enabled: bool) -> PinState {
        PinState::from(enabled != (self == Polarity::ActiveLow))
    }
}

/// Control over the module's power.
pub trait PowerControl {
    /// Error type of the underlying line
    type Error;

    /// Turns the module on or off.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Prepares the line and turns the module on, ahead of bring-up.
    fn initialize(&mut self) -> Result<(), Self::Error> {
        self.set_enabled(true)
    }

    /// Turns the module off.
    fn shutdown(&mut self) -> Result<(), Self::Error> {
        self.set_enabled(false)
    }
}

/// Module enable line on a GPIO.
pub struct EnablePin<P> {
    pin: P,
    polarity: Polarity,
}

impl<P> EnablePin<P> {
    /// Wraps an output pin driving the enable line.
    pub fn new(pin: P, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    /// Releases the underlying pin.
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> PowerControl for EnablePin<P> {
    type Error = P::Error;

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error> {
        debug!("Turning Bluetooth {}", if enabled { "on" } else { "off" });
        self.pin.set_state(self.polarity.level(enabled))
    }

    /// Drives the line to its off level, then turns the module on.
    ///
    /// A freshly configured output starts out inactive, so the module
    /// always sees an off/on cycle here, even if it was already running.
    fn initialize(&mut self) -> Result<(), Self::Error> {
        self.pin.set_state(self.polarity.level(false))?;
        self.set_enabled(true)
    }
}

/// Module without an enable line.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOn;

impl PowerControl for AlwaysOn {
    type Error = Infallible;

    fn set_enabled(&mut self, _enabled: bool) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<C: PowerControl> PowerControl for Option<C> {
    type Error = C::Error;

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error> {
        match self {
            Some(control) => control.set_enabled(enabled),
            None => Ok(()),
        }
    }

    fn initialize(&mut self) -> Result<(), Self::Error> {
        match self {
            Some(control) => control.initialize(),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self) -> Result<(), Self::Error> {
        match self {
            Some(control) => control.shutdown(),
            None => Ok(()),
        }
    }
}
