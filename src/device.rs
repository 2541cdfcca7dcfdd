//! RN-42 Module Interface
//!
//! This module provides a high-level interface for bringing an RN-42 module
//! online and taking it down again. It supports both synchronous and
//! asynchronous operation.
//!
//! The interface is built around the `Module<T, D, P>` struct which owns the
//! UART transport, a delay provider and the power control, and provides
//! methods for:
//! - Powering the module up and running the bring-up sequence
//! - Reading back the identifier the module reported
//! - Powering the module down
//!
//! # Example
//! ```ignore
//! use rn42::{AlwaysOn, Module, ModuleProfile};
//!
//! let uart = // ... Transport implementation at the module's rate
//! let mut module = Module::new(uart, delay, AlwaysOn, ModuleProfile::RN42);
//!
//! if module.initialize()?.is_success() {
//!     let address = module.identity().device_id();
//! }
//! ```

use crate::identity::ModuleIdentity;
use crate::power::PowerControl;
use crate::profile::ModuleProfile;
use crate::sequencer::{BringupResult, Sequencer};
use crate::transport::{AsyncTransport, Transport};

/// Main interface for an attached RN-42.
///
/// The identity starts as the sentinel and is refreshed by every call to
/// [`initialize`](Module::initialize).
pub struct Module<T, D, P> {
    transport: T,
    delay: D,
    power: P,
    profile: ModuleProfile,
    identity: ModuleIdentity,
}

impl<T, D, P> Module<T, D, P> {
    /// Creates a new Module instance.
    ///
    /// # Arguments
    /// * `transport` - UART to the module, at its current rate
    /// * `delay` - Delay provider
    /// * `power` - Control over the module's enable line
    /// * `profile` - Description of the module
    pub fn new(transport: T, delay: D, power: P, profile: ModuleProfile) -> Self {
        Self {
            transport,
            delay,
            power,
            profile,
            identity: ModuleIdentity::unknown(),
        }
    }

    /// The identifier reported during the last bring-up.
    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    /// The profile the module is brought up with.
    pub fn profile(&self) -> &ModuleProfile {
        &self.profile
    }

    /// Releases the transport, delay provider and power control.
    pub fn release(self) -> (T, D, P) {
        (self.transport, self.delay, self.power)
    }
}

impl<T, D, P> Module<T, D, P>
where
    P: PowerControl,
{
    /// Turns the module off.
    ///
    /// # Errors
    /// * `P::Error` - Driving the enable line failed
    pub fn deinitialize(&mut self) -> Result<(), P::Error> {
        self.power.shutdown()
    }
}

impl<T, D, P> Module<T, D, P>
where
    T: Transport,
    D: embedded_hal::delay::DelayNs,
    P: PowerControl,
{
    /// Powers the module up and runs the bring-up sequence.
    ///
    /// Powering up cycles the enable line, so a running module is
    /// restarted. Bring-up failures are reported through the returned
    /// [`BringupResult`], not as errors.
    ///
    /// # Errors
    /// * `P::Error` - Driving the enable line failed
    pub fn initialize(&mut self) -> Result<BringupResult, P::Error> {
        info!("Initializing Bluetooth...");

        self.power.initialize()?;

        let mut sequencer = Sequencer::new(&mut self.transport, &mut self.delay, &self.profile);
        let result = sequencer.run(&mut self.identity);
        // the reboot leaves status output behind
        sequencer.discard_stale();

        info!("Done.");
        Ok(result)
    }
}

impl<T, D, P> Module<T, D, P>
where
    T: AsyncTransport,
    D: embedded_hal_async::delay::DelayNs,
    P: PowerControl,
{
    /// Asynchronously powers the module up and runs the bring-up sequence.
    ///
    /// This is the async version of [`initialize`](Module::initialize).
    pub async fn initialize_async(&mut self) -> Result<BringupResult, P::Error> {
        info!("Initializing Bluetooth...");

        self.power.initialize()?;

        let mut sequencer = Sequencer::new(&mut self.transport, &mut self.delay, &self.profile);
        let result = sequencer.run_async(&mut self.identity).await;
        sequencer.discard_stale_async().await;

        info!("Done.");
        Ok(result)
    }
}
