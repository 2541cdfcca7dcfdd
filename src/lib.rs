#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]
//! RN-42 Bring-up Driver
//!
//! This crate brings a Microchip RN-42 Bluetooth module attached over a UART
//! into its operating configuration. The RN-42 is configured through short
//! ASCII commands exchanged in its command mode; this driver sends the fixed
//! set of commands a freshly powered module needs and interprets the
//! replies.
//!
//! # Features
//! - Baud rate negotiation, with probing of the rates a module may have
//!   been left at
//! - Device name, remote configuration timer, inquiry and page scan windows
//! - Readout of the module's Bluetooth address
//! - Enable line control with either polarity, or none at all
//! - Blocking and async operation
//! - Optional logging through `defmt` or `log`
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`device`]: Main interface tying power, transport and bring-up together
//!
//! - [`sequencer`]: The bring-up sequence itself
//!   - Runs each configuration step as one command/response exchange
//!   - Aborts only when the baud rate cannot be negotiated
//!
//! - [`profile`]: Description of the attached module and its steps
//!
//! - [`commands`]: The RN-42 command set
//!
//! - [`response`]: Reply accumulation and token matching
//!
//! - [`transport`]: UART abstraction, with an adapter for `embedded-io`
//!
//! - [`power`]: Enable line control
//!
//! - [`identity`]: The identifier read from the module
//!
//! # Usage
//! Bring-up follows a specific sequence:
//!
//! 1. Power the module on (cycling the enable line if present)
//! 2. Wait for the module to boot
//! 3. Enter command mode
//! 4. Set the baud rate and follow with the local UART
//! 5. Set the name and read the address
//! 6. Disable remote configuration, tune the scan windows
//! 7. Reboot the module to commit the settings
//!
//! # Important Notes
//! - Only a failed baud rate negotiation aborts the sequence, every other
//!   failed step is logged and skipped
//! - Command mode is only reachable while the module's configuration timer
//!   is running, shortly after power-on
//! - Results finer than [`BringupResult`] are only visible in the log
//!
//! # Example
//! ```ignore
//! use rn42::{EnablePin, Module, ModuleProfile, Polarity, SerialTransport};
//!
//! let uart = SerialTransport::new(uart, 115200);
//! let power = EnablePin::new(enable_pin, Polarity::ActiveLow);
//! let mut module = Module::new(uart, delay, power, ModuleProfile::RN42);
//!
//! let result = module.initialize()?;
//! ```

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod commands;
pub mod device;
pub mod identity;
pub mod power;
pub mod profile;
pub mod response;
pub mod sequencer;
pub mod transport;

pub use device::Module;
pub use identity::{ModuleIdentity, DEVICE_ID_CAPACITY, UNKNOWN_DEVICE_ID};
pub use power::{AlwaysOn, EnablePin, Polarity, PowerControl};
pub use profile::ModuleProfile;
pub use response::StepError;
pub use sequencer::{BringupResult, Sequencer};
pub use transport::{AsyncTransport, BaudControl, BaudRate, SerialTransport, Transport};
