//! Module profile and bring-up steps
//!
//! A [`ModuleProfile`] describes everything bring-up needs to know about
//! the attached module: its command grammar, the rates it may be found
//! at, and the settings to apply. [`ModuleProfile::RN42`] is the profile
//! for a factory-fresh RN-42.
//!
//! The profile expands into a fixed list of [`Step`]s. Each step declares
//! what happens when it fails, so the sequencer runs every step through
//! the same executor.

use crate::commands::{
    self, AtCommand, ENTER_COMMAND_MODE, GET_ADDRESS, REBOOT, SET_BAUD_RATE, SET_CONFIG_TIMER,
    SET_INQUIRY_WINDOW, SET_PAGE_WINDOW, SET_SERIALIZED_NAME,
};
use crate::identity::ModuleIdentity;
use crate::response::StepError;

/// Number of steps run once the module is in command mode.
pub const STEP_COUNT: usize = 7;

/// What the sequence does when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OnFailure {
    /// Stop the bring-up; nothing after this step can work
    Abort,
    /// Log the failure and carry on with the next step
    Continue,
}

/// Work done after the module accepted a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// Nothing beyond the exchange
    None,
    /// Switch the local UART to this rate
    SwitchBaudRate(u32),
    /// Store the reply as the module identifier
    CaptureIdentity,
}

/// Whether the sequence proceeds after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Proceed,
    Abort,
}

/// One configuration action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step<'a> {
    /// What the step does, for diagnostics
    pub description: &'static str,
    /// Command to send
    pub command: AtCommand,
    /// Argument substituted into the command's request
    pub argument: &'a str,
    /// Failure policy
    pub on_failure: OnFailure,
    /// Follow-up on success
    pub effect: Effect,
}

impl Step<'_> {
    /// Logs the outcome of the step and decides whether to go on.
    ///
    /// A failed identity read leaves the sentinel in `identity`.
    pub(crate) fn conclude(
        &self,
        outcome: Result<(), StepError>,
        identity: &mut ModuleIdentity,
    ) -> Flow {
        match outcome {
            Ok(()) => {
                debug!("Successfully completed: {}", self.description);
                if self.effect == Effect::CaptureIdentity {
                    info!("Bluetooth MAC is {}", identity.device_id());
                }
                Flow::Proceed
            }
            Err(error) => {
                if self.effect == Effect::CaptureIdentity {
                    identity.reset();
                }
                match self.on_failure {
                    OnFailure::Abort => {
                        error!("Unable to {}: {:?}", self.description, error);
                        Flow::Abort
                    }
                    OnFailure::Continue => {
                        warn!("Unable to {}: {:?}", self.description, error);
                        Flow::Proceed
                    }
                }
            }
        }
    }
}

/// Static description of the attached module.
#[derive(Debug, Clone, Copy)]
pub struct ModuleProfile {
    /// Command that puts the module into command mode
    pub command_mode: AtCommand,
    /// Command that changes the module's baud rate
    pub set_baud_rate: AtCommand,
    /// Command that assigns the device name
    pub set_name: AtCommand,
    /// Command that reads the module identifier
    pub get_device_id: AtCommand,
    /// Command that sets the remote configuration timer
    pub set_config_timer: AtCommand,
    /// Command that sets the inquiry scan window
    pub set_inquiry_window: AtCommand,
    /// Command that sets the page scan window
    pub set_page_window: AtCommand,
    /// Command that reboots the module
    pub reboot: AtCommand,
    /// Maps a baud rate to the argument of `set_baud_rate`
    pub baud_code: fn(u32) -> Option<&'static str>,
    /// Rate the module ships with
    pub default_baud: u32,
    /// Other rates the module may have been left at, probed in order
    pub probe_rates: &'static [u32],
    /// Rate to run the module at after bring-up
    pub target_baud: u32,
    /// Name to assign
    pub device_name: &'static str,
    /// Remote configuration timer argument
    pub config_timer: &'static str,
    /// Inquiry scan window argument
    pub inquiry_window: &'static str,
    /// Page scan window argument
    pub page_window: &'static str,
    /// Time the module needs after power-on before it accepts commands
    pub boot_delay_ms: u32,
}

impl ModuleProfile {
    /// Factory-fresh RN-42, configured for 115200 baud.
    ///
    /// - Remote configuration disabled (timer 0)
    /// - Inquiry and page scan windows at 0x0200
    pub const RN42: Self = Self {
        command_mode: ENTER_COMMAND_MODE,
        set_baud_rate: SET_BAUD_RATE,
        set_name: SET_SERIALIZED_NAME,
        get_device_id: GET_ADDRESS,
        set_config_timer: SET_CONFIG_TIMER,
        set_inquiry_window: SET_INQUIRY_WINDOW,
        set_page_window: SET_PAGE_WINDOW,
        reboot: REBOOT,
        baud_code: commands::baud_code,
        default_baud: 115200,
        probe_rates: &[9600, 57600, 38400, 19200],
        target_baud: 115200,
        device_name: "OpenXC-VI",
        config_timer: "0",
        inquiry_window: "0200",
        page_window: "0200",
        boot_delay_ms: 1000,
    };

    /// Returns the profile with a different device name.
    pub const fn with_device_name(mut self, name: &'static str) -> Self {
        self.device_name = name;
        self
    }

    /// Returns the profile with a different post bring-up baud rate.
    pub const fn with_target_baud(mut self, baud: u32) -> Self {
        self.target_baud = baud;
        self
    }

    /// The module's code for [`ModuleProfile::target_baud`].
    ///
    /// # Errors
    /// * `StepError::UnsupportedBaudRate` - The module cannot run at the
    ///   target rate
    pub fn target_baud_code(&self) -> Result<&'static str, StepError> {
        (self.baud_code)(self.target_baud).ok_or(StepError::UnsupportedBaudRate)
    }

    /// Rates to try when looking for the module, after `current`.
    ///
    /// The factory default comes first, `current` is never repeated.
    pub fn fallback_rates(&self, current: u32) -> impl Iterator<Item = u32> + '_ {
        core::iter::once(self.default_baud)
            .chain(self.probe_rates.iter().copied())
            .filter(move |&baud| baud != current)
    }

    /// The ordered bring-up steps, once in command mode.
    ///
    /// `baud_code` is the module's code for [`ModuleProfile::target_baud`].
    pub fn steps<'a>(&'a self, baud_code: &'a str) -> [Step<'a>; STEP_COUNT] {
        [
            Step {
                description: "set baud rate",
                command: self.set_baud_rate,
                argument: baud_code,
                on_failure: OnFailure::Abort,
                effect: Effect::SwitchBaudRate(self.target_baud),
            },
            Step {
                description: "set Bluetooth device name",
                command: self.set_name,
                argument: self.device_name,
                on_failure: OnFailure::Continue,
                effect: Effect::None,
            },
            Step {
                description: "get Bluetooth MAC",
                command: self.get_device_id,
                argument: "",
                on_failure: OnFailure::Continue,
                effect: Effect::CaptureIdentity,
            },
            Step {
                description: "disable remote Bluetooth configuration",
                command: self.set_config_timer,
                argument: self.config_timer,
                on_failure: OnFailure::Continue,
                effect: Effect::None,
            },
            Step {
                description: "change Bluetooth inquiry window",
                command: self.set_inquiry_window,
                argument: self.inquiry_window,
                on_failure: OnFailure::Continue,
                effect: Effect::None,
            },
            Step {
                description: "change Bluetooth page scan window",
                command: self.set_page_window,
                argument: self.page_window,
                on_failure: OnFailure::Continue,
                effect: Effect::None,
            },
            Step {
                description: "reboot Bluetooth module",
                command: self.reboot,
                argument: "",
                on_failure: OnFailure::Continue,
                effect: Effect::None,
            },
        ]
    }
}

impl Default for ModuleProfile {
    fn default() -> Self {
        Self::RN42
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_baud_step_is_fatal() {
        let profile = ModuleProfile::RN42;
        let steps = profile.steps("115K");

        assert_eq!(steps[0].on_failure, OnFailure::Abort);
        assert_eq!(steps[0].effect, Effect::SwitchBaudRate(115200));
        assert!(steps[1..].iter().all(|step| step.on_failure == OnFailure::Continue));
    }

    #[test]
    fn test_step_order() {
        let profile = ModuleProfile::RN42;
        let requests: Vec<&str> = profile
            .steps("115K")
            .iter()
            .map(|step| step.command.request)
            .collect();

        assert_eq!(
            requests,
            ["SU,%s\r", "S-,%s\r", "GB\r", "ST,%s\r", "SI,%s\r", "SJ,%s\r", "R,1\r"]
        );
    }

    #[test]
    fn test_reboot_is_last() {
        let profile = ModuleProfile::RN42;
        let steps = profile.steps("115K");
        assert_eq!(steps[STEP_COUNT - 1].command, REBOOT);
    }

    #[test]
    fn test_builders() {
        let profile = ModuleProfile::RN42
            .with_device_name("Tester")
            .with_target_baud(57600);
        let steps = profile.steps("57.6");

        assert_eq!(steps[0].effect, Effect::SwitchBaudRate(57600));
        assert_eq!(steps[1].argument, "Tester");
    }

    #[test]
    fn test_target_baud_code() {
        assert_eq!(ModuleProfile::RN42.target_baud_code(), Ok("115K"));
        assert_eq!(
            ModuleProfile::RN42.with_target_baud(14400).target_baud_code(),
            Err(StepError::UnsupportedBaudRate)
        );
    }

    #[test]
    fn test_fallback_rates_skip_current() {
        let profile = ModuleProfile::RN42;
        let rates: Vec<u32> = profile.fallback_rates(9600).collect();
        assert_eq!(rates, [115200, 57600, 38400, 19200]);

        let rates: Vec<u32> = profile.fallback_rates(115200).collect();
        assert_eq!(rates, [9600, 57600, 38400, 19200]);
    }

    #[test]
    fn test_failed_identity_read_resets_identity() {
        let profile = ModuleProfile::RN42;
        let steps = profile.steps("115K");
        let mut identity = ModuleIdentity::unknown();
        identity.record(b"001122334455").unwrap();

        let flow = steps[2].conclude(Err(StepError::Timeout), &mut identity);

        assert_eq!(flow, Flow::Proceed);
        assert!(!identity.is_known());
    }

    #[test]
    fn test_failed_baud_step_aborts() {
        let profile = ModuleProfile::RN42;
        let steps = profile.steps("115K");
        let mut identity = ModuleIdentity::unknown();

        assert_eq!(
            steps[0].conclude(Err(StepError::Rejected), &mut identity),
            Flow::Abort
        );
        assert_eq!(steps[0].conclude(Ok(()), &mut identity), Flow::Proceed);
    }
}
