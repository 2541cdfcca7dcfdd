//! Bring-up sequencer
//!
//! Runs the profile's configuration steps against the module, one
//! exchange per step:
//!
//! 1. Wait for the module to boot
//! 2. Enter command mode, probing the profile's rates if the module does
//!    not answer at the current one
//! 3. Set the baud rate and follow with the local UART (fatal on failure)
//! 4. Set the name, read the identifier, disable remote configuration,
//!    set the inquiry and page scan windows (failures are logged only)
//! 5. Reboot the module to commit the settings
//!
//! The caller only learns whether the baud rate negotiation went through.
//! Everything finer grained goes to the log.

use crate::commands::AtCommand;
use crate::identity::ModuleIdentity;
use crate::profile::{Effect, Flow, ModuleProfile, Step};
use crate::response::{
    Progress, Response, StepError, MAX_DRAIN_BYTES, MAX_IDLE_POLLS, READ_RETRY_DELAY_MS,
};
use crate::transport::{AsyncTransport, BaudControl, Transport};

/// Outcome of a bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringupResult {
    /// The module is running at the target rate and was rebooted
    Succeeded,
    /// The module could not be moved to the target rate; nothing else was
    /// attempted and the local UART is back at its original rate
    AbortedAtBaudNegotiation,
}

impl BringupResult {
    /// Returns true if the bring-up got past baud rate negotiation.
    pub fn is_success(self) -> bool {
        self == Self::Succeeded
    }
}

/// Drives one bring-up over an exclusively owned transport.
pub struct Sequencer<'p, T, D> {
    transport: T,
    delay: D,
    profile: &'p ModuleProfile,
}

impl<'p, T, D> Sequencer<'p, T, D> {
    /// Creates a sequencer for the module described by `profile`.
    ///
    /// # Arguments
    /// * `transport` - UART to the module, at its current rate
    /// * `delay` - Delay provider for boot and read pacing
    /// * `profile` - Module description
    pub fn new(transport: T, delay: D, profile: &'p ModuleProfile) -> Self {
        Self {
            transport,
            delay,
            profile,
        }
    }

    /// Releases the transport and delay provider.
    pub fn release(self) -> (T, D) {
        (self.transport, self.delay)
    }
}

impl<T: BaudControl, D> Sequencer<'_, T, D> {
    fn apply(
        &mut self,
        step: &Step<'_>,
        response: &Response,
        identity: &mut ModuleIdentity,
    ) -> Result<(), StepError> {
        match step.effect {
            Effect::None => Ok(()),
            Effect::SwitchBaudRate(baud) => self.switch_baud(baud),
            Effect::CaptureIdentity => identity.record(response.value()),
        }
    }

    fn switch_baud(&mut self, baud: u32) -> Result<(), StepError> {
        self.transport
            .set_baud_rate(baud)
            .map_err(|_| StepError::Transport)
    }

    fn restore_baud(&mut self, baud: u32) {
        if self.transport.baud_rate() != baud && self.transport.set_baud_rate(baud).is_err() {
            warn!("Unable to restore UART to {} baud", baud);
        }
    }
}

impl<T, D> Sequencer<'_, T, D>
where
    T: Transport,
    D: embedded_hal::delay::DelayNs,
{
    /// Runs the bring-up sequence.
    ///
    /// `identity` is reset to the sentinel first and only receives an
    /// identifier if the module reports one.
    pub fn run(&mut self, identity: &mut ModuleIdentity) -> BringupResult {
        let profile = self.profile;
        let original_baud = self.transport.baud_rate();
        identity.reset();

        // we most likely just power cycled the module, give it time to boot
        self.delay.delay_ms(profile.boot_delay_ms);

        let baud_code = match profile.target_baud_code() {
            Ok(code) => code,
            Err(e) => {
                error!("Unable to set baud rate {}: {:?}", profile.target_baud, e);
                return BringupResult::AbortedAtBaudNegotiation;
            }
        };

        if let Err(e) = self.enter_command_mode(original_baud) {
            error!("Unable to enter command mode: {:?}", e);
            self.restore_baud(original_baud);
            return BringupResult::AbortedAtBaudNegotiation;
        }

        for step in profile.steps(baud_code) {
            let outcome = self
                .exchange(&step.command, step.argument)
                .and_then(|response| self.apply(&step, &response, identity));

            if step.conclude(outcome, identity) == Flow::Abort {
                self.restore_baud(original_baud);
                return BringupResult::AbortedAtBaudNegotiation;
            }
        }

        BringupResult::Succeeded
    }

    fn enter_command_mode(&mut self, current: u32) -> Result<(), StepError> {
        let profile = self.profile;
        let command = profile.command_mode;
        let mut last = self.exchange(&command, "").map(|_| ());

        for baud in profile.fallback_rates(current) {
            if last.is_ok() {
                break;
            }
            trace!("No answer, probing at {} baud", baud);
            self.switch_baud(baud)?;
            last = self.exchange(&command, "").map(|_| ());
        }

        if last.is_ok() {
            debug!("In command mode at {} baud", self.transport.baud_rate());
        }
        last
    }

    fn exchange(&mut self, command: &AtCommand, argument: &str) -> Result<Response, StepError> {
        self.discard_stale();

        for byte in command.with(argument).bytes() {
            self.transport
                .write_byte(byte)
                .map_err(|_| StepError::Transport)?;
        }

        let mut response = Response::new();
        let mut idle_polls = 0;
        loop {
            match self.transport.read_byte() {
                Ok(Some(byte)) => match response.feed(byte, command) {
                    Progress::Pending => {}
                    Progress::Done(result) => return result.map(|()| response),
                },
                Ok(None) => {
                    idle_polls += 1;
                    if idle_polls >= MAX_IDLE_POLLS {
                        return response.finish(command).map(|()| response);
                    }
                    self.delay.delay_ms(READ_RETRY_DELAY_MS);
                }
                Err(_) => return Err(StepError::Transport),
            }
        }
    }

    /// Reads and drops whatever is already waiting on the line.
    pub(crate) fn discard_stale(&mut self) {
        let mut discarded = 0;
        while discarded < MAX_DRAIN_BYTES {
            match self.transport.read_byte() {
                Ok(Some(_)) => discarded += 1,
                Ok(None) | Err(_) => break,
            }
        }
        if discarded > 0 {
            trace!("Discarded {} stale bytes", discarded);
        }
    }
}

impl<T, D> Sequencer<'_, T, D>
where
    T: AsyncTransport,
    D: embedded_hal_async::delay::DelayNs,
{
    /// Asynchronously runs the bring-up sequence.
    ///
    /// This is the async version of [`run`](Sequencer::run).
    pub async fn run_async(&mut self, identity: &mut ModuleIdentity) -> BringupResult {
        let profile = self.profile;
        let original_baud = self.transport.baud_rate();
        identity.reset();

        self.delay.delay_ms(profile.boot_delay_ms).await;

        let baud_code = match profile.target_baud_code() {
            Ok(code) => code,
            Err(e) => {
                error!("Unable to set baud rate {}: {:?}", profile.target_baud, e);
                return BringupResult::AbortedAtBaudNegotiation;
            }
        };

        if let Err(e) = self.enter_command_mode_async(original_baud).await {
            error!("Unable to enter command mode: {:?}", e);
            self.restore_baud(original_baud);
            return BringupResult::AbortedAtBaudNegotiation;
        }

        for step in profile.steps(baud_code) {
            let outcome = match self.exchange_async(&step.command, step.argument).await {
                Ok(response) => self.apply(&step, &response, identity),
                Err(e) => Err(e),
            };

            if step.conclude(outcome, identity) == Flow::Abort {
                self.restore_baud(original_baud);
                return BringupResult::AbortedAtBaudNegotiation;
            }
        }

        BringupResult::Succeeded
    }

    async fn enter_command_mode_async(&mut self, current: u32) -> Result<(), StepError> {
        let profile = self.profile;
        let command = profile.command_mode;
        let mut last = self.exchange_async(&command, "").await.map(|_| ());

        for baud in profile.fallback_rates(current) {
            if last.is_ok() {
                break;
            }
            trace!("No answer, probing at {} baud", baud);
            self.switch_baud(baud)?;
            last = self.exchange_async(&command, "").await.map(|_| ());
        }

        if last.is_ok() {
            debug!("In command mode at {} baud", self.transport.baud_rate());
        }
        last
    }

    async fn exchange_async(
        &mut self,
        command: &AtCommand,
        argument: &str,
    ) -> Result<Response, StepError> {
        self.discard_stale_async().await;

        for byte in command.with(argument).bytes() {
            self.transport
                .write_byte(byte)
                .await
                .map_err(|_| StepError::Transport)?;
        }

        let mut response = Response::new();
        let mut idle_polls = 0;
        loop {
            match self.transport.read_byte().await {
                Ok(Some(byte)) => match response.feed(byte, command) {
                    Progress::Pending => {}
                    Progress::Done(result) => return result.map(|()| response),
                },
                Ok(None) => {
                    idle_polls += 1;
                    if idle_polls >= MAX_IDLE_POLLS {
                        return response.finish(command).map(|()| response);
                    }
                    self.delay.delay_ms(READ_RETRY_DELAY_MS).await;
                }
                Err(_) => return Err(StepError::Transport),
            }
        }
    }

    /// Asynchronously reads and drops whatever is already waiting on the line.
    ///
    /// This is the async version of [`discard_stale`](Sequencer::discard_stale).
    pub(crate) async fn discard_stale_async(&mut self) {
        let mut discarded = 0;
        while discarded < MAX_DRAIN_BYTES {
            match self.transport.read_byte().await {
                Ok(Some(_)) => discarded += 1,
                Ok(None) | Err(_) => break,
            }
        }
        if discarded > 0 {
            trace!("Discarded {} stale bytes", discarded);
        }
    }
}
