//! Test doubles for an RN-42 on a UART, its enable line and a clock.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin, PinState};
use rn42::commands::baud_code;
use rn42::{AsyncTransport, BaudControl, Transport};

const KNOWN_RATES: [u32; 12] = [
    1200, 2400, 4800, 9600, 19200, 28800, 38400, 57600, 115200, 230400, 460800, 921600,
];

struct State {
    local_baud: u32,
    module_baud: u32,
    pending: Vec<u8>,
    /// Reply bytes, tagged with the rate the module sent them at
    rx: VecDeque<(u8, u32)>,
    requests: Vec<String>,
    baud_changes: Vec<u32>,
    overrides: Vec<(String, Option<Vec<u8>>)>,
}

/// Scripted RN-42 behind a UART.
///
/// Answers like a healthy module unless told otherwise. It only hears
/// requests sent at its own rate, and its replies are only readable at the
/// rate they were sent at. Clones share state, so a test can keep one to
/// inspect what happened.
#[derive(Clone)]
pub struct FakeRn42 {
    state: Rc<RefCell<State>>,
}

impl FakeRn42 {
    /// Module and UART both at `baud`.
    pub fn new(baud: u32) -> Self {
        Self::with_rates(baud, baud)
    }

    /// UART at `local_baud`, module listening at `module_baud`.
    pub fn with_rates(local_baud: u32, module_baud: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                local_baud,
                module_baud,
                pending: Vec::new(),
                rx: VecDeque::new(),
                requests: Vec::new(),
                baud_changes: Vec::new(),
                overrides: Vec::new(),
            })),
        }
    }

    /// Replies with `reply` to requests starting with `prefix`.
    pub fn respond(self, prefix: &str, reply: impl AsRef<[u8]>) -> Self {
        self.state
            .borrow_mut()
            .overrides
            .push((prefix.to_string(), Some(reply.as_ref().to_vec())));
        self
    }

    /// Never replies to requests starting with `prefix`.
    pub fn ignore(self, prefix: &str) -> Self {
        self.state
            .borrow_mut()
            .overrides
            .push((prefix.to_string(), None));
        self
    }

    /// Requests seen on the wire, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state.borrow().requests.clone()
    }

    /// Rates the UART was switched to, in order.
    pub fn baud_changes(&self) -> Vec<u32> {
        self.state.borrow().baud_changes.clone()
    }

    pub fn local_baud(&self) -> u32 {
        self.state.borrow().local_baud
    }

    pub fn module_baud(&self) -> u32 {
        self.state.borrow().module_baud
    }

    /// Bytes waiting to be read.
    pub fn unread(&self) -> usize {
        self.state.borrow().rx.len()
    }

    fn write(&self, byte: u8) {
        let mut state = self.state.borrow_mut();
        state.pending.push(byte);
        if byte != b'\r' && state.pending != b"$$$" {
            return;
        }

        let request = String::from_utf8_lossy(&state.pending).into_owned();
        state.pending.clear();
        state.requests.push(request.clone());

        if state.local_baud != state.module_baud {
            return;
        }

        let reply = state
            .overrides
            .iter()
            .find(|(prefix, _)| request.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Some(default_reply(&request)));

        if let Some(reply) = reply {
            // the acknowledgement still goes out at the old rate
            let sent_at = state.module_baud;
            state.rx.extend(reply.iter().map(|&byte| (byte, sent_at)));

            if request.starts_with("SU,") && contains(&reply, b"AOK") {
                let code = &request[3..request.len() - 1];
                if let Some(baud) = KNOWN_RATES.iter().find(|&&b| baud_code(b) == Some(code)) {
                    state.module_baud = *baud;
                }
            }
        }
    }

    /// Bytes sent at another rate than the UART's arrive as garbage and
    /// are dropped.
    fn read(&self) -> Option<u8> {
        let mut state = self.state.borrow_mut();
        while let Some((byte, sent_at)) = state.rx.pop_front() {
            if sent_at == state.local_baud {
                return Some(byte);
            }
        }
        None
    }

    fn switch(&self, baud: u32) {
        let mut state = self.state.borrow_mut();
        state.local_baud = baud;
        state.baud_changes.push(baud);
    }
}

fn default_reply(request: &str) -> Vec<u8> {
    match request {
        "$$$" => b"CMD\r\n".to_vec(),
        "GB\r" => b"001122334455\r\n".to_vec(),
        "R,1\r" => b"Reboot!\r\n".to_vec(),
        _ => b"AOK\r\n".to_vec(),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

impl BaudControl for FakeRn42 {
    type Error = Infallible;

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error> {
        self.switch(baud);
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.local_baud()
    }
}

impl Transport for FakeRn42 {
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.write(byte);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.read())
    }
}

impl AsyncTransport for FakeRn42 {
    async fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.write(byte);
        Ok(())
    }

    async fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.read())
    }
}

/// Delay provider that only adds up the time it was asked to wait.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub total_ns: u64,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl embedded_hal::delay::DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

/// Output pin recording every level it was driven to.
#[derive(Clone, Default)]
pub struct RecordingPin {
    levels: Rc<RefCell<Vec<PinState>>>,
}

impl RecordingPin {
    pub fn levels(&self) -> Vec<PinState> {
        self.levels.borrow().clone()
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(PinState::High);
        Ok(())
    }
}
