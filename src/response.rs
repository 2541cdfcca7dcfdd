//! Reply accumulation and matching
//!
//! Every exchange with the module follows the same pattern: write the
//! request, then collect bytes until the reply can be judged. Matching is
//! a substring search over everything received so far, so echoes, prompts
//! and line noise around a token do not prevent a match.
//!
//! An exchange gives up when the accumulator fills, or after
//! [`MAX_IDLE_POLLS`] empty reads spaced [`READ_RETRY_DELAY_MS`] apart.
//! Giving up is a failure of the step, never a retry.

use heapless::Vec;

use crate::commands::{AtCommand, Reply, STATUS_REPLIES};

/// Maximum number of reply bytes kept for one exchange.
pub const MAX_RESPONSE_LEN: usize = 64;

/// Empty reads tolerated before an exchange times out.
pub const MAX_IDLE_POLLS: u8 = 20;

/// Pause after each empty read.
pub const READ_RETRY_DELAY_MS: u32 = 50;

/// Upper bound on stale bytes discarded in one go.
pub(crate) const MAX_DRAIN_BYTES: usize = 4 * MAX_RESPONSE_LEN;

/// Why a bring-up step did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepError {
    /// The module answered with its error token
    Rejected,
    /// Neither token arrived before the line went quiet
    Timeout,
    /// The reply filled the accumulator without a match
    Overflow,
    /// The transport failed to read, write or change rate
    Transport,
    /// The reply could not be interpreted
    Malformed,
    /// The requested baud rate has no module equivalent
    UnsupportedBaudRate,
}

/// State of an exchange after a byte was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    Pending,
    Done(Result<(), StepError>),
}

/// Bytes received in reply to one request.
#[derive(Debug, Default)]
pub(crate) struct Response {
    bytes: Vec<u8, MAX_RESPONSE_LEN>,
}

impl Response {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a received byte and judges the reply so far.
    pub(crate) fn feed(&mut self, byte: u8, command: &AtCommand) -> Progress {
        if self.bytes.push(byte).is_err() {
            return Progress::Done(Err(StepError::Overflow));
        }

        match command.reply {
            Reply::Token(token) if self.contains(token) => return Progress::Done(Ok(())),
            _ => {}
        }

        if let Some(error) = command.error {
            if self.contains(error) {
                return Progress::Done(Err(StepError::Rejected));
            }
        }

        if command.reply == Reply::Value && byte == b'\n' {
            if self.value().is_empty() || self.is_status_reply() {
                // blank line or late reply to an earlier command
                self.bytes.clear();
            } else {
                return Progress::Done(Ok(()));
            }
        }

        Progress::Pending
    }

    /// Judges the reply once the line has gone quiet.
    pub(crate) fn finish(&self, command: &AtCommand) -> Result<(), StepError> {
        match command.reply {
            Reply::Value if !self.value().is_empty() && !self.is_status_reply() => Ok(()),
            _ => Err(StepError::Timeout),
        }
    }

    /// Received bytes without surrounding whitespace and line breaks.
    pub(crate) fn value(&self) -> &[u8] {
        self.bytes.trim_ascii()
    }

    fn is_status_reply(&self) -> bool {
        STATUS_REPLIES.iter().any(|status| self.contains(status))
    }

    fn contains(&self, token: &str) -> bool {
        let token = token.as_bytes();
        token.is_empty() || self.bytes.windows(token.len()).any(|window| window == token)
    }
}
