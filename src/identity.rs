//! Module identity
//!
//! The identifier the module reports during bring-up (its Bluetooth
//! address on the RN-42). Until bring-up has read it successfully the
//! identity holds the [`UNKNOWN_DEVICE_ID`] sentinel.

use heapless::String;

use crate::response::StepError;

/// Maximum stored identifier length in bytes. Longer replies are truncated.
pub const DEVICE_ID_CAPACITY: usize = 16;

/// Identifier reported while no valid one has been read.
pub const UNKNOWN_DEVICE_ID: &str = "Unknown";

/// Identifier of the attached module.
///
/// Holds either a complete identifier as reported by the module (truncated
/// to [`DEVICE_ID_CAPACITY`]) or the sentinel, never the remains of a
/// failed read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIdentity {
    device_id: String<DEVICE_ID_CAPACITY>,
}

impl Default for ModuleIdentity {
    fn default() -> Self {
        let mut device_id = String::new();
        // the sentinel always fits
        let _ = device_id.push_str(UNKNOWN_DEVICE_ID);
        Self { device_id }
    }
}

impl ModuleIdentity {
    /// Creates an identity holding the sentinel.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// The module identifier, or [`UNKNOWN_DEVICE_ID`].
    pub fn device_id(&self) -> &str {
        self.device_id.as_str()
    }

    /// Returns true once an identifier has been read from the module.
    pub fn is_known(&self) -> bool {
        self.device_id.as_str() != UNKNOWN_DEVICE_ID
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Stores an identifier reply.
    ///
    /// The reply must be non-empty UTF-8; on error the identity is left
    /// untouched.
    pub(crate) fn record(&mut self, reply: &[u8]) -> Result<(), StepError> {
        let reply = core::str::from_utf8(reply).map_err(|_| StepError::Malformed)?;
        if reply.is_empty() {
            return Err(StepError::Malformed);
        }

        let mut device_id = String::new();
        for c in reply.chars() {
            if device_id.push(c).is_err() {
                break;
            }
        }

        self.device_id = device_id;
        Ok(())
    }
}
