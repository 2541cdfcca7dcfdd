//! RN-42 command set
//!
//! The RN-42 is configured over its UART with short ASCII commands. Each
//! command is a request template with at most one `%s` placeholder,
//! terminated by a carriage return, and the module answers with a short
//! textual reply:
//!
//! | Command      | Request      | Reply            |
//! |--------------|--------------|------------------|
//! | Command mode | `$$$`        | `CMD`            |
//! | Baud rate    | `SU,<code>`  | `AOK` / `ERR`    |
//! | Name         | `S-,<name>`  | `AOK` / `ERR`    |
//! | Address      | `GB`         | 12 hex digits    |
//! | Config timer | `ST,<secs>`  | `AOK` / `ERR`    |
//! | Inquiry      | `SI,<hex>`   | `AOK` / `ERR`    |
//! | Page scan    | `SJ,<hex>`   | `AOK` / `ERR`    |
//! | Reboot       | `R,1`        | `Reboot`         |
//!
//! # Important Notes
//! - `$$$` must not be followed by a carriage return
//! - Command mode is only reachable shortly after boot while the
//!   remote configuration timer is running
//! - `S-` sets a serialized name: the module appends the last four
//!   digits of its address
//! - Settings are written to flash but most take effect after reboot

/// Placeholder substituted by a command's argument.
pub const PLACEHOLDER: &str = "%s";

/// How the module's reply to a command is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// The reply is accepted once this token appears anywhere in the
    /// received bytes
    Token(&'static str),
    /// The reply is a value terminated by a line break (or by the line
    /// going quiet) and is accepted unless it carries the error token.
    /// Lines holding one of the [`STATUS_REPLIES`] are skipped
    Value,
}

/// A single command understood by the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AtCommand {
    /// Request template, with an optional `%s` placeholder
    pub request: &'static str,
    /// Expected reply on success
    pub reply: Reply,
    /// Token the module sends when it rejects the command
    pub error: Option<&'static str>,
}

impl AtCommand {
    /// Builds the request for this command with `argument` substituted.
    pub fn with<'a>(&self, argument: &'a str) -> Request<'a> {
        Request {
            template: self.request,
            argument,
        }
    }
}

/// A request template paired with its argument.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    template: &'static str,
    argument: &'a str,
}

impl<'a> Request<'a> {
    /// Bytes to put on the wire.
    ///
    /// Only the first placeholder is substituted. A template without a
    /// placeholder is sent as-is and the argument is ignored.
    pub fn bytes(&self) -> impl Iterator<Item = u8> + 'a {
        let (head, argument, tail) = match self.template.split_once(PLACEHOLDER) {
            Some((head, tail)) => (head, self.argument, tail),
            None => (self.template, "", ""),
        };

        head.bytes().chain(argument.bytes()).chain(tail.bytes())
    }
}

/// Status replies the module sends to commands other than value reads.
///
/// A line carrying one of these while a value is expected is a late reply
/// to an earlier command, never the value itself.
pub const STATUS_REPLIES: [&str; 2] = ["AOK", "CMD"];

/// Enter command mode (`$$$`)
pub const ENTER_COMMAND_MODE: AtCommand = AtCommand {
    request: "$$$",
    reply: Reply::Token("CMD"),
    error: None,
};

/// Set the UART baud rate (`SU`)
///
/// The argument is a baud code from [`baud_code`], not the numeric rate.
pub const SET_BAUD_RATE: AtCommand = AtCommand {
    request: "SU,%s\r",
    reply: Reply::Token("AOK"),
    error: Some("ERR"),
};

/// Set the serialized device name (`S-`)
pub const SET_SERIALIZED_NAME: AtCommand = AtCommand {
    request: "S-,%s\r",
    reply: Reply::Token("AOK"),
    error: Some("ERR"),
};

/// Read the Bluetooth address (`GB`)
pub const GET_ADDRESS: AtCommand = AtCommand {
    request: "GB\r",
    reply: Reply::Value,
    error: Some("ERR"),
};

/// Set the remote configuration timer in seconds (`ST`)
///
/// - 0 = no remote configuration
/// - 255 = continuous configuration, local and remote
pub const SET_CONFIG_TIMER: AtCommand = AtCommand {
    request: "ST,%s\r",
    reply: Reply::Token("AOK"),
    error: Some("ERR"),
};

/// Set the inquiry scan window (`SI`), 4 hex digits
pub const SET_INQUIRY_WINDOW: AtCommand = AtCommand {
    request: "SI,%s\r",
    reply: Reply::Token("AOK"),
    error: Some("ERR"),
};

/// Set the page scan window (`SJ`), 4 hex digits
pub const SET_PAGE_WINDOW: AtCommand = AtCommand {
    request: "SJ,%s\r",
    reply: Reply::Token("AOK"),
    error: Some("ERR"),
};

/// Reboot the module, committing the configuration (`R,1`)
pub const REBOOT: AtCommand = AtCommand {
    request: "R,1\r",
    reply: Reply::Token("Reboot"),
    error: None,
};

/// Maps a baud rate to the code the RN-42 expects in `SU`.
///
/// Returns `None` for rates the module cannot run at.
pub fn baud_code(baud: u32) -> Option<&'static str> {
    match baud {
        1200 => Some("1200"),
        2400 => Some("2400"),
        4800 => Some("4800"),
        9600 => Some("9600"),
        19200 => Some("19.2"),
        28800 => Some("28.8"),
        38400 => Some("38.4"),
        57600 => Some("57.6"),
        115200 => Some("115K"),
        230400 => Some("230K"),
        460800 => Some("460K"),
        921600 => Some("921K"),
        _ => None,
    }
}
