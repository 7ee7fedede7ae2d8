//! Unified error types for the AeroMon firmware.
//!
//! A single `Error` enum that every fallible construction path converts
//! into, keeping the top-level error handling uniform. All variants are
//! `Copy` so they can be passed around without allocation.
//!
//! The modem protocol engine itself never surfaces errors through this type:
//! link failures are expressed through the device status snapshot, the
//! sequencer stage, and the diagnostic counters (all plain, inspectable
//! state). `Error` covers what can go wrong *before* the engine runs —
//! configuration rendering, peripheral bring-up, payload encoding.

use core::fmt;

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Peripheral or one-time modem initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or does not fit its wire rendering.
    Config(&'static str),
    /// A fixed-buffer serialisation overflowed.
    Encode(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Encode(msg) => write!(f, "encode: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
