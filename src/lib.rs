//! AeroMon firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; the modem driver core
//! is hardware-free and runs against the port traits in [`ports`].

#![deny(unused_must_use)]

pub mod config;
pub mod modem;
pub mod ports;
pub mod telemetry;

mod error;
pub mod pins;

pub use error::{Error, Result};

// Hardware adapters — the concrete implementations are guarded by cfg
// attributes inside.
pub mod adapters;
