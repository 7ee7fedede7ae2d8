//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter | Implements       | Connects to                          |
//! |---------|------------------|--------------------------------------|
//! | `time`  | MonotonicClock   | ESP high-resolution timer / `Instant`|
//! | `uart`  | ModemTransport   | ESP-IDF UART driver (espidf only)    |

pub mod time;

#[cfg(target_os = "espidf")]
pub mod uart;
