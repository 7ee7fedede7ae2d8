//! Telemetry snapshot and publish-payload rendering.
//!
//! The sensing subsystems deposit their latest readings here; the modem
//! driver renders them into the fixed-schema JSON record the broker expects
//! and terminates it with the modem's payload-end control character.

use heapless::Vec;
use serde::Serialize;

use crate::error::Error;

/// Control character that tells the modem the payload is complete (SUB, 0x1A).
pub const PAYLOAD_TERMINATOR: u8 = 0x1A;

/// Upper bound for one rendered publish payload, terminator included.
pub const PAYLOAD_MAX: usize = 64;

/// Latest point-in-time readings consumed by the publish path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readings {
    /// Ambient temperature, whole degrees Celsius.
    pub temperature_c: i16,
    /// Relative humidity, whole percent.
    pub humidity_pct: u8,
}

/// Wire schema of one published record: `{"temp":<int>,"rh":<int>}`.
#[derive(Serialize)]
struct PublishRecord {
    temp: i16,
    rh: u8,
}

/// Render `readings` into the JSON record plus terminator.
pub fn render_payload(readings: &Readings) -> Result<Vec<u8, PAYLOAD_MAX>, Error> {
    const OVERFLOW: Error = Error::Encode("telemetry payload exceeds buffer");

    let record = PublishRecord {
        temp: readings.temperature_c,
        rh: readings.humidity_pct,
    };

    let mut buf: Vec<u8, PAYLOAD_MAX> = Vec::new();
    buf.resize(PAYLOAD_MAX, 0).map_err(|()| OVERFLOW)?;
    let written = serde_json_core::to_slice(&record, &mut buf).map_err(|_| OVERFLOW)?;
    buf.truncate(written);
    buf.push(PAYLOAD_TERMINATOR).map_err(|_| OVERFLOW)?;
    Ok(buf)
}
