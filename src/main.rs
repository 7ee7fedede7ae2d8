//! AeroMon Firmware — Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                 │
//! │                                                          │
//! │   UartTransport            Esp32TimeAdapter              │
//! │   (ModemTransport)         (MonotonicClock)              │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ────────────────   │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │            ModemDriver (pure logic)                │  │
//! │  │  Sequencer · Framer · Classifier                   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The main loop is a plain cooperative scheduler: each subsystem's poll
//! function runs once per iteration and must not block.

#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use aeromon::adapters::time::Esp32TimeAdapter;
use aeromon::adapters::uart::UartTransport;
use aeromon::config::SystemConfig;
use aeromon::modem::ModemDriver;
use aeromon::pins;
use aeromon::ports::MonotonicClock;
use aeromon::telemetry::Readings;

use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;

/// Modem link baud rate.
const MODEM_BAUD: u32 = 115_200;

/// Pacing for the cooperative loop; poll rates well above the modem's
/// response cadence while leaving the CPU mostly idle.
const LOOP_PERIOD_MS: u64 = 2;

/// Status heartbeat interval in the log.
const STATUS_LOG_INTERVAL_MS: u32 = 10_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("AeroMon v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let uart_config = UartConfig::new().baudrate(Hertz(MODEM_BAUD));
    let uart = UartDriver::new(
        peripherals.uart1,
        unsafe { AnyIOPin::new(pins::MODEM_UART_TX_GPIO) },
        unsafe { AnyIOPin::new(pins::MODEM_UART_RX_GPIO) },
        None::<AnyIOPin>,
        None::<AnyIOPin>,
        &uart_config,
    )?;
    let mut transport = UartTransport::new(uart);
    let clock = Esp32TimeAdapter::new();

    // ── 3. Modem driver ───────────────────────────────────────
    let config = SystemConfig::default();
    let mut modem = ModemDriver::new(config)?;
    if let Err(e) = modem.initialize(&mut transport, &clock) {
        // A stalled prelude is not fatal: the polled engine re-establishes
        // the link from scratch and times out stage by stage.
        warn!("modem prelude failed: {e}");
    }

    info!("System ready. Entering poll loop.");

    // ── 4. Poll loop ──────────────────────────────────────────
    let mut last_status_log = clock.now_ms();

    loop {
        // Sensor hub integration lands with the particulate-sensor poller;
        // until then the publish path reports baseline readings.
        modem.set_readings(Readings::default());

        modem.poll(&mut transport, &clock);

        let now = clock.now_ms();
        if now.wrapping_sub(last_status_log) >= STATUS_LOG_INTERVAL_MS {
            last_status_log = now;
            let status = modem.status();
            info!(
                "link: stage={:?} sim={:?} rssi={} operator={:?} mqtt={}",
                modem.stage(),
                status.sim,
                status.signal_strength,
                status.operator.as_str(),
                status.mqtt_connected,
            );
        }

        std::thread::sleep(std::time::Duration::from_millis(LOOP_PERIOD_MS));
    }
}
