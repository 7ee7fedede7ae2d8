//! Cellular modem driver — a polled AT command/response protocol engine.
//!
//! Two cooperating, non-blocking state machines share one context:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ ModemDriver                                                   │
//! │                                                               │
//! │   Sequencer ──── send ────────────▶ ModemTransport (TX ring)  │
//! │      │  ▲                                                     │
//! │ verify  │ resolve                                             │
//! │      ▼  │                                                     │
//! │   ModemContext: Transaction · DeviceStatus · LineBuffer       │
//! │         ▲                                                     │
//! │         │ classify                                            │
//! │   Classifier ◀── completed line ── Framer ◀── RX ring         │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write side walks the bring-up graph (SIM → signal → operator →
//! packet data → MQTT open → connect → publish loop); the read side frames
//! the byte stream into lines and resolves the one outstanding command.
//! Everything runs in a single execution context: [`ModemDriver::poll`] is
//! called once per scheduler iteration and returns promptly, so no
//! synchronisation is needed anywhere in here.
//!
//! Protocol failures never escape as errors — the embedding firmware reads
//! [`DeviceStatus`](context::DeviceStatus), the current
//! [`Stage`](sequencer::Stage), and the
//! [`LinkDiagnostics`](context::LinkDiagnostics) counters instead.

pub mod catalog;
pub mod classifier;
pub mod context;
pub mod framer;
pub mod sequencer;

use log::info;

use crate::config::SystemConfig;
use crate::error::Error;
use crate::modem::catalog::{CommandCatalog, PRELUDE_COMMANDS};
use crate::modem::context::{DeviceStatus, LinkDiagnostics, ModemContext, elapsed_ms};
use crate::modem::sequencer::{Sequencer, Stage};
use crate::ports::{ModemTransport, MonotonicClock};
use crate::telemetry::Readings;

/// The modem driver: command catalog, shared context, and both state
/// machines, owned as one value so several independent instances can coexist
/// (which is exactly what the integration tests do).
pub struct ModemDriver {
    catalog: CommandCatalog,
    sequencer: Sequencer,
    ctx: ModemContext,
}

impl ModemDriver {
    /// Build the driver, rendering the command catalog from `config`.
    pub fn new(config: SystemConfig) -> Result<Self, Error> {
        let catalog = CommandCatalog::new(&config)?;
        Ok(Self {
            catalog,
            sequencer: Sequencer::new(),
            ctx: ModemContext::new(config),
        })
    }

    /// One-time modem setup, run once before the polled engine starts.
    ///
    /// This is the only place in the driver allowed to block, and every wait
    /// is explicitly bounded: a deadline-checked spin for transmit space and
    /// a fixed settle delay after each line. Stale response bytes are drained
    /// afterwards so the framer starts clean.
    pub fn initialize<T: ModemTransport, C: MonotonicClock>(
        &mut self,
        transport: &mut T,
        clock: &C,
    ) -> Result<(), Error> {
        const SETTLE_MS: u32 = 50;
        const SPACE_DEADLINE_MS: u32 = 500;

        info!("modem prelude: {} setup commands", PRELUDE_COMMANDS.len());
        for line in PRELUDE_COMMANDS {
            let start = clock.now_ms();
            while transport.tx_free() < line.len() {
                if elapsed_ms(clock.now_ms(), start) > SPACE_DEADLINE_MS {
                    return Err(Error::Init("modem transport stalled during prelude"));
                }
            }
            transport.write(line.as_bytes());

            let sent = clock.now_ms();
            while elapsed_ms(clock.now_ms(), sent) < SETTLE_MS {}
        }

        while transport.read_byte().is_some() {}
        Ok(())
    }

    /// Advance both state machines by one step. Never blocks.
    pub fn poll<T: ModemTransport, C: MonotonicClock>(&mut self, transport: &mut T, clock: &C) {
        self.sequencer.poll(&mut self.ctx, &self.catalog, transport, clock);

        if framer::poll(&mut self.ctx, transport) {
            let ModemContext {
                line,
                transaction,
                status,
                diagnostics,
                ..
            } = &mut self.ctx;
            classifier::classify(line.as_str(), transaction, status, diagnostics);
            line.reset();
        }
    }

    /// Install the latest telemetry snapshot for the next publish cycle.
    pub fn set_readings(&mut self, readings: Readings) {
        self.ctx.readings = readings;
    }

    /// Link status snapshot (SIM, signal, operator, session flags).
    pub fn status(&self) -> &DeviceStatus {
        &self.ctx.status
    }

    /// Current position in the bring-up graph.
    pub fn stage(&self) -> Stage {
        self.sequencer.stage()
    }

    /// Tolerated-anomaly counters.
    pub fn diagnostics(&self) -> LinkDiagnostics {
        self.ctx.diagnostics
    }
}
