//! Command sequencer — the write-side state machine.
//!
//! Walks an explicit, branching graph of bring-up stages. Every transition is
//! named in the match below (no "next = current + 1" arithmetic), so each
//! edge can be read and tested on its own:
//!
//! ```text
//!  Idle ──(timeout window)──▶ Ping ▶ SimCheck ▶ SignalQuery ▶ OperatorQuery
//!                                                                  │
//!                      ┌────────── fail ──────────┐                ▼
//!                      ▼                          │           PdpActivate ◀─┐
//!                 PdpDeactivate ── ok/fail ───────┴──────────────▶ │        │
//!                                                                  ▼        │
//!                                                             PdpStatus ─fail
//!                                                                  │
//!                                                                  ▼
//!                 MqttOpen ▶ MqttConnect ▶ PublishRequest ▶ Payload ▶ Hold ─┐
//!                                                  ▲                        │
//!                                                  └──(publish interval)────┘
//!
//!  Any verify stage ──(no response within the command timeout)──▶ Idle
//! ```
//!
//! Each stage is polled once per scheduler iteration and returns on its first
//! unsatisfiable condition; waiting is always "try again next poll", never a
//! blocking call. A protocol failure moves to the stage that rebuilds the
//! failing precondition; a timeout abandons the whole cycle.

use log::{debug, warn};

use crate::modem::catalog::{CommandCatalog, CommandId};
use crate::modem::context::{ModemContext, TxStatus, elapsed_ms};
use crate::ports::{ModemTransport, MonotonicClock};
use crate::telemetry;

/// Position in the bring-up graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Waiting out one timeout window before (re)starting the sequence.
    Idle,
    SendPing,
    VerifyPing,
    SendSimCheck,
    VerifySimCheck,
    SendSignalQuery,
    VerifySignalQuery,
    SendOperatorQuery,
    VerifyOperatorQuery,
    SendPdpActivate,
    VerifyPdpActivate,
    SendPdpDeactivate,
    VerifyPdpDeactivate,
    SendPdpStatus,
    VerifyPdpStatus,
    SendMqttOpen,
    VerifyMqttOpen,
    SendMqttConnect,
    VerifyMqttConnect,
    SendPublishRequest,
    VerifyPublishRequest,
    SendPayload,
    VerifyPayload,
    /// Steady state: pacing between publish cycles.
    HoldPublishInterval,
}

/// The write-side state machine.
pub struct Sequencer {
    stage: Stage,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self { stage: Stage::Idle }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Advance the machine by at most one step.
    pub fn poll<T: ModemTransport, C: MonotonicClock>(
        &mut self,
        ctx: &mut ModemContext,
        catalog: &CommandCatalog,
        transport: &mut T,
        clock: &C,
    ) {
        match self.stage {
            Stage::Idle => {
                // Hold one full timeout window so an idle boot (or a fresh
                // abort) does not hammer the modem with back-to-back cycles.
                self.hold(ctx, clock, ctx.config.command_timeout_ms, Stage::SendPing);
            }

            Stage::SendPing => {
                self.send(CommandId::Ping, Stage::VerifyPing, ctx, catalog, transport, clock);
            }
            // The first command has no earlier stage to fall back to; a
            // failure here is absorbed into a retry of the ping itself.
            Stage::VerifyPing => self.verify(Stage::SendSimCheck, Stage::SendPing, ctx, clock),

            Stage::SendSimCheck => {
                self.send(CommandId::SimCheck, Stage::VerifySimCheck, ctx, catalog, transport, clock);
            }
            Stage::VerifySimCheck => {
                self.verify(Stage::SendSignalQuery, Stage::SendSimCheck, ctx, clock);
            }

            Stage::SendSignalQuery => {
                self.send(CommandId::SignalQuality, Stage::VerifySignalQuery, ctx, catalog, transport, clock);
            }
            Stage::VerifySignalQuery => {
                self.verify(Stage::SendOperatorQuery, Stage::SendSignalQuery, ctx, clock);
            }

            Stage::SendOperatorQuery => {
                self.send(CommandId::OperatorQuery, Stage::VerifyOperatorQuery, ctx, catalog, transport, clock);
            }
            Stage::VerifyOperatorQuery => {
                self.verify(Stage::SendPdpActivate, Stage::SendOperatorQuery, ctx, clock);
            }

            // Packet-data attach; a refused activation is cleaned up with a
            // deactivate before trying again.
            Stage::SendPdpActivate => {
                self.send(CommandId::PdpActivate, Stage::VerifyPdpActivate, ctx, catalog, transport, clock);
            }
            Stage::VerifyPdpActivate => {
                self.verify(Stage::SendPdpStatus, Stage::SendPdpDeactivate, ctx, clock);
            }
            Stage::SendPdpDeactivate => {
                self.send(CommandId::PdpDeactivate, Stage::VerifyPdpDeactivate, ctx, catalog, transport, clock);
            }
            // Either way the context is as torn down as it will get —
            // activation is the only move left.
            Stage::VerifyPdpDeactivate => {
                self.verify(Stage::SendPdpActivate, Stage::SendPdpActivate, ctx, clock);
            }
            Stage::SendPdpStatus => {
                self.send(CommandId::PdpStatus, Stage::VerifyPdpStatus, ctx, catalog, transport, clock);
            }
            Stage::VerifyPdpStatus => {
                self.verify(Stage::SendMqttOpen, Stage::SendPdpActivate, ctx, clock);
            }

            Stage::SendMqttOpen => {
                self.send(CommandId::MqttOpen, Stage::VerifyMqttOpen, ctx, catalog, transport, clock);
            }
            // An open refusal usually means the data session is stale:
            // rebuild it from the deactivate step.
            Stage::VerifyMqttOpen => {
                self.verify(Stage::SendMqttConnect, Stage::SendPdpDeactivate, ctx, clock);
            }

            Stage::SendMqttConnect => {
                self.send(CommandId::MqttConnect, Stage::VerifyMqttConnect, ctx, catalog, transport, clock);
            }
            Stage::VerifyMqttConnect => {
                self.verify(Stage::SendPublishRequest, Stage::SendMqttOpen, ctx, clock);
            }

            Stage::SendPublishRequest => {
                self.send(CommandId::MqttPublish, Stage::VerifyPublishRequest, ctx, catalog, transport, clock);
            }
            Stage::VerifyPublishRequest => {
                self.verify(Stage::SendPayload, Stage::SendMqttConnect, ctx, clock);
            }

            Stage::SendPayload => self.send_payload(ctx, transport, clock),
            Stage::VerifyPayload => {
                self.verify(Stage::HoldPublishInterval, Stage::SendPublishRequest, ctx, clock);
            }

            Stage::HoldPublishInterval => {
                self.hold(ctx, clock, ctx.config.publish_interval_ms, Stage::SendPublishRequest);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stage kinds
    // -----------------------------------------------------------------------

    /// Stay put until `interval` has elapsed since the last transmission.
    fn hold<C: MonotonicClock>(&mut self, ctx: &ModemContext, clock: &C, interval: u32, next: Stage) {
        if elapsed_ms(clock.now_ms(), ctx.last_tx_ms) >= interval {
            self.transition(next);
        }
    }

    /// Transmit a catalog command whole, or not at all.
    fn send<T: ModemTransport, C: MonotonicClock>(
        &mut self,
        id: CommandId,
        verify: Stage,
        ctx: &mut ModemContext,
        catalog: &CommandCatalog,
        transport: &mut T,
        clock: &C,
    ) {
        let Some(command) = catalog.get(id) else {
            debug_assert!(false, "{id:?} has no catalog entry");
            return;
        };

        // Transport saturated — leave everything untouched and retry on the
        // next poll rather than splitting the command across writes.
        if transport.tx_free() < command.len() {
            return;
        }

        let written = transport.write(command.bytes());
        if written < command.len() {
            // The free-space check should have prevented this; the pending
            // timeout will recover the sequence.
            warn!("short write for {id:?}: {written}/{} bytes", command.len());
        }

        let now = clock.now_ms();
        ctx.transaction.arm(id, command.suppress_ok, now);
        ctx.last_tx_ms = now;
        debug!("sent {id:?}");
        self.transition(verify);
    }

    /// Act on the outstanding transaction's outcome.
    fn verify<C: MonotonicClock>(
        &mut self,
        on_success: Stage,
        on_failure: Stage,
        ctx: &mut ModemContext,
        clock: &C,
    ) {
        match ctx.transaction.status() {
            Some(TxStatus::Pending) => {
                let waited = elapsed_ms(clock.now_ms(), ctx.transaction.sent_at_ms());
                if waited > ctx.config.command_timeout_ms {
                    // Hard abort: no partial credit for earlier stages.
                    warn!(
                        "{:?} unanswered for {waited} ms — restarting bring-up",
                        ctx.transaction.command()
                    );
                    ctx.diagnostics.timeout_aborts += 1;
                    ctx.transaction.clear();
                    self.transition(Stage::Idle);
                }
            }
            Some(TxStatus::Success) => {
                ctx.transaction.clear();
                self.transition(on_success);
            }
            Some(TxStatus::Failure) => {
                ctx.transaction.clear();
                self.transition(on_failure);
            }
            None => {
                // Verify without a transaction means the invariant broke
                // upstream; restart rather than wait on nothing.
                debug_assert!(false, "verify stage with no outstanding command");
                self.transition(Stage::Idle);
            }
        }
    }

    /// Render and transmit the telemetry record as a pseudo-command.
    fn send_payload<T: ModemTransport, C: MonotonicClock>(
        &mut self,
        ctx: &mut ModemContext,
        transport: &mut T,
        clock: &C,
    ) {
        let payload = match telemetry::render_payload(&ctx.readings) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("publish payload dropped: {err}");
                self.transition(Stage::HoldPublishInterval);
                return;
            }
        };

        if transport.tx_free() < payload.len() {
            return;
        }
        let written = transport.write(&payload);
        if written < payload.len() {
            warn!("short write for payload: {written}/{} bytes", payload.len());
        }

        let now = clock.now_ms();
        ctx.transaction.arm(CommandId::TelemetryPayload, true, now);
        ctx.last_tx_ms = now;
        debug!("sent telemetry payload ({} bytes)", payload.len());
        self.transition(Stage::VerifyPayload);
    }

    fn transition(&mut self, next: Stage) {
        if next != self.stage {
            debug!("sequencer: {:?} -> {next:?}", self.stage);
            self.stage = next;
        }
    }
}
