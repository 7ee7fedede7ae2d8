//! Shared mutable context threaded through every modem driver operation.
//!
//! `ModemContext` is the single struct the sequencer, framer, and classifier
//! read from and write to — the "blackboard" of the protocol engine. Owning
//! all link state in one value (instead of free-standing statics) keeps the
//! coupling visible and lets tests run several independent driver instances
//! side by side.

use heapless::{String, Vec};

use crate::config::SystemConfig;
use crate::modem::catalog::CommandId;
use crate::telemetry::Readings;

/// Capacity of the response line accumulation buffer.
pub const LINE_CAP: usize = 512;

/// Longest operator name retained from the network's service-provider record.
pub const OPERATOR_MAX: usize = 32;

/// Wraparound-tolerant interval since `since`, in milliseconds.
///
/// The tick counter is free-running and wraps at `u32::MAX`; plain
/// subtraction would panic in debug builds the first time it does.
pub(crate) fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

// ---------------------------------------------------------------------------
// Outstanding command transaction
// ---------------------------------------------------------------------------

/// Resolution state of the outstanding command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxStatus {
    #[default]
    Pending,
    Success,
    Failure,
}

/// The single in-flight command record.
///
/// At most one command is outstanding at any time: the sequencer arms the
/// transaction when it transmits and the classifier resolves it; the
/// sequencer clears it again after acting on the outcome.
#[derive(Debug, Default)]
pub struct Transaction {
    command: Option<CommandId>,
    status: TxStatus,
    suppress_ok: bool,
    sent_at_ms: u32,
}

impl Transaction {
    /// Record a freshly transmitted command as pending.
    pub fn arm(&mut self, command: CommandId, suppress_ok: bool, now_ms: u32) {
        self.command = Some(command);
        self.status = TxStatus::Pending;
        self.suppress_ok = suppress_ok;
        self.sent_at_ms = now_ms;
    }

    /// Forget the outstanding command.
    pub fn clear(&mut self) {
        self.command = None;
        self.status = TxStatus::Pending;
        self.suppress_ok = false;
    }

    /// Resolve the outstanding command. No-op when nothing is pending, so a
    /// stray status line between commands is harmless.
    pub fn resolve(&mut self, status: TxStatus) {
        if self.is_pending() {
            self.status = status;
        }
    }

    pub fn command(&self) -> Option<CommandId> {
        self.command
    }

    /// Resolution state, or `None` when no command is outstanding.
    pub fn status(&self) -> Option<TxStatus> {
        self.command.map(|_| self.status)
    }

    pub fn is_pending(&self) -> bool {
        self.command.is_some() && self.status == TxStatus::Pending
    }

    /// Whether the outstanding command's bare `OK` must be ignored because a
    /// distinguishing structured response completes it instead.
    pub fn suppress_ok(&self) -> bool {
        self.command.is_some() && self.suppress_ok
    }

    pub fn sent_at_ms(&self) -> u32 {
        self.sent_at_ms
    }
}

// ---------------------------------------------------------------------------
// Response line buffer
// ---------------------------------------------------------------------------

/// Fixed-capacity accumulation buffer for one response line.
///
/// Writes are bounds-checked: a byte that does not fit is dropped and the
/// line is flagged truncated. Overrunning into adjacent memory is not an
/// option here.
#[derive(Debug, Default)]
pub struct LineBuffer {
    bytes: Vec<u8, LINE_CAP>,
    ready: bool,
    truncated: bool,
}

impl LineBuffer {
    /// Append one byte. Returns `false` (and flags truncation) on overflow.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.bytes.push(byte).is_err() {
            self.truncated = true;
            return false;
        }
        true
    }

    /// Mark the accumulated bytes as one completed line.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn was_truncated(&self) -> bool {
        self.truncated
    }

    /// The line as text. Responses are ASCII; anything that is not valid
    /// UTF-8 is treated as line noise and classifies as nothing.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes).unwrap_or("")
    }

    /// Fully clear the buffer before the next line accumulates.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.ready = false;
        self.truncated = false;
    }
}

// ---------------------------------------------------------------------------
// Device status snapshot
// ---------------------------------------------------------------------------

/// SIM card state as last reported by the modem.
///
/// `NotInserted` doubles as the unknown sentinel: it is the initial value and
/// the value forced back on a SIM query error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimState {
    #[default]
    NotInserted,
    Locked,
    Ready,
}

/// Link status snapshot consumed by the rest of the firmware.
///
/// Mutated only by the response classifier; the sequencer decides its
/// transitions from transaction outcomes alone.
#[derive(Debug, Default)]
pub struct DeviceStatus {
    pub sim: SimState,
    /// Received signal strength, 1–31; 0 means unknown.
    pub signal_strength: u8,
    /// Operator (service provider) name, empty until reported.
    pub operator: String<OPERATOR_MAX>,
    /// Packet-data (GPRS) context is active.
    pub pdp_attached: bool,
    /// MQTT network session to the broker is open.
    pub mqtt_session_open: bool,
    /// MQTT CONNECT handshake completed.
    pub mqtt_connected: bool,
}

/// Counters for conditions the driver tolerates but should not hide.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkDiagnostics {
    /// Lines that exceeded [`LINE_CAP`] and were truncated.
    pub line_overflows: u32,
    /// Completed lines that matched no known response shape.
    pub dropped_lines: u32,
    /// Hard command timeouts that reset the bring-up sequence.
    pub timeout_aborts: u32,
}

// ---------------------------------------------------------------------------
// ModemContext
// ---------------------------------------------------------------------------

/// The shared context passed to every driver operation.
pub struct ModemContext {
    /// Link configuration (timeouts, broker parameters).
    pub config: SystemConfig,
    /// The single outstanding command record.
    pub transaction: Transaction,
    /// Response line under accumulation.
    pub line: LineBuffer,
    /// Status snapshot for the rest of the firmware.
    pub status: DeviceStatus,
    /// Tolerated-anomaly counters.
    pub diagnostics: LinkDiagnostics,
    /// Latest telemetry snapshot for the publish path.
    pub readings: Readings,
    /// Timestamp of the last transmission of any kind.
    pub last_tx_ms: u32,
}

impl ModemContext {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            transaction: Transaction::default(),
            line: LineBuffer::default(),
            status: DeviceStatus::default(),
            diagnostics: LinkDiagnostics::default(),
            readings: Readings::default(),
            last_tx_ms: 0,
        }
    }
}
