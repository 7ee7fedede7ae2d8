//! Response classifier and field parsers.
//!
//! Given one completed response line, decide what it is by ordered substring
//! match — first matching rule wins, at most one classification per line —
//! and either resolve the outstanding transaction or extract a structured
//! field into the device status snapshot.
//!
//! Category detection stays substring-based (AT responses are free-form and
//! may carry echoes or leading noise); field *extraction* goes through the
//! small tokenizer at the bottom so each response shape parses the same way
//! and tests can pin them down individually.

use log::{debug, trace};

use crate::modem::catalog::CommandId;
use crate::modem::context::{DeviceStatus, LinkDiagnostics, SimState, Transaction, TxStatus};

/// Highest RSSI value the modem can report as a real measurement; anything
/// above (the 99 "unknown" sentinel included) is stored as 0.
const SIGNAL_MAX_VALID: u8 = 31;

/// Packet-data state string that counts as attached.
const PDP_ATTACHED_STATE: &str = "IP GPRSACT";

/// Classify one completed line.
///
/// Rules, in priority order:
/// 1. `OK` completes the outstanding command — unless that command is
///    completed by a structured response instead, in which case the bare `OK`
///    is ignored and the later rules get their chance (this is what lets
///    `DEACT OK` fall through to its own rule).
/// 2. `ERROR` fails the outstanding command; SIM and signal queries also
///    force their status field back to the unknown sentinel.
/// 3–5. `+CPIN:` / `+CSQ:` / `+QSPN:` update the status snapshot and leave
///    the transaction alone — their trailing `OK` completes it.
/// 6–9. `DEACT OK` / `STATE:` / `+QMTOPEN:` / `+QMTCONN:` / `+QMTPUB:`
///    resolve the transaction directly and maintain the session flags.
/// 10. A bare `>` prompt means the modem wants the payload bytes now.
///
/// Anything else is counted and dropped as line noise.
pub fn classify(
    line: &str,
    tx: &mut Transaction,
    status: &mut DeviceStatus,
    diagnostics: &mut LinkDiagnostics,
) {
    trace!("modem rx: {line:?}");

    if line.contains("OK") && !tx.suppress_ok() {
        tx.resolve(TxStatus::Success);
        return;
    }

    if line.contains("ERROR") {
        match tx.command() {
            Some(CommandId::SimCheck) => status.sim = SimState::NotInserted,
            Some(CommandId::SignalQuality) => status.signal_strength = 0,
            _ => {}
        }
        debug!("modem error response for {:?}", tx.command());
        tx.resolve(TxStatus::Failure);
        return;
    }

    if line.contains("+CPIN:") {
        status.sim = if line.contains("SIM PIN") {
            SimState::Locked
        } else {
            SimState::Ready
        };
        return;
    }

    if let Some(fields) = marker_fields(line, "+CSQ:") {
        status.signal_strength = match fields.int(0) {
            Some(rssi @ 1..=SIGNAL_MAX_VALID) => rssi,
            _ => 0,
        };
        return;
    }

    if let Some(fields) = marker_fields(line, "+QSPN:") {
        status.operator.clear();
        if let Some(name) = fields.quoted(2) {
            for ch in name.chars() {
                if status.operator.push(ch).is_err() {
                    break;
                }
            }
        }
        return;
    }

    if line.contains("DEACT OK") {
        status.pdp_attached = false;
        tx.resolve(TxStatus::Success);
        return;
    }

    if let Some(rest) = after_marker(line, "STATE:") {
        let attached = rest.trim() == PDP_ATTACHED_STATE;
        status.pdp_attached = attached;
        tx.resolve(if attached {
            TxStatus::Success
        } else {
            TxStatus::Failure
        });
        return;
    }

    if let Some(fields) = marker_fields(line, "+QMTOPEN:") {
        let opened = fields.int(1) == Some(0);
        status.mqtt_session_open = opened;
        tx.resolve(if opened {
            TxStatus::Success
        } else {
            TxStatus::Failure
        });
        return;
    }

    if let Some(fields) = marker_fields(line, "+QMTCONN:") {
        let connected = fields.result_pair_ok();
        status.mqtt_connected = connected;
        tx.resolve(if connected {
            TxStatus::Success
        } else {
            TxStatus::Failure
        });
        return;
    }

    if let Some(fields) = marker_fields(line, "+QMTPUB:") {
        tx.resolve(if fields.result_pair_ok() {
            TxStatus::Success
        } else {
            TxStatus::Failure
        });
        return;
    }

    if line == ">" {
        // Payload prompt: the modem is ready for the publish bytes.
        tx.resolve(TxStatus::Success);
        return;
    }

    if line.contains("OK") {
        // Implicit OK ahead of a structured response — ignored, not noise.
        return;
    }

    diagnostics.dropped_lines += 1;
    trace!("unclassified modem line dropped: {line:?}");
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// The comma-separated fields following a response marker.
struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    /// Field at `index`, trimmed of surrounding whitespace.
    fn get(&self, index: usize) -> Option<&'a str> {
        self.rest.split(',').nth(index).map(str::trim)
    }

    /// Field at `index` parsed as a small decimal integer.
    fn int(&self, index: usize) -> Option<u8> {
        self.get(index)?.parse().ok()
    }

    /// Field at `index` with leading quote/space characters stripped,
    /// truncated at the closing quote.
    fn quoted(&self, index: usize) -> Option<&'a str> {
        let field = self.get(index)?.trim_start_matches([' ', '"']);
        Some(field.split('"').next().unwrap_or(field))
    }

    /// Success shape of the three-field MQTT results (`<id>,<result>,<ret>`):
    /// both trailing integers must be zero.
    fn result_pair_ok(&self) -> bool {
        self.int(1) == Some(0) && self.int(2) == Some(0)
    }
}

/// Everything after the first occurrence of `marker`.
fn after_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker).map(|at| &line[at + marker.len()..])
}

/// The comma-separated fields after `marker`, if the marker is present.
fn marker_fields<'a>(line: &'a str, marker: &str) -> Option<Fields<'a>> {
    after_marker(line, marker).map(|rest| Fields { rest })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bench {
        tx: Transaction,
        status: DeviceStatus,
        diagnostics: LinkDiagnostics,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                tx: Transaction::default(),
                status: DeviceStatus::default(),
                diagnostics: LinkDiagnostics::default(),
            }
        }

        fn outstanding(command: CommandId, suppress_ok: bool) -> Self {
            let mut bench = Self::new();
            bench.tx.arm(command, suppress_ok, 0);
            bench
        }

        fn classify(&mut self, line: &str) {
            classify(line, &mut self.tx, &mut self.status, &mut self.diagnostics);
        }
    }

    #[test]
    fn ok_resolves_a_plain_command() {
        let mut b = Bench::outstanding(CommandId::Ping, false);
        b.classify("OK");
        assert_eq!(b.tx.status(), Some(TxStatus::Success));
    }

    #[test]
    fn ok_is_ignored_while_a_structured_response_is_expected() {
        let mut b = Bench::outstanding(CommandId::MqttOpen, true);
        b.classify("OK");
        assert!(b.tx.is_pending());
        assert_eq!(b.diagnostics.dropped_lines, 0, "an ignored OK is not noise");
        b.classify("+QMTOPEN: 0,0");
        assert_eq!(b.tx.status(), Some(TxStatus::Success));
        assert!(b.status.mqtt_session_open);
    }

    #[test]
    fn error_fails_and_resets_the_tied_status_field() {
        let mut b = Bench::outstanding(CommandId::SimCheck, false);
        b.status.sim = SimState::Ready;
        b.classify("ERROR");
        assert_eq!(b.tx.status(), Some(TxStatus::Failure));
        assert_eq!(b.status.sim, SimState::NotInserted);

        let mut b = Bench::outstanding(CommandId::SignalQuality, false);
        b.status.signal_strength = 17;
        b.classify("+CME ERROR: 10");
        assert_eq!(b.tx.status(), Some(TxStatus::Failure));
        assert_eq!(b.status.signal_strength, 0);
    }

    #[test]
    fn cpin_sets_sim_state_without_resolving() {
        let mut b = Bench::outstanding(CommandId::SimCheck, false);
        b.classify("+CPIN: READY");
        assert_eq!(b.status.sim, SimState::Ready);
        assert!(b.tx.is_pending(), "the trailing OK resolves, not +CPIN:");

        b.classify("OK");
        assert_eq!(b.tx.status(), Some(TxStatus::Success));
    }

    #[test]
    fn cpin_pin_required_means_locked() {
        let mut b = Bench::outstanding(CommandId::SimCheck, false);
        b.classify("+CPIN: SIM PIN");
        assert_eq!(b.status.sim, SimState::Locked);
    }

    #[test]
    fn csq_stores_valid_rssi() {
        let mut b = Bench::outstanding(CommandId::SignalQuality, false);
        b.classify("+CSQ: 15,99");
        assert_eq!(b.status.signal_strength, 15);
    }

    #[test]
    fn csq_unknown_sentinel_clamps_to_zero() {
        let mut b = Bench::outstanding(CommandId::SignalQuality, false);
        b.classify("+CSQ: 99,99");
        assert_eq!(b.status.signal_strength, 0);

        // Anything out of the 1..=31 measurement range maps the same way.
        b.classify("+CSQ: 32,0");
        assert_eq!(b.status.signal_strength, 0);
        b.classify("+CSQ: junk,0");
        assert_eq!(b.status.signal_strength, 0);
    }

    #[test]
    fn qspn_extracts_the_operator_name() {
        let mut b = Bench::outstanding(CommandId::OperatorQuery, false);
        b.classify(r#"+QSPN: "","","MyOperator",0,"20801""#);
        assert_eq!(b.status.operator.as_str(), "MyOperator");
        assert_eq!(b.status.operator.len(), "MyOperator".len());
    }

    #[test]
    fn qspn_with_short_record_clears_the_name() {
        let mut b = Bench::outstanding(CommandId::OperatorQuery, false);
        b.status.operator.push_str("stale").unwrap();
        b.classify("+QSPN: \"\"");
        assert!(b.status.operator.is_empty());
    }

    #[test]
    fn deact_ok_resolves_despite_containing_ok() {
        let mut b = Bench::outstanding(CommandId::PdpDeactivate, true);
        b.status.pdp_attached = true;
        b.classify("DEACT OK");
        assert_eq!(b.tx.status(), Some(TxStatus::Success));
        assert!(!b.status.pdp_attached);
    }

    #[test]
    fn pdp_state_attached_succeeds() {
        let mut b = Bench::outstanding(CommandId::PdpStatus, true);
        b.classify("STATE: IP GPRSACT");
        assert_eq!(b.tx.status(), Some(TxStatus::Success));
        assert!(b.status.pdp_attached);
    }

    #[test]
    fn pdp_state_other_fails() {
        let mut b = Bench::outstanding(CommandId::PdpStatus, true);
        b.status.pdp_attached = true;
        b.classify("STATE: IP INITIAL");
        assert_eq!(b.tx.status(), Some(TxStatus::Failure));
        assert!(!b.status.pdp_attached);
    }

    #[test]
    fn qmtopen_result_codes() {
        let mut b = Bench::outstanding(CommandId::MqttOpen, true);
        b.classify("+QMTOPEN: 0,3");
        assert_eq!(b.tx.status(), Some(TxStatus::Failure));
        assert!(!b.status.mqtt_session_open);
    }

    #[test]
    fn qmtconn_success_needs_both_result_fields_zero() {
        let mut b = Bench::outstanding(CommandId::MqttConnect, true);
        b.classify("+QMTCONN: 0,0,0");
        assert_eq!(b.tx.status(), Some(TxStatus::Success));
        assert!(b.status.mqtt_connected);

        let mut b = Bench::outstanding(CommandId::MqttConnect, true);
        b.classify("+QMTCONN: 0,1,0");
        assert_eq!(b.tx.status(), Some(TxStatus::Failure));
        assert!(!b.status.mqtt_connected);

        let mut b = Bench::outstanding(CommandId::MqttConnect, true);
        b.classify("+QMTCONN: 0,0,4");
        assert_eq!(b.tx.status(), Some(TxStatus::Failure));
    }

    #[test]
    fn qmtpub_result_resolves_the_payload() {
        let mut b = Bench::outstanding(CommandId::TelemetryPayload, true);
        b.classify("+QMTPUB: 0,0,0");
        assert_eq!(b.tx.status(), Some(TxStatus::Success));

        let mut b = Bench::outstanding(CommandId::TelemetryPayload, true);
        b.classify("+QMTPUB: 0,0,2");
        assert_eq!(b.tx.status(), Some(TxStatus::Failure));
    }

    #[test]
    fn prompt_resolves_the_publish_request() {
        let mut b = Bench::outstanding(CommandId::MqttPublish, true);
        b.classify(">");
        assert_eq!(b.tx.status(), Some(TxStatus::Success));
    }

    #[test]
    fn unknown_lines_are_counted_and_dropped() {
        let mut b = Bench::outstanding(CommandId::Ping, false);
        b.classify("+QIURC: \"recv\",0");
        assert!(b.tx.is_pending());
        assert_eq!(b.diagnostics.dropped_lines, 1);
    }

    #[test]
    fn stray_lines_without_outstanding_command_change_nothing() {
        let mut b = Bench::new();
        b.classify("OK");
        b.classify("ERROR");
        b.classify(">");
        assert_eq!(b.tx.status(), None);
    }
}
