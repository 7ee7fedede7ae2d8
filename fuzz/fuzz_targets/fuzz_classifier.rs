//! Fuzz target: response classifier.
//!
//! Classifies arbitrary text lines against every possible outstanding
//! command and asserts that the status snapshot stays inside its documented
//! ranges and that classification never panics.
//!
//! cargo fuzz run fuzz_classifier

#![no_main]

use libfuzzer_sys::fuzz_target;

use aeromon::modem::catalog::CommandId;
use aeromon::modem::classifier;
use aeromon::modem::context::{DeviceStatus, LinkDiagnostics, Transaction};

const COMMANDS: [(CommandId, bool); 11] = [
    (CommandId::Ping, false),
    (CommandId::SimCheck, false),
    (CommandId::SignalQuality, false),
    (CommandId::OperatorQuery, false),
    (CommandId::PdpActivate, false),
    (CommandId::PdpDeactivate, true),
    (CommandId::PdpStatus, true),
    (CommandId::MqttOpen, true),
    (CommandId::MqttConnect, true),
    (CommandId::MqttPublish, true),
    (CommandId::TelemetryPayload, true),
];

fuzz_target!(|data: &[u8]| {
    let Ok(line) = core::str::from_utf8(data) else {
        return;
    };

    for (command, suppress_ok) in COMMANDS {
        let mut tx = Transaction::default();
        tx.arm(command, suppress_ok, 0);
        let mut status = DeviceStatus::default();
        let mut diagnostics = LinkDiagnostics::default();

        classifier::classify(line, &mut tx, &mut status, &mut diagnostics);

        assert!(status.signal_strength <= 31, "RSSI out of range");
    }
});
