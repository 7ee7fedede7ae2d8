//! AT command catalog.
//!
//! Pure data: one immutable table mapping each command identifier to its
//! literal wire bytes (terminator included) and a flag marking commands whose
//! completion signal is a structured response line rather than a bare `OK`.
//! Entries with broker parameters are rendered once from [`SystemConfig`] at
//! startup; nothing here has behavior beyond lookup.

use core::fmt;
use core::fmt::Write;

use heapless::String;

use crate::config::SystemConfig;
use crate::error::Error;

/// CR+LF terminator every command line ends with.
pub const COMMAND_TERMINATOR: &str = "\r\n";

/// Upper bound for one rendered command line.
pub const COMMAND_MAX: usize = 192;

/// One-time modem setup lines sent before the polled engine starts: echo off,
/// verbose CME errors, plain result codes, and unsolicited SMS/registration
/// indications disabled so they cannot interleave with command responses.
pub(crate) const PRELUDE_COMMANDS: [&str; 6] = [
    "ATE0\r\n",
    "AT+CMEE=1\r\n",
    "AT+CRC=0\r\n",
    "AT+CNMI=0,0,0,0,0\r\n",
    "AT+CREG=0\r\n",
    "AT+CGREG=0\r\n",
];

/// Identity of every command the sequencer can have in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    /// `AT` — liveness ping.
    Ping,
    /// `AT+CPIN?` — SIM readiness query.
    SimCheck,
    /// `AT+CSQ` — received signal strength.
    SignalQuality,
    /// `AT+QSPN` — service provider (operator) name.
    OperatorQuery,
    /// `AT+QIACT` — activate the packet-data context.
    PdpActivate,
    /// `AT+QIDEACT` — deactivate the packet-data context.
    PdpDeactivate,
    /// `AT+QISTAT` — packet-data context state query.
    PdpStatus,
    /// `AT+QMTOPEN` — open the MQTT network session.
    MqttOpen,
    /// `AT+QMTCONN` — MQTT CONNECT handshake.
    MqttConnect,
    /// `AT+QMTPUB` — request a publish; the modem answers with a `>` prompt.
    MqttPublish,
    /// The JSON record sent after the prompt. A pseudo-command: it has no
    /// catalog entry and is resolved by the `+QMTPUB:` result line.
    TelemetryPayload,
}

/// One immutable catalog entry.
pub struct Command {
    pub id: CommandId,
    line: String<COMMAND_MAX>,
    /// The command's bare `OK` is ignored; a structured response resolves it.
    pub suppress_ok: bool,
}

impl Command {
    pub fn bytes(&self) -> &[u8] {
        self.line.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }
}

/// The process-wide command table, built once at startup.
pub struct CommandCatalog {
    entries: [Command; 10],
}

impl CommandCatalog {
    /// Render the catalog from the link configuration. Fails if a configured
    /// field does not fit its command line.
    pub fn new(config: &SystemConfig) -> Result<Self, Error> {
        let entries = [
            render(CommandId::Ping, false, format_args!("AT"))?,
            render(CommandId::SimCheck, false, format_args!("AT+CPIN?"))?,
            render(CommandId::SignalQuality, false, format_args!("AT+CSQ"))?,
            render(CommandId::OperatorQuery, false, format_args!("AT+QSPN"))?,
            render(CommandId::PdpActivate, false, format_args!("AT+QIACT"))?,
            render(CommandId::PdpDeactivate, true, format_args!("AT+QIDEACT"))?,
            render(CommandId::PdpStatus, true, format_args!("AT+QISTAT"))?,
            render(
                CommandId::MqttOpen,
                true,
                format_args!(
                    "AT+QMTOPEN=0,\"{}\",{}",
                    config.broker_host, config.broker_port
                ),
            )?,
            render(
                CommandId::MqttConnect,
                true,
                format_args!(
                    "AT+QMTCONN=0,\"{}\",\"{}\",\"{}\"",
                    config.client_id, config.username, config.password
                ),
            )?,
            render(
                CommandId::MqttPublish,
                true,
                format_args!("AT+QMTPUB=0,0,0,0,\"{}\"", config.publish_topic),
            )?,
        ];
        Ok(Self { entries })
    }

    /// Look up a command's wire form. `None` for [`CommandId::TelemetryPayload`],
    /// which is rendered per publish cycle instead.
    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}

fn render(id: CommandId, suppress_ok: bool, args: fmt::Arguments<'_>) -> Result<Command, Error> {
    const OVERFLOW: Error = Error::Config("AT command exceeds the line buffer");

    let mut line: String<COMMAND_MAX> = String::new();
    line.write_fmt(args).map_err(|_| OVERFLOW)?;
    line.push_str(COMMAND_TERMINATOR).map_err(|()| OVERFLOW)?;
    Ok(Command {
        id,
        line,
        suppress_ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CommandCatalog {
        CommandCatalog::new(&SystemConfig::default()).unwrap()
    }

    #[test]
    fn every_entry_is_terminated() {
        let catalog = catalog();
        for id in [
            CommandId::Ping,
            CommandId::SimCheck,
            CommandId::SignalQuality,
            CommandId::OperatorQuery,
            CommandId::PdpActivate,
            CommandId::PdpDeactivate,
            CommandId::PdpStatus,
            CommandId::MqttOpen,
            CommandId::MqttConnect,
            CommandId::MqttPublish,
        ] {
            let cmd = catalog.get(id).unwrap();
            assert!(!cmd.is_empty());
            assert!(
                cmd.bytes().ends_with(COMMAND_TERMINATOR.as_bytes()),
                "{id:?} must end with CRLF"
            );
        }
    }

    #[test]
    fn broker_parameters_are_rendered_in() {
        let config = SystemConfig::default();
        let catalog = CommandCatalog::new(&config).unwrap();

        let open = catalog.get(CommandId::MqttOpen).unwrap();
        let open_line = core::str::from_utf8(open.bytes()).unwrap();
        assert_eq!(
            open_line,
            format!(
                "AT+QMTOPEN=0,\"{}\",{}\r\n",
                config.broker_host, config.broker_port
            )
        );

        let publish = catalog.get(CommandId::MqttPublish).unwrap();
        let publish_line = core::str::from_utf8(publish.bytes()).unwrap();
        assert!(publish_line.contains(config.publish_topic.as_str()));
    }

    #[test]
    fn structured_response_commands_suppress_the_bare_ok() {
        let catalog = catalog();
        for (id, suppress) in [
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
        ] {
            assert_eq!(catalog.get(id).unwrap().suppress_ok, suppress, "{id:?}");
        }
    }

    #[test]
    fn payload_pseudo_command_has_no_entry() {
        assert!(catalog().get(CommandId::TelemetryPayload).is_none());
    }

    #[test]
    fn max_length_fields_fit_the_command_buffer() {
        use core::str::FromStr;

        // Worst case is AT+QMTCONN with every field at capacity; prove the
        // arithmetic rather than trusting it.
        let mut config = SystemConfig::default();
        config.broker_host = String::from_str(&"h".repeat(64)).unwrap();
        config.client_id = String::from_str(&"c".repeat(23)).unwrap();
        config.username = String::from_str(&"u".repeat(64)).unwrap();
        config.password = String::from_str(&"p".repeat(64)).unwrap();
        config.publish_topic = String::from_str(&"t".repeat(64)).unwrap();
        assert!(CommandCatalog::new(&config).is_ok());
    }
}
