//! Response line framer.
//!
//! Turns the modem's raw byte stream into discrete response lines. Polled
//! cooperatively: each call consumes at most one byte from the transport and
//! returns immediately, so the framer can never stall the control loop.
//!
//! Framing rules:
//! - CR or LF with an empty buffer is dropped — this makes CR, LF, and CRLF
//!   terminated responses all frame exactly once.
//! - CR or LF with accumulated bytes completes the line.
//! - The `>` payload prompt arrives with no terminator and is emitted as a
//!   single-character pseudo-line the moment it is read.
//! - Any other byte is appended, subject to the buffer's capacity bound.

use log::warn;

use crate::modem::context::{LINE_CAP, ModemContext};
use crate::ports::ModemTransport;

/// Prompt byte the modem emits when it is ready for payload bytes.
pub const PROMPT: u8 = b'>';

/// Consume at most one received byte. Returns `true` when a completed line is
/// ready for classification.
pub fn poll<T: ModemTransport>(ctx: &mut ModemContext, transport: &mut T) -> bool {
    // A ready line must be classified and reset before accumulation resumes.
    if ctx.line.is_ready() {
        return true;
    }

    if transport.rx_available() == 0 {
        return false;
    }
    let Some(byte) = transport.read_byte() else {
        return false;
    };

    match byte {
        b'\r' | b'\n' => {
            if ctx.line.is_empty() {
                // Idle half of a CRLF pair, or terminator noise between lines.
                return false;
            }
            ctx.line.mark_ready();
            true
        }
        PROMPT => {
            push_bounded(ctx, PROMPT);
            ctx.line.mark_ready();
            true
        }
        _ => {
            push_bounded(ctx, byte);
            false
        }
    }
}

fn push_bounded(ctx: &mut ModemContext, byte: u8) {
    let already_truncated = ctx.line.was_truncated();
    if !ctx.line.push(byte) && !already_truncated {
        ctx.diagnostics.line_overflows += 1;
        warn!("response line exceeded {LINE_CAP} bytes, truncating");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;
    use crate::modem::context::LINE_CAP;

    struct ScriptedPort {
        rx: std::collections::VecDeque<u8>,
    }

    impl ScriptedPort {
        fn new(bytes: &[u8]) -> Self {
            Self {
                rx: bytes.iter().copied().collect(),
            }
        }
    }

    impl ModemTransport for ScriptedPort {
        fn write(&mut self, bytes: &[u8]) -> usize {
            bytes.len()
        }
        fn tx_free(&self) -> usize {
            usize::MAX
        }
        fn rx_available(&self) -> usize {
            self.rx.len()
        }
        fn read_byte(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
    }

    fn ctx() -> ModemContext {
        ModemContext::new(SystemConfig::default())
    }

    /// Drain the whole script, collecting each completed line as text.
    fn frame_all(bytes: &[u8]) -> Vec<String> {
        let mut ctx = ctx();
        let mut port = ScriptedPort::new(bytes);
        let mut lines = Vec::new();
        while port.rx_available() > 0 || ctx.line.is_ready() {
            if poll(&mut ctx, &mut port) {
                lines.push(ctx.line.as_str().to_owned());
                ctx.line.reset();
            }
        }
        lines
    }

    #[test]
    fn no_byte_available_is_a_no_op() {
        let mut ctx = ctx();
        let mut port = ScriptedPort::new(b"");
        assert!(!poll(&mut ctx, &mut port));
        assert!(ctx.line.is_empty());
    }

    #[test]
    fn crlf_terminated_line_frames_once() {
        assert_eq!(frame_all(b"OK\r\n"), ["OK"]);
    }

    #[test]
    fn bare_cr_and_bare_lf_both_frame() {
        assert_eq!(frame_all(b"OK\r"), ["OK"]);
        assert_eq!(frame_all(b"OK\n"), ["OK"]);
    }

    #[test]
    fn leading_terminators_are_skipped() {
        assert_eq!(frame_all(b"\r\n\r\n+CSQ: 20,99\r\nOK\r\n"), ["+CSQ: 20,99", "OK"]);
    }

    #[test]
    fn prompt_is_a_pseudo_line_without_terminator() {
        assert_eq!(frame_all(b">"), [">"]);
    }

    #[test]
    fn oversized_line_is_truncated_and_counted_once() {
        let mut script = vec![b'a'; LINE_CAP + 40];
        script.extend_from_slice(b"\r\n");

        let mut ctx = ctx();
        let mut port = ScriptedPort::new(&script);
        let mut framed = None;
        while port.rx_available() > 0 {
            if poll(&mut ctx, &mut port) {
                framed = Some(ctx.line.len());
                assert!(ctx.line.was_truncated());
                ctx.line.reset();
            }
        }
        assert_eq!(framed, Some(LINE_CAP));
        assert_eq!(ctx.diagnostics.line_overflows, 1);
    }
}
