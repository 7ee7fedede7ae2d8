//! Fuzz target: line framer.
//!
//! Drives arbitrary byte sequences through the framer and asserts that the
//! accumulation buffer never exceeds its capacity bound and that framing
//! resumes cleanly after every reset.
//!
//! cargo fuzz run fuzz_line_framer

#![no_main]

use libfuzzer_sys::fuzz_target;

use aeromon::config::SystemConfig;
use aeromon::modem::context::{LINE_CAP, ModemContext};
use aeromon::modem::framer;
use aeromon::ports::ModemTransport;

struct SoupPort {
    data: Vec<u8>,
    at: usize,
}

impl ModemTransport for SoupPort {
    fn write(&mut self, bytes: &[u8]) -> usize {
        bytes.len()
    }
    fn tx_free(&self) -> usize {
        usize::MAX
    }
    fn rx_available(&self) -> usize {
        self.data.len() - self.at
    }
    fn read_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.at).copied()?;
        self.at += 1;
        Some(byte)
    }
}

fuzz_target!(|data: &[u8]| {
    let mut ctx = ModemContext::new(SystemConfig::default());
    let mut port = SoupPort {
        data: data.to_vec(),
        at: 0,
    };

    while port.rx_available() > 0 {
        if framer::poll(&mut ctx, &mut port) {
            assert!(ctx.line.len() <= LINE_CAP, "line exceeds LINE_CAP");
            let _ = ctx.line.as_str();
            ctx.line.reset();
        }
        assert!(ctx.line.len() <= LINE_CAP, "line exceeds LINE_CAP");
    }
});
