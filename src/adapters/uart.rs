//! ESP-IDF UART adapter for the modem link.
//!
//! Wraps the ESP-IDF UART driver (which services the interrupt-fed TX/RX
//! ring buffers) behind [`ModemTransport`]. All calls are non-blocking: the
//! read timeout is zero and writes only copy into the TX ring, whose free
//! space the driver checks first.

use esp_idf_hal::uart::UartDriver;

use crate::ports::ModemTransport;

/// Non-blocking byte transport over an ESP-IDF UART.
pub struct UartTransport<'d> {
    driver: UartDriver<'d>,
}

impl<'d> UartTransport<'d> {
    pub fn new(driver: UartDriver<'d>) -> Self {
        Self { driver }
    }
}

impl ModemTransport for UartTransport<'_> {
    fn write(&mut self, bytes: &[u8]) -> usize {
        self.driver.write(bytes).unwrap_or(0)
    }

    fn tx_free(&self) -> usize {
        let mut free: usize = 0;
        let err = unsafe {
            esp_idf_svc::sys::uart_get_tx_buffer_free_size(self.driver.port(), &raw mut free)
        };
        if err == esp_idf_svc::sys::ESP_OK { free } else { 0 }
    }

    fn rx_available(&self) -> usize {
        self.driver.remaining_read().unwrap_or(0)
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.driver.read(&mut byte, 0) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}
