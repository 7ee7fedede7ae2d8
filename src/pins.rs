//! Pin assignments for the AeroMon main board (ESP32-S3).

/// UART TX to the cellular modem's RXD.
pub const MODEM_UART_TX_GPIO: i32 = 17;
/// UART RX from the cellular modem's TXD.
pub const MODEM_UART_RX_GPIO: i32 = 18;
