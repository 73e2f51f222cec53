//! Identifiers of the serial-style radio service robots expose and stations write to.

use uuid::Uuid;

/// Control service advertised by robots.
pub const UART_SERVICE: Uuid = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);
/// Characteristic frames are written to.
pub const UART_RX_CHARACTERISTIC: Uuid = Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);
