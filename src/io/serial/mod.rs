// src/io/serial/mod.rs
//
// Serial port driver for the probe link.

pub mod port;
pub(crate) mod utils;

pub use port::{list_serial_ports, SerialConfig, SerialPortInfo, SerialTransport};
pub use utils::{FrameFormat, Parity};
