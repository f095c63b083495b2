// src/io/serial/port.rs
//
// Serial port transport for the probe link, plus port enumeration.

use std::io::{Read, Write};
use std::time::Duration;

use super::utils::{self, FrameFormat};
use crate::error::TransportError;
use crate::io::Transport;

/// Read timeout; keeps `poll` short so the control loop stays responsive.
const POLL_TIMEOUT: Duration = Duration::from_millis(5);

// ============================================================================
// Types and Configuration
// ============================================================================

/// Serial port configuration
#[derive(Clone, Debug, PartialEq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub format: FrameFormat,
}

/// Information about an available serial port
#[derive(Clone, Debug)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

// ============================================================================
// Serial Transport
// ============================================================================

pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl SerialTransport {
    /// Open and configure the port. No retries: a probe that is not plugged
    /// in is a fatal configuration problem.
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(utils::to_serialport_data_bits(config.format.data_bits))
            .stop_bits(utils::to_serialport_stop_bits(config.format.stop_bits))
            .parity(utils::to_serialport_parity(config.format.parity))
            .timeout(POLL_TIMEOUT)
            .open()
            .map_err(|e| TransportError::open(&config.port, e))?;

        tlog!(
            "[serial] Opened {} at {} baud ({})",
            config.port,
            config.baud_rate,
            config.format
        );

        Ok(SerialTransport {
            port,
            name: config.port.clone(),
        })
    }
}

impl Transport for SerialTransport {
    fn poll(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.port.read(buf) {
            Ok(0) => Err(TransportError::Disconnected {
                port: self.name.clone(),
            }),
            Ok(n) => Ok(n),
            // Timeout is the normal "nothing available" answer
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(0),
            Err(source) => Err(TransportError::Read {
                port: self.name.clone(),
                source,
            }),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port
            .write_all(bytes)
            .and_then(|_| self.port.flush())
            .map_err(|source| TransportError::Write {
                port: self.name.clone(),
                source,
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Port Enumeration
// ============================================================================

/// List available serial ports
///
/// On macOS, filters out /dev/tty.* devices and only shows /dev/cu.* devices.
/// The tty devices block on open waiting for carrier detect.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, TransportError> {
    let ports =
        serialport::available_ports().map_err(|e| TransportError::Enumerate(e.to_string()))?;

    Ok(ports
        .into_iter()
        .filter(|_p| {
            #[cfg(target_os = "macos")]
            {
                !_p.port_name.starts_with("/dev/tty.")
            }
            #[cfg(not(target_os = "macos"))]
            {
                true
            }
        })
        .map(|p| {
            let (port_type, manufacturer, product, vid, pid) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    "USB".to_string(),
                    info.manufacturer,
                    info.product,
                    Some(info.vid),
                    Some(info.pid),
                ),
                serialport::SerialPortType::BluetoothPort => {
                    ("Bluetooth".to_string(), None, None, None, None)
                }
                serialport::SerialPortType::PciPort => ("PCI".to_string(), None, None, None, None),
                serialport::SerialPortType::Unknown => {
                    ("Unknown".to_string(), None, None, None, None)
                }
            };
            SerialPortInfo {
                port_name: p.port_name,
                port_type,
                manufacturer,
                product,
                vid,
                pid,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig {
            port: "/nonexistent/probe-port".to_string(),
            baud_rate: 9600,
            format: FrameFormat::default(),
        };
        match SerialTransport::open(&config) {
            Err(TransportError::Open { port, .. }) => assert_eq!(port, config.port),
            Err(e) => panic!("unexpected error {:?}", e),
            Ok(_) => panic!("opened a port that does not exist"),
        }
    }
}
