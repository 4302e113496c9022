//! Serial port transport
//!
//! Provides the hardware link to the plotter's microcontroller over USB
//! serial.
//!
//! Supports:
//! - Port enumeration and discovery
//! - Baud rate, data bit, stop bit and parity configuration
//! - Short read timeouts so the delivery loop can poll for cancellation

use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use std::time::Duration;
use xyplot_core::ConnectionError;

/// Baud rate the plotter firmware listens at
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout used when none is configured
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 50;

/// Serial parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    #[default]
    None,
    Even,
    Odd,
}

impl fmt::Display for SerialParity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerialParity::None => write!(f, "none"),
            SerialParity::Even => write!(f, "even"),
            SerialParity::Odd => write!(f, "odd"),
        }
    }
}

/// Parameters for opening a serial link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: SerialParity,
    /// Hardware flow control
    pub flow_control: bool,
    /// How long a single read may block
    pub read_timeout_ms: u64,
}

impl ConnectionParams {
    /// 8N1 at the firmware's baud rate, no flow control
    pub fn serial(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            flow_control: false,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    fn invalid(reason: String) -> ConnectionError {
        ConnectionError::InvalidParameters { reason }
    }

    fn data_bits(&self) -> Result<serialport::DataBits, ConnectionError> {
        match self.data_bits {
            5 => Ok(serialport::DataBits::Five),
            6 => Ok(serialport::DataBits::Six),
            7 => Ok(serialport::DataBits::Seven),
            8 => Ok(serialport::DataBits::Eight),
            other => Err(Self::invalid(format!("Invalid data bits: {}", other))),
        }
    }

    fn stop_bits(&self) -> Result<serialport::StopBits, ConnectionError> {
        match self.stop_bits {
            1 => Ok(serialport::StopBits::One),
            2 => Ok(serialport::StopBits::Two),
            other => Err(Self::invalid(format!("Invalid stop bits: {}", other))),
        }
    }

    /// Check the parameters without touching hardware
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.port.trim().is_empty() {
            return Err(Self::invalid("Port name is empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(Self::invalid("Baud rate must be positive".to_string()));
        }
        self.data_bits()?;
        self.stop_bits()?;
        Ok(())
    }
}

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

/// List serial ports that look like a plotter controller
///
/// Filters to USB-serial style device names:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>, ConnectionError> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        ConnectionError::PortNotFound {
            port: format!("enumeration failed: {}", e),
        }
    })?;

    Ok(ports
        .iter()
        .filter(|port| is_valid_port(&port.port_name))
        .map(|port| {
            let (vid, pid) = match &port.port_type {
                serialport::SerialPortType::UsbPort(usb) => (Some(usb.vid), Some(usb.pid)),
                _ => (None, None),
            };
            SerialPortInfo {
                port_name: port.port_name.clone(),
                description: port_description(port),
                vid,
                pid,
            }
        })
        .collect())
}

/// Pick a port automatically
///
/// `/dev/ttyUSB*` adapters are what the plotter's controller board
/// enumerates as, so they win over other candidates.
pub fn auto_detect_port() -> Result<String, ConnectionError> {
    let names: Vec<String> = list_ports()?.into_iter().map(|p| p.port_name).collect();
    pick_port(&names).ok_or_else(|| ConnectionError::PortNotFound {
        port: "no USB serial device found".to_string(),
    })
}

fn pick_port(names: &[String]) -> Option<String> {
    names
        .iter()
        .find(|name| name.starts_with("/dev/ttyUSB"))
        .or_else(|| names.first())
        .cloned()
}

/// Check if a port name matches a USB serial controller
pub fn is_valid_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

fn port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

fn to_serialport_parity(parity: SerialParity) -> serialport::Parity {
    match parity {
        SerialParity::None => serialport::Parity::None,
        SerialParity::Even => serialport::Parity::Even,
        SerialParity::Odd => serialport::Parity::Odd,
    }
}

/// Serial port implementation using the serialport crate
pub struct RealSerialPort {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl RealSerialPort {
    /// Open a serial port with the given parameters
    pub fn open(params: &ConnectionParams) -> Result<Self, ConnectionError> {
        params.validate()?;

        let builder = serialport::new(&params.port, params.baud_rate)
            .timeout(Duration::from_millis(params.read_timeout_ms))
            .data_bits(params.data_bits()?)
            .stop_bits(params.stop_bits()?)
            .parity(to_serialport_parity(params.parity))
            .flow_control(if params.flow_control {
                serialport::FlowControl::Hardware
            } else {
                serialport::FlowControl::None
            });

        match builder.open() {
            Ok(port) => {
                tracing::info!(port = %params.port, baud = params.baud_rate, "Opened serial port");
                Ok(RealSerialPort {
                    port,
                    name: params.port.clone(),
                })
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", params.port, e);
                Err(ConnectionError::FailedToOpen {
                    port: params.port.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl Transport for RealSerialPort {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = self.port.write(data)?;
        self.port.flush()?;
        Ok(n)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
