use log::{debug, info};
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use std::fmt;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial port control failed: {0}")]
    Control(#[source] serialport::Error),
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),
}

/// Line-oriented view of the connection to the fan-plate controller.
///
/// Exactly one value implementing this exists per process; it is handed to
/// the controller's worker, which is the only code that touches it.
pub trait Link: Send {
    /// Write raw bytes. A short write surfaces as an error.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Block until a `\n` or until `timeout` elapses. Returns the line
    /// without its terminator, or an empty string if nothing arrived.
    fn read_line(&mut self, timeout: Duration) -> Result<String, TransportError>;

    /// Number of received bytes not yet read.
    fn bytes_available(&mut self) -> Result<usize, TransportError>;

    /// Release the connection. Consumes the link so it cannot be closed twice.
    fn close(self: Box<Self>) -> Result<(), TransportError>;
}

pub struct SerialLink {
    port: Box<dyn SerialPort>,
    device: String,
}

/// Open the serial device once. Any failure here is fatal to the caller.
pub fn open(device: &str, baud_rate: u32, timeout: Duration) -> Result<SerialLink, TransportError> {
    let port = serialport::new(device, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(timeout)
        .open()
        .map_err(|source| TransportError::Open {
            device: device.to_string(),
            source,
        })?;

    info!("Connected to {} at {} baud", device, baud_rate);
    Ok(SerialLink {
        port,
        device: device.to_string(),
    })
}

impl SerialLink {
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl Link for SerialLink {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(data).map_err(TransportError::Write)?;
        self.port.flush().map_err(TransportError::Write)
    }

    fn read_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut buffer = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.port.set_timeout(remaining).map_err(TransportError::Control)?;

            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => buffer.push(byte[0]),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(TransportError::Read(e)),
            }
        }

        Ok(String::from_utf8_lossy(&buffer).trim().to_string())
    }

    fn bytes_available(&mut self) -> Result<usize, TransportError> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(TransportError::Control)
    }

    fn close(mut self: Box<Self>) -> Result<(), TransportError> {
        debug!("Closing {}", self.device);
        self.port.flush().map_err(TransportError::Write)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub path: String,
    pub kind: PortKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    Usb {
        vid: u16,
        pid: u16,
        product: Option<String>,
    },
    Pci,
    Bluetooth,
    Unknown,
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PortKind::Usb { vid, pid, product } => {
                write!(f, "{} (USB {:04x}:{:04x}", self.path, vid, pid)?;
                if let Some(product) = product {
                    write!(f, " {}", product)?;
                }
                write!(f, ")")
            }
            PortKind::Pci => write!(f, "{} (PCI)", self.path),
            PortKind::Bluetooth => write!(f, "{} (Bluetooth)", self.path),
            PortKind::Unknown => write!(f, "{}", self.path),
        }
    }
}

pub fn list_ports() -> Result<Vec<PortInfo>, TransportError> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let kind = match p.port_type {
                SerialPortType::UsbPort(usb) => PortKind::Usb {
                    vid: usb.vid,
                    pid: usb.pid,
                    product: usb.product,
                },
                SerialPortType::PciPort => PortKind::Pci,
                SerialPortType::BluetoothPort => PortKind::Bluetooth,
                SerialPortType::Unknown => PortKind::Unknown,
            };
            PortInfo { path: p.port_name, kind }
        })
        .collect())
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedLink;
    use super::*;

    #[test]
    fn open_reports_missing_device() {
        let err = open("/dev/does-not-exist-fan-plate", 115_200, Duration::from_millis(10))
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::Open { .. }));
        assert!(err.to_string().contains("/dev/does-not-exist-fan-plate"));
    }

    #[test]
    fn port_info_display() {
        let info = PortInfo {
            path: "/dev/ttyUSB0".into(),
            kind: PortKind::Usb {
                vid: 0x10c4,
                pid: 0xea60,
                product: Some("CP2102".into()),
            },
        };
        assert_eq!(info.to_string(), "/dev/ttyUSB0 (USB 10c4:ea60 CP2102)");
    }

    #[test]
    fn scripted_link_times_out_with_empty_line() {
        let mut link = ScriptedLink::new();
        assert_eq!(link.read_line(Duration::from_millis(1)).unwrap(), "");
        link.reply_with("OK");
        link.write(b"45").unwrap();
        assert_eq!(link.bytes_available().unwrap(), 3);
        assert_eq!(link.read_line(Duration::from_millis(1)).unwrap(), "OK");
    }
}
