//! Download-mode exit over the vendor modem endpoint.
//!
//! Best effort: the two writes are a heuristic trigger, nothing is read back, and a
//! successful write does not prove the device left download mode.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use serialport::{DataBits, FlowControl, Parity, SerialPortType, StopBits};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::config::RecoverySettings;
use crate::app::error::AppError;

/// `AT+REBOOT\r\n`
pub const EXIT_SEQUENCE: [u8; 11] = *b"AT+REBOOT\r\n";
pub const RESET_SEQUENCE: [u8; 8] = [0u8; 8];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PortDescriptor {
    pub port_name: String,
    pub label: String,
}

fn com_port_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\((COM\d+)\)").expect("static pattern"))
}

/// The first descriptor whose label names the modem. A parenthesised `(COMn)` in the
/// label wins over the enumerated port name.
pub fn find_modem_port(descriptors: &[PortDescriptor], modem_label: &str) -> Option<String> {
    let needle = modem_label.to_lowercase();
    descriptors
        .iter()
        .find(|descriptor| descriptor.label.to_lowercase().contains(&needle))
        .map(|descriptor| {
            com_port_pattern()
                .captures(&descriptor.label)
                .map(|caps| caps[1].to_string())
                .unwrap_or_else(|| descriptor.port_name.clone())
        })
}

pub fn enumerate_ports() -> Vec<PortDescriptor> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(err) => {
            warn!(error = %err, "failed to enumerate serial ports");
            return Vec::new();
        }
    };
    ports
        .into_iter()
        .map(|port| {
            let label = match port.port_type {
                SerialPortType::UsbPort(usb) => [usb.manufacturer, usb.product]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" "),
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::Unknown => String::new(),
            };
            PortDescriptor {
                port_name: port.port_name,
                label,
            }
        })
        .collect()
}

pub trait PortOpener: Send + Sync {
    fn open(
        &self,
        port_name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn Write + Send>, AppError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortOpener;

impl PortOpener for SerialPortOpener {
    fn open(
        &self,
        port_name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn Write + Send>, AppError> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|err| {
                AppError::port_unavailable(format!("Failed to open {port_name}: {err}"), "")
            })?;
        Ok(Box::new(port))
    }
}

type PortEnumerator = Box<dyn Fn() -> Vec<PortDescriptor> + Send + Sync>;

pub struct DownloadModeRecovery {
    settings: RecoverySettings,
    enumerate: PortEnumerator,
    opener: Box<dyn PortOpener>,
}

impl DownloadModeRecovery {
    pub fn new(settings: RecoverySettings) -> Self {
        Self::with_parts(settings, Box::new(enumerate_ports), Box::new(SerialPortOpener))
    }

    pub fn with_parts(
        settings: RecoverySettings,
        enumerate: PortEnumerator,
        opener: Box<dyn PortOpener>,
    ) -> Self {
        Self {
            settings,
            enumerate,
            opener,
        }
    }

    pub fn list_ports(&self) -> Vec<PortDescriptor> {
        (self.enumerate)()
    }

    pub fn find_port(&self) -> Option<String> {
        find_modem_port(&self.list_ports(), &self.settings.modem_label)
    }

    pub fn force_exit_download_mode(&self) -> bool {
        let trace_id = Uuid::new_v4().to_string();
        let Some(port_name) = self.find_port() else {
            info!(trace_id = %trace_id, label = %self.settings.modem_label, "no download-mode modem port found");
            return false;
        };
        match self.send_exit_sequence(&port_name, &trace_id) {
            Ok(()) => {
                info!(trace_id = %trace_id, port = %port_name, "download-mode exit sequence sent");
                true
            }
            Err(err) => {
                warn!(trace_id = %trace_id, port = %port_name, error = %err, "download-mode exit failed");
                false
            }
        }
    }

    // The port is dropped, and so closed, on every path out of this function.
    fn send_exit_sequence(&self, port_name: &str, trace_id: &str) -> Result<(), AppError> {
        let io_error = |err: std::io::Error| {
            AppError::port_unavailable(format!("Write to {port_name} failed: {err}"), trace_id)
        };
        let mut port = self.opener.open(
            port_name,
            self.settings.baud_rate,
            Duration::from_millis(self.settings.write_timeout_ms),
        )?;
        port.write_all(&EXIT_SEQUENCE).map_err(io_error)?;
        port.flush().map_err(io_error)?;
        std::thread::sleep(Duration::from_millis(self.settings.inter_write_delay_ms));
        port.write_all(&RESET_SEQUENCE).map_err(io_error)?;
        port.flush().map_err(io_error)?;
        Ok(())
    }
}
