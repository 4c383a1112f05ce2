use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceMode {
    #[default]
    Disconnected,
    UsbConnected,
    Adb,
    Download,
    Fastboot,
}

impl DeviceMode {
    /// Arbitration rank; a candidate wins when its rank is >= the held mode's.
    pub fn priority(self) -> u8 {
        match self {
            DeviceMode::Disconnected => 0,
            DeviceMode::UsbConnected => 1,
            DeviceMode::Fastboot => 2,
            DeviceMode::Download => 3,
            DeviceMode::Adb => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceMode::Disconnected => "DISCONNECTED",
            DeviceMode::UsbConnected => "USB_CONNECTED",
            DeviceMode::Adb => "ADB",
            DeviceMode::Download => "DOWNLOAD",
            DeviceMode::Fastboot => "FASTBOOT",
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    #[default]
    Unknown,
    Android,
    Samsung,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceType::Unknown => "UNKNOWN",
            DeviceType::Android => "ANDROID",
            DeviceType::Samsung => "SAMSUNG",
        })
    }
}

/// What is attached right now. `mode == Disconnected` iff `!connected`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeviceSession {
    pub mode: DeviceMode,
    pub device_type: DeviceType,
    pub connected: bool,
}

impl DeviceSession {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Online,
    Unauthorized,
    Offline,
    Recovery,
    Sideload,
    Fastboot,
    NotFound,
}

/// One `<serial>\t<status>` line of the debug bridge's `devices` listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachedDevice {
    pub serial: String,
    pub state: String,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Adb,
    Fastboot,
}

impl ToolKind {
    /// Directory name under `<install_dir>/Tools/`. Both tools ship in the adb bundle.
    pub fn tools_subdir(self) -> &'static str {
        match self {
            ToolKind::Adb | ToolKind::Fastboot => "adb",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    ProcessStart,
    NonZeroExit,
    PatternMatched,
    Timeout,
    Cancelled,
}

impl FailureKind {
    pub fn code(self) -> &'static str {
        match self {
            FailureKind::ProcessStart => "ERR_PROCESS_START",
            FailureKind::NonZeroExit => "ERR_NON_ZERO_EXIT",
            FailureKind::PatternMatched => "ERR_PATTERN_MATCHED",
            FailureKind::Timeout => "ERR_TIMEOUT",
            FailureKind::Cancelled => "ERR_CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub failure: Option<FailureKind>,
}

impl CommandResult {
    pub fn failed(kind: FailureKind, diagnostic: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: diagnostic.into(),
            exit_code: -1,
            failure: Some(kind),
        }
    }

    /// stdout and stderr joined, the way the flashing tool's status lines are read.
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.trim().to_string(),
            (true, false) => self.stderr.trim().to_string(),
            (false, false) => format!("{}\n{}", self.stdout.trim(), self.stderr.trim()),
        }
    }
}

/// Opaque identity of a bus device, used to match a detach against the tracked attach.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeviceKey(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachOutcome {
    pub name: String,
    pub session: DeviceSession,
    pub mode_changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceEvent {
    Attached(AttachOutcome),
    Detached { session: DeviceSession },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
}
