use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSettings {
    pub install_dir: String,
    pub adb_binary: String,
    pub fastboot_binary: String,
    pub command_timeout_secs: u64,
    pub restart_pause_ms: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            install_dir: String::new(),
            adb_binary: default_binary("adb"),
            fastboot_binary: default_binary("fastboot"),
            command_timeout_secs: 30,
            restart_pause_ms: 1000,
        }
    }
}

impl ToolSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Empty `install_dir` means the directory of the running executable.
    pub fn resolved_install_dir(&self) -> PathBuf {
        let configured = self.install_dir.trim();
        if !configured.is_empty() {
            return PathBuf::from(configured);
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecoverySettings {
    pub modem_label: String,
    pub baud_rate: u32,
    pub inter_write_delay_ms: u64,
    pub write_timeout_ms: u64,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            modem_label: "SAMSUNG Mobile USB Modem".to_string(),
            baud_rate: 115_200,
            inter_write_delay_ms: 500,
            write_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSettings {
    pub enabled: bool,
    pub detach_requires_tracked_device: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            detach_requires_tracked_device: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    pub log_level: String,
    pub console_max_lines: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            console_max_lines: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub recovery: RecoverySettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

fn default_binary(stem: &str) -> String {
    if cfg!(windows) {
        format!("{stem}.exe")
    } else {
        stem.to_string()
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("HANDSET_CONSOLE_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    home_dir().join(".handset_console_config.json")
}

pub fn backup_config_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_else(|| "handset_console_config".to_string());
    path.with_file_name(format!("{stem}.backup.json"))
}

pub fn load_config() -> Result<ConsoleConfig, AppError> {
    load_config_from_path(&config_path())
}

pub fn save_config(config: &ConsoleConfig) -> Result<(), AppError> {
    let path = config_path();
    save_config_to_path(config, &path, &backup_config_path_for(&path))
}

pub fn load_config_from_path(path: &Path) -> Result<ConsoleConfig, AppError> {
    if !path.exists() {
        return Ok(ConsoleConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), ""))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), ""))?;
    Ok(validate_config(config_from_value(&value)))
}

pub fn save_config_to_path(
    config: &ConsoleConfig,
    path: &Path,
    backup_path: &Path,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if path.exists() {
        let _ = fs::copy(path, backup_path);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), ""))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), ""))?;
    Ok(())
}

// A broken section falls back to its defaults without discarding the others.
fn config_from_value(value: &serde_json::Value) -> ConsoleConfig {
    fn section<T: serde::de::DeserializeOwned + Default>(
        value: &serde_json::Value,
        key: &str,
    ) -> T {
        value
            .get(key)
            .cloned()
            .and_then(|raw| serde_json::from_value(raw).ok())
            .unwrap_or_default()
    }

    ConsoleConfig {
        tools: section(value, "tools"),
        recovery: section(value, "recovery"),
        monitor: section(value, "monitor"),
        logging: section(value, "logging"),
    }
}

pub fn validate_config(mut config: ConsoleConfig) -> ConsoleConfig {
    let defaults = ConsoleConfig::default();
    if config.tools.command_timeout_secs < 1 {
        config.tools.command_timeout_secs = defaults.tools.command_timeout_secs;
    }
    if config.tools.adb_binary.trim().is_empty() {
        config.tools.adb_binary = defaults.tools.adb_binary;
    }
    if config.tools.fastboot_binary.trim().is_empty() {
        config.tools.fastboot_binary = defaults.tools.fastboot_binary;
    }
    if config.recovery.baud_rate == 0 {
        config.recovery.baud_rate = defaults.recovery.baud_rate;
    }
    if config.recovery.modem_label.trim().is_empty() {
        config.recovery.modem_label = defaults.recovery.modem_label;
    }
    if config.recovery.write_timeout_ms == 0 {
        config.recovery.write_timeout_ms = defaults.recovery.write_timeout_ms;
    }
    if config.logging.console_max_lines < 50 {
        config.logging.console_max_lines = defaults.logging.console_max_lines;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from_path(&dir.path().join("absent.json")).expect("load");
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.recovery.baud_rate, 115_200);
        assert_eq!(config.tools.restart_pause_ms, 1000);
    }

    #[test]
    fn broken_section_keeps_other_sections() {
        let value = serde_json::json!({
            "tools": { "command_timeout_secs": "not-a-number" },
            "recovery": {
                "modem_label": "ACME Modem",
                "baud_rate": 9600,
                "inter_write_delay_ms": 10,
                "write_timeout_ms": 200
            }
        });
        let config = config_from_value(&value);
        assert_eq!(config.tools, ToolSettings::default());
        assert_eq!(config.recovery.modem_label, "ACME Modem");
        assert_eq!(config.recovery.baud_rate, 9600);
    }

    #[test]
    fn clamps_invalid_values() {
        let mut config = ConsoleConfig::default();
        config.tools.command_timeout_secs = 0;
        config.tools.adb_binary = "  ".to_string();
        config.recovery.baud_rate = 0;
        config.logging.console_max_lines = 3;
        let validated = validate_config(config);
        assert_eq!(validated.tools.command_timeout_secs, 30);
        assert_eq!(validated.tools.adb_binary, ToolSettings::default().adb_binary);
        assert_eq!(validated.recovery.baud_rate, 115_200);
        assert_eq!(validated.logging.console_max_lines, 500);
    }

    #[test]
    fn save_writes_backup_of_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("console.json");
        let backup = backup_config_path_for(&path);
        assert_eq!(backup.file_name().unwrap(), "console.backup.json");

        let mut config = ConsoleConfig::default();
        save_config_to_path(&config, &path, &backup).expect("first save");
        assert!(!backup.exists());

        config.monitor.detach_requires_tracked_device = true;
        save_config_to_path(&config, &path, &backup).expect("second save");
        assert!(backup.exists());

        let reloaded = load_config_from_path(&path).expect("reload");
        assert!(reloaded.monitor.detach_requires_tracked_device);
        let previous = load_config_from_path(&backup).expect("backup");
        assert!(!previous.monitor.detach_requires_tracked_device);
    }

    #[test]
    fn explicit_install_dir_is_used_verbatim() {
        let settings = ToolSettings {
            install_dir: " /opt/handset ".to_string(),
            ..ToolSettings::default()
        };
        assert_eq!(settings.resolved_install_dir(), PathBuf::from("/opt/handset"));
    }
}
