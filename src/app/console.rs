use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Local;
use tracing::info;

use crate::app::config::ConsoleConfig;
use crate::app::hotplug::{HardwareMonitor, HotplugSource};
use crate::app::models::{
    CommandResult, ConnectionState, DeviceEvent, DeviceMode, DeviceSession, LogEntry,
};
use crate::app::recovery::{DownloadModeRecovery, PortDescriptor};
use crate::app::session::SessionStore;
use crate::app::tools::adb::{AdbClient, RebootTarget};
use crate::app::tools::executor::{CommandExecutor, ToolRunner};
use crate::app::tools::fastboot::FastbootClient;
use crate::app::tools::probe::SessionProbe;

/// Bounded, timestamped log of what the console did.
pub struct ConsoleLog {
    entries: Mutex<VecDeque<LogEntry>>,
    max_lines: usize,
}

impl ConsoleLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_lines: max_lines.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "console", "{message}");
        let mut entries = self.lock();
        entries.push_back(LogEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            message,
        });
        while entries.len() > self.max_lines {
            entries.pop_front();
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|entry| entry.message.clone()).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

fn failure_text(result: &CommandResult) -> String {
    let detail = result.combined_output();
    match result.failure {
        Some(kind) => format!("{detail} [{}]", kind.code()),
        None => detail,
    }
}

fn mode_list(modes: &[DeviceMode]) -> String {
    modes
        .iter()
        .map(|mode| mode.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Owns the session and every tool; all user actions enter here.
pub struct Console {
    store: Arc<SessionStore>,
    monitor: HardwareMonitor,
    probe: SessionProbe,
    adb: AdbClient,
    fastboot: FastbootClient,
    recovery: DownloadModeRecovery,
    log: ConsoleLog,
}

impl Console {
    pub fn new(config: &ConsoleConfig) -> Self {
        let runner: Arc<dyn ToolRunner> = Arc::new(CommandExecutor::new(&config.tools));
        Self::with_parts(
            config,
            runner,
            DownloadModeRecovery::new(config.recovery.clone()),
        )
    }

    pub fn with_parts(
        config: &ConsoleConfig,
        runner: Arc<dyn ToolRunner>,
        recovery: DownloadModeRecovery,
    ) -> Self {
        let store = Arc::new(SessionStore::new(
            config.monitor.detach_requires_tracked_device,
        ));
        Self {
            monitor: HardwareMonitor::new(Arc::clone(&store)),
            store,
            probe: SessionProbe::new(Arc::clone(&runner)),
            adb: AdbClient::new(
                Arc::clone(&runner),
                Duration::from_millis(config.tools.restart_pause_ms),
            ),
            fastboot: FastbootClient::new(runner),
            recovery,
            log: ConsoleLog::new(config.logging.console_max_lines),
        }
    }

    pub fn session(&self) -> DeviceSession {
        self.store.snapshot()
    }

    pub fn store(&self) -> Arc<SessionStore> {
        Arc::clone(&self.store)
    }

    pub fn monitor(&self) -> &HardwareMonitor {
        &self.monitor
    }

    pub fn log(&self) -> &ConsoleLog {
        &self.log
    }

    pub fn start_monitoring(&self, source: &dyn HotplugSource) -> bool {
        let started = self.monitor.start(source);
        if !started {
            self.log
                .push("Hardware monitoring unavailable; attach events will not be tracked.");
        }
        started
    }

    /// Logs a monitor event; an attach that leaves the session in ADB mode is probed.
    pub fn handle_event(&self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Attached(outcome) => {
                self.log.push(format!(
                    "[CONNECTED] {} [{}]",
                    outcome.name, outcome.session.mode
                ));
                if outcome.session.mode == DeviceMode::Adb {
                    self.report_bridge_state();
                }
            }
            DeviceEvent::Detached { .. } => {
                self.log.push("[OFFLINE] Device disconnected.");
            }
        }
    }

    fn report_bridge_state(&self) -> ConnectionState {
        let state = self.probe.query_connection_state();
        match state {
            ConnectionState::Online => self.log.push("Debug bridge ready and authorized."),
            ConnectionState::Unauthorized => self.log.push(
                "WARNING: Debug bridge not authorized. Accept the RSA prompt on the device. \
                 (ERR_AUTH_PENDING)",
            ),
            other => self.log.push(format!("Debug bridge state: {other:?}")),
        }
        state
    }

    /// Debug-bridge state and device listing; a session in FASTBOOT also gets a
    /// flashing-tool listing.
    pub fn probe_connection(&self) -> ConnectionState {
        if self.store.snapshot().mode == DeviceMode::Fastboot {
            let bootloader = self.fastboot.device_state();
            self.log.push(format!("Bootloader state: {bootloader:?}"));
        }
        let state = self.report_bridge_state();
        for device in self.probe.list_devices() {
            self.log.push(format!(
                "  {} {}{}",
                device.serial,
                device.state,
                device
                    .model
                    .map(|model| format!(" ({model})"))
                    .unwrap_or_default()
            ));
        }
        state
    }

    fn require_mode(&self, allowed: &[DeviceMode]) -> Option<DeviceSession> {
        let session = self.store.snapshot();
        if !session.connected {
            self.log
                .push("ERROR: No device detected. Connect a USB cable.");
            return None;
        }
        if !allowed.contains(&session.mode) {
            self.log.push(format!(
                "ERROR: This action requires {} mode. Current mode: {}.",
                mode_list(allowed),
                session.mode
            ));
            return None;
        }
        Some(session)
    }

    pub fn read_info(&self) -> bool {
        let Some(session) = self.require_mode(&[DeviceMode::Adb, DeviceMode::Fastboot]) else {
            return false;
        };
        if session.mode == DeviceMode::Fastboot {
            self.log.push("Reading bootloader information...");
            let info = self.fastboot.read_info();
            self.log.push(format!(
                "Product: {} | Unlocked: {}",
                info.product.as_deref().unwrap_or("unknown"),
                info.unlocked.as_deref().unwrap_or("unknown")
            ));
            return info.product.is_some();
        }

        self.log.push("Reading device information...");
        match self.adb.read_identity() {
            Ok(identity) => {
                self.log.push(format!("Model: {}", identity.model));
                self.log.push(format!(
                    "Serial: {}",
                    identity.serial.as_deref().unwrap_or("unknown")
                ));
                true
            }
            Err(result) => {
                self.log.push(format!("ERROR: {}", failure_text(&result)));
                false
            }
        }
    }

    pub fn reboot(&self) -> bool {
        let Some(session) = self.require_mode(&[
            DeviceMode::Adb,
            DeviceMode::Download,
            DeviceMode::Fastboot,
        ]) else {
            return false;
        };
        if session.mode == DeviceMode::Fastboot {
            self.log.push("Rebooting from bootloader...");
            return self.report(self.fastboot.reboot(), "Device is rebooting.");
        }
        if session.mode == DeviceMode::Download {
            self.log
                .push("Requesting download-mode exit over the modem port...");
            if self.recovery.force_exit_download_mode() {
                self.log.push("Download-mode exit command sent.");
                return true;
            }
            self.log
                .push("FAILED: Could not reach the modem port.");
            self.log
                .push("Manual exit: hold Volume Down + Power for 10 seconds.");
            return false;
        }

        self.log.push("Rebooting...");
        self.report(self.adb.reboot(RebootTarget::System), "Device is rebooting.")
    }

    pub fn reboot_recovery(&self) -> bool {
        if self.require_mode(&[DeviceMode::Adb]).is_none() {
            return false;
        }
        self.log.push("Rebooting into recovery...");
        self.report(
            self.adb.reboot(RebootTarget::Recovery),
            "Device is entering recovery.",
        )
    }

    /// ADB: reboot to the bootloader. FASTBOOT: request a bootloader unlock.
    pub fn bootloader(&self) -> bool {
        let Some(session) = self.require_mode(&[DeviceMode::Adb, DeviceMode::Fastboot]) else {
            return false;
        };
        if session.mode == DeviceMode::Adb {
            self.log.push("Rebooting into bootloader...");
            return self.report(
                self.adb.reboot(RebootTarget::Bootloader),
                "Device is entering the bootloader.",
            );
        }
        self.log
            .push("Requesting bootloader unlock (confirm on the device)...");
        self.report(self.fastboot.unlock_bootloader(), "Unlock request accepted.")
    }

    pub fn factory_reset(&self) -> bool {
        let Some(session) = self.require_mode(&[DeviceMode::Adb, DeviceMode::Fastboot]) else {
            return false;
        };
        self.log.push("Factory reset (wipe data)...");
        if session.mode == DeviceMode::Fastboot {
            let (userdata, cache) = self.fastboot.wipe_data();
            let userdata_ok = self.report(userdata, "userdata erased.");
            let cache_ok = self.report(cache, "cache erased.");
            return userdata_ok && cache_ok;
        }
        self.report(
            self.adb.wipe_data(),
            "Wipe command sent. Check the device.",
        )
    }

    pub fn restart_bridge(&self) -> bool {
        self.log.push("Restarting debug bridge service...");
        self.report(self.adb.restart_server(), "Debug bridge service restarted.")
    }

    pub fn launch_intent(&self, action: &str, uri: Option<&str>) -> bool {
        if self.require_mode(&[DeviceMode::Adb]).is_none() {
            return false;
        }
        match self.adb.start_activity(action, uri) {
            Ok(result) => self.report(result, "Intent sent."),
            Err(err) => {
                self.log.push(format!("ERROR: {}", err.error));
                false
            }
        }
    }

    pub fn list_ports(&self) -> Vec<PortDescriptor> {
        let ports = self.recovery.list_ports();
        if ports.is_empty() {
            self.log.push("No serial ports found.");
        }
        for port in &ports {
            self.log.push(format!("  {} {}", port.port_name, port.label));
        }
        ports
    }

    fn report(&self, result: CommandResult, success_message: &str) -> bool {
        if result.success {
            self.log.push(format!("OK: {success_message}"));
        } else {
            self.log.push(format!("FAILED: {}", failure_text(&result)));
        }
        result.success
    }
}

#[cfg(test)]
mod tests;
