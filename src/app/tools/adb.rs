use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::error::AppError;
use crate::app::models::{CommandResult, ToolKind};
use crate::app::tools::executor::ToolRunner;
use crate::app::tools::parse::parse_single_prop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootTarget {
    System,
    Recovery,
    Bootloader,
}

impl RebootTarget {
    fn arguments(self) -> &'static str {
        match self {
            RebootTarget::System => "reboot",
            RebootTarget::Recovery => "reboot recovery",
            RebootTarget::Bootloader => "reboot bootloader",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub model: String,
    pub serial: Option<String>,
}

/// Debug-bridge operations. Every call goes through the shared [`ToolRunner`].
pub struct AdbClient {
    runner: Arc<dyn ToolRunner>,
    restart_pause: Duration,
}

impl AdbClient {
    pub fn new(runner: Arc<dyn ToolRunner>, restart_pause: Duration) -> Self {
        Self {
            runner,
            restart_pause,
        }
    }

    pub fn run(&self, arguments: &str) -> CommandResult {
        self.runner.execute(ToolKind::Adb, arguments)
    }

    pub fn reboot(&self, target: RebootTarget) -> CommandResult {
        self.run(target.arguments())
    }

    pub fn getprop(&self, key: &str) -> CommandResult {
        self.run(&format!("shell getprop {key}"))
    }

    /// Model is required; a missing serial is tolerated.
    pub fn read_identity(&self) -> Result<DeviceIdentity, CommandResult> {
        let model = self.getprop("ro.product.model");
        if !model.success {
            return Err(model);
        }
        let serial = self.getprop("ro.serialno");
        let serial = if serial.success {
            parse_single_prop(&serial.stdout)
        } else {
            None
        };
        Ok(DeviceIdentity {
            model: parse_single_prop(&model.stdout).unwrap_or_default(),
            serial,
        })
    }

    pub fn start_activity(
        &self,
        action: &str,
        uri: Option<&str>,
    ) -> Result<CommandResult, AppError> {
        let action = action.trim();
        if action.is_empty() || action.contains(char::is_whitespace) || action.contains('"') {
            return Err(AppError::validation(
                "intent action must be a single token",
                "",
            ));
        }
        let mut arguments = format!("shell am start -a {action}");
        if let Some(uri) = uri.map(str::trim).filter(|value| !value.is_empty()) {
            if uri.contains('"') {
                return Err(AppError::validation("intent uri must not contain quotes", ""));
            }
            arguments.push_str(&format!(" -d \"{uri}\""));
        }
        Ok(self.run(&arguments))
    }

    pub fn kill_server(&self) -> CommandResult {
        self.run("kill-server")
    }

    pub fn start_server(&self) -> CommandResult {
        self.run("start-server")
    }

    /// kill-server, fixed pause, start-server. Only the start result is returned.
    pub fn restart_server(&self) -> CommandResult {
        let killed = self.kill_server();
        if !killed.success {
            warn!(stderr = %killed.stderr.trim(), "kill-server reported failure; starting anyway");
        }
        std::thread::sleep(self.restart_pause);
        let started = self.start_server();
        info!(success = started.success, "debug bridge service restarted");
        started
    }

    /// Recovery-command wipe, falling back to the legacy shell verb.
    pub fn wipe_data(&self) -> CommandResult {
        let primary = self.run("shell recovery --wipe_data");
        if primary.success {
            return primary;
        }
        self.run("shell wipe data")
    }
}
