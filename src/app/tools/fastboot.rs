use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::app::models::{CommandResult, ToolKind};
use crate::app::tools::executor::ToolRunner;
use crate::app::tools::parse::parse_getvar_value;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BootloaderState {
    Fastboot,
    Unknown,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BootloaderInfo {
    pub product: Option<String>,
    pub unlocked: Option<String>,
}

/// Flashing-tool operations against a device sitting in its bootloader.
pub struct FastbootClient {
    runner: Arc<dyn ToolRunner>,
}

impl FastbootClient {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }

    pub fn run(&self, arguments: &str) -> CommandResult {
        self.runner.execute(ToolKind::Fastboot, arguments)
    }

    pub fn device_state(&self) -> BootloaderState {
        let result = self.run("devices");
        if result.combined_output().contains("fastboot") {
            BootloaderState::Fastboot
        } else {
            BootloaderState::Unknown
        }
    }

    pub fn getvar(&self, key: &str) -> (CommandResult, Option<String>) {
        let result = self.run(&format!("getvar {key}"));
        let value = parse_getvar_value(&result.combined_output(), key);
        (result, value)
    }

    pub fn read_info(&self) -> BootloaderInfo {
        let (_, product) = self.getvar("product");
        let (_, unlocked) = self.getvar("unlocked");
        BootloaderInfo { product, unlocked }
    }

    /// `flashing unlock`; older bootloaders only know `oem unlock`.
    pub fn unlock_bootloader(&self) -> CommandResult {
        let modern = self.run("flashing unlock");
        let rejected = !modern.success || modern.combined_output().to_lowercase().contains("unknown");
        if !rejected {
            return modern;
        }
        info!("flashing unlock rejected; retrying with oem unlock");
        self.run("oem unlock")
    }

    pub fn reboot(&self) -> CommandResult {
        self.run("reboot")
    }

    /// Erases userdata then cache; both results are returned.
    pub fn wipe_data(&self) -> (CommandResult, CommandResult) {
        let userdata = self.run("erase userdata");
        let cache = self.run("erase cache");
        (userdata, cache)
    }
}
