use std::sync::Arc;

use tracing::debug;

use crate::app::models::{AttachedDevice, ConnectionState, ToolKind};
use crate::app::tools::executor::ToolRunner;
use crate::app::tools::parse::{parse_adb_devices, parse_connection_state};

const LIST_DEVICES: &str = "devices";

pub struct SessionProbe {
    runner: Arc<dyn ToolRunner>,
}

impl SessionProbe {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }

    /// A failed listing still has its stdout scanned; an unreachable bridge yields `NotFound`.
    pub fn query_connection_state(&self) -> ConnectionState {
        let result = self.runner.execute(ToolKind::Adb, LIST_DEVICES);
        let state = parse_connection_state(&result.stdout);
        debug!(state = ?state, success = result.success, "probed debug bridge");
        state
    }

    pub fn is_online(&self) -> bool {
        self.query_connection_state() == ConnectionState::Online
    }

    pub fn list_devices(&self) -> Vec<AttachedDevice> {
        let result = self.runner.execute(ToolKind::Adb, "devices -l");
        parse_adb_devices(&result.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tools::test_utils::ScriptedRunner;

    #[test]
    fn online_when_device_line_present() {
        let runner = Arc::new(
            ScriptedRunner::new().reply("List of devices attached\nABC123\tdevice\n", "", 0),
        );
        let probe = SessionProbe::new(runner.clone());
        assert_eq!(probe.query_connection_state(), ConnectionState::Online);
        assert_eq!(runner.calls(), vec![(ToolKind::Adb, "devices".to_string())]);
    }

    #[test]
    fn unauthorized_is_reported_even_though_command_fails_classification() {
        let runner = Arc::new(ScriptedRunner::new().reply(
            "List of devices attached\nABC123\tunauthorized\n",
            "",
            0,
        ));
        let probe = SessionProbe::new(runner);
        assert_eq!(probe.query_connection_state(), ConnectionState::Unauthorized);
    }

    #[test]
    fn unreachable_bridge_is_not_found() {
        let probe = SessionProbe::new(Arc::new(ScriptedRunner::new()));
        assert_eq!(probe.query_connection_state(), ConnectionState::NotFound);
        assert!(!probe.is_online());
    }

    #[test]
    fn is_online_mirrors_state() {
        let runner = Arc::new(ScriptedRunner::new().reply("X\tdevice\n", "", 0));
        assert!(SessionProbe::new(runner).is_online());
    }

    #[test]
    fn lists_devices_with_long_format() {
        let runner = Arc::new(ScriptedRunner::new().reply(
            "List of devices attached\nR58M\tdevice usb:1-1 model:SM_G960F\n",
            "",
            0,
        ));
        let probe = SessionProbe::new(runner.clone());
        let devices = probe.list_devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].model.as_deref(), Some("SM_G960F"));
        assert_eq!(runner.call_args(), vec!["devices -l".to_string()]);
    }
}
