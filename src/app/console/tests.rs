use super::*;
use crate::app::config::ConsoleConfig;
use crate::app::error::AppError;
use crate::app::models::{AttachOutcome, ToolKind};
use crate::app::recovery::{PortOpener, EXIT_SEQUENCE};
use crate::app::tools::test_utils::ScriptedRunner;
use std::io::{self, Write};

struct SinkOpener {
    written: Arc<Mutex<Vec<u8>>>,
}

struct SinkWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("written").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl PortOpener for SinkOpener {
    fn open(
        &self,
        _port_name: &str,
        _baud_rate: u32,
        _timeout: Duration,
    ) -> Result<Box<dyn Write + Send>, AppError> {
        Ok(Box::new(SinkWriter(Arc::clone(&self.written))))
    }
}

fn test_config() -> ConsoleConfig {
    let mut config = ConsoleConfig::default();
    config.tools.restart_pause_ms = 0;
    config.recovery.inter_write_delay_ms = 0;
    config
}

fn recovery_with_modem(written: &Arc<Mutex<Vec<u8>>>) -> DownloadModeRecovery {
    DownloadModeRecovery::with_parts(
        test_config().recovery,
        Box::new(|| {
            vec![PortDescriptor {
                port_name: "/dev/ttyACM0".to_string(),
                label: "SAMSUNG Mobile USB Modem".to_string(),
            }]
        }),
        Box::new(SinkOpener {
            written: Arc::clone(written),
        }),
    )
}

fn recovery_without_ports() -> DownloadModeRecovery {
    DownloadModeRecovery::with_parts(
        test_config().recovery,
        Box::new(Vec::<PortDescriptor>::new),
        Box::new(SinkOpener {
            written: Arc::new(Mutex::new(Vec::new())),
        }),
    )
}

fn console(runner: &Arc<ScriptedRunner>) -> Console {
    Console::with_parts(&test_config(), runner.clone(), recovery_without_ports())
}

fn attach(console: &Console, name: &str) -> AttachOutcome {
    console
        .store()
        .attach(None, name, "")
        .expect("accepted attach")
}

fn logged(console: &Console, needle: &str) -> bool {
    console
        .log()
        .messages()
        .iter()
        .any(|message| message.contains(needle))
}

#[test]
fn actions_refuse_without_a_device() {
    let runner = Arc::new(ScriptedRunner::new());
    let console = console(&runner);

    assert!(!console.reboot());
    assert!(!console.read_info());
    assert!(!console.factory_reset());
    assert!(runner.calls().is_empty());
    assert!(logged(&console, "No device detected"));
}

#[test]
fn actions_refuse_the_wrong_mode_and_name_it() {
    let runner = Arc::new(ScriptedRunner::new());
    let console = console(&runner);
    attach(&console, "SAMSUNG Mobile USB Modem");

    assert!(!console.read_info());
    assert!(!console.reboot_recovery());
    assert!(runner.calls().is_empty());
    assert!(logged(
        &console,
        "requires ADB or FASTBOOT mode. Current mode: DOWNLOAD."
    ));
    assert!(logged(&console, "requires ADB mode. Current mode: DOWNLOAD."));
}

#[test]
fn fastboot_reboot_uses_the_flashing_tool() {
    let runner = Arc::new(ScriptedRunner::new().reply("", "Rebooting\nFinished.", 0));
    let console = console(&runner);
    attach(&console, "Android Bootloader FASTBOOT");

    assert!(console.reboot());
    assert_eq!(
        runner.calls(),
        vec![(ToolKind::Fastboot, "reboot".to_string())]
    );
    assert!(logged(&console, "OK: Device is rebooting."));
}

#[test]
fn adb_reboot_runs_the_bridge() {
    let runner = Arc::new(ScriptedRunner::new().reply("", "", 0));
    let console = console(&runner);
    attach(&console, "SAMSUNG Android ADB Interface");

    assert!(console.reboot());
    assert_eq!(runner.calls(), vec![(ToolKind::Adb, "reboot".to_string())]);
    assert!(logged(&console, "OK: Device is rebooting."));
}

#[test]
fn download_reboot_goes_over_the_modem_port() {
    let written = Arc::new(Mutex::new(Vec::new()));
    let runner = Arc::new(ScriptedRunner::new());
    let console = Console::with_parts(&test_config(), runner.clone(), recovery_with_modem(&written));
    attach(&console, "SAMSUNG Mobile USB Modem");

    assert!(console.reboot());
    assert!(runner.calls().is_empty());
    assert!(written.lock().expect("written").starts_with(&EXIT_SEQUENCE));
}

#[test]
fn download_reboot_without_port_suggests_manual_exit() {
    let runner = Arc::new(ScriptedRunner::new());
    let console = console(&runner);
    attach(&console, "SAMSUNG Mobile USB Modem");

    assert!(!console.reboot());
    assert!(logged(&console, "Volume Down + Power"));
}

#[test]
fn adb_attach_event_reports_pending_authorization() {
    let runner = Arc::new(ScriptedRunner::new().reply(
        "List of devices attached\nR58M12345\tunauthorized\n",
        "",
        0,
    ));
    let console = console(&runner);
    let outcome = attach(&console, "SAMSUNG Android ADB Interface");

    console.handle_event(&DeviceEvent::Attached(outcome));
    assert!(logged(&console, "[CONNECTED] SAMSUNG Android ADB Interface [ADB]"));
    assert!(logged(&console, "ERR_AUTH_PENDING"));
    assert_eq!(runner.call_args(), vec!["devices".to_string()]);
}

#[test]
fn non_adb_attach_is_not_probed() {
    let runner = Arc::new(ScriptedRunner::new());
    let console = console(&runner);
    let outcome = attach(&console, "SAMSUNG Mobile USB Modem");

    console.handle_event(&DeviceEvent::Attached(outcome));
    assert!(runner.calls().is_empty());
    assert!(logged(&console, "[DOWNLOAD]"));
}

#[test]
fn detach_event_logs_offline() {
    let runner = Arc::new(ScriptedRunner::new());
    let console = console(&runner);
    console.handle_event(&DeviceEvent::Detached {
        session: DeviceSession::default(),
    });
    assert!(logged(&console, "[OFFLINE]"));
}

#[test]
fn read_info_logs_model_and_serial() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .reply("SM-G991B\n", "", 0)
            .reply("R58M12345\n", "", 0),
    );
    let console = console(&runner);
    attach(&console, "Android ADB Interface");

    assert!(console.read_info());
    assert!(logged(&console, "Model: SM-G991B"));
    assert!(logged(&console, "Serial: R58M12345"));
}

#[test]
fn read_info_failure_carries_failure_code() {
    let runner = Arc::new(ScriptedRunner::new().reply("", "error: device offline", 1));
    let console = console(&runner);
    attach(&console, "Android ADB Interface");

    assert!(!console.read_info());
    assert!(logged(&console, "ERR_NON_ZERO_EXIT"));
}

#[test]
fn fastboot_factory_reset_erases_both_partitions() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .reply("", "Erasing 'userdata' OKAY\nFinished.", 0)
            .reply("", "Erasing 'cache' OKAY\nFinished.", 0),
    );
    let console = console(&runner);
    attach(&console, "Android FASTBOOT");

    assert!(console.factory_reset());
    assert_eq!(
        runner.calls(),
        vec![
            (ToolKind::Fastboot, "erase userdata".to_string()),
            (ToolKind::Fastboot, "erase cache".to_string()),
        ]
    );
}

#[test]
fn restart_bridge_needs_no_device() {
    let runner = Arc::new(ScriptedRunner::new().reply("", "", 0).reply(
        "* daemon started successfully\n",
        "",
        0,
    ));
    let console = console(&runner);

    assert!(console.restart_bridge());
    assert_eq!(
        runner.call_args(),
        vec!["kill-server".to_string(), "start-server".to_string()]
    );
}

#[test]
fn invalid_intent_action_is_rejected_before_running() {
    let runner = Arc::new(ScriptedRunner::new());
    let console = console(&runner);
    attach(&console, "Android ADB Interface");

    assert!(!console.launch_intent("two words", None));
    assert!(runner.calls().is_empty());
    assert!(logged(&console, "single token"));
}

#[test]
fn intent_with_uri_is_quoted() {
    let runner = Arc::new(ScriptedRunner::new().reply("Starting: Intent", "", 0));
    let console = console(&runner);
    attach(&console, "Android ADB Interface");

    assert!(console.launch_intent(
        "android.intent.action.VIEW",
        Some("https://example.com/a b")
    ));
    assert_eq!(
        runner.call_args(),
        vec!["shell am start -a android.intent.action.VIEW -d \"https://example.com/a b\"".to_string()]
    );
}

#[test]
fn console_log_is_bounded() {
    let log = ConsoleLog::new(3);
    for index in 0..5 {
        log.push(format!("line {index}"));
    }
    assert_eq!(log.messages(), vec!["line 2", "line 3", "line 4"]);
    assert_eq!(log.entries()[0].timestamp.len(), "00:00:00".len());
    log.clear();
    assert!(log.entries().is_empty());
}

#[test]
fn probe_in_fastboot_lists_bootloader_state() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .reply("R58M12345\tfastboot\n", "", 0)
            .reply("List of devices attached\n", "", 0)
            .reply("List of devices attached\n", "", 0),
    );
    let console = console(&runner);
    attach(&console, "Android FASTBOOT");

    assert_eq!(console.probe_connection(), ConnectionState::NotFound);
    assert_eq!(runner.calls()[0], (ToolKind::Fastboot, "devices".to_string()));
    assert!(logged(&console, "Bootloader state: Fastboot"));
}
