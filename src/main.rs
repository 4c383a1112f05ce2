use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use handset_console_lib::app::config::{
    backup_config_path_for, config_path, load_config, load_config_from_path, save_config,
    save_config_to_path, ConsoleConfig,
};
use handset_console_lib::app::console::Console;
use handset_console_lib::app::error::AppError;
use handset_console_lib::app::hotplug::usb::UsbHotplugSource;
use handset_console_lib::app::logging::init_logging;
use tracing::{error, info};

#[derive(Debug, Clone, Default)]
struct Args {
    config: Option<PathBuf>,
    install_dir: Option<String>,
    no_monitor: bool,
    timeout_secs: Option<u64>,
}

const USAGE: &str = "Usage: handset_console [--config PATH] [--install-dir DIR] [--no-monitor] [--timeout SECS]";

fn parse_args<I: Iterator<Item = String>>(mut it: I) -> Result<Args, String> {
    let mut args = Args::default();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--config requires a value".to_string())?;
                args.config = Some(PathBuf::from(value));
            }
            "--install-dir" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--install-dir requires a value".to_string())?;
                args.install_dir = Some(value);
            }
            "--no-monitor" => {
                args.no_monitor = true;
            }
            "--timeout" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--timeout requires a value".to_string())?;
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| format!("--timeout expects a positive number, got {value}"))?;
                args.timeout_secs = Some(secs);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            other => return Err(format!("Unknown arg: {other}\n{USAGE}")),
        }
    }
    Ok(args)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    State,
    Probe,
    Info,
    Reboot,
    Recovery,
    Bootloader,
    Reset,
    RestartAdb,
    Ports,
    Intent { action: String, uri: Option<String> },
    Log,
    Save,
    Help,
    Quit,
}

const COMMANDS: &str = "state | probe | info | reboot | recovery | bootloader | reset | restart-adb | ports | intent <action> [uri] | log | save | quit";

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let command = match head.to_ascii_lowercase().as_str() {
        "state" => Command::State,
        "probe" => Command::Probe,
        "info" => Command::Info,
        "reboot" => Command::Reboot,
        "recovery" => Command::Recovery,
        "bootloader" => Command::Bootloader,
        "reset" => Command::Reset,
        "restart-adb" => Command::RestartAdb,
        "ports" => Command::Ports,
        "intent" => {
            let action = words
                .next()
                .ok_or_else(|| "intent requires an action".to_string())?
                .to_string();
            let rest = words.collect::<Vec<_>>().join(" ");
            let uri = if rest.is_empty() { None } else { Some(rest) };
            Command::Intent { action, uri }
        }
        "log" => Command::Log,
        "save" => Command::Save,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command: {other}")),
    };
    Ok(Some(command))
}

fn apply_overrides(mut config: ConsoleConfig, args: &Args) -> ConsoleConfig {
    if let Some(dir) = &args.install_dir {
        config.tools.install_dir = dir.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.tools.command_timeout_secs = secs;
    }
    if args.no_monitor {
        config.monitor.enabled = false;
    }
    config
}

/// Writes the effective settings to `--config` when given, else to the default location.
fn persist_config(config: &ConsoleConfig, path: Option<&Path>) -> Result<PathBuf, AppError> {
    match path {
        Some(path) => {
            save_config_to_path(config, path, &backup_config_path_for(path))?;
            Ok(path.to_path_buf())
        }
        None => {
            save_config(config)?;
            Ok(config_path())
        }
    }
}

fn run_command(console: &Console, config: &ConsoleConfig, args: &Args, command: Command) {
    match command {
        Command::State => {
            let session = console.session();
            println!(
                "mode={} type={} connected={}",
                session.mode, session.device_type, session.connected
            );
        }
        Command::Probe => {
            let state = console.probe_connection();
            println!("{state:?}");
        }
        Command::Info => {
            console.read_info();
        }
        Command::Reboot => {
            console.reboot();
        }
        Command::Recovery => {
            console.reboot_recovery();
        }
        Command::Bootloader => {
            console.bootloader();
        }
        Command::Reset => {
            console.factory_reset();
        }
        Command::RestartAdb => {
            console.restart_bridge();
        }
        Command::Ports => {
            for port in console.list_ports() {
                println!("{}\t{}", port.port_name, port.label);
            }
        }
        Command::Intent { action, uri } => {
            console.launch_intent(&action, uri.as_deref());
        }
        Command::Log => {
            for entry in console.log().entries() {
                println!("[{}] {}", entry.timestamp, entry.message);
            }
        }
        Command::Save => match persist_config(config, args.config.as_deref()) {
            Ok(path) => println!("config saved to {}", path.display()),
            Err(err) => eprintln!("{err}"),
        },
        Command::Help => println!("{COMMANDS}"),
        Command::Quit => {}
    }
}

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let loaded = match &args.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };
    let config = match loaded {
        Ok(cfg) => apply_overrides(cfg, &args),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_logging(&config.logging.log_level);

    let console = Arc::new(Console::new(&config));
    if config.monitor.enabled {
        let events = console.monitor().subscribe();
        if console.start_monitoring(&UsbHotplugSource) {
            let worker = Arc::clone(&console);
            let spawned = thread::Builder::new()
                .name("device-events".to_string())
                .spawn(move || {
                    for event in events {
                        worker.handle_event(&event);
                    }
                });
            if let Err(err) = spawned {
                error!(error = %err, "failed to spawn event thread");
            }
        }
    } else {
        info!("hardware monitoring disabled");
    }

    println!("{COMMANDS}");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let Some(Ok(line)) = lines.next() else {
            break;
        };
        match parse_command(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => run_command(&console, &config, &args, command),
            Ok(None) => {}
            Err(msg) => eprintln!("{msg}"),
        }
    }

    console.monitor().stop();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Result<Args, String> {
        parse_args(values.iter().map(|value| value.to_string()))
    }

    #[test]
    fn parses_flags() {
        let parsed = args(&["--install-dir", "/opt/tools", "--no-monitor", "--timeout", "5"])
            .expect("args");
        assert_eq!(parsed.install_dir.as_deref(), Some("/opt/tools"));
        assert!(parsed.no_monitor);
        assert_eq!(parsed.timeout_secs, Some(5));

        let config = apply_overrides(ConsoleConfig::default(), &parsed);
        assert_eq!(config.tools.install_dir, "/opt/tools");
        assert_eq!(config.tools.command_timeout_secs, 5);
        assert!(!config.monitor.enabled);
    }

    #[test]
    fn rejects_bad_flags() {
        assert!(args(&["--timeout", "0"]).is_err());
        assert!(args(&["--timeout"]).is_err());
        assert!(args(&["--verbose"]).is_err());
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(parse_command("REBOOT"), Ok(Some(Command::Reboot)));
        assert_eq!(parse_command("restart-adb"), Ok(Some(Command::RestartAdb)));
        assert_eq!(
            parse_command("intent android.intent.action.VIEW https://example.com"),
            Ok(Some(Command::Intent {
                action: "android.intent.action.VIEW".to_string(),
                uri: Some("https://example.com".to_string()),
            }))
        );
        assert_eq!(parse_command("save"), Ok(Some(Command::Save)));
        assert!(parse_command("intent").is_err());
        assert!(parse_command("flash").is_err());
    }

    #[test]
    fn save_writes_to_the_given_config_path_with_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("console.json");
        let mut config = ConsoleConfig::default();
        config.tools.command_timeout_secs = 12;

        let written = persist_config(&config, Some(&path)).expect("first save");
        assert_eq!(written, path);
        assert!(!backup_config_path_for(&path).exists());

        config.tools.command_timeout_secs = 45;
        persist_config(&config, Some(&path)).expect("second save");
        assert!(backup_config_path_for(&path).exists());
        let reloaded = load_config_from_path(&path).expect("reload");
        assert_eq!(reloaded.tools.command_timeout_secs, 45);
    }
}
