use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::config::ToolSettings;
use crate::app::error::AppError;
use crate::app::models::{CommandResult, FailureKind, ToolKind};
use crate::app::tools::classify::classify;
use crate::app::tools::locator::{resolve_tool, split_arguments, ResolvedTool};
use crate::app::tools::runner::{run_command, CancelToken, RunSpec};

#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

/// Seam between the tool clients and process spawning.
pub trait ToolRunner: Send + Sync {
    fn execute_with(&self, kind: ToolKind, arguments: &str, options: &ExecOptions)
        -> CommandResult;

    fn execute(&self, kind: ToolKind, arguments: &str) -> CommandResult {
        self.execute_with(kind, arguments, &ExecOptions::default())
    }
}

#[derive(Debug, Clone)]
pub struct CommandExecutor {
    install_dir: PathBuf,
    adb_binary: String,
    fastboot_binary: String,
    default_timeout: Duration,
}

impl CommandExecutor {
    pub fn new(settings: &ToolSettings) -> Self {
        Self {
            install_dir: settings.resolved_install_dir(),
            adb_binary: settings.adb_binary.clone(),
            fastboot_binary: settings.fastboot_binary.clone(),
            default_timeout: settings.command_timeout(),
        }
    }

    fn binary_for(&self, kind: ToolKind) -> &str {
        match kind {
            ToolKind::Adb => &self.adb_binary,
            ToolKind::Fastboot => &self.fastboot_binary,
        }
    }

    pub fn resolve(&self, kind: ToolKind) -> ResolvedTool {
        resolve_tool(&self.install_dir, kind, self.binary_for(kind))
    }
}

fn failure_kind_for(err: &AppError) -> FailureKind {
    match err.code.as_str() {
        "ERR_TIMEOUT" => FailureKind::Timeout,
        "ERR_CANCELLED" => FailureKind::Cancelled,
        _ => FailureKind::ProcessStart,
    }
}

impl ToolRunner for CommandExecutor {
    fn execute_with(
        &self,
        kind: ToolKind,
        arguments: &str,
        options: &ExecOptions,
    ) -> CommandResult {
        let trace_id = Uuid::new_v4().to_string();
        let resolved = self.resolve(kind);
        if let ResolvedTool::Bare(name) = &resolved {
            debug!(
                trace_id = %trace_id,
                tool = ?kind,
                binary = %name,
                install_dir = %self.install_dir.display(),
                "tool not found under install dir; using search path"
            );
        }

        let args = split_arguments(arguments);
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let spec = RunSpec {
            program: resolved.program(),
            args: &args,
            working_dir: resolved.working_dir(),
            timeout,
            cancel: options.cancel.as_ref(),
        };

        match run_command(spec, &trace_id) {
            Ok(output) => {
                let result = classify(output);
                if result.success {
                    info!(
                        trace_id = %trace_id,
                        tool = ?kind,
                        arguments = %arguments,
                        "tool command succeeded"
                    );
                } else {
                    warn!(
                        trace_id = %trace_id,
                        tool = ?kind,
                        arguments = %arguments,
                        exit_code = result.exit_code,
                        failure = ?result.failure,
                        "tool command failed"
                    );
                }
                result
            }
            Err(err) => {
                warn!(
                    trace_id = %trace_id,
                    tool = ?kind,
                    arguments = %arguments,
                    error = %err,
                    "tool command did not complete"
                );
                CommandResult::failed(failure_kind_for(&err), err.error)
            }
        }
    }
}
