//! Scripted stand-in for the command executor.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::app::models::{CommandResult, FailureKind, ToolKind};
use crate::app::tools::classify::classify;
use crate::app::tools::executor::{ExecOptions, ToolRunner};
use crate::app::tools::runner::CommandOutput;

/// Replies with queued results in order and records every invocation.
/// An exhausted queue answers with a process-start failure.
#[derive(Default)]
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<CommandResult>>,
    calls: Mutex<Vec<(ToolKind, String)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, stdout: &str, stderr: &str, exit_code: i32) -> Self {
        let result = classify(CommandOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(exit_code),
        });
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<(ToolKind, String)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_args(&self) -> Vec<String> {
        self.calls().into_iter().map(|(_, args)| args).collect()
    }
}

impl ToolRunner for ScriptedRunner {
    fn execute_with(
        &self,
        kind: ToolKind,
        arguments: &str,
        _options: &ExecOptions,
    ) -> CommandResult {
        self.calls
            .lock()
            .expect("calls lock")
            .push((kind, arguments.to_string()));
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| CommandResult::failed(FailureKind::ProcessStart, "no scripted reply"))
    }
}
