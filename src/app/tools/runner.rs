use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::app::error::AppError;

// Extra time granted to the pipe readers once the deadline is reached or the group is killed.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Shared flag checked while a child runs; setting it kills the child.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct RunSpec<'a> {
    pub program: &'a Path,
    pub args: &'a [String],
    pub working_dir: Option<&'a Path>,
    pub timeout: Duration,
    pub cancel: Option<&'a CancelToken>,
}

/// Reader thread for one pipe. Bytes land in a shared buffer so a partial read can be
/// collected even when a leftover grandchild keeps the pipe open.
struct Drain {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

impl Drain {
    fn spawn<R: Read + Send + 'static>(reader: R) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
        let sink = Arc::clone(&buffer);
        let (tx, done) = mpsc::channel();
        std::thread::spawn(move || {
            let mut reader = reader;
            let mut temp = [0u8; 4096];
            loop {
                match reader.read(&mut temp) {
                    Ok(0) | Err(_) => break,
                    Ok(count) => sink
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .extend_from_slice(&temp[..count]),
                }
            }
            let _ = tx.send(());
        });
        Self { buffer, done }
    }

    /// Waits for end-of-stream until `deadline`. Returns the text read so far and whether
    /// the stream actually ended.
    fn collect(self, deadline: Instant) -> (String, bool) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let ended = !matches!(
            self.done.recv_timeout(remaining),
            Err(RecvTimeoutError::Timeout)
        );
        let bytes = std::mem::take(
            &mut *self
                .buffer
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        (String::from_utf8_lossy(&bytes).to_string(), ended)
    }
}

/// The child leads its own process group on unix, so this also reaches anything it forked.
fn kill_group(child: &Child) {
    #[cfg(unix)]
    if let Ok(pgid) = i32::try_from(child.id()) {
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = child;
}

fn kill_tree(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

pub fn run_command(spec: RunSpec<'_>, trace_id: &str) -> Result<CommandOutput, AppError> {
    let mut command = Command::new(spec.program);
    command
        .args(spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = spec.working_dir {
        command.current_dir(dir);
    }
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut command, 0);

    let mut child = command.spawn().map_err(|err| {
        let message = format!(
            "Failed to start {}: {err} (is the tool installed?)",
            spec.program.display()
        );
        if err.kind() == std::io::ErrorKind::NotFound {
            AppError::tool_not_found(message, trace_id)
        } else {
            AppError::process_start(message, trace_id)
        }
    })?;

    // Drain stdout/stderr in parallel; otherwise, a chatty child process can block once the pipe
    // buffer fills, and we will incorrectly hit the timeout.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;
    let stdout_drain = Drain::spawn(stdout);
    let stderr_drain = Drain::spawn(stderr);

    let start = Instant::now();
    let deadline = start + spec.timeout;
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                let cancelled = spec.cancel.is_some_and(CancelToken::is_cancelled);
                let timed_out = Instant::now() >= deadline;
                if cancelled || timed_out {
                    kill_tree(&mut child);
                    let grace = Instant::now() + DRAIN_GRACE;
                    let _ = stdout_drain.collect(grace);
                    let _ = stderr_drain.collect(grace);
                    if cancelled {
                        return Err(AppError::cancelled("Command cancelled", trace_id));
                    }
                    return Err(AppError::timeout(
                        format!("Command timed out after {}s", spec.timeout.as_secs_f32()),
                        trace_id,
                    ));
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(err) => {
                kill_tree(&mut child);
                return Err(AppError::system(
                    format!("Failed to poll command: {err}"),
                    trace_id,
                ));
            }
        }
    };

    // A process forked by the tool may still hold the pipes; it gets the rest of the
    // deadline and is then killed along with the group.
    let drain_deadline = deadline.max(Instant::now() + DRAIN_GRACE);
    let (stdout, stdout_ended) = stdout_drain.collect(drain_deadline);
    let (stderr, stderr_ended) = stderr_drain.collect(drain_deadline);
    if !(stdout_ended && stderr_ended) {
        warn!(
            trace_id = %trace_id,
            program = %spec.program.display(),
            "tool exited but left processes holding its output; killing its process group"
        );
        kill_group(&child);
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code,
    })
}
