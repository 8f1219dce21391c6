use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use anyhow::Context as _;

use crate::foundation::error::{PhotonError, PhotonResult};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to wait for captured output after killing a process. Descendants of the killed
/// process can keep its pipes open indefinitely.
const KILLED_DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Shared flag that asks in-flight and pending external work to stop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How an external process ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitState {
    /// Exited on its own. `None` when terminated by a signal.
    Exited(Option<i32>),
    /// Killed after exceeding the configured timeout.
    TimedOut,
    /// Killed because the [`CancelToken`] fired.
    Cancelled,
}

/// Exit state plus captured stdout/stderr of one external invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutput {
    pub state: ExitState,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn exited(code: i32) -> Self {
        Self {
            state: ExitState::Exited(Some(code)),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn success(&self) -> bool {
        self.state == ExitState::Exited(Some(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self.state {
            ExitState::Exited(code) => code,
            ExitState::TimedOut | ExitState::Cancelled => None,
        }
    }

    /// Turn a non-successful exit into a [`PhotonError::Assembly`] naming `what`.
    pub fn ensure_success(&self, what: &str) -> PhotonResult<()> {
        match &self.state {
            ExitState::Exited(Some(0)) => Ok(()),
            ExitState::Exited(code) => Err(PhotonError::assembly(format!(
                "{what} exited with status {}: {}",
                code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                self.stderr.trim()
            ))),
            ExitState::TimedOut => Err(PhotonError::assembly(format!("{what} timed out"))),
            ExitState::Cancelled => Err(PhotonError::assembly(format!("{what} was cancelled"))),
        }
    }
}

/// Limits applied while waiting on an external process.
#[derive(Clone, Debug, Default)]
pub struct WaitLimits {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

/// Spawn `cmd`, capture its output and wait for it within `limits`.
///
/// Returns `Err` only when the process cannot be launched; every way it can end after launch is
/// reported through [`CommandOutput::state`].
pub fn run_command(cmd: &mut Command, limits: &WaitLimits) -> PhotonResult<CommandOutput> {
    let line = describe(cmd);
    tracing::debug!(command = %line, "spawning");

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn '{line}'"))?;

    let stdout_drain = drain(child.stdout.take());
    let stderr_drain = drain(child.stderr.take());

    let state = wait_within(&mut child, limits)
        .with_context(|| format!("failed to wait for '{line}'"))?;

    let killed = matches!(state, ExitState::TimedOut | ExitState::Cancelled);
    Ok(CommandOutput {
        stdout: collect_drain(stdout_drain, killed)?,
        stderr: collect_drain(stderr_drain, killed)?,
        state,
    })
}

fn wait_within(child: &mut Child, limits: &WaitLimits) -> std::io::Result<ExitState> {
    if limits.timeout.is_none() && limits.cancel.is_none() {
        return child.wait().map(|s| ExitState::Exited(s.code()));
    }

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(ExitState::Exited(status.code()));
        }
        if let Some(cancel) = &limits.cancel
            && cancel.is_cancelled()
        {
            kill_and_reap(child)?;
            return Ok(ExitState::Cancelled);
        }
        if let Some(timeout) = limits.timeout
            && started.elapsed() >= timeout
        {
            kill_and_reap(child)?;
            return Ok(ExitState::TimedOut);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn kill_and_reap(child: &mut Child) -> std::io::Result<()> {
    // The child may exit between try_wait and kill; that race is harmless.
    let _ = child.kill();
    child.wait().map(|_| ())
}

type Drain = Option<Receiver<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let res = pipe.read_to_end(&mut bytes).map(|_| bytes);
            // The receiver is gone when the caller stopped waiting after a kill.
            let _ = tx.send(res);
        });
        rx
    })
}

/// Output read by a drain thread. After a kill the thread is abandoned if the pipe is still open
/// once the grace period ends, and the output is reported as empty.
fn collect_drain(rx: Drain, killed: bool) -> PhotonResult<String> {
    let Some(rx) = rx else {
        return Ok(String::new());
    };
    let res = if killed {
        match rx.recv_timeout(KILLED_DRAIN_GRACE) {
            Ok(res) => res,
            Err(_) => return Ok(String::new()),
        }
    } else {
        rx.recv()
            .map_err(|_| PhotonError::Other(anyhow::anyhow!("output drain thread panicked")))?
    };
    let bytes = res.context("failed to read process output")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Render a command line for logs and error messages.
pub fn describe(cmd: &Command) -> String {
    let mut s = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        s.push(' ');
        s.push_str(&arg.to_string_lossy());
    }
    s
}

/// Return `true` when `program` can be invoked from `PATH`.
pub fn is_on_path(program: &str, version_arg: &str) -> bool {
    Command::new(program)
        .arg(version_arg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> PhotonResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
