use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::error::PhotonResult;
use crate::foundation::process::{CancelToken, CommandOutput, WaitLimits, run_command};

/// One synchronous renderer invocation per persisted scene file.
///
/// `Err` means the renderer could not be started at all. Everything that happens after launch
/// (non-zero exit, timeout, cancellation) is reported through the returned [`CommandOutput`].
pub trait Renderer {
    fn render(&mut self, scene_path: &Path) -> PhotonResult<CommandOutput>;
}

impl<F> Renderer for F
where
    F: FnMut(&Path) -> PhotonResult<CommandOutput>,
{
    fn render(&mut self, scene_path: &Path) -> PhotonResult<CommandOutput> {
        self(scene_path)
    }
}

/// Runs `program [args..] <scene file name>` from the scene file's directory.
#[derive(Clone, Debug)]
pub struct CommandRenderer {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            cancel: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// A relative program path with a directory part would resolve against the scene directory
    /// once the child's working directory changes, so anchor it to ours.
    fn resolved_program(&self) -> PhotonResult<PathBuf> {
        let has_dir = self.program.components().count() > 1;
        if self.program.is_absolute() || !has_dir {
            return Ok(self.program.clone());
        }
        let cwd = std::env::current_dir().context("failed to read current directory")?;
        Ok(cwd.join(&self.program))
    }
}

impl Renderer for CommandRenderer {
    fn render(&mut self, scene_path: &Path) -> PhotonResult<CommandOutput> {
        let program = self.resolved_program()?;
        let mut cmd = Command::new(program);
        cmd.args(&self.args);

        match (scene_path.parent(), scene_path.file_name()) {
            (Some(dir), Some(name)) if !dir.as_os_str().is_empty() => {
                cmd.current_dir(dir).arg(name);
            }
            _ => {
                cmd.arg(scene_path);
            }
        }

        run_command(
            &mut cmd,
            &WaitLimits {
                timeout: self.timeout,
                cancel: self.cancel.clone(),
            },
        )
    }
}
