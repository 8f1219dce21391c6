use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{PhotonError, PhotonResult};
use crate::foundation::process::{CancelToken, CommandOutput, ExitState};
use crate::render::renderer::Renderer;
use crate::scene::lua::{SerializeMode, Serializer};
use crate::scene::validate::Defect;
use crate::sweep::Frame;

/// Options for [`run`].
#[derive(Clone, Debug)]
pub struct RunOpts {
    /// Directory receiving scene files; the renderer writes its images next to them.
    pub work_dir: PathBuf,
    pub mode: SerializeMode,
    pub scene_ext: String,
    /// Extension of the image the renderer produces for each scene file.
    pub image_ext: String,
    /// Once fired, the in-flight frame finishes as the renderer reports it and the rest are
    /// skipped.
    pub cancel: Option<CancelToken>,
}

impl RunOpts {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            mode: SerializeMode::Strict,
            scene_ext: "lua".to_string(),
            image_ext: "ppm".to_string(),
            cancel: None,
        }
    }

    pub fn scene_path(&self, index: FrameIndex) -> PathBuf {
        self.work_dir
            .join(format!("scene{}.{}", index.0, self.scene_ext))
    }

    pub fn image_path(&self, index: FrameIndex) -> PathBuf {
        self.scene_path(index).with_extension(&self.image_ext)
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Why a frame has no image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderFailure {
    /// Renderer exited non-zero (`None` when killed by a signal).
    Exit { code: Option<i32>, stderr: String },
    /// Renderer exited zero but the expected image is not there.
    MissingImage,
    TimedOut,
    Cancelled,
    /// Renderer could not be started.
    Launch(String),
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderFailure::Exit { code: Some(c), .. } => {
                write!(f, "renderer exited with status {c}")
            }
            RenderFailure::Exit { code: None, .. } => write!(f, "renderer killed by signal"),
            RenderFailure::MissingImage => write!(f, "renderer produced no image"),
            RenderFailure::TimedOut => write!(f, "renderer timed out"),
            RenderFailure::Cancelled => write!(f, "renderer cancelled"),
            RenderFailure::Launch(msg) => write!(f, "renderer failed to start: {msg}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameStatus {
    Rendered,
    Failed(RenderFailure),
    /// Strict mode refused to serialize the scene; the renderer was not invoked.
    Invalid(Vec<Defect>),
    /// Not attempted because the run was cancelled.
    Skipped,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub index: FrameIndex,
    /// `None` when the scene was never written.
    pub scene_path: Option<PathBuf>,
    pub image_path: PathBuf,
    pub status: FrameStatus,
}

/// Per-frame outcomes of one [`run`], in frame order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    pub frames: Vec<FrameReport>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub rendered: usize,
    pub failed: usize,
    pub invalid: usize,
    pub skipped: usize,
}

impl RunSummary {
    /// `true` when every frame rendered.
    pub fn is_clean(&self) -> bool {
        self.rendered == self.total
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frame(s): {} rendered, {} failed, {} invalid, {} skipped",
            self.total, self.rendered, self.failed, self.invalid, self.skipped
        )
    }
}

impl RunReport {
    /// Images of successfully rendered frames, in frame order.
    pub fn rendered_images(&self) -> Vec<PathBuf> {
        self.frames
            .iter()
            .filter(|f| f.status == FrameStatus::Rendered)
            .map(|f| f.image_path.clone())
            .collect()
    }

    /// Frames that were attempted and did not render.
    pub fn failures(&self) -> Vec<&FrameReport> {
        self.frames
            .iter()
            .filter(|f| matches!(f.status, FrameStatus::Failed(_) | FrameStatus::Invalid(_)))
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        let mut s = RunSummary {
            total: self.frames.len(),
            ..RunSummary::default()
        };
        for f in &self.frames {
            match f.status {
                FrameStatus::Rendered => s.rendered += 1,
                FrameStatus::Failed(_) => s.failed += 1,
                FrameStatus::Invalid(_) => s.invalid += 1,
                FrameStatus::Skipped => s.skipped += 1,
            }
        }
        s
    }
}

/// Serialize, persist and render every frame in order.
///
/// Each frame is serialized exactly once and the renderer is invoked at most once per frame. A
/// frame that fails does not stop the run. Only environmental errors (the work directory or a
/// scene file cannot be written) abort it.
#[tracing::instrument(skip_all, fields(work_dir = %opts.work_dir.display()))]
pub fn run<I, R>(frames: I, renderer: &mut R, opts: &RunOpts) -> PhotonResult<RunReport>
where
    I: IntoIterator<Item = Frame>,
    R: Renderer + ?Sized,
{
    std::fs::create_dir_all(&opts.work_dir).with_context(|| {
        format!(
            "failed to create work directory '{}'",
            opts.work_dir.display()
        )
    })?;

    let mut serializer = Serializer::new(opts.mode);
    let mut report = RunReport::default();
    for frame in frames {
        let index = frame.index;
        let image_path = opts.image_path(index);

        if opts.cancelled() {
            report.frames.push(FrameReport {
                index,
                scene_path: None,
                image_path,
                status: FrameStatus::Skipped,
            });
            continue;
        }

        let text = match serializer.serialize(&frame.scene) {
            Ok(text) => text,
            Err(PhotonError::Serialization { defects }) => {
                tracing::warn!(frame = %index, defects = defects.len(), "scene rejected");
                report.frames.push(FrameReport {
                    index,
                    scene_path: None,
                    image_path,
                    status: FrameStatus::Invalid(defects),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        let scene_path = opts.scene_path(index);
        std::fs::write(&scene_path, text)
            .with_context(|| format!("failed to write scene file '{}'", scene_path.display()))?;
        remove_stale(&image_path)?;

        tracing::info!(frame = %index, value = frame.value, "rendering");
        let status = match renderer.render(&scene_path) {
            Ok(out) => classify(&out, &image_path),
            Err(e) => FrameStatus::Failed(RenderFailure::Launch(e.to_string())),
        };
        match &status {
            FrameStatus::Rendered => tracing::info!(frame = %index, "rendered"),
            FrameStatus::Failed(why) => tracing::warn!(frame = %index, "{why}"),
            FrameStatus::Invalid(_) | FrameStatus::Skipped => {}
        }

        report.frames.push(FrameReport {
            index,
            scene_path: Some(scene_path),
            image_path,
            status,
        });
    }

    tracing::info!(summary = %report.summary(), "run finished");
    Ok(report)
}

fn classify(out: &CommandOutput, image_path: &Path) -> FrameStatus {
    let failure = match &out.state {
        ExitState::Exited(Some(0)) if image_path.is_file() => return FrameStatus::Rendered,
        ExitState::Exited(Some(0)) => RenderFailure::MissingImage,
        ExitState::Exited(code) => RenderFailure::Exit {
            code: *code,
            stderr: out.stderr.trim().to_string(),
        },
        ExitState::TimedOut => RenderFailure::TimedOut,
        ExitState::Cancelled => RenderFailure::Cancelled,
    };
    FrameStatus::Failed(failure)
}

/// An image left over from an earlier run would hide a renderer that wrote nothing.
fn remove_stale(image_path: &Path) -> PhotonResult<()> {
    match std::fs::remove_file(image_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!(
                "failed to remove stale image '{}'",
                image_path.display()
            ))
            .into()),
    }
}
