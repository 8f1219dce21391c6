use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::encode::convert::{ConverterConfig, ImageConverter};
use crate::encode::video::{EncodeJob, EncoderKind, VideoEncoder};
use crate::foundation::error::{PhotonError, PhotonResult};
use crate::foundation::process::{CancelToken, WaitLimits, ensure_parent_dir};

/// Movie output settings. Defaults reproduce the classic 10 fps, 800 kbit/s MS-MPEG4v2 AVI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieConfig {
    pub out_path: PathBuf,
    pub fps: u32,
    pub codec: String,
    pub bitrate_kbps: u32,
    /// Intermediate image quality, 1..=100.
    pub quality: u8,
    pub intermediate_ext: String,
    /// Where intermediates are written. Defaults to the directory of the first frame image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intermediate_dir: Option<PathBuf>,
    pub encoder: EncoderKind,
    pub converter: ConverterConfig,
    /// Per-invocation limit for the converter and the encoder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            out_path: PathBuf::from("movie.avi"),
            fps: 10,
            codec: "msmpeg4v2".to_string(),
            bitrate_kbps: 800,
            quality: 100,
            intermediate_ext: "jpg".to_string(),
            intermediate_dir: None,
            encoder: EncoderKind::default(),
            converter: ConverterConfig::default(),
            timeout_secs: None,
        }
    }
}

impl MovieConfig {
    pub fn validate(&self) -> PhotonResult<()> {
        if self.fps == 0 {
            return Err(PhotonError::validation("movie fps must be non-zero"));
        }
        if self.bitrate_kbps == 0 {
            return Err(PhotonError::validation("movie bitrate must be non-zero"));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(PhotonError::validation("movie quality must be in 1..=100"));
        }
        if self.intermediate_ext.is_empty() || self.codec.is_empty() {
            return Err(PhotonError::validation(
                "movie codec and intermediate extension must be non-empty",
            ));
        }
        Ok(())
    }

    pub fn wait_limits(&self, cancel: Option<CancelToken>) -> WaitLimits {
        WaitLimits {
            timeout: self.timeout_secs.map(Duration::from_secs),
            cancel,
        }
    }

    /// Converter and encoder selected by this config.
    pub fn tools(
        &self,
        cancel: Option<CancelToken>,
    ) -> (Box<dyn ImageConverter>, Box<dyn VideoEncoder>) {
        let limits = self.wait_limits(cancel);
        (
            self.converter.build(limits.clone()),
            self.encoder.build(limits),
        )
    }

    fn list_path(&self, dir: &Path) -> PathBuf {
        let stem = self
            .out_path
            .file_stem()
            .map_or_else(|| "movie".into(), |s| s.to_string_lossy());
        dir.join(format!("{stem}.frames.txt"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembleResult {
    pub out_path: PathBuf,
    pub frames: usize,
    /// Intermediate files deleted after encoding.
    pub removed: usize,
}

/// Convert `frame_images` (in playback order) and encode them into `cfg.out_path`.
///
/// Intermediates are deleted only after a successful encode; on any failure they stay on disk
/// and a [`PhotonError::Assembly`] is returned.
#[tracing::instrument(skip_all, fields(out = %cfg.out_path.display(), frames = frame_images.len()))]
pub fn assemble(
    frame_images: &[PathBuf],
    cfg: &MovieConfig,
    converter: &mut dyn ImageConverter,
    encoder: &mut dyn VideoEncoder,
) -> PhotonResult<AssembleResult> {
    cfg.validate()?;
    let Some(first) = frame_images.first() else {
        return Err(PhotonError::assembly("no rendered frames to assemble"));
    };

    let dir = match &cfg.intermediate_dir {
        Some(d) => d.clone(),
        None => first
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create '{}'", dir.display()))?;
    }
    ensure_parent_dir(&cfg.out_path)?;

    let targets = intermediate_paths(frame_images, &dir, &cfg.intermediate_ext)?;

    tracing::info!(count = targets.len(), dir = %dir.display(), "converting frames");
    for (src, dst) in frame_images.iter().zip(&targets) {
        if let Err(e) = converter.convert(src, dst, cfg.quality) {
            tracing::warn!(src = %src.display(), "conversion failed; keeping intermediates");
            return Err(as_assembly(e));
        }
    }

    let list_path = cfg.list_path(&dir);
    // A movie from an earlier run must not pass for this run's output.
    remove_movie(&cfg.out_path)?;
    tracing::info!(encoder = encoder.name(), "encoding movie");
    let job = EncodeJob {
        frames: &targets,
        list_path: &list_path,
        out_path: &cfg.out_path,
        fps: cfg.fps,
        codec: &cfg.codec,
        bitrate_kbps: cfg.bitrate_kbps,
    };
    if let Err(e) = encoder.encode(&job) {
        tracing::warn!("encoding failed; keeping intermediates");
        if let Err(rm) = remove_movie(&cfg.out_path) {
            tracing::warn!("could not remove partial movie: {rm}");
        }
        return Err(as_assembly(e));
    }
    if !cfg.out_path.is_file() {
        return Err(PhotonError::assembly(format!(
            "{} reported success but '{}' was not written",
            encoder.name(),
            cfg.out_path.display()
        )));
    }

    let mut removed = 0;
    for path in targets.iter().chain(std::iter::once(&list_path)) {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), "could not remove intermediate: {e}"),
        }
    }

    tracing::info!(removed, "movie written");
    Ok(AssembleResult {
        out_path: cfg.out_path.clone(),
        frames: targets.len(),
        removed,
    })
}

/// [`assemble`] with the converter and encoder named in `cfg`.
pub fn assemble_with_config(
    frame_images: &[PathBuf],
    cfg: &MovieConfig,
    cancel: Option<CancelToken>,
) -> PhotonResult<AssembleResult> {
    let (mut converter, mut encoder) = cfg.tools(cancel);
    assemble(frame_images, cfg, converter.as_mut(), encoder.as_mut())
}

fn remove_movie(path: &Path) -> PhotonResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PhotonError::assembly(format!(
            "failed to remove '{}': {e}",
            path.display()
        ))),
    }
}

fn as_assembly(e: PhotonError) -> PhotonError {
    match e {
        PhotonError::Assembly(_) => e,
        other => PhotonError::assembly(other.to_string()),
    }
}

/// `scene<index:06>.<ext>` in `dir` for every image, so name order equals frame order.
fn intermediate_paths(
    frame_images: &[PathBuf],
    dir: &Path,
    ext: &str,
) -> PhotonResult<Vec<PathBuf>> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(frame_images.len());
    for (pos, src) in frame_images.iter().enumerate() {
        let index = frame_number(src).unwrap_or(pos as u64);
        if !seen.insert(index) {
            return Err(PhotonError::assembly(format!(
                "frame index {index} appears more than once"
            )));
        }
        let dst = dir.join(format!("scene{index:06}.{ext}"));
        if &dst == src {
            return Err(PhotonError::assembly(format!(
                "intermediate for '{}' would overwrite it",
                src.display()
            )));
        }
        out.push(dst);
    }
    Ok(out)
}

/// Trailing decimal digits of the file stem: `scene42.ppm` is frame 42.
pub fn frame_number(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    stem[prefix.len()..].parse().ok()
}

/// Images in `dir` with extension `ext`, ordered by frame number. Files without a frame number
/// are ignored.
pub fn collect_frame_images(dir: &Path, ext: &str) -> PhotonResult<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to read '{}'", dir.display()))?;
    let mut frames = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read '{}'", dir.display()))?
            .path();
        let matches_ext = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if !matches_ext || !path.is_file() {
            continue;
        }
        if let Some(n) = frame_number(&path) {
            frames.push((n, path));
        }
    }
    frames.sort();
    Ok(frames.into_iter().map(|(_, p)| p).collect())
}
