use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{PhotonError, PhotonResult};
use crate::foundation::process::{WaitLimits, run_command};

/// Everything an encoder needs for one movie.
#[derive(Clone, Debug)]
pub struct EncodeJob<'a> {
    /// Intermediate images in playback order. All live in `list_path`'s directory.
    pub frames: &'a [PathBuf],
    /// Where the encoder may write its frame list; removed with the intermediates.
    pub list_path: &'a Path,
    pub out_path: &'a Path,
    pub fps: u32,
    pub codec: &'a str,
    pub bitrate_kbps: u32,
}

/// Turns an ordered image list into one video file.
pub trait VideoEncoder {
    fn name(&self) -> &str;
    fn encode(&mut self, job: &EncodeJob<'_>) -> PhotonResult<()>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    #[default]
    Ffmpeg,
    Mencoder,
}

impl EncoderKind {
    pub fn build(self, limits: WaitLimits) -> Box<dyn VideoEncoder> {
        match self {
            EncoderKind::Ffmpeg => Box::new(FfmpegEncoder::new(limits)),
            EncoderKind::Mencoder => Box::new(MencoderEncoder::new(limits)),
        }
    }
}

/// System `ffmpeg` reading an ffconcat manifest.
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    pub program: PathBuf,
    pub limits: WaitLimits,
}

impl FfmpegEncoder {
    pub fn new(limits: WaitLimits) -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            limits,
        }
    }
}

/// Manifest for ffmpeg's concat demuxer. Entries are bare file names, which the demuxer resolves
/// against the manifest's own directory.
pub fn ffconcat_manifest(frames: &[PathBuf], fps: u32) -> PhotonResult<String> {
    let duration = 1.0 / f64::from(fps.max(1));
    let mut out = String::from("ffconcat version 1.0\n");
    for frame in frames {
        let name = frame
            .file_name()
            .ok_or_else(|| {
                PhotonError::assembly(format!("'{}' has no file name", frame.display()))
            })?
            .to_string_lossy()
            .replace('\'', r"'\''");
        // Writing to a String cannot fail.
        let _ = writeln!(out, "file '{name}'\nduration {duration}");
    }
    // The concat demuxer ignores the duration of the last entry unless it is repeated.
    if let Some(last) = frames.last().and_then(|f| f.file_name()) {
        let name = last.to_string_lossy().replace('\'', r"'\''");
        let _ = writeln!(out, "file '{name}'");
    }
    Ok(out)
}

impl VideoEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn encode(&mut self, job: &EncodeJob<'_>) -> PhotonResult<()> {
        let manifest = ffconcat_manifest(job.frames, job.fps)?;
        std::fs::write(job.list_path, manifest)
            .with_context(|| format!("failed to write '{}'", job.list_path.display()))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
            .arg(job.list_path)
            .args(["-an", "-r"])
            .arg(job.fps.to_string())
            .args(["-c:v", job.codec, "-b:v"])
            .arg(format!("{}k", job.bitrate_kbps))
            .arg(job.out_path);

        let out = run_command(&mut cmd, &self.limits).map_err(|e| {
            PhotonError::assembly(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        out.ensure_success("ffmpeg")
    }
}

/// Legacy MPlayer `mencoder` reading an `mf://@list` file.
#[derive(Clone, Debug)]
pub struct MencoderEncoder {
    pub program: PathBuf,
    pub limits: WaitLimits,
}

impl MencoderEncoder {
    pub fn new(limits: WaitLimits) -> Self {
        Self {
            program: PathBuf::from("mencoder"),
            limits,
        }
    }
}

impl VideoEncoder for MencoderEncoder {
    fn name(&self) -> &str {
        "mencoder"
    }

    fn encode(&mut self, job: &EncodeJob<'_>) -> PhotonResult<()> {
        let mut list = String::new();
        for frame in job.frames {
            let _ = writeln!(list, "{}", frame.display());
        }
        std::fs::write(job.list_path, list)
            .with_context(|| format!("failed to write '{}'", job.list_path.display()))?;

        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("mf://@{}", job.list_path.display()))
            .arg("-mf")
            .arg(format!("fps={}", job.fps))
            .arg("-o")
            .arg(job.out_path)
            .args(["-ovc", "lavc", "-lavcopts"])
            .arg(format!(
                "vcodec={}:vbitrate={}",
                job.codec, job.bitrate_kbps
            ));

        let out = run_command(&mut cmd, &self.limits).map_err(|e| {
            PhotonError::assembly(format!(
                "failed to spawn mencoder (is it installed and on PATH?): {e}"
            ))
        })?;
        out.ensure_success("mencoder")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_lists_frames_in_order_with_durations() {
        let frames = vec![
            PathBuf::from("tmp/scene000000.jpg"),
            PathBuf::from("tmp/scene000001.jpg"),
        ];
        let m = ffconcat_manifest(&frames, 10).unwrap();
        assert_eq!(
            m,
            "ffconcat version 1.0\n\
             file 'scene000000.jpg'\nduration 0.1\n\
             file 'scene000001.jpg'\nduration 0.1\n\
             file 'scene000001.jpg'\n"
        );
    }

    #[test]
    fn manifest_escapes_quotes() {
        let m = ffconcat_manifest(&[PathBuf::from("it's.jpg")], 25).unwrap();
        assert!(m.contains(r"file 'it'\''s.jpg'"));
    }

    #[test]
    fn encoder_kind_json_is_lowercase() {
        let k: EncoderKind = serde_json::from_str("\"mencoder\"").unwrap();
        assert_eq!(k, EncoderKind::Mencoder);
        assert_eq!(EncoderKind::default().build(WaitLimits::default()).name(), "ffmpeg");
    }

    #[test]
    fn missing_encoder_binary_is_an_assembly_error() {
        let dir = PathBuf::from("target").join("video_unit");
        std::fs::create_dir_all(&dir).unwrap();
        let frames = vec![dir.join("scene000000.jpg")];
        let list = dir.join("movie.frames.txt");
        let out = dir.join("movie.avi");
        let mut enc = MencoderEncoder {
            program: PathBuf::from("photonreel-no-such-mencoder"),
            limits: WaitLimits::default(),
        };
        let err = enc
            .encode(&EncodeJob {
                frames: &frames,
                list_path: &list,
                out_path: &out,
                fps: 10,
                codec: "msmpeg4v2",
                bitrate_kbps: 800,
            })
            .unwrap_err();
        assert!(matches!(err, PhotonError::Assembly(_)));
        assert!(list.is_file());
    }
}
