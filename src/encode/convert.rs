use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{PhotonError, PhotonResult};
use crate::foundation::process::{WaitLimits, run_command};

/// Converts one renderer image into the encoder's intermediate format.
pub trait ImageConverter {
    /// `quality` is 1..=100 and only affects lossy targets.
    fn convert(&mut self, src: &Path, dst: &Path, quality: u8) -> PhotonResult<()>;
}

/// Converter selection as it appears in project files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConverterConfig {
    /// Decode and re-encode in-process with the `image` crate.
    #[default]
    Builtin,
    /// ImageMagick-style `program -quality Q src dst`.
    External { program: String },
}

impl ConverterConfig {
    pub fn build(&self, limits: WaitLimits) -> Box<dyn ImageConverter> {
        match self {
            ConverterConfig::Builtin => Box::new(BuiltinConverter),
            ConverterConfig::External { program } => Box::new(ExternalConverter {
                program: PathBuf::from(program),
                limits,
            }),
        }
    }
}

/// In-process conversion. JPEG targets honour `quality`; other targets are written in the
/// format implied by their extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinConverter;

impl ImageConverter for BuiltinConverter {
    fn convert(&mut self, src: &Path, dst: &Path, quality: u8) -> PhotonResult<()> {
        let img = image::open(src).map_err(|e| {
            PhotonError::assembly(format!("failed to decode '{}': {e}", src.display()))
        })?;

        if is_jpeg(dst) {
            let file = File::create(dst)
                .with_context(|| format!("failed to create '{}'", dst.display()))?;
            let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(
                BufWriter::new(file),
                quality.clamp(1, 100),
            );
            enc.encode_image(&img.to_rgb8()).map_err(|e| {
                PhotonError::assembly(format!("failed to encode '{}': {e}", dst.display()))
            })?;
        } else {
            img.save(dst).map_err(|e| {
                PhotonError::assembly(format!("failed to write '{}': {e}", dst.display()))
            })?;
        }
        Ok(())
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

/// Shells out to an external converter such as ImageMagick's `convert`.
#[derive(Clone, Debug)]
pub struct ExternalConverter {
    pub program: PathBuf,
    pub limits: WaitLimits,
}

impl ImageConverter for ExternalConverter {
    fn convert(&mut self, src: &Path, dst: &Path, quality: u8) -> PhotonResult<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-quality")
            .arg(quality.to_string())
            .arg(src)
            .arg(dst);
        let out = run_command(&mut cmd, &self.limits).map_err(|e| {
            PhotonError::assembly(format!(
                "failed to start '{}': {e}",
                self.program.display()
            ))
        })?;
        out.ensure_success(&self.program.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = PathBuf::from("target").join("convert_unit").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn builtin_converts_ppm_to_jpeg() {
        let dir = scratch("ppm_to_jpeg");
        let src = dir.join("scene3.ppm");
        std::fs::write(&src, "P3\n2 1\n255\n255 0 0 0 0 255\n").unwrap();
        let dst = dir.join("scene000003.jpg");

        BuiltinConverter.convert(&src, &dst, 100).unwrap();

        let back = image::open(&dst).unwrap();
        assert_eq!((back.width(), back.height()), (2, 1));
    }

    #[test]
    fn builtin_reports_undecodable_input_as_assembly_error() {
        let dir = scratch("garbage");
        let src = dir.join("scene1.ppm");
        std::fs::write(&src, "not an image").unwrap();
        let err = BuiltinConverter
            .convert(&src, &dir.join("scene000001.jpg"), 90)
            .unwrap_err();
        assert!(matches!(err, PhotonError::Assembly(_)), "{err}");
    }

    #[test]
    fn converter_config_json() {
        let c: ConverterConfig =
            serde_json::from_str(r#"{"kind":"external","program":"convert"}"#).unwrap();
        assert_eq!(
            c,
            ConverterConfig::External {
                program: "convert".to_string()
            }
        );
        assert_eq!(ConverterConfig::default(), ConverterConfig::Builtin);
    }

    #[test]
    fn missing_external_converter_is_an_assembly_error() {
        let dir = scratch("missing_tool");
        let mut conv = ExternalConverter {
            program: PathBuf::from("photonreel-no-such-convert"),
            limits: WaitLimits::default(),
        };
        let err = conv
            .convert(&dir.join("a.ppm"), &dir.join("a.jpg"), 100)
            .unwrap_err();
        assert!(matches!(err, PhotonError::Assembly(_)));
    }
}
