//! Project files: one JSON document naming the scene template, the sweep, the renderer command
//! and the movie settings.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::encode::assemble::{AssembleResult, MovieConfig, assemble_with_config};
use crate::foundation::core::{FrameIndex, FrameRange, Vec3};
use crate::foundation::error::{PhotonError, PhotonResult};
use crate::foundation::process::{CancelToken, ensure_parent_dir};
use crate::render::pipeline::{RunOpts, RunReport, run};
use crate::render::renderer::{CommandRenderer, Renderer};
use crate::scene::builder::ensure_valid;
use crate::scene::lua::{SerializeMode, Serializer};
use crate::scene::model::Scene;
use crate::scene::presets;
use crate::sweep::{FrameSweep, SweepConfig, SweepParam};

/// External renderer command and the file extensions it works with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub program: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub scene_ext: String,
    pub image_ext: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "kiran".to_string(),
            args: Vec::new(),
            timeout_secs: None,
            scene_ext: "lua".to_string(),
            image_ext: "ppm".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Built-in template name; exclusive with `scene`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Inline template; exclusive with `preset`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<Scene>,
    /// Defaults to the preset's sweep, or a single unchanged frame for inline scenes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep: Option<SweepConfig>,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub serialize_mode: SerializeMode,
    #[serde(default)]
    pub movie: MovieConfig,
}

impl ProjectConfig {
    /// Starter project for a built-in preset, with its sweep spelled out for editing.
    pub fn for_preset(name: &str) -> PhotonResult<Self> {
        let preset = presets::by_name(name)?;
        Ok(Self {
            preset: Some(preset.name.to_string()),
            scene: None,
            sweep: Some(preset.sweep),
            renderer: RendererConfig::default(),
            serialize_mode: SerializeMode::default(),
            movie: MovieConfig {
                out_path: PathBuf::from(format!("{}.avi", preset.name)),
                ..MovieConfig::default()
            },
        })
    }

    pub fn load(path: &Path) -> PhotonResult<Self> {
        let f = File::open(path)
            .with_context(|| format!("open project '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse project JSON '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> PhotonResult<()> {
        ensure_parent_dir(path)?;
        let f = File::create(path)
            .with_context(|| format!("create project '{}'", path.display()))?;
        serde_json::to_writer_pretty(f, self)
            .with_context(|| format!("write project JSON '{}'", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> PhotonResult<()> {
        match (&self.preset, &self.scene) {
            (Some(_), Some(_)) => Err(PhotonError::validation(
                "project sets both 'preset' and 'scene'; pick one",
            )),
            (None, None) => Err(PhotonError::validation(
                "project needs either a 'preset' or a 'scene'",
            )),
            (Some(name), None) if !presets::is_known(name) => Err(presets::unknown_preset(name)),
            _ => {
                if let Some(sweep) = &self.sweep {
                    sweep.validate()?;
                }
                self.movie.validate()
            }
        }
    }

    /// Template scene and sweep this project renders.
    pub fn resolve(&self) -> PhotonResult<(Scene, SweepConfig)> {
        self.validate()?;
        let (scene, preset_sweep) = if let Some(name) = &self.preset {
            let p = presets::by_name(name)?;
            (p.scene, Some(p.sweep))
        } else if let Some(scene) = &self.scene {
            (scene.clone(), None)
        } else {
            return Err(PhotonError::validation(
                "project needs either a 'preset' or a 'scene'",
            ));
        };
        let sweep = self
            .sweep
            .clone()
            .or(preset_sweep)
            .unwrap_or_else(single_frame);
        Ok((scene, sweep))
    }

    /// Replace a preset reference by its inline scene and sweep so they can be edited.
    pub fn materialize(&mut self) -> PhotonResult<()> {
        let (scene, sweep) = self.resolve()?;
        self.preset = None;
        self.scene = Some(scene);
        self.sweep = Some(sweep);
        Ok(())
    }

    /// The validated frame sequence. Strict mode rejects a defective template before any frame
    /// is generated; lenient mode leaves the defects to the serializer, which logs them once.
    pub fn frame_sweep(&self) -> PhotonResult<FrameSweep> {
        let (scene, sweep) = self.resolve()?;
        if self.serialize_mode == SerializeMode::Strict {
            ensure_valid(&scene)?;
        }
        FrameSweep::new(scene, sweep)
    }

    pub fn run_opts(&self, work_dir: impl Into<PathBuf>, cancel: Option<CancelToken>) -> RunOpts {
        RunOpts {
            mode: self.serialize_mode,
            scene_ext: self.renderer.scene_ext.clone(),
            image_ext: self.renderer.image_ext.clone(),
            cancel,
            ..RunOpts::new(work_dir)
        }
    }

    pub fn command_renderer(&self, cancel: Option<CancelToken>) -> CommandRenderer {
        let mut r = CommandRenderer::new(&self.renderer.program)
            .with_args(self.renderer.args.iter().cloned())
            .with_timeout(self.renderer.timeout_secs.map(Duration::from_secs));
        if let Some(cancel) = cancel {
            r = r.with_cancel(cancel);
        }
        r
    }

    /// Write every frame's scene file into `out_dir` without rendering.
    pub fn generate(&self, out_dir: &Path) -> PhotonResult<Vec<PathBuf>> {
        let sweep = self.frame_sweep()?;
        let opts = self.run_opts(out_dir, None);
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create '{}'", out_dir.display()))?;

        let mut serializer = Serializer::new(self.serialize_mode);
        let mut written = Vec::new();
        for frame in &sweep {
            let text = serializer.serialize(&frame.scene)?;
            let path = opts.scene_path(frame.index);
            std::fs::write(&path, text)
                .with_context(|| format!("failed to write scene file '{}'", path.display()))?;
            written.push(path);
        }
        tracing::info!(count = written.len(), dir = %out_dir.display(), "scene files written");
        Ok(written)
    }

    /// Generate and render every frame with `renderer`.
    pub fn render_with(
        &self,
        work_dir: &Path,
        renderer: &mut dyn Renderer,
        cancel: Option<CancelToken>,
    ) -> PhotonResult<RunReport> {
        let sweep = self.frame_sweep()?;
        tracing::info!(frames = sweep.planned_len(), "starting run");
        run(&sweep, renderer, &self.run_opts(work_dir, cancel))
    }

    /// Assemble the rendered frames of `report` into the configured movie.
    pub fn assemble(
        &self,
        report: &RunReport,
        cancel: Option<CancelToken>,
    ) -> PhotonResult<AssembleResult> {
        assemble_with_config(&report.rendered_images(), &self.movie, cancel)
    }
}

fn single_frame() -> SweepConfig {
    SweepConfig {
        frames: FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(1),
        },
        param: SweepParam::Fixed,
        start: 0.0,
        step: 1.0,
        bound: 0.0,
    }
}

/// Command-line overrides for individual project options. `None` leaves the option alone.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub threads: Option<u32>,
    pub max_ray_depth: Option<u32>,
    pub anti_aliasing: Option<bool>,
    pub max_photon_depth: Option<u32>,
    pub photon_search_count: Option<u32>,
    pub photon_search_radius: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub eye: Option<Vec3>,
    pub look_at: Option<Vec3>,
    pub first_frame: Option<u64>,
    pub end_frame: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub fps: Option<u32>,
    pub codec: Option<String>,
    pub bitrate_kbps: Option<u32>,
}

impl Overrides {
    fn touches_scene(&self) -> bool {
        self.threads.is_some()
            || self.max_ray_depth.is_some()
            || self.anti_aliasing.is_some()
            || self.max_photon_depth.is_some()
            || self.photon_search_count.is_some()
            || self.photon_search_radius.is_some()
            || self.width.is_some()
            || self.height.is_some()
            || self.eye.is_some()
            || self.look_at.is_some()
            || self.first_frame.is_some()
            || self.end_frame.is_some()
    }

    pub fn apply(&self, cfg: &mut ProjectConfig) -> PhotonResult<()> {
        if self.touches_scene() {
            cfg.materialize()?;
        }
        if let Some(scene) = cfg.scene.as_mut() {
            let rt = &mut scene.raytracer;
            set(&mut rt.num_threads, self.threads);
            set(&mut rt.max_ray_depth, self.max_ray_depth);
            set(&mut rt.anti_aliasing, self.anti_aliasing);
            set(&mut rt.max_photon_depth, self.max_photon_depth);
            set(&mut rt.photon_search_count, self.photon_search_count);
            set(&mut rt.photon_search_radius, self.photon_search_radius);
            set(&mut scene.window.width, self.width);
            set(&mut scene.window.height, self.height);
            set(&mut scene.camera.eye, self.eye);
            set(&mut scene.camera.look_at, self.look_at);
        }
        if let Some(sweep) = cfg.sweep.as_mut() {
            set(&mut sweep.frames.start.0, self.first_frame);
            set(&mut sweep.frames.end.0, self.end_frame);
            sweep.validate()?;
        }
        if self.timeout_secs.is_some() {
            cfg.renderer.timeout_secs = self.timeout_secs;
            cfg.movie.timeout_secs = self.timeout_secs;
        }
        set(&mut cfg.movie.fps, self.fps);
        set(&mut cfg.movie.codec, self.codec.clone());
        set(&mut cfg.movie.bitrate_kbps, self.bitrate_kbps);
        cfg.movie.validate()
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_project_round_trips_through_json() {
        let cfg = ProjectConfig::for_preset("room1").unwrap();
        let s = serde_json::to_string_pretty(&cfg).unwrap();
        let back: ProjectConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(back.movie.out_path, PathBuf::from("room1.avi"));
    }

    #[test]
    fn minimal_project_takes_defaults() {
        let cfg: ProjectConfig = serde_json::from_str(r#"{"preset":"room2"}"#).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.renderer.program, "kiran");
        assert_eq!(cfg.serialize_mode, SerializeMode::Strict);
        assert_eq!(cfg.frame_sweep().unwrap().planned_len(), 1);
    }

    #[test]
    fn preset_and_scene_are_exclusive() {
        let mut cfg = ProjectConfig::for_preset("room2").unwrap();
        cfg.scene = Some(presets::room2().unwrap().scene);
        assert!(cfg.validate().is_err());
        cfg.scene = None;
        cfg.preset = None;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_preset_lists_alternatives() {
        let err = ProjectConfig::for_preset("room5").unwrap_err().to_string();
        assert!(err.contains("room1, room2, gallery"));
    }

    #[test]
    fn strict_project_rejects_a_dangling_template_up_front() {
        let mut scene = presets::room2().unwrap().scene;
        scene.objects[0].material = "Marble".to_string();
        let mut cfg: ProjectConfig = serde_json::from_str(r#"{"preset":"room2"}"#).unwrap();
        cfg.preset = None;
        cfg.scene = Some(scene);

        let err = cfg.frame_sweep().unwrap_err();
        assert!(err.to_string().contains("missing material 'Marble'"));

        cfg.serialize_mode = SerializeMode::Lenient;
        assert_eq!(cfg.frame_sweep().unwrap().planned_len(), 1);
    }

    #[test]
    fn overrides_materialize_presets_and_apply() {
        let mut cfg = ProjectConfig::for_preset("room1").unwrap();
        Overrides {
            threads: Some(16),
            width: Some(320),
            height: Some(200),
            end_frame: Some(4),
            fps: Some(25),
            ..Overrides::default()
        }
        .apply(&mut cfg)
        .unwrap();

        assert!(cfg.preset.is_none());
        let scene = cfg.scene.as_ref().unwrap();
        assert_eq!(scene.raytracer.num_threads, 16);
        assert_eq!((scene.window.width, scene.window.height), (320, 200));
        assert_eq!(cfg.movie.fps, 25);
        assert_eq!(cfg.frame_sweep().unwrap().planned_len(), 4);
    }

    #[test]
    fn movie_only_overrides_keep_the_preset_reference() {
        let mut cfg = ProjectConfig::for_preset("gallery").unwrap();
        Overrides {
            bitrate_kbps: Some(1600),
            ..Overrides::default()
        }
        .apply(&mut cfg)
        .unwrap();
        assert_eq!(cfg.preset.as_deref(), Some("gallery"));
        assert_eq!(cfg.movie.bitrate_kbps, 1600);
    }
}
