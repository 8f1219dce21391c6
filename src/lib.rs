#![forbid(unsafe_code)]

pub mod encode;
pub mod foundation;
pub mod project;
pub mod render;
pub mod scene;
pub mod sweep;

pub use encode::{
    AssembleResult, BuiltinConverter, ConverterConfig, EncodeJob, EncoderKind, ExternalConverter,
    FfmpegEncoder, ImageConverter, MencoderEncoder, MovieConfig, VideoEncoder, assemble,
    assemble_with_config, collect_frame_images,
};
pub use foundation::core::{Axis, FrameIndex, FrameRange, Rgb, Vec3};
pub use foundation::error::{PhotonError, PhotonResult};
pub use foundation::process::{CancelToken, CommandOutput, ExitState, WaitLimits, run_command};
pub use project::{Overrides, ProjectConfig, RendererConfig};
pub use render::{
    CommandRenderer, FrameReport, FrameStatus, RenderFailure, Renderer, RunOpts, RunReport,
    RunSummary, run,
};
pub use scene::builder::{SceneBuilder, ensure_valid};
pub use scene::lua::{SerializeMode, Serializer, serialize};
pub use scene::model::{
    Bounds, Camera, Light, LightKind, Material, Object, RaytracerSettings, Scene, Shape,
    WindowSettings,
};
pub use scene::presets::{PRESET_NAMES, Preset};
pub use scene::validate::{Defect, validate};
pub use sweep::{Frame, FrameSweep, SweepConfig, SweepParam};
