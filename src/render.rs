pub mod pipeline;
pub mod renderer;

pub use pipeline::{FrameReport, FrameStatus, RenderFailure, RunOpts, RunReport, RunSummary, run};
pub use renderer::{CommandRenderer, Renderer};
