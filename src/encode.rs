pub mod assemble;
pub mod convert;
pub mod video;

pub use assemble::{
    AssembleResult, MovieConfig, assemble, assemble_with_config, collect_frame_images,
};
pub use convert::{BuiltinConverter, ConverterConfig, ExternalConverter, ImageConverter};
pub use video::{EncodeJob, EncoderKind, FfmpegEncoder, MencoderEncoder, VideoEncoder};
