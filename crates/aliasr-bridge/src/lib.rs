pub mod bridge;
pub mod pipeline;
pub mod resampler;

pub use bridge::{AudioBridge, BridgeState};
pub use pipeline::{ManualPipeline, MediaPipeline, PipelineEvent, PipelineTap, TapSpec};
pub use resampler::Resampler;
