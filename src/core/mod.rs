//! Orchestration: the voice interaction pipeline.

pub mod pipeline;

pub use pipeline::VoicePipeline;
