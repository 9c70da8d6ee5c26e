pub mod backends;
pub mod config;
pub mod core;

pub use config::{Backend, Configuration};
pub use core::{
    BoundingBox, DecoderError, DecoderResult, DynFrameSource, FrameSource, VideoFrame,
    VideoMetadata,
};
