//! Frame scanning: preprocessing, per-frame matching and the worker pool.

pub mod preprocess;
mod processor;
mod progress;
mod scheduler;

pub use processor::{FrameOutcome, FrameProcessor, MatchLedger, MatchResult, MatchType};
pub use progress::ScanProgress;
pub use scheduler::{
    DEFAULT_FRAME_SKIP, DEFAULT_MATCH_LIMIT, FrameScheduler, ScanOptions, ScanOutcome,
};
