use std::time::Duration;

use crate::config::Configuration;
use crate::core::{
    DecoderError, DecoderResult, DynFrameSource, FrameSource, VideoFrame, VideoMetadata,
};

const BACKEND_NAME: &str = "mock";

/// Synthetic source producing horizontal gradient frames.
///
/// Each row is filled with `(row + index) % 256` so that frames differ and
/// an index can be recovered from the first pixel.
#[derive(Debug, Clone)]
pub struct MockSource {
    frame_count: u64,
    width: u32,
    height: u32,
    fps: f64,
}

impl Default for MockSource {
    fn default() -> Self {
        Self {
            frame_count: 240,
            width: 320,
            height: 180,
            fps: 24.0,
        }
    }
}

impl MockSource {
    pub fn new(frame_count: u64, width: u32, height: u32, fps: f64) -> Self {
        Self {
            frame_count,
            width,
            height,
            fps,
        }
    }

    fn generate_frame(&self, index: u64) -> DecoderResult<VideoFrame> {
        let stride = self.width as usize * 3;
        let mut data = vec![0u8; stride * self.height as usize];
        for (row, chunk) in data.chunks_mut(stride.max(1)).enumerate() {
            let value = ((row as u64 + index) % 256) as u8;
            chunk.fill(value);
        }
        let timestamp = self.metadata().timestamp_for(index);
        Ok(
            VideoFrame::from_rgb_owned(self.width, self.height, stride, timestamp, data)?
                .with_frame_index(Some(index)),
        )
    }
}

impl FrameSource for MockSource {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            duration: Some(Duration::from_secs_f64(self.frame_count as f64 / self.fps)),
            fps: Some(self.fps),
            width: Some(self.width),
            height: Some(self.height),
            total_frames: Some(self.frame_count),
        }
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn frame(&mut self, index: u64) -> DecoderResult<VideoFrame> {
        if index >= self.frame_count {
            return Err(DecoderError::OutOfRange {
                index,
                count: self.frame_count,
            });
        }
        self.generate_frame(index)
    }
}

pub fn boxed_mock(config: &Configuration) -> DecoderResult<DynFrameSource> {
    let mut source = MockSource::default();
    if let Some(count) = config.mock_frame_count {
        source.frame_count = count;
    }
    Ok(Box::new(source))
}
