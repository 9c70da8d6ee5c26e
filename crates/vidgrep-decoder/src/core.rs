use std::time::Duration;

pub use vidgrep_types::{BoundingBox, DecoderError, DecoderResult, VideoFrame};

pub type DynFrameSource = Box<dyn FrameSource>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoMetadata {
    pub duration: Option<Duration>,
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub total_frames: Option<u64>,
}

impl VideoMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration_and_fps(duration: Duration, fps: f64) -> Self {
        Self {
            duration: Some(duration),
            fps: Some(fps),
            ..Default::default()
        }
    }

    pub fn calculate_total_frames(&self) -> Option<u64> {
        if let Some(total) = self.total_frames {
            return Some(total);
        }

        if let (Some(duration), Some(fps)) = (self.duration, self.fps) {
            let seconds = duration.as_secs_f64();
            let total = (seconds * fps).round();
            if total.is_finite() && total >= 0.0 {
                return Some(total as u64);
            }
        }

        None
    }

    /// Presentation time of `index` derived from the frame rate.
    pub fn timestamp_for(&self, index: u64) -> Option<Duration> {
        let fps = self.fps.filter(|fps| fps.is_finite() && *fps > 0.0)?;
        Some(Duration::from_secs_f64(index as f64 / fps))
    }
}

/// Random-access view over a decoded video.
///
/// Seeking is absolute: callers may request indices in any order and
/// implementations must not assume sequential access. Implementations are
/// not required to be thread-safe; shared use goes through a lock.
pub trait FrameSource: Send + 'static {
    fn name(&self) -> &'static str;

    fn metadata(&self) -> VideoMetadata {
        VideoMetadata::default()
    }

    fn frame_count(&self) -> u64;

    fn frame(&mut self, index: u64) -> DecoderResult<VideoFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_frames_prefers_explicit_count() {
        let metadata = VideoMetadata {
            total_frames: Some(12),
            ..VideoMetadata::with_duration_and_fps(Duration::from_secs(10), 30.0)
        };
        assert_eq!(metadata.calculate_total_frames(), Some(12));
    }

    #[test]
    fn total_frames_falls_back_to_duration() {
        let metadata = VideoMetadata::with_duration_and_fps(Duration::from_secs(2), 25.0);
        assert_eq!(metadata.calculate_total_frames(), Some(50));
    }

    #[test]
    fn timestamp_requires_positive_fps() {
        let metadata = VideoMetadata {
            fps: Some(0.0),
            ..Default::default()
        };
        assert_eq!(metadata.timestamp_for(10), None);

        let metadata = VideoMetadata {
            fps: Some(25.0),
            ..Default::default()
        };
        assert_eq!(metadata.timestamp_for(50), Some(Duration::from_secs(2)));
    }
}
