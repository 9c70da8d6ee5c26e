//! Shared domain models for the vidgrep workspace.
//!
//! Frames, bounding boxes and decoder errors live here so the decoder, OCR
//! and scanning crates can agree on them without pulling each other's
//! native dependencies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

pub type DecoderResult<T> = Result<T, DecoderError>;

const RGB_CHANNELS: usize = 3;

/// Decoded frame stored as packed RGB8 rows.
#[derive(Clone)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    stride: usize,
    frame_index: Option<u64>,
    timestamp: Option<Duration>,
    data: Arc<[u8]>,
}

impl fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("timestamp", &self.timestamp)
            .field("bytes", &self.data.len())
            .field("frame_index", &self.frame_index)
            .finish()
    }
}

impl VideoFrame {
    pub fn from_rgb_owned(
        width: u32,
        height: u32,
        stride: usize,
        timestamp: Option<Duration>,
        data: Vec<u8>,
    ) -> DecoderResult<Self> {
        let row_bytes = (width as usize)
            .checked_mul(RGB_CHANNELS)
            .ok_or_else(|| DecoderError::InvalidFrame {
                reason: "calculated row length overflowed".into(),
            })?;
        if stride < row_bytes {
            return Err(DecoderError::InvalidFrame {
                reason: format!("stride {stride} is smaller than row length {row_bytes}"),
            });
        }
        let required =
            stride
                .checked_mul(height as usize)
                .ok_or_else(|| DecoderError::InvalidFrame {
                    reason: "calculated frame length overflowed".into(),
                })?;
        if data.len() < required {
            return Err(DecoderError::InvalidFrame {
                reason: format!(
                    "insufficient RGB bytes: got {} expected at least {}",
                    data.len(),
                    required
                ),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            timestamp,
            data: Arc::from(data.into_boxed_slice()),
            frame_index: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Copies the visible pixels into a tightly packed buffer (stride == width * 3).
    pub fn to_packed_rgb(&self) -> Vec<u8> {
        let row_bytes = self.width as usize * RGB_CHANNELS;
        let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
        for row in self.data.chunks(self.stride).take(self.height as usize) {
            packed.extend_from_slice(&row[..row_bytes]);
        }
        packed
    }

    pub fn frame_index(&self) -> Option<u64> {
        self.frame_index
    }

    pub fn with_frame_index(mut self, index: Option<u64>) -> Self {
        self.frame_index = index;
        self
    }
}

/// Axis-aligned rectangle in pixel coordinates of the source frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }

    /// Maps a box found on an upscaled image back onto the source image.
    pub fn downscaled(self, factor: u32) -> Self {
        let factor = factor.max(1);
        Self {
            x: self.x / factor,
            y: self.y / factor,
            width: self.width / factor,
            height: self.height / factor,
        }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@({},{})", self.width, self.height, self.x, self.y)
    }
}

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("backend {backend} is not supported in this build")]
    Unsupported { backend: &'static str },

    #[error("{backend} backend failed: {message}")]
    BackendFailure {
        backend: &'static str,
        message: String,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("frame {index} is out of range (frame count {count})")]
    OutOfRange { index: u64, count: u64 },

    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecoderError {
    pub fn unsupported(backend: &'static str) -> Self {
        Self::Unsupported { backend }
    }

    pub fn backend_failure(backend: &'static str, message: impl Into<String>) -> Self {
        Self::BackendFailure {
            backend,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_short_buffers() {
        let result = VideoFrame::from_rgb_owned(4, 2, 12, None, vec![0; 20]);
        assert!(matches!(result, Err(DecoderError::InvalidFrame { .. })));
    }

    #[test]
    fn frame_rejects_stride_smaller_than_row() {
        let result = VideoFrame::from_rgb_owned(4, 2, 8, None, vec![0; 64]);
        assert!(result.is_err());
    }

    #[test]
    fn packed_rgb_drops_row_padding() {
        let mut data = vec![0u8; 16 * 2];
        data[..6].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        data[16..22].copy_from_slice(&[7, 8, 9, 10, 11, 12]);
        let frame = VideoFrame::from_rgb_owned(2, 2, 16, None, data).unwrap();
        assert_eq!(
            frame.to_packed_rgb(),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
        );
    }

    #[test]
    fn downscale_divides_every_edge() {
        let bbox = BoundingBox::new(10, 20, 30, 41).downscaled(2);
        assert_eq!(bbox, BoundingBox::new(5, 10, 15, 20));
        assert_eq!(bbox.right(), 20);
    }
}
