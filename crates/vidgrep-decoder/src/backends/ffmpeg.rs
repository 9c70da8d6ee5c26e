#![cfg(feature = "backend-ffmpeg")]

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg::util::error::{EAGAIN, EWOULDBLOCK};
use ffmpeg_next as ffmpeg;

use crate::core::{
    DecoderError, DecoderResult, DynFrameSource, FrameSource, VideoFrame, VideoMetadata,
};

const BACKEND_NAME: &str = "ffmpeg";
const AV_TIME_BASE: f64 = 1_000_000.0;

pub struct FfmpegSource {
    path: PathBuf,
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    time_base: ffmpeg::Rational,
    fps: f64,
    frame_count: u64,
    metadata: VideoMetadata,
}

// SAFETY: the ffmpeg contexts are owned exclusively by this value and are
// never aliased; callers serialize access behind a mutex.
unsafe impl Send for FfmpegSource {}

impl FfmpegSource {
    pub fn open<P: AsRef<Path>>(path: P) -> DecoderResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DecoderError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input file {} does not exist", path.display()),
            )));
        }
        ffmpeg::init().map_err(backend_error)?;

        let input = ffmpeg::format::input(&path).map_err(backend_error)?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| DecoderError::backend_failure(BACKEND_NAME, "no video stream found"))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let fps = [stream.avg_frame_rate(), stream.rate()]
            .into_iter()
            .map(f64::from)
            .find(|fps| fps.is_finite() && *fps > 0.0)
            .ok_or_else(|| {
                DecoderError::backend_failure(BACKEND_NAME, "video stream has no frame rate")
            })?;
        let stream_frames = stream.frames();

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(backend_error)?;
        let decoder = context.decoder().video().map_err(backend_error)?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(backend_error)?;

        let duration = (input.duration() > 0)
            .then(|| Duration::from_secs_f64(input.duration() as f64 / AV_TIME_BASE));
        let mut metadata = VideoMetadata {
            duration,
            fps: Some(fps),
            width: Some(decoder.width()),
            height: Some(decoder.height()),
            total_frames: (stream_frames > 0).then_some(stream_frames as u64),
        };
        let frame_count = metadata.calculate_total_frames().unwrap_or(0);
        metadata.total_frames = Some(frame_count);
        tracing::debug!(
            path = %path.display(),
            fps,
            frame_count,
            width = decoder.width(),
            height = decoder.height(),
            "ffmpeg stream opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            fps,
            frame_count,
            metadata,
        })
    }

    fn target_pts(&self, index: u64) -> i64 {
        let seconds = index as f64 / self.fps;
        let base = f64::from(self.time_base);
        if base <= 0.0 {
            return 0;
        }
        (seconds / base).floor() as i64
    }
}

impl FrameSource for FfmpegSource {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn metadata(&self) -> VideoMetadata {
        self.metadata
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

        let target = self.target_pts(index);
        let seek_ts = (index as f64 / self.fps * AV_TIME_BASE) as i64;
        self.input.seek(seek_ts, ..=seek_ts).map_err(backend_error)?;
        self.decoder.flush();

        let time_base = self.time_base;
        let mut decoded = ffmpeg::util::frame::Video::empty();
        let mut last: Option<ffmpeg::util::frame::Video> = None;

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            if let Err(err) = self.decoder.send_packet(&packet) {
                if !is_retryable_error(&err) {
                    return Err(backend_error(err));
                }
            }
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.timestamp().or(decoded.pts()).unwrap_or(target);
                if pts >= target {
                    return convert_frame(&mut self.scaler, &decoded, time_base, index);
                }
                last = Some(decoded.clone());
            }
        }

        self.decoder.send_eof().map_err(backend_error)?;
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            last = Some(decoded.clone());
        }

        match last {
            Some(frame) => convert_frame(&mut self.scaler, &frame, time_base, index),
            None => Err(DecoderError::backend_failure(
                BACKEND_NAME,
                format!("no frame decoded at index {index} of {}", self.path.display()),
            )),
        }
    }
}

fn convert_frame(
    scaler: &mut ffmpeg::software::scaling::Context,
    decoded: &ffmpeg::util::frame::Video,
    time_base: ffmpeg::Rational,
    index: u64,
) -> DecoderResult<VideoFrame> {
    let mut converted = ffmpeg::util::frame::Video::empty();
    scaler.run(decoded, &mut converted).map_err(backend_error)?;

    let plane = converted.data(0);
    let stride = converted.stride(0);
    let width = converted.width();
    let height = converted.height();
    let mut buffer = Vec::with_capacity(stride * height as usize);
    for row in 0..height as usize {
        let offset = row * stride;
        buffer.extend_from_slice(&plane[offset..offset + stride]);
    }
    let timestamp = decoded
        .timestamp()
        .or(decoded.pts())
        .filter(|pts| *pts >= 0)
        .map(|pts| Duration::from_secs_f64(pts as f64 * f64::from(time_base)));
    Ok(
        VideoFrame::from_rgb_owned(width, height, stride, timestamp, buffer)?
            .with_frame_index(Some(index)),
    )
}

fn backend_error(err: ffmpeg::Error) -> DecoderError {
    DecoderError::backend_failure(BACKEND_NAME, err.to_string())
}

fn is_retryable_error(error: &ffmpeg::Error) -> bool {
    matches!(
        error,
        ffmpeg::Error::Other { errno }
            if *errno == EAGAIN || *errno == EWOULDBLOCK
    )
}

pub fn boxed_ffmpeg<P: AsRef<Path>>(path: P) -> DecoderResult<DynFrameSource> {
    Ok(Box::new(FfmpegSource::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_returns_error() {
        let result = FfmpegSource::open("/tmp/nonexistent-file.mp4");
        assert!(matches!(result, Err(DecoderError::Io(_))));
    }
}
