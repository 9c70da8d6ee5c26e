use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};
use vidgrep_types::BoundingBox;

use crate::output::error::OutputError;
use crate::output::util::format_file_stamp;

const BLOCK_COLOR: [u8; 3] = [0, 0, 255];
const TERM_COLOR: [u8; 3] = [255, 0, 0];
const JPEG_QUALITY: u8 = 90;

/// Copies `frame` and outlines every recognized block, then every matched term.
///
/// Terms are drawn last so they stay visible where they overlap a block.
pub fn annotate(frame: &RgbImage, blocks: &[BoundingBox], terms: &[BoundingBox]) -> RgbImage {
    let mut annotated = frame.clone();
    let (width, height) = (annotated.width() as usize, annotated.height() as usize);
    let buffer: &mut [u8] = &mut annotated;
    draw_rectangles_rgb(buffer, width, height, &boxes_to_rects(blocks, width, height), BLOCK_COLOR);
    draw_rectangles_rgb(buffer, width, height, &boxes_to_rects(terms, width, height), TERM_COLOR);
    annotated
}

/// Writes an annotated match frame as `frame-<HH-MM-SS-mmm>.jpg`.
///
/// When another frame already claimed that name the frame index is appended.
/// The plain name is claimed with `create_new`, so two workers racing for it
/// never write the same file.
pub fn write_result_frame(
    directory: &Path,
    image: &RgbImage,
    timestamp: Option<Duration>,
    frame_index: u64,
) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(directory)?;
    let stamp = format_file_stamp(timestamp.unwrap_or_default());
    let preferred = directory.join(format!("frame-{stamp}.jpg"));
    let (path, file) = match create_new(&preferred) {
        Ok(file) => (preferred, file),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            let fallback = directory.join(format!("frame-{stamp}-{frame_index}.jpg"));
            let file = File::create(&fallback)?;
            (fallback, file)
        }
        Err(err) => return Err(err.into()),
    };
    encode_jpeg(file, image)?;
    Ok(path)
}

pub fn write_jpeg(path: &Path, image: &RgbImage) -> Result<(), OutputError> {
    encode_jpeg(File::create(path)?, image)
}

fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn encode_jpeg(file: File, image: &RgbImage) -> Result<(), OutputError> {
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgb8,
    )?;
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

fn boxes_to_rects(boxes: &[BoundingBox], frame_width: usize, frame_height: usize) -> Vec<Rect> {
    let mut rects = Vec::new();
    if frame_width == 0 || frame_height == 0 {
        return rects;
    }
    for bbox in boxes {
        let x0 = bbox.x as usize;
        let y0 = bbox.y as usize;
        let x1 = (bbox.right() as usize).min(frame_width);
        let y1 = (bbox.bottom() as usize).min(frame_height);
        if x0 >= x1 || y0 >= y1 {
            continue;
        }
        rects.push(Rect {
            x0,
            y0,
            x1: x1 - 1,
            y1: y1 - 1,
        });
    }
    rects
}

fn draw_rectangles_rgb(
    buffer: &mut [u8],
    width: usize,
    height: usize,
    rects: &[Rect],
    color: [u8; 3],
) {
    let stride = width * 3;
    for rect in rects {
        let thickness = rect_thickness(rect);
        for offset in 0..thickness {
            let top = rect.y0 + offset;
            if top > rect.y1 {
                break;
            }
            let bottom = rect.y1 - offset;
            for x in rect.x0..=rect.x1 {
                paint_pixel(buffer, stride, top, x, color);
                if bottom < height {
                    paint_pixel(buffer, stride, bottom, x, color);
                }
            }

            let left = rect.x0 + offset;
            if left > rect.x1 {
                break;
            }
            let right = rect.x1 - offset;
            for y in rect.y0..=rect.y1 {
                paint_pixel(buffer, stride, y, left, color);
                paint_pixel(buffer, stride, y, right, color);
            }
        }
    }
}

fn paint_pixel(buffer: &mut [u8], stride: usize, y: usize, x: usize, color: [u8; 3]) {
    let idx = y * stride + x * 3;
    if let Some(pixel) = buffer.get_mut(idx..idx + 3) {
        pixel.copy_from_slice(&color);
    }
}

fn rect_thickness(rect: &Rect) -> usize {
    let span = (rect.x1 - rect.x0).min(rect.y1 - rect.y0).max(1);
    span.min(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn boxes_are_clipped_to_the_frame() {
        let rects = boxes_to_rects(
            &[
                BoundingBox::new(2, 2, 100, 3),
                BoundingBox::new(50, 0, 4, 4),
                BoundingBox::new(0, 0, 0, 5),
            ],
            10,
            10,
        );
        assert_eq!(
            rects,
            vec![Rect {
                x0: 2,
                y0: 2,
                x1: 9,
                y1: 4
            }]
        );
    }

    #[test]
    fn matched_terms_are_drawn_over_blocks() {
        let frame = RgbImage::from_pixel(12, 12, Rgb([10, 10, 10]));
        let block = BoundingBox::new(1, 1, 10, 10);
        let annotated = annotate(&frame, &[block], &[block]);
        assert_eq!(annotated.get_pixel(1, 1), &Rgb(TERM_COLOR));
        assert_eq!(annotated.get_pixel(6, 6), &Rgb([10, 10, 10]));
        assert_eq!(frame.get_pixel(1, 1), &Rgb([10, 10, 10]));
    }

    #[test]
    fn unmatched_blocks_are_blue() {
        let frame = RgbImage::from_pixel(12, 12, Rgb([10, 10, 10]));
        let annotated = annotate(&frame, &[BoundingBox::new(0, 0, 5, 5)], &[]);
        assert_eq!(annotated.get_pixel(0, 0), &Rgb(BLOCK_COLOR));
        assert_eq!(annotated.get_pixel(4, 2), &Rgb(BLOCK_COLOR));
    }

    #[test]
    fn result_frames_get_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let timestamp = Some(Duration::from_millis(3_723_004));
        let first = write_result_frame(dir.path(), &image, timestamp, 7).unwrap();
        let second = write_result_frame(dir.path(), &image, timestamp, 8).unwrap();
        assert_eq!(first.file_name().unwrap(), "frame-01-02-03-004.jpg");
        assert_eq!(second.file_name().unwrap(), "frame-01-02-03-004-8.jpg");
        assert!(second.exists());
    }

    #[test]
    fn concurrent_writers_never_share_a_name() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let timestamp = Some(Duration::from_secs(2));
        let barrier = std::sync::Barrier::new(8);

        let paths: Vec<PathBuf> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8u64)
                .map(|index| {
                    let (dir, image, barrier) = (dir.path(), &image, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        write_result_frame(dir, image, timestamp, index).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        let unique: std::collections::HashSet<&PathBuf> = paths.iter().collect();
        assert_eq!(unique.len(), 8);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 8);
        assert!(paths.iter().any(|path| path.ends_with("frame-00-00-02-000.jpg")));
    }
}
