use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use vidgrep_decoder::VideoFrame;

/// Factor applied before recognition; recognizer boxes are divided by it.
pub const UPSCALE: u32 = 2;

/// Copies a decoded frame into an owned RGB image, dropping row padding.
pub fn frame_to_rgb(frame: &VideoFrame) -> Option<RgbImage> {
    if frame.is_empty() {
        return None;
    }
    RgbImage::from_raw(frame.width(), frame.height(), frame.to_packed_rgb())
}

/// Produces the grayscale image handed to the recognizer.
///
/// With `crop` only the left half is kept, at full height, so coordinates
/// found on the result still map onto the source frame after dividing by
/// [`UPSCALE`].
pub fn prepare(source: &RgbImage, crop: bool) -> Option<GrayImage> {
    let (width, height) = if crop {
        (source.width() / 2, source.height())
    } else {
        source.dimensions()
    };
    if width == 0 || height == 0 {
        return None;
    }
    let region = imageops::crop_imm(source, 0, 0, width, height).to_image();
    let upscaled = imageops::resize(
        &region,
        width * UPSCALE,
        height * UPSCALE,
        FilterType::CatmullRom,
    );
    Some(imageops::grayscale(&upscaled))
}
