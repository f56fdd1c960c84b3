use image::{DynamicImage, RgbImage};

const CONTRAST: f32 = 1.5;

/// Grayscale + fixed contrast boost before recognition.
///
/// Each pixel becomes the channel average pushed away from mid-gray and
/// written back into all three channels, which sharpens text edges for the
/// recognizer without thresholding away faint scripts.
pub(super) fn enhance_for_recognition(image: &DynamicImage) -> RgbImage {
    let mut rgb = image.to_rgb8();
    for pixel in rgb.pixels_mut() {
        let [r, g, b] = pixel.0;
        let avg = (r as f32 + g as f32 + b as f32) / 3.0;
        let adjusted = boost_contrast(avg);
        pixel.0 = [adjusted, adjusted, adjusted];
    }
    rgb
}

pub(super) fn boost_contrast(luminance: f32) -> u8 {
    ((luminance - 128.0) * CONTRAST + 128.0).clamp(0.0, 255.0).round() as u8
}
