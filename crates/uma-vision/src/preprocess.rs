use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};

/// Canonical width every character-screen upload is normalized to.
pub const WORKING_WIDTH: u32 = 1024;

/// Resize keeping the aspect ratio so the result is `width` pixels wide.
pub fn resize_to_width(image: &RgbaImage, width: u32, filter: FilterType) -> RgbaImage {
    let (w, h) = image.dimensions();
    if w == width || w == 0 {
        return image.clone();
    }
    let height = ((h as f64) * (width as f64) / (w as f64)).round().max(1.0) as u32;
    imageops::resize(image, width, height, filter)
}

/// Keep the horizontal band between `top` and `bottom`, given as fractions of the height.
pub fn crop_band(image: &RgbaImage, top: f64, bottom: f64) -> RgbaImage {
    let (w, h) = image.dimensions();
    let y0 = ((h as f64) * top.clamp(0.0, 1.0)) as u32;
    let y1 = ((h as f64) * bottom.clamp(0.0, 1.0)) as u32;
    if y1 <= y0 {
        return RgbaImage::new(w, 0);
    }
    imageops::crop_imm(image, 0, y0, w, y1 - y0).to_image()
}

pub fn grayscale(image: &RgbaImage) -> GrayImage {
    imageops::grayscale(image)
}

/// Luminance threshold: pixels at or above `threshold` become white, everything else black.
pub fn binarize(image: &RgbaImage, threshold: u8) -> GrayImage {
    let gray = imageops::grayscale(image);
    let (w, h) = gray.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        if gray.get_pixel(x, y)[0] >= threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Color threshold: a pixel is white when any RGB channel exceeds its border.
pub fn binarize_rgb(image: &RgbaImage, border: [u8; 3]) -> GrayImage {
    let (w, h) = image.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let p = image.get_pixel(x, y);
        if p[0] > border[0] || p[1] > border[1] || p[2] > border[2] {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Resize a template to `width`, preserving aspect ratio.
pub fn resize_gray_to_width(image: &GrayImage, width: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == width || w == 0 {
        return image.clone();
    }
    let height = ((h as f64) * (width as f64) / (w as f64)).round().max(1.0) as u32;
    imageops::resize(image, width, height, FilterType::Triangle)
}
