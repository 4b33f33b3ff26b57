// ============================================================================
// IMAGE EDIT: rotate, crop and downscale an image before it joins the pool
// ============================================================================

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbaImage, imageops};
use rayon::prelude::*;

use crate::error::EditError;
use crate::layout::ImageDimensions;

/// Longest side of an edited image unless the caller asks otherwise.
pub const DEFAULT_MAX_RESOLUTION: u32 = 1920;
pub const JPEG_QUALITY: u8 = 92;

/// Crop rectangle in pixels. Coordinates are relative to the top-left of the
/// unrotated image; the rotated content stays centred on the same point, so
/// the rectangle may reach outside the original bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropArea {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl CropArea {
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EditParams {
    pub crop: CropArea,
    /// Clockwise rotation in degrees.
    pub rotation: f32,
    /// Longest allowed side after cropping; 0 disables the limit.
    pub max_resolution: u32,
}

impl EditParams {
    pub fn crop(crop: CropArea) -> Self {
        Self {
            crop,
            rotation: 0.0,
            max_resolution: DEFAULT_MAX_RESOLUTION,
        }
    }
}

/// Encoded result of an edit, ready for the pool or an upload.
#[derive(Clone, Debug)]
pub struct EditedImage {
    pub bytes: Vec<u8>,
    pub dimensions: ImageDimensions,
    pub file_name: Option<String>,
}

impl EditedImage {
    pub const MIME: &'static str = "image/jpeg";
}

/// Size after applying the resolution limit. Aspect ratio is kept and each
/// side is rounded, never below one pixel.
pub fn target_size(width: u32, height: u32, max_resolution: u32) -> (u32, u32) {
    let longest = width.max(height);
    if max_resolution == 0 || longest <= max_resolution {
        return (width, height);
    }
    let scale = max_resolution as f64 / longest as f64;
    let w = (width as f64 * scale).round().max(1.0) as u32;
    let h = (height as f64 * scale).round().max(1.0) as u32;
    (w, h)
}

/// Rotate, crop and downscale `src`.
pub fn render(src: &RgbaImage, params: &EditParams) -> Result<RgbaImage, EditError> {
    let crop = params.crop;
    if crop.width == 0 || crop.height == 0 {
        return Err(EditError::EmptyCrop);
    }

    let degrees = params.rotation.rem_euclid(360.0);
    let cropped = match quarter_turns(degrees) {
        Some(turns) => crop_quarter_turned(src, turns, crop),
        None => crop_rotated(src, degrees, crop),
    };

    let (w, h) = target_size(crop.width, crop.height, params.max_resolution);
    if (w, h) == (crop.width, crop.height) {
        Ok(cropped)
    } else {
        Ok(imageops::resize(&cropped, w, h, imageops::FilterType::Triangle))
    }
}

/// Encode as JPEG. Transparent areas (outside a rotated image) become black.
pub fn encode_jpeg(img: &RgbaImage) -> Result<Vec<u8>, EditError> {
    let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
    Ok(out.into_inner())
}

/// Decode `bytes`, apply `params` and encode the result. A blank file name
/// counts as none.
pub fn edit_image(bytes: &[u8], params: &EditParams, file_name: Option<&str>) -> Result<EditedImage, EditError> {
    let src = image::load_from_memory(bytes)?.to_rgba8();
    let edited = render(&src, params)?;
    let dimensions = ImageDimensions::new(edited.width(), edited.height());
    log::debug!(
        "edited image {}x{} -> {}x{} (rotation {})",
        src.width(),
        src.height(),
        dimensions.width,
        dimensions.height,
        params.rotation
    );
    Ok(EditedImage {
        bytes: encode_jpeg(&edited)?,
        dimensions,
        file_name: file_name.map(str::trim).filter(|n| !n.is_empty()).map(String::from),
    })
}

fn quarter_turns(degrees: f32) -> Option<u8> {
    let turns = degrees / 90.0;
    ((turns - turns.round()).abs() < 1e-4).then(|| (turns.round() as u8) % 4)
}

fn crop_quarter_turned(src: &RgbaImage, turns: u8, crop: CropArea) -> RgbaImage {
    let rotated = match turns {
        1 => imageops::rotate90(src),
        2 => imageops::rotate180(src),
        3 => imageops::rotate270(src),
        _ => src.clone(),
    };
    // Top-left of the rotated image in the unrotated frame.
    let left = (src.width() as i64 - rotated.width() as i64).div_euclid(2);
    let top = (src.height() as i64 - rotated.height() as i64).div_euclid(2);

    let mut out = RgbaImage::new(crop.width, crop.height);
    imageops::overlay(&mut out, &rotated, left - crop.x, top - crop.y);
    out
}

/// Arbitrary angle: every output pixel is mapped back through the inverse
/// rotation and sampled bilinearly against a transparent background.
fn crop_rotated(src: &RgbaImage, degrees: f32, crop: CropArea) -> RgbaImage {
    let mut out = RgbaImage::new(crop.width, crop.height);
    let cx = src.width() as f32 * 0.5;
    let cy = src.height() as f32 * 0.5;
    let (sin, cos) = degrees.to_radians().sin_cos();

    let src_w = src.width() as i32;
    let src_h = src.height() as i32;
    let stride = src_w as usize * 4;
    let raw = src.as_raw();
    let sample = |sx: i32, sy: i32| -> [f32; 4] {
        if sx < 0 || sy < 0 || sx >= src_w || sy >= src_h {
            [0.0; 4]
        } else {
            let idx = sy as usize * stride + sx as usize * 4;
            [raw[idx] as f32, raw[idx + 1] as f32, raw[idx + 2] as f32, raw[idx + 3] as f32]
        }
    };

    let row_bytes = crop.width as usize * 4;
    out.par_chunks_mut(row_bytes).enumerate().for_each(|(dy, row)| {
        let py = (crop.y as f32 + dy as f32 + 0.5) - cy;
        for dx in 0..crop.width as usize {
            let px = (crop.x as f32 + dx as f32 + 0.5) - cx;
            let src_x = px * cos + py * sin + cx - 0.5;
            let src_y = -px * sin + py * cos + cy - 0.5;

            let x0 = src_x.floor() as i32;
            let y0 = src_y.floor() as i32;
            if x0 < -1 || y0 < -1 || x0 >= src_w || y0 >= src_h {
                continue;
            }
            let fx = src_x - x0 as f32;
            let fy = src_y - y0 as f32;

            let tl = sample(x0, y0);
            let tr = sample(x0 + 1, y0);
            let bl = sample(x0, y0 + 1);
            let br = sample(x0 + 1, y0 + 1);

            let base = dx * 4;
            for c in 0..4 {
                let top = tl[c] + (tr[c] - tl[c]) * fx;
                let bottom = bl[c] + (br[c] - bl[c]) * fx;
                row[base + c] = (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8;
            }
        }
    });
    out
}
