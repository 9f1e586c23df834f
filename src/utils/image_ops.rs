use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use tracing::{debug, trace};

/// Decode an uploaded frame into a 3-channel RGB image.
///
/// Any format the `image` crate recognises is accepted. Undecodable or
/// empty input yields `None` instead of an error, so callers can treat it
/// as a frame with nothing in it.
pub fn decode_frame(bytes: &[u8]) -> Option<DynamicImage> {
    if bytes.is_empty() {
        debug!("Empty frame buffer");
        return None;
    }

    match image::load_from_memory(bytes) {
        Ok(img) => {
            trace!("Decoded frame: {}x{}", img.width(), img.height());
            Some(DynamicImage::ImageRgb8(img.to_rgb8()))
        }
        Err(e) => {
            debug!("Frame could not be decoded ({} bytes): {}", bytes.len(), e);
            None
        }
    }
}

/// Gray used for letterbox padding
pub const LETTERBOX_FILL: u8 = 114;

/// Geometry of fitting a frame into a square model input without
/// distorting it: scale by `gain`, then pad left/top by `pad_x`/`pad_y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub gain: f32,
    /// Frame size after scaling, before padding
    pub scaled: (u32, u32),
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, target_size: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let target = target_size as f32;
        let gain = (target / w).min(target / h);

        let scaled_w = ((w * gain).round() as u32).clamp(1, target_size);
        let scaled_h = ((h * gain).round() as u32).clamp(1, target_size);

        // Odd padding puts the extra pixel on the right/bottom
        let pad_x = ((target - scaled_w as f32) / 2.0 - 0.1).round().max(0.0) as u32;
        let pad_y = ((target - scaled_h as f32) / 2.0 - 0.1).round().max(0.0) as u32;

        Self {
            gain,
            scaled: (scaled_w, scaled_h),
            pad_x,
            pad_y,
        }
    }

    /// Map an `[x1, y1, x2, y2]` box from model input space back onto the
    /// original frame (unclipped)
    pub fn unmap(&self, bbox: [f32; 4]) -> [f32; 4] {
        let (px, py) = (self.pad_x as f32, self.pad_y as f32);
        [
            (bbox[0] - px) / self.gain,
            (bbox[1] - py) / self.gain,
            (bbox[2] - px) / self.gain,
            (bbox[3] - py) / self.gain,
        ]
    }
}

/// Letterbox a frame into `target_size` x `target_size` and lay it out as
/// a `[1, 3, H, W]` tensor with channels scaled to `[0, 1]`.
///
/// The aspect ratio is kept; the border is filled with [`LETTERBOX_FILL`].
pub fn to_nchw_tensor(img: &DynamicImage, target_size: u32) -> Array4<f32> {
    let letterbox = Letterbox::fit(img.width(), img.height(), target_size);
    let (scaled_w, scaled_h) = letterbox.scaled;
    trace!(
        "Preprocessing frame: {}x{} → {}x{} padded to {}x{}",
        img.width(),
        img.height(),
        scaled_w,
        scaled_h,
        target_size,
        target_size
    );

    let rgb = if (scaled_w, scaled_h) == (img.width(), img.height()) {
        img.to_rgb8()
    } else {
        img.resize_exact(scaled_w, scaled_h, FilterType::Triangle).to_rgb8()
    };

    let target = target_size as usize;
    let fill = LETTERBOX_FILL as f32 / 255.0;
    let mut array = Array4::<f32>::from_elem((1, 3, target, target), fill);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let x = (x + letterbox.pad_x) as usize;
        let y = (y + letterbox.pad_y) as usize;
        if x >= target || y >= target {
            continue;
        }
        array[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        array[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        array[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }

    array
}
