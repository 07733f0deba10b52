//! Rounded-corner alpha masking.
//!
//! The mask is opaque everywhere except inside the four `radius`x`radius`
//! corner boxes, where a pixel survives only if its Euclidean distance to
//! the corner's rounding center stays within the radius. Applied as a
//! destination-in blend: the target keeps its alpha multiplied by the mask.
//!
//! `radius <= 0` skips the mask entirely (explicit fast path, not a
//! degraded case).

use image::{GrayImage, RgbaImage};

use crate::composite::mul_div255;

/// Build the alpha mask for a rounded rectangle.
pub fn rounded_mask(width: u32, height: u32, radius: i32) -> GrayImage {
    if radius <= 0 {
        return GrayImage::from_pixel(width, height, image::Luma([255]));
    }
    let r = (radius as u32).min(width / 2).min(height / 2);
    let rf = r as f32;

    GrayImage::from_fn(width, height, |x, y| {
        // Distance from this pixel to the nearest rounding center, but only
        // when the pixel sits inside a corner box.
        let cx = if x < r {
            Some(rf - 0.5 - x as f32)
        } else if x >= width - r {
            Some(x as f32 - (width - r) as f32 + 0.5)
        } else {
            None
        };
        let cy = if y < r {
            Some(rf - 0.5 - y as f32)
        } else if y >= height - r {
            Some(y as f32 - (height - r) as f32 + 0.5)
        } else {
            None
        };

        match (cx, cy) {
            (Some(dx), Some(dy)) => {
                if (dx.max(0.0).powi(2) + dy.max(0.0).powi(2)).sqrt() <= rf {
                    image::Luma([255])
                } else {
                    image::Luma([0])
                }
            }
            _ => image::Luma([255]),
        }
    })
}

/// Destination-in: multiply the layer's alpha by the mask.
/// Dimension mismatch is a caller bug surfaced by a debug assert; in
/// release the overlap is clipped.
pub fn apply_mask(layer: &mut RgbaImage, mask: &GrayImage) {
    debug_assert_eq!(layer.dimensions(), mask.dimensions());
    let w = layer.width().min(mask.width());
    let h = layer.height().min(mask.height());
    for y in 0..h {
        for x in 0..w {
            let m = mask.get_pixel(x, y).0[0];
            if m == 255 {
                continue;
            }
            let px = layer.get_pixel_mut(x, y);
            px.0[3] = mul_div255(u16::from(px.0[3]), u16::from(m));
        }
    }
}

/// Round the corners of a layer in place. `radius <= 0` is a no-op.
pub fn round_corners(layer: &mut RgbaImage, radius: i32) {
    if radius <= 0 {
        return;
    }
    let mask = rounded_mask(layer.width(), layer.height(), radius);
    apply_mask(layer, &mask);
}
