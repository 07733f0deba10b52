//! Straight-alpha pixel compositing.
//!
//! The engine's pixel contract is **straight** (non-premultiplied) RGBA8,
//! matching what the `image` and `imageproc` crates produce and consume.
//! All blending is integer arithmetic over u16 intermediates.

use image::RgbaImage;

pub type Rgba8 = [u8; 4];

/// Source-over composite of straight-alpha pixels.
pub fn over(dst: Rgba8, src: Rgba8, opacity: f32) -> Rgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return [src[0], src[1], src[2], 255];
    }

    let inv = 255u16 - u16::from(sa);
    let da = mul_div255(u16::from(dst[3]), inv);
    let oa = u16::from(sa) + u16::from(da);

    let mut out = [0u8; 4];
    out[3] = oa.min(255) as u8;
    if oa == 0 {
        return out;
    }
    for i in 0..3 {
        // Straight alpha: channels are weighted by their own alpha and
        // re-normalized by the output alpha.
        let sc = u32::from(src[i]) * u32::from(sa);
        let dc = u32::from(dst[i]) * u32::from(da);
        out[i] = ((sc + dc + u32::from(oa) / 2) / u32::from(oa)).min(255) as u8;
    }
    out
}

/// Composite `src` over `dst` at offset `(x, y)`, clipping to `dst` bounds.
/// Negative offsets clip the top/left of `src`.
pub fn blit_over(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64, opacity: f32) {
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let (sw, sh) = (src.width() as i64, src.height() as i64);

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + sw).min(dw);
    let y1 = (y + sh).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for dy in y0..y1 {
        for dx in x0..x1 {
            let sp = src.get_pixel((dx - x) as u32, (dy - y) as u32).0;
            if sp[3] == 0 {
                continue;
            }
            let dp = dst.get_pixel(dx as u32, dy as u32).0;
            dst.put_pixel(dx as u32, dy as u32, image::Rgba(over(dp, sp, opacity)));
        }
    }
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

/// Linear interpolation between two channel values.
pub(crate) fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let t = t.clamp(0.0, 1.0);
    (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_opacity_0_is_noop() {
        let dst = [1, 2, 3, 4];
        let src = [200, 200, 200, 200];
        assert_eq!(over(dst, src, 0.0), dst);
    }

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        let src = [255, 255, 255, 0];
        assert_eq!(over(dst, src, 1.0), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src, 1.0), src);
    }

    #[test]
    fn over_half_alpha_blends_channels() {
        let dst = [0, 0, 0, 255];
        let src = [255, 255, 255, 128];
        let out = over(dst, src, 1.0);
        assert_eq!(out[3], 255);
        for c in &out[..3] {
            assert!((120..=135).contains(c), "channel {c} not near half");
        }
    }

    #[test]
    fn blit_clips_to_destination() {
        let mut dst = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        blit_over(&mut dst, &src, 2, 2, 1.0);
        assert_eq!(dst.get_pixel(1, 1).0, [0, 0, 0, 255]);
        assert_eq!(dst.get_pixel(3, 3).0, [255, 0, 0, 255]);

        // Negative offsets clip the source's top-left.
        let mut dst = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        blit_over(&mut dst, &src, -2, -2, 1.0);
        assert_eq!(dst.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(dst.get_pixel(3, 3).0, [0, 0, 0, 255]);
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp_u8(10, 200, 0.0), 10);
        assert_eq!(lerp_u8(10, 200, 1.0), 200);
    }
}
