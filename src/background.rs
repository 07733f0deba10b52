//! Background layer synthesis.
//!
//! Three modes: per-pixel gradients (1–3 colors, 5 directions), a supplied
//! image resized per a fit policy, or auto (image if one is discoverable by
//! naming convention next to the screenshots, else gradient). An unreadable
//! background image is recoverable-structural: warn and fall back to the
//! gradient, never fail the build.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::color::Rgb;
use crate::composite::lerp_u8;
use crate::error::{StoreshotError, StoreshotResult};

pub const MAX_GRADIENT_STOPS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradientDirection {
    TopBottom,
    BottomTop,
    LeftRight,
    RightLeft,
    /// Interpolates along the normalized sum of both axes.
    Diagonal,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GradientSpec {
    pub colors: Vec<Rgb>,
    pub direction: GradientDirection,
}

impl GradientSpec {
    pub fn new(colors: Vec<Rgb>, direction: GradientDirection) -> StoreshotResult<Self> {
        let spec = Self { colors, direction };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> StoreshotResult<()> {
        if self.colors.is_empty() {
            return Err(StoreshotError::validation("gradient needs at least one color"));
        }
        if self.colors.len() > MAX_GRADIENT_STOPS {
            return Err(StoreshotError::validation(format!(
                "gradient supports at most {MAX_GRADIENT_STOPS} colors, got {}",
                self.colors.len()
            )));
        }
        Ok(())
    }

    /// Color at interpolation parameter `t` in `[0, 1]`. For three or more
    /// stops, `t` maps into equal-width segments between consecutive stops.
    pub fn sample(&self, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        match self.colors.len() {
            0 => Rgb::new(0, 0, 0),
            1 => self.colors[0],
            n => {
                let segments = (n - 1) as f32;
                let scaled = t * segments;
                let idx = (scaled.floor() as usize).min(n - 2);
                let local = scaled - idx as f32;
                let (a, b) = (self.colors[idx], self.colors[idx + 1]);
                Rgb::new(
                    lerp_u8(a.r, b.r, local),
                    lerp_u8(a.g, b.g, local),
                    lerp_u8(a.b, b.b, local),
                )
            }
        }
    }
}

/// Named gradient presets referencable from device configs.
pub fn preset(id: &str) -> Option<GradientSpec> {
    let (colors, direction) = match id {
        "dusk" => (vec![Rgb::new(0x2C, 0x3E, 0x50), Rgb::new(0x4C, 0xA1, 0xAF)], GradientDirection::TopBottom),
        "sunset" => (
            vec![Rgb::new(0xFF, 0x51, 0x2F), Rgb::new(0xF0, 0x93, 0x33), Rgb::new(0xFF, 0xE2, 0x59)],
            GradientDirection::Diagonal,
        ),
        "ocean" => (vec![Rgb::new(0x13, 0x54, 0x7A), Rgb::new(0x80, 0xD0, 0xC7)], GradientDirection::TopBottom),
        "forest" => (vec![Rgb::new(0x0B, 0x48, 0x6B), Rgb::new(0x1E, 0x8C, 0x4E)], GradientDirection::LeftRight),
        "midnight" => (
            vec![Rgb::new(0x0F, 0x0C, 0x29), Rgb::new(0x30, 0x2B, 0x63), Rgb::new(0x24, 0x24, 0x3E)],
            GradientDirection::TopBottom,
        ),
        "blush" => (vec![Rgb::new(0xDD, 0x5E, 0x89), Rgb::new(0xF7, 0xBB, 0x97)], GradientDirection::Diagonal),
        _ => return None,
    };
    Some(GradientSpec { colors, direction })
}

/// Fallback gradient used when nothing is configured or an image fails.
pub fn default_gradient() -> GradientSpec {
    preset("dusk").expect("default preset exists")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Scale to fill, crop overflow, preserve aspect.
    Cover,
    /// Scale to fit entirely, pad the remainder.
    Contain,
    /// Stretch, ignoring aspect.
    Fill,
    /// Contain, but never upscale.
    ScaleDown,
}

/// Resolved background request, as the compositor consumes it.
#[derive(Clone, Debug)]
pub enum BackgroundSpec {
    Solid(Rgb),
    Gradient(GradientSpec),
    Image { path: PathBuf, fit: Option<FitMode> },
    /// Image if one is discoverable in `dir`, else `gradient`.
    Auto { dir: PathBuf, gradient: GradientSpec },
}

/// Produce the background layer at canvas resolution.
pub fn synthesize(spec: &BackgroundSpec, width: u32, height: u32) -> StoreshotResult<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(StoreshotError::validation("background canvas must be non-empty"));
    }
    match spec {
        BackgroundSpec::Solid(c) => Ok(RgbaImage::from_pixel(width, height, image::Rgba(c.to_rgba(255)))),
        BackgroundSpec::Gradient(g) => {
            g.validate()?;
            Ok(render_gradient(g, width, height))
        }
        BackgroundSpec::Image { path, fit } => match image::open(path) {
            Ok(img) => Ok(fit_image(&img.to_rgba8(), width, height, *fit)),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "background image unreadable, using default gradient");
                Ok(render_gradient(&default_gradient(), width, height))
            }
        },
        BackgroundSpec::Auto { dir, gradient } => match discover_background(dir) {
            Some(path) => synthesize(&BackgroundSpec::Image { path, fit: None }, width, height),
            None => synthesize(&BackgroundSpec::Gradient(gradient.clone()), width, height),
        },
    }
}

/// `background.{png,jpg,jpeg}` next to the input screenshots, if present.
pub fn discover_background(dir: &Path) -> Option<PathBuf> {
    for name in ["background.png", "background.jpg", "background.jpeg"] {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn render_gradient(g: &GradientSpec, width: u32, height: u32) -> RgbaImage {
    if g.colors.len() == 1 {
        return RgbaImage::from_pixel(width, height, image::Rgba(g.colors[0].to_rgba(255)));
    }

    let wmax = (width - 1).max(1) as f32;
    let hmax = (height - 1).max(1) as f32;

    RgbaImage::from_fn(width, height, |x, y| {
        let fx = x as f32 / wmax;
        let fy = y as f32 / hmax;
        let t = match g.direction {
            GradientDirection::TopBottom => fy,
            GradientDirection::BottomTop => 1.0 - fy,
            GradientDirection::LeftRight => fx,
            GradientDirection::RightLeft => 1.0 - fx,
            GradientDirection::Diagonal => (fx + fy) / 2.0,
        };
        image::Rgba(g.sample(t).to_rgba(255))
    })
}

/// Resize `src` into a `width`x`height` canvas per the fit policy.
/// With no explicit mode, equal aspect ratios pick `Fill` and anything else
/// picks `Contain` (best-fit heuristic). An aspect mismatch is worth a
/// warning but never a failure.
pub fn fit_image(src: &RgbaImage, width: u32, height: u32, fit: Option<FitMode>) -> RgbaImage {
    let (sw, sh) = (src.width().max(1), src.height().max(1));
    let src_aspect = sw as f32 / sh as f32;
    let dst_aspect = width as f32 / height as f32;
    let aspects_match = (src_aspect - dst_aspect).abs() < 1e-3;

    let fit = fit.unwrap_or(if aspects_match { FitMode::Fill } else { FitMode::Contain });
    if !aspects_match {
        tracing::warn!(
            source = format!("{sw}x{sh}"),
            target = format!("{width}x{height}"),
            ?fit,
            "background aspect ratio differs from canvas"
        );
    }

    let filter = image::imageops::FilterType::Lanczos3;
    match fit {
        FitMode::Fill => image::imageops::resize(src, width, height, filter),
        FitMode::Cover => {
            let scale = (width as f32 / sw as f32).max(height as f32 / sh as f32);
            let rw = ((sw as f32 * scale).round() as u32).max(width);
            let rh = ((sh as f32 * scale).round() as u32).max(height);
            let resized = image::imageops::resize(src, rw, rh, filter);
            let x = (rw - width) / 2;
            let y = (rh - height) / 2;
            image::imageops::crop_imm(&resized, x, y, width, height).to_image()
        }
        FitMode::Contain | FitMode::ScaleDown => {
            let mut scale = (width as f32 / sw as f32).min(height as f32 / sh as f32);
            if fit == FitMode::ScaleDown {
                scale = scale.min(1.0);
            }
            let rw = ((sw as f32 * scale).round() as u32).clamp(1, width);
            let rh = ((sh as f32 * scale).round() as u32).clamp(1, height);
            let resized = image::imageops::resize(src, rw, rh, filter);
            let mut canvas = RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]));
            let x = i64::from((width - rw) / 2);
            let y = i64::from((height - rh) / 2);
            crate::composite::blit_over(&mut canvas, &resized, x, y, 1.0);
            canvas
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_blue() -> GradientSpec {
        GradientSpec::new(
            vec![Rgb::new(255, 0, 0), Rgb::new(0, 0, 255)],
            GradientDirection::TopBottom,
        )
        .unwrap()
    }

    #[test]
    fn two_color_vertical_gradient_endpoints() {
        let img = synthesize(&BackgroundSpec::Gradient(red_blue()), 100, 100).unwrap();
        let top = img.get_pixel(0, 0).0;
        let bottom = img.get_pixel(0, 99).0;
        assert!(top[0] > 200 && top[2] < 55, "top not red-biased: {top:?}");
        assert!(bottom[0] < 55 && bottom[2] > 200, "bottom not blue-biased: {bottom:?}");
    }

    #[test]
    fn bottom_top_inverts_axis() {
        let mut g = red_blue();
        g.direction = GradientDirection::BottomTop;
        let img = synthesize(&BackgroundSpec::Gradient(g), 50, 50).unwrap();
        assert!(img.get_pixel(0, 0).0[2] > 200);
        assert!(img.get_pixel(0, 49).0[0] > 200);
    }

    #[test]
    fn diagonal_midpoint_is_blend() {
        let mut g = red_blue();
        g.direction = GradientDirection::Diagonal;
        let img = synthesize(&BackgroundSpec::Gradient(g), 101, 101).unwrap();
        let mid = img.get_pixel(50, 50).0;
        assert!((100..=160).contains(&mid[0]));
        assert!((100..=160).contains(&mid[2]));
    }

    #[test]
    fn three_color_gradient_passes_through_middle_stop() {
        let g = GradientSpec::new(
            vec![Rgb::new(255, 0, 0), Rgb::new(0, 255, 0), Rgb::new(0, 0, 255)],
            GradientDirection::LeftRight,
        )
        .unwrap();
        let img = synthesize(&BackgroundSpec::Gradient(g), 101, 10).unwrap();
        let mid = img.get_pixel(50, 5).0;
        assert!(mid[1] > 200, "middle stop should dominate: {mid:?}");
    }

    #[test]
    fn single_color_is_solid_fill() {
        let g = GradientSpec::new(vec![Rgb::new(9, 8, 7)], GradientDirection::TopBottom).unwrap();
        let img = synthesize(&BackgroundSpec::Gradient(g), 8, 8).unwrap();
        assert!(img.pixels().all(|p| p.0 == [9, 8, 7, 255]));
    }

    #[test]
    fn gradient_validation_bounds_stop_count() {
        assert!(GradientSpec::new(vec![], GradientDirection::TopBottom).is_err());
        let four = vec![Rgb::new(0, 0, 0); 4];
        assert!(GradientSpec::new(four, GradientDirection::TopBottom).is_err());
    }

    #[test]
    fn presets_resolve_and_validate() {
        for id in ["dusk", "sunset", "ocean", "forest", "midnight", "blush"] {
            preset(id).unwrap().validate().unwrap();
        }
        assert!(preset("nope").is_none());
    }

    #[test]
    fn fit_fill_stretches_to_exact_size() {
        let src = RgbaImage::from_pixel(10, 20, image::Rgba([1, 2, 3, 255]));
        let out = fit_image(&src, 40, 40, Some(FitMode::Fill));
        assert_eq!(out.dimensions(), (40, 40));
    }

    #[test]
    fn fit_contain_pads_remainder() {
        let src = RgbaImage::from_pixel(10, 20, image::Rgba([255, 255, 255, 255]));
        let out = fit_image(&src, 40, 40, Some(FitMode::Contain));
        assert_eq!(out.dimensions(), (40, 40));
        // Width scales to 20, centered: columns 0 and 39 are padding.
        assert_eq!(out.get_pixel(0, 20).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(20, 20).0, [255, 255, 255, 255]);
    }

    #[test]
    fn fit_cover_crops_overflow() {
        let src = RgbaImage::from_pixel(10, 20, image::Rgba([7, 7, 7, 255]));
        let out = fit_image(&src, 40, 40, Some(FitMode::Cover));
        assert_eq!(out.dimensions(), (40, 40));
        assert!(out.pixels().all(|p| p.0 == [7, 7, 7, 255]));
    }

    #[test]
    fn fit_scale_down_never_upscales() {
        let src = RgbaImage::from_pixel(10, 10, image::Rgba([7, 7, 7, 255]));
        let out = fit_image(&src, 40, 40, Some(FitMode::ScaleDown));
        assert_eq!(out.dimensions(), (40, 40));
        // Source stays 10x10 centered; corners are padding.
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(20, 20).0, [7, 7, 7, 255]);
    }

    #[test]
    fn best_fit_picks_fill_for_equal_aspect() {
        let src = RgbaImage::from_pixel(10, 10, image::Rgba([5, 5, 5, 255]));
        let out = fit_image(&src, 30, 30, None);
        assert!(out.pixels().all(|p| p.0 == [5, 5, 5, 255]));
    }

    #[test]
    fn missing_image_falls_back_to_default_gradient() {
        let spec = BackgroundSpec::Image {
            path: PathBuf::from("/nonexistent/definitely-missing.png"),
            fit: None,
        };
        let img = synthesize(&spec, 20, 20).unwrap();
        assert_eq!(img.dimensions(), (20, 20));
    }

    #[test]
    fn auto_without_discoverable_image_uses_gradient() {
        let spec = BackgroundSpec::Auto {
            dir: PathBuf::from("/nonexistent"),
            gradient: red_blue(),
        };
        let img = synthesize(&spec, 10, 10).unwrap();
        assert!(img.get_pixel(0, 0).0[0] > 200);
    }

    #[test]
    fn zero_canvas_is_rejected() {
        assert!(synthesize(&BackgroundSpec::Solid(Rgb::new(0, 0, 0)), 0, 10).is_err());
    }
}
