//! Composition orchestration.
//!
//! [`compose`] merges background, framed screenshot and caption layers into
//! one output buffer:
//!
//! 1. synthesize the background at output resolution
//! 2. scale the screenshot into the frame's screen rect (or straight onto
//!    the canvas when no frame is selected), apply partial-frame cropping
//!    and corner rounding, place per `frame_scale`/`frame_position`
//! 3. size the caption box from the frame's resolved vertical placement,
//!    rasterize it, stack it above/below/over the device layer
//! 4. flatten, optionally downsampling for preview
//!
//! Coupling is one-directional: device placement never moves to make room
//! for the caption; the caption sizes itself around the device.

use std::sync::Arc;

use image::RgbaImage;

use crate::background::{self, BackgroundSpec};
use crate::composite::blit_over;
use crate::config::{CaptionPosition, CaptionSettings, FramePosition};
use crate::error::{StoreshotError, StoreshotResult};
use crate::layout::{CaptionBox, compute_height, compute_height_adaptive};
use crate::mask::round_corners;
use crate::registry::{FrameDescriptor, Orientation};
use crate::text::{CaptionFont, render};

/// Longest output edge in preview mode.
pub const PREVIEW_MAX_EDGE: u32 = 640;

/// Caption input for one composition: text already resolved to the target
/// language, settings already merged.
#[derive(Clone)]
pub struct CaptionRequest {
    pub text: String,
    pub settings: CaptionSettings,
    pub font: Option<Arc<CaptionFont>>,
}

/// One composition's inputs. Constructed by the caller, consumed once.
#[derive(Clone)]
pub struct CompositionRequest {
    pub screenshot: RgbaImage,
    pub frame: Option<FrameDescriptor>,
    /// Bezel bitmap for `frame`. Absent art still composes: the descriptor
    /// keeps sizing/positioning correct ("selected but not rendered").
    pub frame_art: Option<RgbaImage>,
    pub caption: Option<CaptionRequest>,
    pub background: BackgroundSpec,
    pub output_width: u32,
    pub output_height: u32,
    pub frame_position: FramePosition,
    pub frame_scale: f32,
    pub partial_frame_pct: f32,
    pub corner_radius: i32,
    pub preview: bool,
}

/// Structured outcome handed back for logging/reporting.
#[derive(Clone, Debug)]
pub struct ComposeReport {
    pub frame_used: Option<String>,
    /// Orientation actually composed: the frame's when one is used (desktop
    /// and watch frames force theirs), otherwise the screenshot's.
    pub orientation: Orientation,
    pub caption_lines: usize,
    pub width: u32,
    pub height: u32,
}

pub struct ComposeOutput {
    pub image: RgbaImage,
    pub report: ComposeReport,
}

/// Compose one screenshot into a finished marketing image.
pub fn compose(request: &CompositionRequest) -> StoreshotResult<ComposeOutput> {
    if request.output_width == 0 || request.output_height == 0 {
        return Err(StoreshotError::validation("output resolution must be non-zero"));
    }
    let (sw, sh) = request.screenshot.dimensions();
    if sw == 0 || sh == 0 {
        return Err(StoreshotError::composite("screenshot buffer is empty"));
    }

    let (out_w, out_h) = (request.output_width, request.output_height);
    let orientation = match &request.frame {
        Some(frame) => frame.orientation,
        None => Orientation::of(sw, sh),
    };

    let mut canvas = background::synthesize(&request.background, out_w, out_h)?;

    let device = build_device_layer(request)?;
    let placed = place_device(&device, request, out_w, out_h);
    blit_over(&mut canvas, &placed.layer, placed.x, placed.y, 1.0);

    let mut caption_lines = 0;
    if let Some(caption) = &request.caption {
        caption_lines = draw_caption(&mut canvas, caption, &placed, out_w, out_h);
    }

    let image = if request.preview {
        preview_downsample(&canvas)
    } else {
        canvas
    };

    let (width, height) = image.dimensions();
    Ok(ComposeOutput {
        report: ComposeReport {
            frame_used: request.frame.as_ref().map(|f| f.name.clone()),
            orientation,
            caption_lines,
            width,
            height,
        },
        image,
    })
}

struct PlacedDevice {
    layer: RgbaImage,
    x: i64,
    y: i64,
}

/// Screenshot scaled into the frame's screen rect with the bezel art on
/// top, partial-frame cropped and corner-rounded. Without a frame, the raw
/// screenshot with corner rounding.
fn build_device_layer(request: &CompositionRequest) -> StoreshotResult<RgbaImage> {
    let filter = image::imageops::FilterType::Lanczos3;

    let mut layer = match &request.frame {
        Some(frame) => {
            frame.validate()?;
            let mut layer =
                RgbaImage::from_pixel(frame.width, frame.height, image::Rgba([0, 0, 0, 0]));
            let screen = image::imageops::resize(
                &request.screenshot,
                frame.screen.width,
                frame.screen.height,
                filter,
            );
            blit_over(&mut layer, &screen, i64::from(frame.screen.x), i64::from(frame.screen.y), 1.0);

            if let Some(art) = &request.frame_art {
                if art.dimensions() != (frame.width, frame.height) {
                    tracing::warn!(
                        frame = %frame.name,
                        art = format!("{}x{}", art.width(), art.height()),
                        expected = format!("{}x{}", frame.width, frame.height),
                        "frame art dimensions differ from catalog, rescaling"
                    );
                    let scaled = image::imageops::resize(art, frame.width, frame.height, filter);
                    blit_over(&mut layer, &scaled, 0, 0, 1.0);
                } else {
                    blit_over(&mut layer, art, 0, 0, 1.0);
                }
            }
            layer
        }
        None => request.screenshot.clone(),
    };

    // Partial-frame cropping only applies to a framed device layer.
    if request.frame.is_some() && request.partial_frame_pct > 0.0 {
        let keep = 1.0 - (request.partial_frame_pct / 100.0).clamp(0.0, 0.9);
        let kept_h = ((layer.height() as f32 * keep).round() as u32).max(1);
        layer = image::imageops::crop_imm(&layer, 0, 0, layer.width(), kept_h).to_image();
    }

    round_corners(&mut layer, request.corner_radius);
    Ok(layer)
}

fn place_device(device: &RgbaImage, request: &CompositionRequest, out_w: u32, out_h: u32) -> PlacedDevice {
    let (dw, dh) = (device.width() as f32, device.height() as f32);
    let fit = (out_w as f32 / dw).min(out_h as f32 / dh);
    let scale = (fit * request.frame_scale).max(f32::MIN_POSITIVE);

    let tw = ((dw * scale).round() as u32).max(1);
    let th = ((dh * scale).round() as u32).max(1);
    let layer = if (tw, th) == device.dimensions() {
        device.clone()
    } else {
        image::imageops::resize(device, tw, th, image::imageops::FilterType::Lanczos3)
    };

    let x = (i64::from(out_w) - i64::from(tw)) / 2;
    let travel = i64::from(out_h) - i64::from(th);
    let y = if travel > 0 {
        (travel as f32 * request.frame_position.fraction()).round() as i64
    } else {
        0
    };
    PlacedDevice { layer, x, y }
}

/// Size, rasterize and stack the caption layer. Returns the line count.
fn draw_caption(
    canvas: &mut RgbaImage,
    caption: &CaptionRequest,
    placed: &PlacedDevice,
    out_w: u32,
    out_h: u32,
) -> usize {
    let settings = &caption.settings;
    let frame_top = placed.y.clamp(0, i64::from(out_h)) as u32;
    let frame_bottom =
        (placed.y + i64::from(placed.layer.height())).clamp(0, i64::from(out_h)) as u32;

    let (text_box, cap_y): (CaptionBox, i64) = match settings.position {
        CaptionPosition::Above => {
            let b = compute_height_adaptive(
                &caption.text,
                settings.style.font_size,
                out_w,
                out_h,
                frame_top,
                &settings.layout,
                &settings.boxing,
            );
            (b, 0)
        }
        CaptionPosition::Below => {
            let available = out_h - frame_bottom;
            let b = compute_height_adaptive(
                &caption.text,
                settings.style.font_size,
                out_w,
                out_h,
                available,
                &settings.layout,
                &settings.boxing,
            );
            let y = i64::from(out_h) - i64::from(b.height);
            (b, y.max(0))
        }
        CaptionPosition::Overlay => {
            let b = compute_height(
                &caption.text,
                settings.style.font_size,
                out_w,
                &settings.layout,
                &settings.boxing,
            );
            (b, 0)
        }
    };

    if text_box.lines.is_empty() {
        return 0;
    }

    tracing::debug!(
        lines = text_box.lines.len(),
        height = text_box.height,
        position = ?settings.position,
        "caption layout"
    );

    let layer = render(
        &text_box.lines,
        out_w,
        text_box.height,
        &settings.style,
        caption.font.as_deref(),
    );
    blit_over(canvas, &layer, 0, cap_y, 1.0);
    text_box.lines.len()
}

/// Bound the longest edge to [`PREVIEW_MAX_EDGE`], preserving aspect.
fn preview_downsample(image: &RgbaImage) -> RgbaImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= PREVIEW_MAX_EDGE {
        return image.clone();
    }
    let scale = PREVIEW_MAX_EDGE as f32 / longest as f32;
    let tw = ((w as f32 * scale).round() as u32).max(1);
    let th = ((h as f32 * scale).round() as u32).max(1);
    image::imageops::resize(image, tw, th, image::imageops::FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::registry::{DeviceClass, ScreenRect};

    fn frame() -> FrameDescriptor {
        FrameDescriptor {
            name: "test-frame".to_string(),
            display_name: "Test".to_string(),
            class: DeviceClass::Phone,
            orientation: Orientation::Portrait,
            width: 100,
            height: 200,
            screen: ScreenRect { x: 10, y: 20, width: 80, height: 160 },
        }
    }

    fn request() -> CompositionRequest {
        CompositionRequest {
            screenshot: RgbaImage::from_pixel(40, 80, image::Rgba([0, 255, 0, 255])),
            frame: None,
            frame_art: None,
            caption: None,
            background: BackgroundSpec::Solid(Rgb::new(20, 20, 20)),
            output_width: 200,
            output_height: 400,
            frame_position: FramePosition::default(),
            frame_scale: 1.0,
            partial_frame_pct: 0.0,
            corner_radius: 0,
            preview: false,
        }
    }

    #[test]
    fn output_matches_configured_resolution() {
        let out = compose(&request()).unwrap();
        assert_eq!(out.image.dimensions(), (200, 400));
        assert_eq!(out.report.width, 200);
        assert_eq!(out.report.orientation, Orientation::Portrait);
        assert!(out.report.frame_used.is_none());
    }

    #[test]
    fn frameless_screenshot_fills_canvas() {
        let out = compose(&request()).unwrap();
        // Screenshot aspect matches canvas: center pixel is screenshot green.
        assert_eq!(out.image.get_pixel(100, 200).0, [0, 255, 0, 255]);
    }

    #[test]
    fn framed_composition_reports_frame_and_draws_screen() {
        let mut req = request();
        req.frame = Some(frame());
        let out = compose(&req).unwrap();
        assert_eq!(out.report.frame_used.as_deref(), Some("test-frame"));
        // Screen content lands inside the scaled frame in the canvas center.
        assert_eq!(out.image.get_pixel(100, 200).0, [0, 255, 0, 255]);
    }

    #[test]
    fn missing_frame_art_still_composes() {
        let mut req = request();
        req.frame = Some(frame());
        req.frame_art = None;
        assert!(compose(&req).is_ok());
    }

    #[test]
    fn frame_art_is_composited_over_screenshot() {
        let mut req = request();
        let f = frame();
        // Opaque bezel everywhere: it should cover the screenshot.
        req.frame_art = Some(RgbaImage::from_pixel(f.width, f.height, image::Rgba([255, 0, 0, 255])));
        req.frame = Some(f);
        let out = compose(&req).unwrap();
        assert_eq!(out.image.get_pixel(100, 200).0, [255, 0, 0, 255]);
    }

    #[test]
    fn partial_frame_crops_bottom() {
        let mut req = request();
        req.frame = Some(frame());
        req.partial_frame_pct = 50.0;
        req.frame_scale = 0.5;
        req.frame_position = FramePosition::Percent(0.0);
        let out = compose(&req).unwrap();
        assert_eq!(out.image.dimensions(), (200, 400));
        // Bottom area is pure background since the frame is half-cropped.
        assert_eq!(out.image.get_pixel(100, 399).0, [20, 20, 20, 255]);
    }

    #[test]
    fn partial_frame_without_frame_leaves_screenshot_intact() {
        let mut req = request();
        req.partial_frame_pct = 50.0;
        let out = compose(&req).unwrap();
        // No frame: the crop does not apply and the screenshot still
        // reaches the bottom of the canvas.
        assert_eq!(out.image.get_pixel(100, 399).0, [0, 255, 0, 255]);
    }

    #[test]
    fn report_orientation_follows_selected_frame() {
        let mut req = request();
        let mut f = frame();
        f.orientation = Orientation::Landscape;
        req.frame = Some(f);
        // Portrait screenshot into a landscape frame: the frame wins.
        let out = compose(&req).unwrap();
        assert_eq!(out.report.orientation, Orientation::Landscape);
    }

    #[test]
    fn invalid_frame_is_rejected() {
        let mut req = request();
        let mut f = frame();
        f.screen.width = 500;
        req.frame = Some(f);
        assert!(compose(&req).is_err());
    }

    #[test]
    fn caption_without_font_still_counts_lines() {
        let mut req = request();
        req.frame = Some(frame());
        req.frame_scale = 0.5;
        req.frame_position = FramePosition::Percent(100.0);
        req.caption = Some(CaptionRequest {
            text: "Welcome to the app".to_string(),
            settings: CaptionSettings::default(),
            font: None,
        });
        let out = compose(&req).unwrap();
        assert!(out.report.caption_lines >= 1);
        // No font: layer is transparent, background shows through at top.
        assert_eq!(out.image.get_pixel(5, 5).0, [20, 20, 20, 255]);
    }

    #[test]
    fn empty_caption_text_draws_nothing() {
        let mut req = request();
        req.caption = Some(CaptionRequest {
            text: "   ".to_string(),
            settings: CaptionSettings::default(),
            font: None,
        });
        let out = compose(&req).unwrap();
        assert_eq!(out.report.caption_lines, 0);
    }

    #[test]
    fn preview_bounds_longest_edge() {
        let mut req = request();
        req.output_width = 1290;
        req.output_height = 2796;
        req.preview = true;
        let out = compose(&req).unwrap();
        let (w, h) = out.image.dimensions();
        assert_eq!(h, PREVIEW_MAX_EDGE);
        assert!(w < PREVIEW_MAX_EDGE);
        // Aspect preserved within rounding.
        let aspect = w as f32 / h as f32;
        assert!((aspect - 1290.0 / 2796.0).abs() < 0.01);
    }

    #[test]
    fn composition_is_deterministic() {
        let mut req = request();
        req.frame = Some(frame());
        req.corner_radius = 12;
        req.background = BackgroundSpec::Gradient(crate::background::default_gradient());
        let a = compose(&req).unwrap();
        let b = compose(&req).unwrap();
        assert_eq!(a.image.as_raw(), b.image.as_raw());
    }

    #[test]
    fn zero_output_is_rejected() {
        let mut req = request();
        req.output_width = 0;
        assert!(compose(&req).is_err());
    }

    #[test]
    fn empty_screenshot_is_rejected() {
        let mut req = request();
        req.screenshot = RgbaImage::new(0, 0);
        assert!(compose(&req).is_err());
    }
}
