//! Caption rasterization.
//!
//! Turns wrapped caption lines into a transparent RGBA layer. Everything
//! here is cosmetic, so every failure path degrades instead of erroring:
//! an unloadable font yields a fully transparent layer of the requested
//! size, and an unparsable color falls back to the default. Callers see a
//! blank caption layer, never a crashed build.
//!
//! Glyph metrics are consulted only here, at raster time; layout upstream
//! works from the heuristic estimator in [`crate::layout`].

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::RgbaImage;
use imageproc::drawing::{draw_text_mut, text_size};

use crate::color::{DEFAULT_CAPTION_COLOR, Rgb};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Resolved caption style, colors already validated.
#[derive(Clone, Debug)]
pub struct CaptionStyle {
    pub font_size: f32,
    pub color: Rgb,
    pub alignment: Alignment,
    pub line_height: f32,
    pub padding_top: f32,
    pub padding_x: f32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: 64.0,
            color: DEFAULT_CAPTION_COLOR,
            alignment: Alignment::Center,
            line_height: 1.25,
            padding_top: 24.0,
            padding_x: 24.0,
        }
    }
}

/// A loaded caption font. Absence of one is a valid state: rendering
/// without a font produces a transparent layer.
pub struct CaptionFont {
    font: FontVec,
}

impl CaptionFont {
    /// Load a font file. Missing or unparsable fonts degrade to `None`
    /// with a warning.
    pub fn load(path: &Path) -> Option<Self> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "caption font unreadable, captions will be blank");
                return None;
            }
        };
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        match FontVec::try_from_vec(bytes) {
            Ok(font) => Some(Self { font }),
            Err(err) => {
                tracing::warn!(%err, "caption font failed to parse, captions will be blank");
                None
            }
        }
    }
}

/// Strip characters the shaping step must never see. The rasterizer here is
/// glyph-based rather than markup-based, so sanitizing reduces to removing
/// control characters.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// Rasterize wrapped caption lines into a transparent `width`x`height`
/// layer. Lines are placed starting at `padding_top`, advancing by
/// `font_size * line_height`; each line is aligned independently.
pub fn render(
    lines: &[String],
    width: u32,
    height: u32,
    style: &CaptionStyle,
    font: Option<&CaptionFont>,
) -> RgbaImage {
    let mut layer = RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 0]));
    let Some(font) = font else {
        return layer;
    };
    if lines.is_empty() || style.font_size <= 0.0 {
        return layer;
    }

    let scale = PxScale::from(style.font_size);
    let color = image::Rgba(style.color.to_rgba(255));
    let advance = style.font_size * style.line_height;
    let mut y = style.padding_top;

    for line in lines {
        let line = sanitize(line);
        if line.is_empty() {
            y += advance;
            continue;
        }
        let (tw, _) = text_size(scale, &font.font, &line);
        let x = match style.alignment {
            Alignment::Left => style.padding_x,
            Alignment::Center => (width as f32 - tw as f32) / 2.0,
            Alignment::Right => width as f32 - tw as f32 - style.padding_x,
        };
        draw_text_mut(
            &mut layer,
            color,
            x.max(0.0).round() as i32,
            y.max(0.0).round() as i32,
            scale,
            &font.font,
            &line,
        );
        y += advance;
    }

    layer
}
