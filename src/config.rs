//! Device build configuration.
//!
//! Raw config structs carry optional per-device overrides; [`resolve`]
//! merges them over global defaults into one fully-resolved struct. The
//! engine only ever consumes resolved values — optional override chains
//! stop here.

use std::path::PathBuf;

use crate::background::{BackgroundSpec, FitMode, GradientDirection, GradientSpec, MAX_GRADIENT_STOPS, default_gradient, preset};
use crate::color::{DEFAULT_CAPTION_COLOR, Rgb};
use crate::error::{StoreshotError, StoreshotResult};
use crate::layout::{BoxOptions, LayoutOptions};
use crate::registry::DeviceClass;
use crate::text::{Alignment, CaptionStyle};

/// Where the caption sits relative to the device layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionPosition {
    Above,
    Below,
    Overlay,
}

/// Vertical placement of the device frame on the canvas: a keyword or a
/// 0–100 percentage of the available vertical travel.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FramePosition {
    Keyword(FramePositionKeyword),
    Percent(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePositionKeyword {
    Top,
    Center,
    Bottom,
}

impl FramePosition {
    /// Placement as a fraction of the available vertical travel.
    pub fn fraction(&self) -> f32 {
        match self {
            Self::Keyword(FramePositionKeyword::Top) => 0.0,
            Self::Keyword(FramePositionKeyword::Center) => 0.5,
            Self::Keyword(FramePositionKeyword::Bottom) => 1.0,
            Self::Percent(p) => (p / 100.0).clamp(0.0, 1.0) as f32,
        }
    }
}

impl Default for FramePosition {
    fn default() -> Self {
        Self::Keyword(FramePositionKeyword::Center)
    }
}

/// Raw per-device caption overrides.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub font: Option<PathBuf>,
    pub size: Option<f32>,
    pub color: Option<String>,
    pub align: Option<Alignment>,
    pub position: Option<CaptionPosition>,
    pub padding: Option<f32>,
    pub max_lines: Option<usize>,
    pub line_height: Option<f32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
}

/// Raw per-device background override.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Gradient preset id (see [`crate::background::preset`]).
    pub preset: Option<String>,
    /// Custom gradient colors (hex or named), overriding `preset`.
    pub colors: Option<Vec<String>>,
    pub direction: Option<GradientDirection>,
    /// Explicit background image path.
    pub image: Option<PathBuf>,
    pub fit: Option<FitMode>,
    /// Discover a background image next to the screenshots.
    pub auto: Option<bool>,
}

/// Raw per-device build parameters, as loaded from a config file.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct DeviceConfig {
    pub input_dir: PathBuf,
    pub class: DeviceClass,
    pub output_width: u32,
    pub output_height: u32,
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub auto_frame: Option<bool>,
    #[serde(default)]
    pub frame_position: Option<FramePosition>,
    #[serde(default)]
    pub frame_scale: Option<f32>,
    /// Percentage of the frame's bottom edge to crop (partial frame).
    #[serde(default)]
    pub partial_frame: Option<f32>,
    #[serde(default)]
    pub corner_radius: Option<i32>,
    #[serde(default)]
    pub caption: Option<CaptionConfig>,
    #[serde(default)]
    pub background: Option<BackgroundConfig>,
}

/// Global defaults layered under every device.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub frame_position: Option<FramePosition>,
    pub frame_scale: Option<f32>,
    pub corner_radius: Option<i32>,
    pub caption: Option<CaptionConfig>,
    pub background: Option<BackgroundConfig>,
}

/// Fully-resolved caption settings.
#[derive(Clone, Debug)]
pub struct CaptionSettings {
    pub font: Option<PathBuf>,
    pub style: CaptionStyle,
    pub position: CaptionPosition,
    pub layout: LayoutOptions,
    pub boxing: BoxOptions,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            font: None,
            style: CaptionStyle::default(),
            position: CaptionPosition::Above,
            layout: LayoutOptions::default(),
            boxing: BoxOptions::default(),
        }
    }
}

/// Fully-resolved per-device configuration, the only shape the engine sees.
#[derive(Clone, Debug)]
pub struct ResolvedDeviceConfig {
    pub input_dir: PathBuf,
    pub class: DeviceClass,
    pub output_width: u32,
    pub output_height: u32,
    pub preferred_frame: Option<String>,
    pub auto_frame: bool,
    pub frame_position: FramePosition,
    pub frame_scale: f32,
    /// 0 disables partial-frame cropping.
    pub partial_frame_pct: f32,
    pub corner_radius: i32,
    pub caption: CaptionSettings,
    pub background: BackgroundSpec,
}

/// Merge a device config over global defaults into resolved values.
/// Output resolution must be valid here: a zero dimension is batch-fatal.
pub fn resolve(defaults: &Defaults, device: &DeviceConfig) -> StoreshotResult<ResolvedDeviceConfig> {
    if device.output_width == 0 || device.output_height == 0 {
        return Err(StoreshotError::validation(format!(
            "output resolution {}x{} is invalid",
            device.output_width, device.output_height
        )));
    }

    let caption = resolve_caption(defaults.caption.as_ref(), device.caption.as_ref());
    let background = resolve_background(
        defaults.background.as_ref(),
        device.background.as_ref(),
        &device.input_dir,
    );

    Ok(ResolvedDeviceConfig {
        input_dir: device.input_dir.clone(),
        class: device.class,
        output_width: device.output_width,
        output_height: device.output_height,
        preferred_frame: device.frame.clone(),
        auto_frame: device.auto_frame.unwrap_or(true),
        frame_position: device
            .frame_position
            .or(defaults.frame_position)
            .unwrap_or_default(),
        frame_scale: device
            .frame_scale
            .or(defaults.frame_scale)
            .unwrap_or(1.0)
            .clamp(0.1, 2.0),
        partial_frame_pct: device.partial_frame.unwrap_or(0.0).clamp(0.0, 90.0),
        corner_radius: device
            .corner_radius
            .or(defaults.corner_radius)
            .unwrap_or(0),
        caption,
        background,
    })
}

fn resolve_caption(defaults: Option<&CaptionConfig>, device: Option<&CaptionConfig>) -> CaptionSettings {
    let pick = |get: fn(&CaptionConfig) -> Option<f32>| -> Option<f32> {
        device.and_then(get).or_else(|| defaults.and_then(get))
    };

    let base = CaptionSettings::default();
    let font = device
        .and_then(|c| c.font.clone())
        .or_else(|| defaults.and_then(|c| c.font.clone()));
    let color = device
        .and_then(|c| c.color.as_deref())
        .or_else(|| defaults.and_then(|c| c.color.as_deref()))
        .map(|s| Rgb::parse_or(s, DEFAULT_CAPTION_COLOR))
        .unwrap_or(DEFAULT_CAPTION_COLOR);

    let font_size = pick(|c| c.size).unwrap_or(base.style.font_size).max(1.0);
    let line_height = pick(|c| c.line_height).unwrap_or(base.style.line_height).max(0.5);
    let padding = pick(|c| c.padding).unwrap_or(base.style.padding_top).max(0.0);

    let style = CaptionStyle {
        font_size,
        color,
        alignment: device
            .and_then(|c| c.align)
            .or_else(|| defaults.and_then(|c| c.align))
            .unwrap_or(base.style.alignment),
        line_height,
        padding_top: padding,
        padding_x: padding,
    };

    let boxing = BoxOptions {
        line_height,
        padding_top: padding,
        padding_bottom: padding,
        min_height: device
            .and_then(|c| c.min_height)
            .or_else(|| defaults.and_then(|c| c.min_height))
            .unwrap_or(base.boxing.min_height),
        max_height: device
            .and_then(|c| c.max_height)
            .or_else(|| defaults.and_then(|c| c.max_height))
            .unwrap_or(base.boxing.max_height),
        max_lines: device
            .and_then(|c| c.max_lines)
            .or_else(|| defaults.and_then(|c| c.max_lines))
            .or(base.boxing.max_lines),
    };

    CaptionSettings {
        font,
        style,
        position: device
            .and_then(|c| c.position)
            .or_else(|| defaults.and_then(|c| c.position))
            .unwrap_or(base.position),
        layout: LayoutOptions {
            padding_x: padding,
            ..base.layout
        },
        boxing,
    }
}

fn resolve_background(
    defaults: Option<&BackgroundConfig>,
    device: Option<&BackgroundConfig>,
    input_dir: &std::path::Path,
) -> BackgroundSpec {
    let merged = BackgroundConfig {
        preset: device.and_then(|b| b.preset.clone()).or_else(|| defaults.and_then(|b| b.preset.clone())),
        colors: device.and_then(|b| b.colors.clone()).or_else(|| defaults.and_then(|b| b.colors.clone())),
        direction: device.and_then(|b| b.direction).or_else(|| defaults.and_then(|b| b.direction)),
        image: device.and_then(|b| b.image.clone()).or_else(|| defaults.and_then(|b| b.image.clone())),
        fit: device.and_then(|b| b.fit).or_else(|| defaults.and_then(|b| b.fit)),
        auto: device.and_then(|b| b.auto).or_else(|| defaults.and_then(|b| b.auto)),
    };

    let gradient = gradient_from(&merged);

    if let Some(path) = merged.image {
        return BackgroundSpec::Image { path, fit: merged.fit };
    }
    if merged.auto.unwrap_or(false) {
        return BackgroundSpec::Auto {
            dir: input_dir.to_path_buf(),
            gradient,
        };
    }
    BackgroundSpec::Gradient(gradient)
}

fn gradient_from(cfg: &BackgroundConfig) -> GradientSpec {
    if let Some(raw) = &cfg.colors {
        let mut colors: Vec<Rgb> = raw.iter().filter_map(|s| Rgb::parse(s)).collect();
        if colors.len() < raw.len() {
            tracing::warn!("ignoring unparsable gradient colors");
        }
        if colors.len() > MAX_GRADIENT_STOPS {
            tracing::warn!(
                "gradient supports at most {MAX_GRADIENT_STOPS} colors, extra stops ignored"
            );
            colors.truncate(MAX_GRADIENT_STOPS);
        }
        if !colors.is_empty() {
            let direction = cfg.direction.unwrap_or(GradientDirection::TopBottom);
            return GradientSpec { colors, direction };
        }
        tracing::warn!("no usable gradient colors, using default gradient");
    }

    if let Some(id) = &cfg.preset {
        if let Some(mut g) = preset(id) {
            if let Some(dir) = cfg.direction {
                g.direction = dir;
            }
            return g;
        }
        tracing::warn!(preset = %id, "unknown gradient preset, using default");
    }

    let mut g = default_gradient();
    if let Some(dir) = cfg.direction {
        g.direction = dir;
    }
    g
}
