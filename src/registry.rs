//! Device frame catalog.
//!
//! The registry is loaded once at startup (builtin table, optionally
//! replaced or extended by a JSON catalog file) and is immutable afterwards.
//! It is plain read-only data, safe to share by reference across all
//! concurrent composition tasks without synchronization.
//!
//! Bezel bitmaps are separate on-disk assets resolved by naming convention
//! (`<frames_dir>/<name>.png`). A catalog entry whose art file is missing is
//! still selectable: callers get the metadata (so layout stays correct) and
//! a warning, never a failure.

use std::path::Path;

use anyhow::Context as _;

use crate::error::{StoreshotError, StoreshotResult};

/// Minimum fraction of the frame area the screen cutout must cover.
/// Guards against malformed catalog metadata (e.g. swapped width/height).
const MIN_CUTOUT_AREA_FRACTION: f64 = 0.30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Phone,
    Tablet,
    Desktop,
    Watch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Orientation of a raw screenshot. Square counts as portrait.
    pub fn of(width: u32, height: u32) -> Self {
        if width > height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }
}

/// Screen cutout rectangle inside a frame image, in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScreenRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FrameDescriptor {
    pub name: String,
    pub display_name: String,
    pub class: DeviceClass,
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
    pub screen: ScreenRect,
}

impl FrameDescriptor {
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn validate(&self) -> StoreshotResult<()> {
        if self.name.trim().is_empty() {
            return Err(StoreshotError::validation("frame name must be non-empty"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(StoreshotError::validation(format!(
                "frame '{}' has zero dimensions",
                self.name
            )));
        }
        let s = &self.screen;
        if s.width == 0 || s.height == 0 {
            return Err(StoreshotError::validation(format!(
                "frame '{}' has an empty screen rect",
                self.name
            )));
        }
        let right = s.x.checked_add(s.width);
        let bottom = s.y.checked_add(s.height);
        if right.is_none_or(|r| r > self.width) || bottom.is_none_or(|b| b > self.height) {
            return Err(StoreshotError::validation(format!(
                "frame '{}' screen rect {}x{}+{}+{} exceeds frame bounds {}x{}",
                self.name, s.width, s.height, s.x, s.y, self.width, self.height
            )));
        }
        let cutout = f64::from(s.width) * f64::from(s.height);
        let total = f64::from(self.width) * f64::from(self.height);
        if cutout / total < MIN_CUTOUT_AREA_FRACTION {
            return Err(StoreshotError::validation(format!(
                "frame '{}' screen rect covers less than {}% of the frame",
                self.name,
                (MIN_CUTOUT_AREA_FRACTION * 100.0) as u32
            )));
        }
        Ok(())
    }
}

/// The immutable frame catalog.
#[derive(Clone, Debug)]
pub struct FrameRegistry {
    frames: Vec<FrameDescriptor>,
}

impl FrameRegistry {
    /// Build a registry from explicit descriptors, rejecting invalid entries
    /// and duplicate names. Registry order is selection tie-break order.
    pub fn new(frames: Vec<FrameDescriptor>) -> StoreshotResult<Self> {
        if frames.is_empty() {
            return Err(StoreshotError::registry("frame catalog is empty"));
        }
        for (i, f) in frames.iter().enumerate() {
            f.validate()?;
            if frames[..i].iter().any(|other| other.name == f.name) {
                return Err(StoreshotError::registry(format!(
                    "duplicate frame name '{}'",
                    f.name
                )));
            }
        }
        Ok(Self { frames })
    }

    /// The compiled-in catalog of common device frames.
    pub fn builtin() -> Self {
        Self::new(builtin_frames()).expect("builtin catalog is valid")
    }

    /// Load a catalog from a JSON array of descriptors, replacing the
    /// builtin table entirely.
    pub fn from_json(bytes: &[u8]) -> StoreshotResult<Self> {
        let frames: Vec<FrameDescriptor> =
            serde_json::from_slice(bytes).context("parse frame catalog JSON")?;
        Self::new(frames)
    }

    pub fn from_json_file(path: &Path) -> StoreshotResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read frame catalog '{}'", path.display()))?;
        Self::from_json(&bytes)
    }

    pub fn frames(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    pub fn by_name(&self, name: &str) -> Option<&FrameDescriptor> {
        self.frames.iter().find(|f| f.name == name)
    }

    /// Load the bezel bitmap for a frame from `frames_dir`, by naming
    /// convention. Missing or undecodable art degrades to `None` with a
    /// warning: the frame is "selected but not rendered" and the caller
    /// keeps using the descriptor for layout.
    pub fn load_frame_art(&self, frame: &FrameDescriptor, frames_dir: &Path) -> Option<image::RgbaImage> {
        let path = frames_dir.join(format!("{}.png", frame.name));
        match image::open(&path) {
            Ok(img) => Some(img.to_rgba8()),
            Err(err) => {
                tracing::warn!(
                    frame = %frame.name,
                    path = %path.display(),
                    %err,
                    "frame art unavailable, compositing without bezel"
                );
                None
            }
        }
    }
}

fn builtin_frames() -> Vec<FrameDescriptor> {
    fn f(
        name: &str,
        display_name: &str,
        class: DeviceClass,
        orientation: Orientation,
        width: u32,
        height: u32,
        screen: ScreenRect,
    ) -> FrameDescriptor {
        FrameDescriptor {
            name: name.to_string(),
            display_name: display_name.to_string(),
            class,
            orientation,
            width,
            height,
            screen,
        }
    }

    use DeviceClass::*;
    use Orientation::*;

    vec![
        f(
            "phone-6.7-portrait",
            "Phone 6.7\" (portrait)",
            Phone,
            Portrait,
            1380,
            2910,
            ScreenRect { x: 45, y: 57, width: 1290, height: 2796 },
        ),
        f(
            "phone-6.7-landscape",
            "Phone 6.7\" (landscape)",
            Phone,
            Landscape,
            2910,
            1380,
            ScreenRect { x: 57, y: 45, width: 2796, height: 1290 },
        ),
        f(
            "phone-6.1-portrait",
            "Phone 6.1\" (portrait)",
            Phone,
            Portrait,
            1260,
            2700,
            ScreenRect { x: 42, y: 52, width: 1179, height: 2556 },
        ),
        f(
            "phone-6.1-landscape",
            "Phone 6.1\" (landscape)",
            Phone,
            Landscape,
            2700,
            1260,
            ScreenRect { x: 52, y: 42, width: 2556, height: 1179 },
        ),
        f(
            "phone-5.5-portrait",
            "Phone 5.5\" (portrait)",
            Phone,
            Portrait,
            1350,
            2500,
            ScreenRect { x: 54, y: 146, width: 1242, height: 2208 },
        ),
        f(
            "tablet-12.9-portrait",
            "Tablet 12.9\" (portrait)",
            Tablet,
            Portrait,
            2210,
            2900,
            ScreenRect { x: 80, y: 86, width: 2048, height: 2732 },
        ),
        f(
            "tablet-12.9-landscape",
            "Tablet 12.9\" (landscape)",
            Tablet,
            Landscape,
            2900,
            2210,
            ScreenRect { x: 86, y: 80, width: 2732, height: 2048 },
        ),
        f(
            "tablet-11-portrait",
            "Tablet 11\" (portrait)",
            Tablet,
            Portrait,
            1800,
            2500,
            ScreenRect { x: 66, y: 56, width: 1668, height: 2388 },
        ),
        f(
            "desktop-16",
            "Desktop 16\"",
            Desktop,
            Landscape,
            3700,
            2250,
            ScreenRect { x: 122, y: 120, width: 3456, height: 2000 },
        ),
        f(
            "desktop-27",
            "Desktop 27\"",
            Desktop,
            Landscape,
            5400,
            3100,
            ScreenRect { x: 140, y: 130, width: 5120, height: 2880 },
        ),
        f(
            "watch-45mm",
            "Watch 45mm",
            Watch,
            Portrait,
            460,
            650,
            ScreenRect { x: 31, y: 82, width: 396, height: 484 },
        ),
        f(
            "watch-49mm",
            "Watch 49mm",
            Watch,
            Portrait,
            496,
            690,
            ScreenRect { x: 43, y: 94, width: 410, height: 502 },
        ),
    ]
}
