#![forbid(unsafe_code)]

pub mod background;
pub mod batch;
pub mod color;
pub mod compose;
pub mod composite;
pub mod config;
pub mod error;
pub mod layout;
pub mod mask;
pub mod registry;
pub mod select;
pub mod text;

pub use background::{BackgroundSpec, FitMode, GradientDirection, GradientSpec};
pub use batch::{BatchOptions, BatchStats, CaptionSource, ComposeOutcome, run_batch};
pub use color::Rgb;
pub use compose::{CaptionRequest, ComposeOutput, ComposeReport, CompositionRequest, compose};
pub use config::{
    CaptionConfig, CaptionPosition, CaptionSettings, Defaults, DeviceConfig, FramePosition,
    ResolvedDeviceConfig, resolve,
};
pub use error::{StoreshotError, StoreshotResult};
pub use layout::{
    BoxOptions, CaptionBox, LayoutOptions, compute_height, compute_height_adaptive, wrap,
};
pub use registry::{DeviceClass, FrameDescriptor, FrameRegistry, Orientation, ScreenRect};
pub use select::select_frame;
pub use text::{Alignment, CaptionFont, CaptionStyle};
