//! Batch orchestration.
//!
//! The screenshots for one (device, language) build are processed in
//! filename-sorted order, partitioned into fixed-size groups, and each
//! group runs concurrently on an explicitly-sized rayon pool. The runner
//! waits for a group to fully complete before starting the next, which
//! bounds peak memory: every in-flight composition holds several
//! full-resolution bitmaps.
//!
//! Completion order within a group is not guaranteed; outcome records are
//! re-assembled in input order. Per-item failures are caught exactly here
//! and converted into records, so one corrupt screenshot never aborts the
//! batch. The frame registry is read-only shared data and crosses task
//! boundaries by reference without synchronization.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use rayon::prelude::*;

use crate::compose::{CaptionRequest, CompositionRequest, compose};
use crate::config::ResolvedDeviceConfig;
use crate::error::{StoreshotError, StoreshotResult};
use crate::registry::{FrameRegistry, Orientation};
use crate::select::select_frame;
use crate::text::CaptionFont;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Clone, Debug)]
pub struct BatchOptions {
    /// Worker count and group size.
    pub concurrency: usize,
    pub output_dir: PathBuf,
    /// Directory holding bezel art (`<name>.png`). None: compose without art.
    pub frames_dir: Option<PathBuf>,
    pub preview: bool,
}

impl BatchOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            output_dir: output_dir.into(),
            frames_dir: None,
            preview: false,
        }
    }
}

/// Caption text source for a batch. Text arrives already translated.
#[derive(Clone, Debug, Default)]
pub enum CaptionSource {
    #[default]
    None,
    /// Same caption for every screenshot.
    Uniform(String),
    /// Per-screenshot captions keyed by file stem.
    PerStem(BTreeMap<String, String>),
}

impl CaptionSource {
    fn for_stem(&self, stem: &str) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Uniform(text) => Some(text),
            Self::PerStem(map) => map.get(stem).map(String::as_str),
        }
    }
}

/// Per-screenshot outcome record.
#[derive(Clone, Debug)]
pub struct ComposeOutcome {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub frame_used: Option<String>,
    pub orientation: Option<Orientation>,
    pub error: Option<String>,
}

impl ComposeOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Compose every screenshot in the device's input directory.
///
/// Batch-fatal conditions (unreadable input directory, uncreatable output
/// directory, invalid concurrency) return `Err`; everything per-item is
/// captured in the outcome records.
pub fn run_batch(
    registry: &FrameRegistry,
    config: &ResolvedDeviceConfig,
    captions: &CaptionSource,
    opts: &BatchOptions,
) -> StoreshotResult<(Vec<ComposeOutcome>, BatchStats)> {
    let inputs = list_screenshots(&config.input_dir)?;
    if inputs.is_empty() {
        tracing::warn!(dir = %config.input_dir.display(), "no screenshots found");
        return Ok((Vec::new(), BatchStats::default()));
    }

    std::fs::create_dir_all(&opts.output_dir)
        .with_context(|| format!("create output dir '{}'", opts.output_dir.display()))?;

    // Loaded once, shared by every task in every group.
    let font: Option<Arc<CaptionFont>> = config
        .caption
        .font
        .as_deref()
        .and_then(CaptionFont::load)
        .map(Arc::new);

    let pool = build_thread_pool(opts.concurrency)?;
    let group_size = opts.concurrency.max(1);

    let mut outcomes = Vec::with_capacity(inputs.len());
    for group in inputs.chunks(group_size) {
        // Group barrier: collect joins every task before the next group starts.
        let group_outcomes: Vec<ComposeOutcome> = pool.install(|| {
            group
                .par_iter()
                .map(|input| process_one(registry, config, captions, opts, font.clone(), input))
                .collect()
        });
        outcomes.extend(group_outcomes);
    }

    let stats = BatchStats {
        total: outcomes.len() as u64,
        succeeded: outcomes.iter().filter(|o| o.succeeded()).count() as u64,
        failed: outcomes.iter().filter(|o| !o.succeeded()).count() as u64,
    };
    tracing::info!(
        total = stats.total,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "batch finished"
    );
    Ok((outcomes, stats))
}

fn process_one(
    registry: &FrameRegistry,
    config: &ResolvedDeviceConfig,
    captions: &CaptionSource,
    opts: &BatchOptions,
    font: Option<Arc<CaptionFont>>,
    input: &Path,
) -> ComposeOutcome {
    match compose_one(registry, config, captions, opts, font, input) {
        Ok((output, frame_used, orientation)) => ComposeOutcome {
            input: input.to_path_buf(),
            output: Some(output),
            frame_used,
            orientation: Some(orientation),
            error: None,
        },
        Err(err) => {
            tracing::warn!(input = %input.display(), %err, "composition failed");
            ComposeOutcome {
                input: input.to_path_buf(),
                output: None,
                frame_used: None,
                orientation: None,
                error: Some(err.to_string()),
            }
        }
    }
}

fn compose_one(
    registry: &FrameRegistry,
    config: &ResolvedDeviceConfig,
    captions: &CaptionSource,
    opts: &BatchOptions,
    font: Option<Arc<CaptionFont>>,
    input: &Path,
) -> StoreshotResult<(PathBuf, Option<String>, Orientation)> {
    let screenshot = image::open(input)
        .with_context(|| format!("decode screenshot '{}'", input.display()))?
        .to_rgba8();
    let (sw, sh) = screenshot.dimensions();

    let frame = if config.auto_frame || config.preferred_frame.is_some() {
        select_frame(registry, sw, sh, config.class, config.preferred_frame.as_deref()).cloned()
    } else {
        None
    };
    let frame_art = match (&frame, &opts.frames_dir) {
        (Some(f), Some(dir)) => registry.load_frame_art(f, dir),
        _ => None,
    };

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let caption = captions.for_stem(&stem).map(|text| CaptionRequest {
        text: text.to_string(),
        settings: config.caption.clone(),
        font,
    });

    let request = CompositionRequest {
        screenshot,
        frame,
        frame_art,
        caption,
        background: config.background.clone(),
        output_width: config.output_width,
        output_height: config.output_height,
        frame_position: config.frame_position,
        frame_scale: config.frame_scale,
        partial_frame_pct: config.partial_frame_pct,
        corner_radius: config.corner_radius,
        preview: opts.preview,
    };

    let out = compose(&request)?;
    let output = opts.output_dir.join(format!("{stem}.png"));
    out.image
        .save_with_format(&output, image::ImageFormat::Png)
        .with_context(|| format!("write output '{}'", output.display()))?;

    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        frame = ?out.report.frame_used,
        "composed"
    );
    Ok((output, out.report.frame_used, out.report.orientation))
}

/// Screenshots in filename-sorted order. Background images discovered by
/// naming convention are not inputs.
fn list_screenshots(dir: &Path) -> StoreshotResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read input dir '{}'", dir.display()))?;

    let mut inputs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read input dir '{}'", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        if !matches!(ext.as_deref(), Some("png" | "jpg" | "jpeg")) {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.starts_with("background.") {
            continue;
        }
        inputs.push(path);
    }
    inputs.sort();
    Ok(inputs)
}

fn build_thread_pool(threads: usize) -> StoreshotResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(StoreshotError::validation("batch concurrency must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| StoreshotError::composite(format!("failed to build thread pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_source_lookup() {
        let none = CaptionSource::None;
        assert!(none.for_stem("a").is_none());

        let uniform = CaptionSource::Uniform("hi".to_string());
        assert_eq!(uniform.for_stem("anything"), Some("hi"));

        let mut map = BTreeMap::new();
        map.insert("01-home".to_string(), "Home".to_string());
        let per = CaptionSource::PerStem(map);
        assert_eq!(per.for_stem("01-home"), Some("Home"));
        assert!(per.for_stem("02-detail").is_none());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(build_thread_pool(0).is_err());
        assert!(build_thread_pool(1).is_ok());
    }

    #[test]
    fn missing_input_dir_is_batch_fatal() {
        let registry = FrameRegistry::builtin();
        let config = crate::config::resolve(
            &crate::config::Defaults::default(),
            &crate::config::DeviceConfig {
                input_dir: PathBuf::from("/nonexistent/shots"),
                class: crate::registry::DeviceClass::Phone,
                output_width: 100,
                output_height: 200,
                frame: None,
                auto_frame: None,
                frame_position: None,
                frame_scale: None,
                partial_frame: None,
                corner_radius: None,
                caption: None,
                background: None,
            },
        )
        .unwrap();
        let opts = BatchOptions::new(std::env::temp_dir().join("storeshot-test-out"));
        assert!(run_batch(&registry, &config, &CaptionSource::None, &opts).is_err());
    }
}
