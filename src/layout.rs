//! Caption layout: word wrapping and box sizing.
//!
//! Width estimation is deliberately heuristic — an average character width
//! of `font_size * factor` — rather than exact glyph metrics. The caption
//! box heights and line counts downstream are tuned against this
//! approximation, so it must stay an explicit, documented approximation.
//! The multipliers are empirical and overridable via [`LayoutOptions`].

const ELLIPSIS: char = '…';

/// Tunable layout constants.
#[derive(Clone, Copy, Debug)]
pub struct LayoutOptions {
    /// Average character width as a fraction of font size.
    pub char_width_factor: f32,
    /// Same, for narrow canvases where the caption font renders smaller.
    pub narrow_char_width_factor: f32,
    /// Canvas width below which a canvas counts as narrow (watch-class).
    pub narrow_canvas_px: u32,
    /// Horizontal padding subtracted from the wrap width, per side.
    pub padding_x: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            char_width_factor: 0.60,
            narrow_char_width_factor: 0.48,
            narrow_canvas_px: 500,
            padding_x: 24.0,
        }
    }
}

/// Caption box sizing constraints.
#[derive(Clone, Copy, Debug)]
pub struct BoxOptions {
    pub line_height: f32,
    pub padding_top: f32,
    pub padding_bottom: f32,
    pub min_height: u32,
    pub max_height: u32,
    pub max_lines: Option<usize>,
}

impl Default for BoxOptions {
    fn default() -> Self {
        Self {
            line_height: 1.25,
            padding_top: 24.0,
            padding_bottom: 24.0,
            min_height: 80,
            max_height: 600,
            max_lines: Some(3),
        }
    }
}

/// A sized caption box: wrapped lines plus the pixel height they claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptionBox {
    pub lines: Vec<String>,
    pub height: u32,
}

/// Estimated average character width for a canvas.
pub fn char_width(font_size: f32, canvas_width: u32, opts: &LayoutOptions) -> f32 {
    let factor = if canvas_width < opts.narrow_canvas_px {
        opts.narrow_char_width_factor
    } else {
        opts.char_width_factor
    };
    font_size * factor
}

/// Estimated rendered width of `text` at `font_size` on a canvas.
pub fn estimated_width(text: &str, font_size: f32, canvas_width: u32, opts: &LayoutOptions) -> f32 {
    text.chars().count() as f32 * char_width(font_size, canvas_width, opts)
}

/// Greedy word-wrap of `text` into at most `max_lines` lines fitting
/// `max_width` minus padding.
///
/// Overflow handling is a degradation policy, never an error:
/// - a single word wider than the available width is truncated with an
///   ellipsis;
/// - if the line budget runs out, the remaining words are joined and
///   truncated with an ellipsis on the last line.
pub fn wrap(
    text: &str,
    max_width: u32,
    font_size: f32,
    max_lines: Option<usize>,
    opts: &LayoutOptions,
) -> Vec<String> {
    let cw = char_width(font_size, max_width, opts);
    let available = (max_width as f32 - 2.0 * opts.padding_x).max(cw);
    let max_chars = ((available / cw).floor() as usize).max(1);

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    let mut i = 0;
    while i < words.len() {
        let word = words[i];

        if let Some(limit) = max_lines
            && lines.len() + 1 == limit.max(1)
        {
            // Last allowed line: everything left has to fit here.
            let rest = words[i..].join(" ");
            let line = if current.is_empty() {
                rest
            } else {
                format!("{current} {rest}")
            };
            lines.push(truncate_to(&line, max_chars));
            return lines;
        }

        let candidate_len = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if candidate_len <= max_chars {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            i += 1;
            continue;
        }

        if current.is_empty() {
            // Single word wider than the line: truncate it in place.
            lines.push(truncate_to(word, max_chars));
            i += 1;
        } else {
            lines.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate_to(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push(ELLIPSIS);
    out
}

/// Wrap `text` and compute the caption box height:
/// `lines * font_size * line_height + paddings`, clamped to
/// `[min_height, max_height]`. The clamp holds for any input length.
pub fn compute_height(
    text: &str,
    font_size: f32,
    canvas_width: u32,
    layout: &LayoutOptions,
    boxing: &BoxOptions,
) -> CaptionBox {
    let lines = wrap(text, canvas_width, font_size, boxing.max_lines, layout);
    let raw = lines.len() as f32 * font_size * boxing.line_height
        + boxing.padding_top
        + boxing.padding_bottom;
    let (min, max) = ordered_bounds(boxing.min_height, boxing.max_height);
    let height = (raw.ceil() as u32).clamp(min, max);
    CaptionBox { lines, height }
}

/// Adaptive variant: derives `max_height` from the device frame's vertical
/// placement on the canvas, then sizes the box within it.
///
/// A frame pinned near the top leaves almost no room above it, so the
/// caption is capped at a small fraction of the canvas; a frame pushed
/// toward the bottom lets the caption claim most of the space above it.
/// Callers must pass the frame's resolved top edge (`frame_top_y`) — or,
/// for a caption drawn below the device, the space remaining beneath it.
pub fn compute_height_adaptive(
    text: &str,
    font_size: f32,
    canvas_width: u32,
    canvas_height: u32,
    frame_top_y: u32,
    layout: &LayoutOptions,
    boxing: &BoxOptions,
) -> CaptionBox {
    let canvas_h = canvas_height as f32;
    let available = frame_top_y as f32;

    let max = if available < canvas_h * 0.15 {
        canvas_h * 0.12
    } else {
        (available * 0.9).clamp(canvas_h * 0.08, canvas_h * 0.5)
    };
    let max = (max.ceil() as u32).max(1);

    let adapted = BoxOptions {
        max_height: max,
        min_height: boxing.min_height.min(max),
        ..*boxing
    };
    compute_height(text, font_size, canvas_width, layout, &adapted)
}

fn ordered_bounds(min: u32, max: u32) -> (u32, u32) {
    if min <= max { (min, max) } else { (max, max) }
}
