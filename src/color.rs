//! Caption/background color parsing.
//!
//! Color input is cosmetic: anything that fails to parse falls back to a
//! documented default instead of erroring, so a bad hex string can never
//! abort a build. The degrade boundary is the typed [`Rgb::parse_or`]
//! return value, not a caught exception.

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Default caption color when parsing fails or nothing is configured.
pub const DEFAULT_CAPTION_COLOR: Rgb = Rgb::new(255, 255, 255);

const NAMED: &[(&str, Rgb)] = &[
    ("white", Rgb::new(255, 255, 255)),
    ("black", Rgb::new(0, 0, 0)),
    ("red", Rgb::new(220, 38, 38)),
    ("green", Rgb::new(22, 163, 74)),
    ("blue", Rgb::new(37, 99, 235)),
    ("yellow", Rgb::new(234, 179, 8)),
    ("orange", Rgb::new(234, 88, 12)),
    ("purple", Rgb::new(147, 51, 234)),
    ("gray", Rgb::new(107, 114, 128)),
    ("grey", Rgb::new(107, 114, 128)),
];

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Strict parse: `#RGB`, `#RRGGBB` (leading `#` optional), or a name
    /// from the small named table. Returns `None` on anything else.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some(c) = NAMED
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, c)| *c)
        {
            return Some(c);
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let mut it = hex.chars();
                let (r, g, b) = (it.next()?, it.next()?, it.next()?);
                Some(Self::new(expand_nibble(r)?, expand_nibble(g)?, expand_nibble(b)?))
            }
            6 => Some(Self::new(
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            _ => None,
        }
    }

    /// Lenient parse used everywhere a color is cosmetic: falls back to
    /// `default` (with a warning) when the input is unparsable.
    pub fn parse_or(input: &str, default: Rgb) -> Self {
        match Self::parse(input) {
            Some(c) => c,
            None => {
                tracing::warn!(input, "unrecognized color, using default");
                default
            }
        }
    }

    pub fn to_rgba(self, a: u8) -> [u8; 4] {
        [self.r, self.g, self.b, a]
    }
}

fn expand_nibble(c: char) -> Option<u8> {
    let v = c.to_digit(16)? as u8;
    Some(v << 4 | v)
}
