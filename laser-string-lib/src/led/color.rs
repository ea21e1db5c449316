use std::fmt;

use palette::{FromColor, Hsl, Srgb};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RGB {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RGB {
    pub const BLACK: RGB = RGB::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        RGB { red, green, blue }
    }

    /// Wire order: red, green, blue.
    pub fn to_bytes(self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

impl fmt::Display for RGB {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl From<(u8, u8, u8)> for RGB {
    fn from(tuple: (u8, u8, u8)) -> Self {
        RGB::new(tuple.0, tuple.1, tuple.2)
    }
}

impl From<Srgb<u8>> for RGB {
    fn from(color: Srgb<u8>) -> Self {
        RGB::new(color.red, color.green, color.blue)
    }
}

/// Brightness adjustment as a signed percentage of the color's lightness.
///
/// `-100` turns everything black, `0` leaves colors untouched and `100`
/// doubles the lightness (saturating at white). The default is a very dim
/// `-98`, which keeps a bare string of lights from blinding anyone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brightness(f32);

impl Brightness {
    pub const FULL: Brightness = Brightness(0.0);
    pub const DIM: Brightness = Brightness(-98.0);

    /// Values outside `[-100, 100]` are clamped.
    pub fn new(percent: f32) -> Self {
        if percent.is_nan() {
            return Self::FULL;
        }
        Brightness(percent.clamp(-100.0, 100.0))
    }

    pub fn percent(&self) -> f32 {
        self.0
    }

    /// Multiplier applied to the HSL lightness.
    pub fn factor(&self) -> f32 {
        (1.0 + self.0 / 100.0).clamp(0.0, 2.0)
    }

    /// Scales the lightness of `color`. For colors at or below half lightness
    /// this scales every channel by [`Brightness::factor`].
    pub fn apply(&self, color: RGB) -> RGB {
        if self.0 == 0.0 {
            return color;
        }
        let rgb: Srgb<f32> = Srgb::new(color.red, color.green, color.blue).into_format();
        let mut hsl: Hsl = Hsl::from_color(rgb);
        hsl.lightness = (hsl.lightness * self.factor()).clamp(0.0, 1.0);
        let adjusted: Srgb = Srgb::from_color(hsl);
        RGB::new(
            to_channel(adjusted.red),
            to_channel(adjusted.green),
            to_channel(adjusted.blue),
        )
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self::DIM
    }
}

/// Fractions are dropped, the way the controller's byte packing does it.
fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// One step in the color resolution chain.
pub trait ColorLookup: Send + Sync {
    /// Returns `None` when this strategy does not recognize the token.
    fn lookup(&self, token: &str) -> Option<RGB>;
}

/// CSS/SVG color names such as `blue` or `rebeccapurple`.
///
/// Matching is exact and case-sensitive. Symbol notation (`:blue`) is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedColors;

impl ColorLookup for NamedColors {
    fn lookup(&self, token: &str) -> Option<RGB> {
        let name = token.strip_prefix(':').unwrap_or(token);
        palette::named::from_str(name).map(RGB::from)
    }
}

/// HTML hex colors: `#RRGGBB`, `RRGGBB` or the short `#RGB` form.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexColors;

impl ColorLookup for HexColors {
    fn lookup(&self, token: &str) -> Option<RGB> {
        token.parse::<Srgb<u8>>().ok().map(RGB::from)
    }
}

/// Turns color tokens into dimmed RGB values.
///
/// Lookups are tried in order: named colors, then hex strings, then any
/// extra strategies added with [`ColorResolver::with_lookup`].
pub struct ColorResolver {
    lookups: Vec<Box<dyn ColorLookup>>,
    brightness: Brightness,
}

impl Default for ColorResolver {
    fn default() -> Self {
        Self::new(Brightness::default())
    }
}

impl fmt::Debug for ColorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorResolver")
            .field("lookups", &self.lookups.len())
            .field("brightness", &self.brightness)
            .finish()
    }
}

impl ColorResolver {
    pub fn new(brightness: Brightness) -> Self {
        ColorResolver {
            lookups: vec![Box::new(NamedColors), Box::new(HexColors)],
            brightness,
        }
    }

    pub fn with_lookup(mut self, lookup: impl ColorLookup + 'static) -> Self {
        self.lookups.push(Box::new(lookup));
        self
    }

    pub fn resolve(&self, token: &str) -> Result<RGB> {
        self.lookups
            .iter()
            .find_map(|lookup| lookup.lookup(token))
            .map(|color| self.brightness.apply(color))
            .ok_or_else(|| Error::UnknownColor(token.to_string()))
    }
}
