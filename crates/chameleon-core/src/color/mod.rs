//! Color model: color spaces, conversions, hex strings and pixel decoding.
//!
//! Channel conventions are the same everywhere, including the variables bound
//! inside conversion expressions:
//!
//! | space | channels |
//! |-------|----------|
//! | rgb   | r, g, b as integers in 0..=255 |
//! | hls   | h in degrees [0, 360), l and s in [0, 1] |
//! | hsv   | h in degrees [0, 360), s and v in [0, 1] |
//! | yiq   | y in [0, 1], i and q as signed chrominance |

mod convert;

use crate::number::Number;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pixel and hex decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Unsupported pixel depth: {0} bits")]
    UnsupportedDepth(u8),
    #[error("Invalid hex color {0:?}, expected #rrggbb")]
    InvalidHex(String),
}

/// The color spaces a conversion expression can construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    Rgb,
    Hls,
    Hsv,
    Yiq,
}

impl ColorSpace {
    pub const ALL: [ColorSpace; 4] = [ColorSpace::Rgb, ColorSpace::Hls, ColorSpace::Hsv, ColorSpace::Yiq];

    /// Name as written in expressions.
    pub fn name(self) -> &'static str {
        match self {
            ColorSpace::Rgb => "rgb",
            ColorSpace::Hls => "hls",
            ColorSpace::Hsv => "hsv",
            ColorSpace::Yiq => "yiq",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|space| space.name() == name)
    }

    /// Variable letter of each channel, e.g. `['h', 'l', 's']` for HLS.
    pub fn channel_names(self) -> [char; 3] {
        let mut letters = self.name().chars();
        let mut next = || letters.next().unwrap_or('?');
        [next(), next(), next()]
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An 8-bit-per-channel RGB color as sampled from the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0x??RRGGBB` integer; the top byte is ignored.
    pub const fn from_packed(value: u32) -> Self {
        Self {
            r: (value >> 16) as u8,
            g: (value >> 8) as u8,
            b: value as u8,
        }
    }

    /// Pack as `0x00RRGGBB`.
    pub const fn to_packed(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Render as `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse `#rrggbb`. The leading `#` is optional.
    pub fn parse_hex(text: &str) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::InvalidHex(text.to_string());
        let digits = text.strip_prefix('#').unwrap_or(text);
        if digits.len() != 6 || !digits.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
        Ok(Self::from_packed(value))
    }

    fn to_unit(self) -> [f64; 3] {
        [self.r, self.g, self.b].map(|c| c as f64 / 255.0)
    }

    fn from_unit(unit: [f64; 3]) -> Self {
        let [r, g, b] = unit.map(|c| to_channel(c * 255.0));
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Round and clamp a 0..=255 scale value; NaN maps to 0.
fn to_channel(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 255.0) as u8
    }
}

/// A raw sample read from the display together with its depth in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPixel {
    pub value: u32,
    pub depth: u8,
}

impl RawPixel {
    pub const fn new(value: u32, depth: u8) -> Self {
        Self { value, depth }
    }
}

/// Decode a raw display sample into RGB.
///
/// Depths 24 and 32 are `0x??RRGGBB`; 16 is RGB565 and 15 is RGB555, both
/// scaled up to 8 bits per channel.
pub fn decode(raw: RawPixel) -> Result<Rgb, DecodeError> {
    let v = raw.value;
    match raw.depth {
        24 | 32 => Ok(Rgb::from_packed(v)),
        16 => Ok(Rgb::new(
            expand5((v >> 11) & 0x1f),
            expand6((v >> 5) & 0x3f),
            expand5(v & 0x1f),
        )),
        15 => Ok(Rgb::new(
            expand5((v >> 10) & 0x1f),
            expand5((v >> 5) & 0x1f),
            expand5(v & 0x1f),
        )),
        depth => Err(DecodeError::UnsupportedDepth(depth)),
    }
}

fn expand5(c: u32) -> u8 {
    ((c << 3) | (c >> 2)) as u8
}

fn expand6(c: u32) -> u8 {
    ((c << 2) | (c >> 4)) as u8
}

/// Parse seed colors given on the command line.
///
/// Each argument may hold several whitespace-separated colors, so the whole
/// output of an earlier run can be passed as a single argument. Empty
/// pieces are skipped.
pub fn parse_hex_list<I, S>(args: I) -> Result<Vec<Rgb>, DecodeError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut colors = Vec::new();
    for arg in args {
        for piece in arg.as_ref().split_whitespace() {
            colors.push(Rgb::parse_hex(piece)?);
        }
    }
    Ok(colors)
}

/// An immutable color value tagged with its space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    space: ColorSpace,
    channels: [f64; 3],
}

impl Color {
    /// Create a color from channel values in the conventions of `space`.
    ///
    /// RGB channels are rounded and clamped to 0..=255.
    pub fn new(space: ColorSpace, channels: [f64; 3]) -> Self {
        let channels = match space {
            ColorSpace::Rgb => channels.map(|c| to_channel(c) as f64),
            _ => channels,
        };
        Self { space, channels }
    }

    pub fn from_rgb(rgb: Rgb) -> Self {
        Self {
            space: ColorSpace::Rgb,
            channels: [rgb.r as f64, rgb.g as f64, rgb.b as f64],
        }
    }

    pub fn space(&self) -> ColorSpace {
        self.space
    }

    pub fn channels(&self) -> [f64; 3] {
        self.channels
    }

    /// Channels as numbers: integers for RGB, floats otherwise.
    pub fn channel_values(&self) -> [Number; 3] {
        match self.space {
            ColorSpace::Rgb => self.channels.map(|c| Number::Int(c as i64)),
            _ => self.channels.map(Number::Float),
        }
    }

    /// Convert into another space, going through RGB unit floats.
    pub fn convert(&self, target: ColorSpace) -> Color {
        if target == self.space {
            return *self;
        }
        let [r, g, b] = self.to_unit_rgb();
        let channels = match target {
            ColorSpace::Rgb => return Color::from_rgb(Rgb::from_unit([r, g, b])),
            ColorSpace::Hls => scale_hue(convert::rgb_to_hls(r, g, b)),
            ColorSpace::Hsv => scale_hue(convert::rgb_to_hsv(r, g, b)),
            ColorSpace::Yiq => convert::rgb_to_yiq(r, g, b),
        };
        Color { space: target, channels }
    }

    /// The 8-bit RGB color this value displays as.
    pub fn to_rgb(&self) -> Rgb {
        match self.space {
            ColorSpace::Rgb => {
                let [r, g, b] = self.channels.map(to_channel);
                Rgb::new(r, g, b)
            }
            _ => Rgb::from_unit(self.to_unit_rgb()),
        }
    }

    fn to_unit_rgb(&self) -> [f64; 3] {
        let [a, b, c] = self.channels;
        match self.space {
            ColorSpace::Rgb => [a / 255.0, b / 255.0, c / 255.0],
            ColorSpace::Hls => convert::hls_to_rgb(a / 360.0, b, c),
            ColorSpace::Hsv => convert::hsv_to_rgb(a / 360.0, b, c),
            ColorSpace::Yiq => convert::yiq_to_rgb(a, b, c),
        }
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::from_rgb(rgb)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.channel_values();
        write!(f, "{}({}, {}, {})", self.space, a, b, c)
    }
}

fn scale_hue([h, x, y]: [f64; 3]) -> [f64; 3] {
    [h * 360.0, x, y]
}

/// Lighten dark colors and darken light ones by `percent` of their HSV value.
///
/// Used for the border of preview swatches so it stays visible on any color.
pub fn adjust_brightness(percent: f64, rgb: Rgb) -> Rgb {
    let [r, g, b] = rgb.to_unit();
    let [h, s, v] = convert::rgb_to_hsv(r, g, b);
    let part = v * percent / 100.0;
    let v = if v > 0.5 { (v - part).max(0.0) } else { (v + part).min(1.0) };
    Rgb::from_unit(convert::hsv_to_rgb(h, s, v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_round_trip(space: ColorSpace) {
        for r in (0..=255).step_by(15) {
            for g in (0..=255).step_by(17) {
                for b in (0..=255).step_by(5) {
                    let rgb = Rgb::new(r as u8, g as u8, b as u8);
                    let back = Color::from_rgb(rgb).convert(space).convert(ColorSpace::Rgb).to_rgb();
                    let diff = |x: u8, y: u8| (x as i16 - y as i16).abs();
                    assert!(
                        diff(rgb.r, back.r) <= 1 && diff(rgb.g, back.g) <= 1 && diff(rgb.b, back.b) <= 1,
                        "{} -> {} -> {}",
                        rgb,
                        space,
                        back
                    );
                }
            }
        }
    }

    #[test]
    fn test_round_trip_hls() {
        assert_round_trip(ColorSpace::Hls);
    }

    #[test]
    fn test_round_trip_hsv() {
        assert_round_trip(ColorSpace::Hsv);
    }

    #[test]
    fn test_round_trip_yiq() {
        assert_round_trip(ColorSpace::Yiq);
    }

    #[test]
    fn test_hue_in_degrees() {
        let hls = Color::from_rgb(Rgb::new(0, 0, 255)).convert(ColorSpace::Hls);
        let [h, l, s] = hls.channels();
        assert!((h - 240.0).abs() < 1e-9);
        assert!((l - 0.5).abs() < 1e-9);
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gray_has_zero_hue() {
        for space in [ColorSpace::Hls, ColorSpace::Hsv] {
            let [h, _, _] = Color::from_rgb(Rgb::new(128, 128, 128)).convert(space).channels();
            assert_eq!(h, 0.0);
        }
    }

    #[test]
    fn test_rgb_constructor_clamps_and_rounds() {
        let color = Color::new(ColorSpace::Rgb, [300.0, -4.0, 127.6]);
        assert_eq!(color.to_rgb(), Rgb::new(255, 0, 128));
        assert_eq!(color.channel_values(), [Number::Int(255), Number::Int(0), Number::Int(128)]);
        assert_eq!(Color::new(ColorSpace::Rgb, [f64::NAN, 1.0, 2.0]).to_rgb(), Rgb::new(0, 1, 2));
    }

    #[test]
    fn test_hex() {
        assert_eq!(Rgb::new(255, 0, 51).to_hex(), "#ff0033");
        assert_eq!(Rgb::new(1, 2, 3).to_string(), "#010203");
        assert_eq!(Rgb::parse_hex("#FF0033").unwrap(), Rgb::new(255, 0, 51));
        assert_eq!(Rgb::parse_hex("0a0b0c").unwrap(), Rgb::new(10, 11, 12));
        assert!(matches!(Rgb::parse_hex("#ff003"), Err(DecodeError::InvalidHex(_))));
        assert!(matches!(Rgb::parse_hex("#gg0033"), Err(DecodeError::InvalidHex(_))));
        assert!(matches!(Rgb::parse_hex("#+f0033"), Err(DecodeError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_hex_list() {
        let colors = parse_hex_list(["#ff0000\n#00ff00", "", "#0000ff"]).unwrap();
        assert_eq!(colors, vec![Rgb::new(255, 0, 0), Rgb::new(0, 255, 0), Rgb::new(0, 0, 255)]);
        assert!(parse_hex_list(["#ff0000 nope"]).is_err());
    }

    #[test]
    fn test_packed() {
        let rgb = Rgb::from_packed(0xff12_3456);
        assert_eq!(rgb, Rgb::new(0x12, 0x34, 0x56));
        assert_eq!(rgb.to_packed(), 0x0012_3456);
    }

    #[test]
    fn test_decode_depths() {
        assert_eq!(decode(RawPixel::new(0x00ff_8000, 24)).unwrap(), Rgb::new(255, 128, 0));
        assert_eq!(decode(RawPixel::new(0xffff_8000, 32)).unwrap(), Rgb::new(255, 128, 0));
        assert_eq!(decode(RawPixel::new(0xf800, 16)).unwrap(), Rgb::new(255, 0, 0));
        assert_eq!(decode(RawPixel::new(0x07e0, 16)).unwrap(), Rgb::new(0, 255, 0));
        assert_eq!(decode(RawPixel::new(0x001f, 15)).unwrap(), Rgb::new(0, 0, 255));
        assert_eq!(decode(RawPixel::new(0, 8)), Err(DecodeError::UnsupportedDepth(8)));
    }

    #[test]
    fn test_space_names() {
        assert_eq!(ColorSpace::from_name("hsv"), Some(ColorSpace::Hsv));
        assert_eq!(ColorSpace::from_name("lab"), None);
        assert_eq!(ColorSpace::Yiq.channel_names(), ['y', 'i', 'q']);
        assert_eq!(ColorSpace::Hls.to_string(), "hls");
        assert_eq!(serde_json::to_string(&ColorSpace::Hsv).unwrap(), "\"hsv\"");
    }

    #[test]
    fn test_adjust_brightness() {
        let light = adjust_brightness(45.0, Rgb::new(255, 255, 255));
        assert_eq!(light, Rgb::new(140, 140, 140));
        let dark = adjust_brightness(45.0, Rgb::new(0, 0, 0));
        assert_eq!(dark, Rgb::BLACK);
        let mid = adjust_brightness(50.0, Rgb::new(100, 0, 0));
        assert!(mid.r > 100);
    }
}
