use crate::foundation::core::Rgba8Premul;
use crate::foundation::math::{linear_to_srgb, mul_div255_u8, srgb_to_linear, unit_to_u8};
use serde::{Deserialize, Serialize};

/// Color space a surface stores its pixels in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Gamma-encoded sRGB.
    #[default]
    Srgb,
    /// Linear-light sRGB primaries.
    LinearSrgb,
}

/// Per-node processing color space choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpaceType {
    /// Use the color space of the render context.
    #[default]
    Inherit,
    /// Force sRGB.
    Srgb,
    /// Force linear sRGB.
    LinearSrgb,
}

impl ColorSpaceType {
    /// Concrete color space given the context's processing space.
    pub fn resolve(self, inherited: ColorSpace) -> ColorSpace {
        match self {
            Self::Inherit => inherited,
            Self::Srgb => ColorSpace::Srgb,
            Self::LinearSrgb => ColorSpace::LinearSrgb,
        }
    }
}

/// Straight-alpha color with `[0, 1]` channels, authored in sRGB.
///
/// Deserializes from `"#RRGGBB"`/`"#RRGGBBAA"`, `{ "r", "g", "b", "a"? }`, or `[r, g, b, a?]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
    /// Alpha.
    pub a: f64,
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    /// Build from float channels.
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Build from 8-bit straight channels.
    pub fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            f64::from(a) / 255.0,
        )
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        parse_hex(s)
    }

    /// 8-bit straight channels.
    pub fn to_rgba8(self) -> [u8; 4] {
        [
            unit_to_u8(self.r),
            unit_to_u8(self.g),
            unit_to_u8(self.b),
            unit_to_u8(self.a),
        ]
    }

    /// Premultiplied pixel with the sRGB-authored channels encoded for `space`.
    pub fn to_premul_in(self, space: ColorSpace) -> Rgba8Premul {
        let c = match space {
            ColorSpace::Srgb => self,
            ColorSpace::LinearSrgb => Self::rgba(
                srgb_to_linear(self.r),
                srgb_to_linear(self.g),
                srgb_to_linear(self.b),
                self.a,
            ),
        };
        let [r, g, b, a] = c.to_rgba8();
        Rgba8Premul::from_straight_rgba(r, g, b, a)
    }

    /// Straight color from a premultiplied pixel, without transfer conversion.
    pub fn from_premul(px: Rgba8Premul) -> Self {
        if px.a == 0 {
            return Self::TRANSPARENT;
        }
        let a = f64::from(px.a);
        Self::rgba(
            (f64::from(px.r) / a).min(1.0),
            (f64::from(px.g) / a).min(1.0),
            (f64::from(px.b) / a).min(1.0),
            a / 255.0,
        )
    }

    /// Channel-wise product.
    pub fn multiply(self, other: Self) -> Self {
        Self::rgba(
            self.r * other.r,
            self.g * other.g,
            self.b * other.b,
            self.a * other.a,
        )
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            RgbaObj {
                r: f64,
                g: f64,
                b: f64,
                #[serde(default = "one")]
                a: f64,
            },
            Arr(Vec<f64>),
        }

        fn one() -> f64 {
            1.0
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => parse_hex(&s).map_err(serde::de::Error::custom),
            Repr::RgbaObj { r, g, b, a } => Ok(Self::rgba(r, g, b, a)),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgba(*r, *g, *b, 1.0)),
                [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
                _ => Err(serde::de::Error::custom(
                    "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

fn parse_hex(s: &str) -> Result<Color, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    if !s.is_ascii() {
        return Err("hex color must be ASCII".to_owned());
    }
    let (r, g, b, a) = match s.len() {
        6 => (
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            255,
        ),
        8 => (
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        ),
        _ => {
            return Err("hex color must be #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned());
        }
    };

    Ok(Color::rgba8(r, g, b, a))
}

/// Re-encode a premultiplied pixel from one color space into another.
pub(crate) fn convert_premul(px: [u8; 4], from: ColorSpace, to: ColorSpace) -> [u8; 4] {
    let a = px[3];
    if from == to || a == 0 {
        return px;
    }
    let transfer: fn(f64) -> f64 = match (from, to) {
        (ColorSpace::Srgb, ColorSpace::LinearSrgb) => srgb_to_linear,
        (ColorSpace::LinearSrgb, ColorSpace::Srgb) => linear_to_srgb,
        _ => return px,
    };
    let af = f64::from(a);
    let mut out = [0u8, 0, 0, a];
    for i in 0..3 {
        let straight = (f64::from(px[i]) / af).min(1.0);
        let encoded = unit_to_u8(transfer(straight));
        out[i] = mul_div255_u8(u16::from(encoded), u16::from(a));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/color.rs"]
mod tests;
