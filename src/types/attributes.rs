//! Category-specific token attributes.
//!
//! Colors are held in CIE L\*a\*b\* (D65) so that distances and weighted
//! averages are taken in a perceptually uniform space. Conversion to and
//! from 8-bit sRGB is provided for ingest and export.

use serde::{Deserialize, Serialize};

use super::token::Category;

// D65 reference white.
const XN: f64 = 0.95047;
const YN: f64 = 1.0;
const ZN: f64 = 1.08883;

const EPSILON_DELTA: f64 = 6.0 / 29.0;

/// A color in CIE L\*a\*b\* with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorValue {
    /// Lightness, 0..=100.
    pub l: f64,
    /// Green–red axis.
    pub a: f64,
    /// Blue–yellow axis.
    pub b: f64,
    /// Opacity, 0..=1.
    #[serde(default = "opaque")]
    pub alpha: f64,
}

fn opaque() -> f64 {
    1.0
}

impl ColorValue {
    /// Create an opaque Lab color.
    pub fn lab(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b, alpha: 1.0 }
    }

    /// Set the alpha channel.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Convert from 8-bit sRGB channels.
    pub fn from_srgb8(r: u8, g: u8, b: u8) -> Self {
        let r = srgb_to_linear(r as f64 / 255.0);
        let g = srgb_to_linear(g as f64 / 255.0);
        let b = srgb_to_linear(b as f64 / 255.0);

        let x = 0.4124564 * r + 0.3575761 * g + 0.1804375 * b;
        let y = 0.2126729 * r + 0.7151522 * g + 0.0721750 * b;
        let z = 0.0193339 * r + 0.1191920 * g + 0.9503041 * b;

        let fx = lab_f(x / XN);
        let fy = lab_f(y / YN);
        let fz = lab_f(z / ZN);

        Self::lab(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1].repeat(2));
                Some(Self::from_srgb8(expand(0)?, expand(1)?, expand(2)?))
            }
            6 | 8 => {
                let color = Self::from_srgb8(
                    channel(&digits[0..2])?,
                    channel(&digits[2..4])?,
                    channel(&digits[4..6])?,
                );
                if digits.len() == 8 {
                    Some(color.with_alpha(channel(&digits[6..8])? as f64 / 255.0))
                } else {
                    Some(color)
                }
            }
            _ => None,
        }
    }

    /// Convert to 8-bit sRGB, clamping out-of-gamut values.
    pub fn to_srgb8(&self) -> (u8, u8, u8) {
        let fy = (self.l + 16.0) / 116.0;
        let fx = fy + self.a / 500.0;
        let fz = fy - self.b / 200.0;

        let x = XN * lab_f_inv(fx);
        let y = YN * lab_f_inv(fy);
        let z = ZN * lab_f_inv(fz);

        let r = 3.2404542 * x - 1.5371385 * y - 0.4985314 * z;
        let g = -0.9692660 * x + 1.8760108 * y + 0.0415560 * z;
        let b = 0.0556434 * x - 0.2040259 * y + 1.0572252 * z;

        (to_channel(r), to_channel(g), to_channel(b))
    }

    /// Lowercase hex; `#rrggbb` when opaque, `#rrggbbaa` otherwise.
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_srgb8();
        let alpha = (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        if alpha == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{alpha:02x}")
        }
    }

    /// Chroma (distance from the neutral axis).
    pub fn chroma(&self) -> f64 {
        self.a.hypot(self.b)
    }

    fn validate(&self) -> Result<(), String> {
        if ![self.l, self.a, self.b, self.alpha].iter().all(|v| v.is_finite()) {
            return Err("color has non-finite component".to_string());
        }
        if !(0.0..=100.0).contains(&self.l) {
            return Err(format!("lightness {} outside [0, 100]", self.l));
        }
        if !(-128.0..=128.0).contains(&self.a) || !(-128.0..=128.0).contains(&self.b) {
            return Err(format!("chromatic axes ({}, {}) outside [-128, 128]", self.a, self.b));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(format!("alpha {} outside [0, 1]", self.alpha));
        }
        Ok(())
    }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> f64 {
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn to_channel(linear: f64) -> u8 {
    (linear_to_srgb(linear).clamp(0.0, 1.0) * 255.0).round() as u8
}

fn lab_f(t: f64) -> f64 {
    if t > EPSILON_DELTA.powi(3) {
        t.cbrt()
    } else {
        t / (3.0 * EPSILON_DELTA * EPSILON_DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f64) -> f64 {
    if t > EPSILON_DELTA {
        t.powi(3)
    } else {
        3.0 * EPSILON_DELTA * EPSILON_DELTA * (t - 4.0 / 29.0)
    }
}

/// Box shadow geometry plus color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowValue {
    /// Horizontal offset in px.
    pub offset_x: f64,
    /// Vertical offset in px.
    pub offset_y: f64,
    /// Blur radius in px.
    pub blur: f64,
    /// Spread in px.
    #[serde(default)]
    pub spread: f64,
    /// Shadow color.
    pub color: ColorValue,
}

/// Composite typographic style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypographyValue {
    /// Font family name.
    pub family: String,
    /// Font size in px.
    pub size: f64,
    /// Font weight, 1..=1000.
    pub weight: f64,
    /// Line height as a ratio of the font size.
    pub line_height: f64,
}

/// Attributes of a token, one variant per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum TokenAttributes {
    /// A color.
    Color(ColorValue),
    /// A spacing increment in px.
    Spacing {
        /// Size in px.
        px: f64,
    },
    /// A corner radius in px.
    Radius {
        /// Size in px.
        px: f64,
    },
    /// A box shadow.
    Shadow(ShadowValue),
    /// A font family.
    FontFamily {
        /// Family name.
        family: String,
    },
    /// A typographic style.
    Typography(TypographyValue),
}

impl TokenAttributes {
    /// Category this value belongs to.
    pub fn category(&self) -> Category {
        match self {
            Self::Color(_) => Category::Color,
            Self::Spacing { .. } => Category::Spacing,
            Self::Radius { .. } => Category::Radius,
            Self::Shadow(_) => Category::Shadow,
            Self::FontFamily { .. } => Category::FontFamily,
            Self::Typography(_) => Category::Typography,
        }
    }

    /// Check that every component is finite and in range.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Color(c) => c.validate(),
            Self::Spacing { px } | Self::Radius { px } => validate_length(*px, "size"),
            Self::Shadow(s) => {
                if !s.offset_x.is_finite() || !s.offset_y.is_finite() {
                    return Err("shadow offset is non-finite".to_string());
                }
                validate_length(s.blur, "blur")?;
                if !s.spread.is_finite() {
                    return Err("shadow spread is non-finite".to_string());
                }
                s.color.validate()
            }
            Self::FontFamily { family } => validate_family(family),
            Self::Typography(t) => {
                validate_family(&t.family)?;
                if !t.size.is_finite() || t.size <= 0.0 {
                    return Err(format!("font size {} must be positive", t.size));
                }
                if !t.weight.is_finite() || !(1.0..=1000.0).contains(&t.weight) {
                    return Err(format!("font weight {} outside [1, 1000]", t.weight));
                }
                if !t.line_height.is_finite() || t.line_height <= 0.0 {
                    return Err(format!("line height {} must be positive", t.line_height));
                }
                Ok(())
            }
        }
    }
}

fn validate_length(px: f64, what: &str) -> Result<(), String> {
    if !px.is_finite() {
        Err(format!("{what} is non-finite"))
    } else if px < 0.0 {
        Err(format!("{what} {px} is negative"))
    } else {
        Ok(())
    }
}

fn validate_family(family: &str) -> Result<(), String> {
    if family.trim().is_empty() {
        Err("font family is empty".to_string())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parse_and_format() {
        let white = ColorValue::from_hex("#ffffff").unwrap();
        assert!((white.l - 100.0).abs() < 0.01);
        assert!(white.a.abs() < 0.01 && white.b.abs() < 0.01);
        assert_eq!(white.to_hex(), "#ffffff");

        let short = ColorValue::from_hex("#f00").unwrap();
        assert_eq!(short.to_hex(), "#ff0000");

        let translucent = ColorValue::from_hex("#3366cc80").unwrap();
        assert_eq!(translucent.to_hex(), "#3366cc80");

        assert!(ColorValue::from_hex("#12345").is_none());
        assert!(ColorValue::from_hex("#gggggg").is_none());
    }

    #[test]
    fn test_srgb_round_trip_is_stable() {
        for hex in ["#000000", "#1a2b3c", "#7f7f7f", "#00ff00", "#e91e63"] {
            let c = ColorValue::from_hex(hex).unwrap();
            assert_eq!(c.to_hex(), hex);
        }
    }

    #[test]
    fn test_known_lab_value() {
        // sRGB red is roughly L=53.24, a=80.09, b=67.20.
        let red = ColorValue::from_srgb8(255, 0, 0);
        assert!((red.l - 53.24).abs() < 0.05);
        assert!((red.a - 80.09).abs() < 0.05);
        assert!((red.b - 67.20).abs() < 0.05);
    }

    #[test]
    fn test_validation() {
        assert!(TokenAttributes::Color(ColorValue::lab(50.0, 0.0, 0.0)).validate().is_ok());
        assert!(TokenAttributes::Color(ColorValue::lab(120.0, 0.0, 0.0)).validate().is_err());
        assert!(TokenAttributes::Color(ColorValue::lab(50.0, f64::NAN, 0.0)).validate().is_err());
        assert!(TokenAttributes::Spacing { px: -1.0 }.validate().is_err());
        assert!(TokenAttributes::Spacing { px: f64::INFINITY }.validate().is_err());
        assert!(TokenAttributes::Radius { px: 0.0 }.validate().is_ok());
        assert!(TokenAttributes::FontFamily { family: "  ".into() }.validate().is_err());
        let typo = TypographyValue {
            family: "Inter".into(),
            size: 16.0,
            weight: 1200.0,
            line_height: 1.5,
        };
        assert!(TokenAttributes::Typography(typo).validate().is_err());
    }

    #[test]
    fn test_serde_tagging() {
        let attrs = TokenAttributes::Spacing { px: 8.0 };
        let json = serde_json::to_string(&attrs).unwrap();
        assert_eq!(json, r#"{"category":"spacing","px":8.0}"#);

        let parsed: TokenAttributes =
            serde_json::from_str(r#"{"category":"color","l":50.0,"a":10.0,"b":-10.0}"#).unwrap();
        assert_eq!(parsed.category(), Category::Color);
        if let TokenAttributes::Color(c) = parsed {
            assert_eq!(c.alpha, 1.0);
        }
    }
}
