use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Opaque palette color. Parsed from `#RRGGBB` in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(text: &str) -> Result<Self, ConfigError> {
        let digits = text
            .strip_prefix('#')
            .ok_or_else(|| ConfigError::InvalidColor(text.to_owned()))?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ConfigError::InvalidColor(text.to_owned()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| ConfigError::InvalidColor(text.to_owned()))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub const fn with_alpha(self, a: u8) -> Rgba {
        Rgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }

    pub const fn transparent(self) -> Rgba {
        self.with_alpha(0)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Unmultiplied color with straight alpha, the way a 2D canvas takes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub fn lerp(self, other: Self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let inverse = 1.0 - amount;
        let mix = |a: u8, b: u8| ((a as f32 * inverse) + (b as f32 * amount)).round() as u8;

        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    pub fn scale_alpha(self, factor: f32) -> Self {
        Self {
            a: (self.a as f32 * factor.clamp(0.0, 1.0)) as u8,
            ..self
        }
    }
}

/// Converts a unit opacity into an alpha byte, saturating at both ends.
pub fn alpha_byte(opacity: f32) -> u8 {
    if !opacity.is_finite() {
        return 0;
    }
    (opacity * 255.0).clamp(0.0, 255.0).floor() as u8
}
