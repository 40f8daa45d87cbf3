//! Colors and the fixed preset palettes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Color parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("Color must start with '#': {0}")]
    MissingHash(String),
    #[error("Color must have 6 or 8 hex digits: {0}")]
    InvalidLength(String),
    #[error("Invalid hex digit in color: {0}")]
    InvalidDigit(String),
}

/// RGBA8 color, serialized as a `#rrggbb` / `#rrggbbaa` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::rgba(0, 0, 0, 0)
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (case-insensitive).
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let digits = hex
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ColorError::MissingHash(hex.to_string()))?;
        if digits.len() != 6 && digits.len() != 8 {
            return Err(ColorError::InvalidLength(hex.to_string()));
        }
        let channel = |i: usize| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ColorError::InvalidDigit(hex.to_string()))
        };
        let a = if digits.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }

    /// Lowercase hex form; the alpha pair is omitted when opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Whether this color belongs to the fixed ink palette.
    pub fn is_preset(&self) -> bool {
        INK_PRESETS.contains(self)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Fixed ink palette shown in the toolbar. Custom picks outside this list
/// land in the recent-colors cache.
pub const INK_PRESETS: [Color; 6] = [
    Color::rgb(0x00, 0x00, 0x00), // black
    Color::rgb(0xef, 0x44, 0x44), // red
    Color::rgb(0x3b, 0x82, 0xf6), // blue
    Color::rgb(0x22, 0xc5, 0x5e), // green
    Color::rgb(0xf5, 0x9e, 0x0b), // amber
    Color::rgb(0xa8, 0x55, 0xf7), // purple
];

/// Fixed palette for text highlights.
pub const HIGHLIGHT_PRESETS: [Color; 4] = [
    Color::rgb(0xfe, 0xf0, 0x8a), // yellow
    Color::rgb(0xbb, 0xf7, 0xd0), // green
    Color::rgb(0xbf, 0xdb, 0xfe), // blue
    Color::rgb(0xfb, 0xcf, 0xe8), // pink
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        let c = Color::from_hex("#FEF08A").unwrap();
        assert_eq!(c, Color::rgb(0xfe, 0xf0, 0x8a));
        assert_eq!(c.to_hex(), "#fef08a");

        let translucent = Color::from_hex("#11223380").unwrap();
        assert_eq!(translucent.a, 0x80);
        assert_eq!(translucent.to_hex(), "#11223380");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Color::from_hex("fef08a"), Err(ColorError::MissingHash(_))));
        assert!(matches!(Color::from_hex("#fff"), Err(ColorError::InvalidLength(_))));
        assert!(matches!(Color::from_hex("#zzzzzz"), Err(ColorError::InvalidDigit(_))));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::rgb(255, 0, 16)).unwrap();
        assert_eq!(json, "\"#ff0010\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::rgb(255, 0, 16));
    }

    #[test]
    fn test_presets() {
        assert!(Color::black().is_preset());
        assert!(!Color::rgb(1, 2, 3).is_preset());
        // Highlight palette is separate from the ink palette
        assert!(!HIGHLIGHT_PRESETS[0].is_preset());
    }
}
