use std::fmt;
use std::str::FromStr;

use crate::error::ColorParseError;

// Color is the display color of a band and the routes drawn for it
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const AQUAMARINE: Color = Color::rgb(127, 255, 212);
    pub const BLUEVIOLET: Color = Color::rgb(138, 43, 226);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    // opacity is alpha in 0.0..=1.0
    pub fn opacity(&self) -> f64 {
        self.a as f64 / 255.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    // Accepts 0xRRGGBB, 0xRRGGBBAA, #RRGGBB and #RRGGBBAA
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .or_else(|| trimmed.strip_prefix('#'))
            .ok_or_else(|| ColorParseError::Format(s.to_string()))?;

        if digits.len() != 6 && digits.len() != 8 {
            return Err(ColorParseError::Format(s.to_string()));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError::Digits(s.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ColorParseError::Digits(s.to_string()))
        };

        let a = if digits.len() == 8 { channel(6)? } else { 255 };

        Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}
