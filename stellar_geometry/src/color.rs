use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `#rrggbb` or `#rrggbbaa`, leading `#` optional.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let s = s.trim_start_matches('#');
        if !s.is_ascii() {
            return Err(format!("invalid hex color `{s}`"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&s[range], 16).map_err(|e| format!("invalid hex color `{s}`: {e}"))
        };
        match s.len() {
            6 => Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Ok(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(format!(
                "invalid hex color `{s}`, expected 6 or 8 hex digits"
            )),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
