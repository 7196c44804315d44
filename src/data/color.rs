//! Backend-agnostic RGB color used by the palettes and the chart.

use std::fmt;

/// An opaque 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Build a color from a `0xRRGGBB` literal.
    pub const fn from_hex(hex: u32) -> Self {
        Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// CSS hex notation, e.g. `#38bdf8`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub const RED: Rgb = Rgb::from_hex(0xef4444);
pub const BLUE: Rgb = Rgb::from_hex(0x3b82f6);
pub const YELLOW: Rgb = Rgb::from_hex(0xeab308);
pub const GREEN: Rgb = Rgb::from_hex(0x22c55e);
pub const SKY: Rgb = Rgb::from_hex(0x38bdf8);
pub const SLATE_800: Rgb = Rgb::from_hex(0x1f2937);
pub const SLATE_900: Rgb = Rgb::from_hex(0x111827);
pub const AXIS_LINE: Rgb = Rgb::from_hex(0x4b5563);
pub const AXIS_TEXT: Rgb = Rgb::from_hex(0x9ca3af);
pub const LABEL_TEXT: Rgb = Rgb::from_hex(0xd1d5db);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(Rgb::from_hex(0x38bdf8), Rgb(0x38, 0xbd, 0xf8));
        assert_eq!(SKY.to_hex(), "#38bdf8");
        assert_eq!(format!("{}", RED), "#ef4444");
    }
}
