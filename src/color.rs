//! RGB colors shared by the status light and the scene.

use serde::{Deserialize, Serialize};

/// A 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(0xFF, 0xFF, 0xFF);
    /// Default text color.
    pub const GRAY: Self = Self::new(0x80, 0x80, 0x80);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value.
    pub const fn from_hex(hex: u32) -> Self {
        Self::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    pub fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.r, self.g, self.b])
    }
}

/// Colors in config files: `8421504` or `"#808080"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Packed(u32),
    Hex(String),
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Packed(hex) if hex <= 0xFF_FFFF => Ok(Color::from_hex(hex)),
            ColorRepr::Packed(hex) => Err(format!("color {:#x} exceeds 0xFFFFFF", hex)),
            ColorRepr::Hex(s) => {
                let digits = s.trim_start_matches('#').trim_start_matches("0x");
                if digits.len() != 6 {
                    return Err(format!("color '{}' is not #RRGGBB", s));
                }
                u32::from_str_radix(digits, 16)
                    .map(Color::from_hex)
                    .map_err(|_| format!("color '{}' is not #RRGGBB", s))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex(0x808080), Color::GRAY);
        assert_eq!(Color::from_hex(0x00FF10), Color::new(0, 0xFF, 0x10));
    }

    #[test]
    fn test_deserialize_packed_and_string() {
        let packed: Color = serde_json::from_str("16711680").unwrap();
        assert_eq!(packed, Color::new(0xFF, 0, 0));
        let hex: Color = serde_json::from_str("\"#0000ff\"").unwrap();
        assert_eq!(hex, Color::new(0, 0, 0xFF));
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        assert!(serde_json::from_str::<Color>("\"blue\"").is_err());
        assert!(serde_json::from_str::<Color>("33554432").is_err());
    }
}
