//! Bitmap fonts for on-screen labels.
//!
//! Uses the Spleen bitmap font family at its native cell sizes.

use serde::{Deserialize, Serialize};
use spleen_font::{FONT_6X12, FONT_8X16, FONT_12X24, PSF2Font};

use crate::error::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextFont {
    #[serde(rename = "6x12")]
    Small,
    #[default]
    #[serde(rename = "8x16")]
    Medium,
    #[serde(rename = "12x24")]
    Large,
}

impl TextFont {
    /// Character cell `(width, height)` in pixels.
    pub fn cell(self) -> (usize, usize) {
        match self {
            TextFont::Small => (6, 12),
            TextFont::Medium => (8, 16),
            TextFont::Large => (12, 24),
        }
    }

    fn data(self) -> &'static [u8] {
        match self {
            TextFont::Small => FONT_6X12,
            TextFont::Medium => FONT_8X16,
            TextFont::Large => FONT_12X24,
        }
    }

    /// Pixel extent of `text`, one line per `\n`.
    pub fn measure(self, text: &str) -> (usize, usize) {
        let (cw, ch) = self.cell();
        let lines = text.lines().count();
        let widest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        (widest * cw, lines * ch)
    }

    /// Call `plot(x, y)` for every lit pixel of `text` laid out from `(0, 0)`.
    ///
    /// Characters missing from the font draw as a box outline.
    pub fn render(self, text: &str, mut plot: impl FnMut(usize, usize)) -> Result<(), PortalError> {
        let mut spleen = PSF2Font::new(self.data())
            .map_err(|_| PortalError::Display("corrupt built-in font".into()))?;
        let (cw, ch) = self.cell();
        let mut utf8 = [0u8; 4];

        for (line_no, line) in text.lines().enumerate() {
            let oy = line_no * ch;
            for (col, c) in line.chars().enumerate() {
                let ox = col * cw;
                let bytes = c.encode_utf8(&mut utf8).as_bytes();
                if let Some(glyph) = spleen.glyph_for_utf8(bytes) {
                    for (gy, row) in glyph.enumerate() {
                        for (gx, on) in row.enumerate() {
                            if on && gx < cw && gy < ch {
                                plot(ox + gx, oy + gy);
                            }
                        }
                    }
                } else {
                    for x in 0..cw {
                        plot(ox + x, oy);
                        plot(ox + x, oy + ch - 1);
                    }
                    for y in 0..ch {
                        plot(ox, oy + y);
                        plot(ox + cw - 1, oy + y);
                    }
                }
            }
        }
        Ok(())
    }
}
