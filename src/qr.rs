//! # QR Rendering
//!
//! Encode a payload into a QR matrix and rasterize it into a packed 1-bit
//! bitmap of a caller-chosen pixel size.
//!
//! ## Geometry
//!
//! ```text
//! block_size = size / (matrix_width + 4)      // 2 quiet blocks per side
//! offset     = (size - block_size * matrix_width) / 2
//! ```
//!
//! Each module becomes a `block_size × block_size` square, and the code is
//! centered in the `size × size` bitmap. Rows are packed 8 pixels per byte,
//! MSB first, so `size` must be a multiple of 32 to keep every row word
//! aligned.

use qrcode::{Color as Module, EcLevel, QrCode};

use crate::color::Color;
use crate::error::PortalError;

/// Pixel sizes must be a multiple of this.
pub const SIZE_GRANULARITY: usize = 32;

/// Quiet-zone blocks added across the width (two per side).
pub const BORDER_BLOCKS: usize = 4;

/// Square boolean module grid. `true` is a dark module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    width: usize,
    modules: Vec<bool>,
}

impl QrMatrix {
    /// Encode `data` at error-correction level L.
    pub fn encode(data: &str) -> Result<Self, PortalError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
            .map_err(|e| PortalError::Validation(format!("QR code generation failed: {}", e)))?;
        let width = code.width();
        let mut modules = Vec::with_capacity(width * width);
        for y in 0..width {
            for x in 0..width {
                modules.push(code[(x, y)] == Module::Dark);
            }
        }
        Ok(Self { width, modules })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }
}

/// A rasterized QR code: packed 1-bit rows plus a two-entry palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrBitmap {
    size: usize,
    block_size: usize,
    data: Vec<u8>,
    /// `[light, dark]`
    palette: [Color; 2],
}

impl QrBitmap {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Bytes per packed row.
    pub fn stride(&self) -> usize {
        self.size / 8
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn palette(&self) -> [Color; 2] {
        self.palette
    }

    /// Replace the dark color.
    pub fn with_foreground(mut self, color: Color) -> Self {
        self.palette[1] = color;
        self
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        let byte = self.data[y * self.stride() + x / 8];
        (byte >> (7 - (x % 8))) & 1 == 1
    }

    pub fn color_at(&self, x: usize, y: usize) -> Color {
        self.palette[self.is_dark(x, y) as usize]
    }
}

/// Encode `data` and rasterize it into a `size × size` bitmap.
///
/// ## Errors
///
/// [`PortalError::Validation`] if `size` is not a positive multiple of 32, if
/// it is too small to give each module at least one pixel, or if the payload
/// does not fit in a QR code.
pub fn render(data: &str, size: usize) -> Result<QrBitmap, PortalError> {
    validate_size(size)?;
    let matrix = QrMatrix::encode(data)?;
    rasterize(&matrix, size)
}

/// Rasterize an already encoded matrix. See [`render`].
pub fn rasterize(matrix: &QrMatrix, size: usize) -> Result<QrBitmap, PortalError> {
    validate_size(size)?;

    let block_size = size / (matrix.width() + BORDER_BLOCKS);
    if block_size == 0 {
        return Err(PortalError::Validation(format!(
            "QR size {} is too small for a {}x{} code",
            size,
            matrix.width(),
            matrix.height()
        )));
    }
    let x_offset = (size - block_size * matrix.width()) / 2;
    let y_offset = (size - block_size * matrix.height()) / 2;

    let stride = size / 8;
    let mut data = vec![0u8; stride * size];
    let mut line = vec![0u8; stride];

    for y in 0..matrix.height() {
        line.fill(0);
        for x in 0..matrix.width() {
            if matrix.is_dark(x, y) {
                for b in 0..block_size {
                    let px = x_offset + x * block_size + b;
                    line[px / 8] |= 1 << (7 - (px % 8));
                }
            }
        }
        // One packed row, written block_size times.
        for b in 0..block_size {
            let row = y_offset + y * block_size + b;
            data[row * stride..(row + 1) * stride].copy_from_slice(&line);
        }
    }

    Ok(QrBitmap {
        size,
        block_size,
        data,
        palette: [Color::WHITE, Color::BLACK],
    })
}

fn validate_size(size: usize) -> Result<(), PortalError> {
    if size == 0 || size % SIZE_GRANULARITY != 0 {
        return Err(PortalError::Validation(format!(
            "QR size must be a multiple of {}, got {}",
            SIZE_GRANULARITY, size
        )));
    }
    Ok(())
}
