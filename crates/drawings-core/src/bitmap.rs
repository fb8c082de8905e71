//! 4-bit palette bitmaps.
//!
//! A drawing is `width * height` palette indices packed two per byte: pixel
//! `i = y * width + x` lives in byte `i / 2`, in the low nibble when `i` is
//! even and the high nibble when it is odd.

use thiserror::Error;

/// Number of palette entries; every index fits in a nibble.
pub const PALETTE_SIZE: usize = 16;

/// Index of the background colour (white). A buffer made only of it is blank.
pub const BLANK_INDEX: u8 = 3;

/// The fixed 16-colour palette, as RGB triples.
pub const PALETTE: [[u8; 3]; PALETTE_SIZE] = [
    [0, 0, 0],       // black
    [87, 87, 87],    // dark gray
    [160, 160, 160], // light gray
    [255, 255, 255], // white
    [42, 75, 215],   // blue
    [29, 105, 20],   // green
    [129, 74, 25],   // brown
    [129, 38, 192],  // purple
    [157, 175, 255], // light blue
    [129, 197, 122], // light green
    [233, 222, 187], // tan
    [173, 35, 35],   // red
    [41, 208, 208],  // cyan
    [255, 238, 51],  // yellow
    [255, 146, 51],  // orange
    [255, 205, 243], // pink
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitmapError {
    #[error("expected {expected} bytes, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    #[error("expected {expected} pixels, got {actual}")]
    PixelCount { expected: usize, actual: usize },

    #[error("palette index {index} at pixel {pixel} is out of range")]
    PaletteIndex { pixel: usize, index: u8 },
}

/// Fixed canvas dimensions. `width * height` must be even.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const DEFAULT: Canvas = Canvas {
        width: 320,
        height: 240,
    };

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size in bytes of a packed buffer for this canvas.
    pub fn buffer_len(&self) -> usize {
        self.pixel_count() / 2
    }

    /// Reject a packed buffer of the wrong size.
    pub fn check_len(&self, bytes: &[u8]) -> Result<(), BitmapError> {
        if bytes.len() != self.buffer_len() {
            return Err(BitmapError::BufferLength {
                expected: self.buffer_len(),
                actual: bytes.len(),
            });
        }
        Ok(())
    }

    /// Pack one palette index per pixel into nibbles.
    pub fn pack(&self, pixels: &[u8]) -> Result<Vec<u8>, BitmapError> {
        if pixels.len() != self.pixel_count() {
            return Err(BitmapError::PixelCount {
                expected: self.pixel_count(),
                actual: pixels.len(),
            });
        }
        if let Some((pixel, &index)) = pixels
            .iter()
            .enumerate()
            .find(|&(_, &p)| p as usize >= PALETTE_SIZE)
        {
            return Err(BitmapError::PaletteIndex { pixel, index });
        }
        Ok(pixels
            .chunks_exact(2)
            .map(|pair| pair[0] | (pair[1] << 4))
            .collect())
    }

    /// Unpack a buffer into one palette index per pixel.
    pub fn unpack(&self, bytes: &[u8]) -> Result<Vec<u8>, BitmapError> {
        self.check_len(bytes)?;
        Ok(bytes
            .iter()
            .flat_map(|&b| [b & 0x0F, (b >> 4) & 0x0F])
            .collect())
    }

    /// Decode a buffer into opaque RGBA pixels, row-major.
    pub fn to_rgba(&self, bytes: &[u8]) -> Result<Vec<u8>, BitmapError> {
        let indices = self.unpack(bytes)?;
        let mut rgba = Vec::with_capacity(indices.len() * 4);
        for index in indices {
            let [r, g, b] = PALETTE[index as usize];
            rgba.extend_from_slice(&[r, g, b, 0xFF]);
        }
        Ok(rgba)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// `true` if every pixel is [`BLANK_INDEX`].
pub fn is_blank(bytes: &[u8]) -> bool {
    const BLANK_BYTE: u8 = BLANK_INDEX | (BLANK_INDEX << 4);
    bytes.iter().all(|&b| b == BLANK_BYTE)
}

#[derive(Debug, Error)]
#[error("raster encoding failed: {0}")]
pub struct RasterError(pub String);

/// Encodes RGBA pixels into an image container such as PNG.
pub trait RasterEncoder: Send + Sync {
    /// MIME type of the encoded output.
    fn content_type(&self) -> &'static str;

    fn encode(&self, width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, RasterError>;
}
