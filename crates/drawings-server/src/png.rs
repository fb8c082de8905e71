//! Minimal PNG writer: 8-bit RGB, no filtering, stored (uncompressed) deflate.

use drawings_core::{RasterEncoder, RasterError};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
const COLOR_TYPE_RGB: u8 = 2;
const MAX_STORED_BLOCK: usize = 0xFFFF;

/// Writes truecolor PNGs. The alpha channel of the input is dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngEncoder;

impl RasterEncoder for PngEncoder {
    fn content_type(&self) -> &'static str {
        "image/png"
    }

    fn encode(&self, width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError(format!("empty image {width}x{height}")));
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RasterError(format!(
                "expected {expected} RGBA bytes, got {}",
                rgba.len()
            )));
        }

        let row_len = width as usize * 3;
        let mut scanlines = Vec::with_capacity((row_len + 1) * height as usize);
        for row in rgba.chunks_exact(width as usize * 4) {
            scanlines.push(0); // filter: none
            for px in row.chunks_exact(4) {
                scanlines.extend_from_slice(&px[..3]);
            }
        }

        let mut ihdr = Vec::with_capacity(13);
        ihdr.extend_from_slice(&width.to_be_bytes());
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.extend_from_slice(&[8, COLOR_TYPE_RGB, 0, 0, 0]);

        let mut out = Vec::with_capacity(scanlines.len() + 128);
        out.extend_from_slice(&SIGNATURE);
        write_chunk(&mut out, b"IHDR", &ihdr);
        write_chunk(&mut out, b"IDAT", &zlib_stored(&scanlines));
        write_chunk(&mut out, b"IEND", &[]);
        Ok(out)
    }
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut crc = crc32fast::Hasher::new();
    crc.update(kind);
    crc.update(data);
    out.extend_from_slice(&crc.finalize().to_be_bytes());
}

/// Wrap `data` in a zlib stream made of stored deflate blocks.
fn zlib_stored(data: &[u8]) -> Vec<u8> {
    let blocks = data.len().div_ceil(MAX_STORED_BLOCK).max(1);
    let mut out = Vec::with_capacity(data.len() + blocks * 5 + 6);
    out.extend_from_slice(&[0x78, 0x01]);

    let mut chunks = data.chunks(MAX_STORED_BLOCK).peekable();
    if chunks.peek().is_none() {
        out.extend_from_slice(&[1, 0x00, 0x00, 0xFF, 0xFF]);
    }
    while let Some(chunk) = chunks.next() {
        let last = chunks.peek().is_none();
        let len = chunk.len() as u16;
        out.push(u8::from(last));
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(!len).to_le_bytes());
        out.extend_from_slice(chunk);
    }

    out.extend_from_slice(&adler32(data).to_be_bytes());
    out
}

fn adler32(data: &[u8]) -> u32 {
    const MOD: u32 = 65_521;
    let (mut a, mut b) = (1u32, 0u32);
    // 5552 is the largest run that cannot overflow `b` before reduction.
    for run in data.chunks(5552) {
        for &byte in run {
            a += u32::from(byte);
            b += a;
        }
        a %= MOD;
        b %= MOD;
    }
    (b << 16) | a
}
