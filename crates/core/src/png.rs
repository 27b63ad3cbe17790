//! Grayscale PNG export of the virtual panel.
//!
//! IDAT is zlib-compressed with `miniz_oxide`; chunk CRCs are computed here.

use std::path::Path;

use crate::panel::VirtualPanel;

const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Encode a monochrome image as an 8-bit grayscale PNG.
///
/// `pixels` is row-major, `width * height` entries (true = lit).
pub fn encode_png_mono(width: u32, height: u32, pixels: &[bool]) -> Vec<u8> {
    let mut png = Vec::with_capacity(width as usize * height as usize / 4 + 128);
    png.extend_from_slice(&SIGNATURE);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(0); // color type: grayscale
    ihdr.push(0); ihdr.push(0); ihdr.push(0);
    write_chunk(&mut png, b"IHDR", &ihdr);

    let w = width as usize;
    let mut raw = Vec::with_capacity((w + 1) * height as usize);
    for y in 0..height as usize {
        raw.push(0); // filter: None
        for x in 0..w {
            let lit = pixels.get(y * w + x).copied().unwrap_or(false);
            raw.push(if lit { 255 } else { 0 });
        }
    }

    let zlib_data = miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6);
    write_chunk(&mut png, b"IDAT", &zlib_data);
    write_chunk(&mut png, b"IEND", &[]);

    png
}

/// Snapshot of what the panel currently shows.
pub fn encode_panel(panel: &VirtualPanel) -> Vec<u8> {
    let g = panel.geometry();
    encode_png_mono(g.columns() as u32, g.rows() as u32, &panel.as_mono_pixels())
}

pub fn save_panel(panel: &VirtualPanel, path: &Path) -> Result<(), String> {
    std::fs::write(path, encode_panel(panel))
        .map_err(|e| format!("Write error: {}", e))
}

fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);
    let crc = crc32(&chunk_type[..], data);
    out.extend_from_slice(&crc.to_be_bytes());
}

// CRC-32 (PNG)
fn crc32(chunk_type: &[u8], data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFFFFFF;
    for &b in chunk_type.iter().chain(data.iter()) {
        crc ^= b as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
        }
    }
    crc ^ 0xFFFFFFFF
}
