//! Glyph column lookup for the two text geometries the layout engine
//! renders.
//!
//! - [`Font::Narrow`] — one byte per column, 8 pixel rows, LSB on top
//! - [`Font::Tall`] — one `u16` per column, 16 pixel rows; the low byte
//!   lands on the upper page, the high byte on the page below
//!
//! [`BuiltinFont`] covers printable ASCII `0x21..=0x7E` from a 5×7 bitmap.
//! Narrow glyphs get one trailing spacing column; tall glyphs are the same
//! bitmap stretched to 16 rows and padded to a fixed 8-column cell.

use crate::error::Error;

/// Column buffer size for narrow glyphs
pub const NARROW_MAX_COLUMNS: usize = 10;
/// Column buffer size for tall glyphs
pub const TALL_MAX_COLUMNS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Narrow,
    Tall,
}

impl Font {
    /// Page rows one line of text occupies
    pub const fn pages(self) -> u8 {
        match self {
            Font::Narrow => 1,
            Font::Tall => 2,
        }
    }
}

/// Character-to-column lookup.
pub trait GlyphProvider {
    /// Fill `buf` with the glyph's byte columns; returns the column count.
    fn narrow_columns(&self, ch: u8, buf: &mut [u8; NARROW_MAX_COLUMNS]) -> Result<usize, Error>;

    /// Fill `buf` with the glyph's 16-bit columns; returns the column count.
    fn tall_columns(&self, ch: u8, buf: &mut [u16; TALL_MAX_COLUMNS]) -> Result<usize, Error>;

    /// Columns of either font widened to `u16`.
    fn columns_for(&self, font: Font, ch: u8) -> Result<Vec<u16>, Error> {
        match font {
            Font::Narrow => {
                let mut buf = [0u8; NARROW_MAX_COLUMNS];
                let n = self.narrow_columns(ch, &mut buf)?;
                Ok(buf[..n].iter().map(|&b| b as u16).collect())
            }
            Font::Tall => {
                let mut buf = [0u16; TALL_MAX_COLUMNS];
                let n = self.tall_columns(ch, &mut buf)?;
                Ok(buf[..n].to_vec())
            }
        }
    }
}

impl<G: GlyphProvider + ?Sized> GlyphProvider for &G {
    fn narrow_columns(&self, ch: u8, buf: &mut [u8; NARROW_MAX_COLUMNS]) -> Result<usize, Error> {
        (**self).narrow_columns(ch, buf)
    }

    fn tall_columns(&self, ch: u8, buf: &mut [u16; TALL_MAX_COLUMNS]) -> Result<usize, Error> {
        (**self).tall_columns(ch, buf)
    }
}

/// Built-in ASCII font.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFont;

const FIRST_CHAR: u8 = 0x21;
const LAST_CHAR: u8 = 0x7E;

fn bitmap(ch: u8) -> Result<&'static [u8; 5], Error> {
    if !(FIRST_CHAR..=LAST_CHAR).contains(&ch) {
        return Err(Error::InvalidCharacter(ch));
    }
    Ok(&GLYPHS_5X7[(ch - FIRST_CHAR) as usize])
}

/// Double every row: bit n moves to bits 2n and 2n+1.
pub const fn stretch_column(col: u8) -> u16 {
    let mut out = 0u16;
    let mut bit = 0;
    while bit < 8 {
        if col & (1 << bit) != 0 {
            out |= 0b11 << (bit * 2);
        }
        bit += 1;
    }
    out
}

impl GlyphProvider for BuiltinFont {
    fn narrow_columns(&self, ch: u8, buf: &mut [u8; NARROW_MAX_COLUMNS]) -> Result<usize, Error> {
        let glyph = bitmap(ch)?;
        buf[..5].copy_from_slice(glyph);
        buf[5] = 0;
        Ok(6)
    }

    fn tall_columns(&self, ch: u8, buf: &mut [u16; TALL_MAX_COLUMNS]) -> Result<usize, Error> {
        let glyph = bitmap(ch)?;
        buf.fill(0);
        for (dst, &col) in buf[1..6].iter_mut().zip(glyph.iter()) {
            *dst = stretch_column(col);
        }
        Ok(TALL_MAX_COLUMNS)
    }
}

// 0x21 '!' .. 0x7E '~', five columns each, LSB = top row
#[rustfmt::skip]
static GLYPHS_5X7: [[u8; 5]; 94] = [
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x56, 0x20, 0x50], // &
    [0x00, 0x08, 0x07, 0x03, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x2A, 0x1C, 0x7F, 0x1C, 0x2A], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x80, 0x70, 0x30, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x00, 0x60, 0x60, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x72, 0x49, 0x49, 0x49, 0x46], // 2
    [0x21, 0x41, 0x49, 0x4D, 0x33], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x31], // 6
    [0x41, 0x21, 0x11, 0x09, 0x07], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x46, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x00, 0x14, 0x00, 0x00], // :
    [0x00, 0x40, 0x34, 0x00, 0x00], // ;
    [0x00, 0x08, 0x14, 0x22, 0x41], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x59, 0x09, 0x06], // ?
    [0x3E, 0x41, 0x5D, 0x59, 0x4E], // @
    [0x7C, 0x12, 0x11, 0x12, 0x7C], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x41, 0x3E], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x09, 0x01], // F
    [0x3E, 0x41, 0x41, 0x51, 0x73], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x1C, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x26, 0x49, 0x49, 0x49, 0x32], // S
    [0x03, 0x01, 0x7F, 0x01, 0x03], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x03, 0x04, 0x78, 0x04, 0x03], // Y
    [0x61, 0x59, 0x49, 0x4D, 0x43], // Z
    [0x00, 0x7F, 0x41, 0x41, 0x41], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x41, 0x7F], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x03, 0x07, 0x08, 0x00], // `
    [0x20, 0x54, 0x54, 0x78, 0x40], // a
    [0x7F, 0x28, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x28], // c
    [0x38, 0x44, 0x44, 0x28, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x00, 0x08, 0x7E, 0x09, 0x02], // f
    [0x18, 0xA4, 0xA4, 0x9C, 0x78], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x40, 0x3D, 0x00], // j
    [0x7F, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x78, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0xFC, 0x18, 0x24, 0x24, 0x18], // p
    [0x18, 0x24, 0x24, 0x18, 0xFC], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x24], // s
    [0x04, 0x04, 0x3F, 0x44, 0x24], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x4C, 0x90, 0x90, 0x90, 0x7C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x77, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x02, 0x01, 0x02, 0x04, 0x02], // ~
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_range() {
        let font = BuiltinFont;
        let mut buf = [0u8; NARROW_MAX_COLUMNS];
        for ch in FIRST_CHAR..=LAST_CHAR {
            assert_eq!(font.narrow_columns(ch, &mut buf), Ok(6), "char 0x{:02X}", ch);
            assert!(buf[..5].iter().any(|&c| c != 0), "char 0x{:02X} is blank", ch);
        }
    }

    #[test]
    fn test_rejects_space_and_control() {
        let font = BuiltinFont;
        let mut buf = [0u8; NARROW_MAX_COLUMNS];
        assert_eq!(font.narrow_columns(b' ', &mut buf), Err(Error::InvalidCharacter(b' ')));
        assert_eq!(font.narrow_columns(b'\n', &mut buf), Err(Error::InvalidCharacter(b'\n')));
        let mut wide = [0u16; TALL_MAX_COLUMNS];
        assert_eq!(font.tall_columns(0x7F, &mut wide), Err(Error::InvalidCharacter(0x7F)));
    }

    #[test]
    fn test_digit_zero_columns() {
        let cols = BuiltinFont.columns_for(Font::Narrow, b'0').unwrap();
        assert_eq!(cols, vec![0x3E, 0x51, 0x49, 0x45, 0x3E, 0x00]);
    }

    #[test]
    fn test_stretch_column() {
        assert_eq!(stretch_column(0x00), 0x0000);
        assert_eq!(stretch_column(0x01), 0x0003);
        assert_eq!(stretch_column(0x80), 0xC000);
        assert_eq!(stretch_column(0xFF), 0xFFFF);
        assert_eq!(stretch_column(0x41), 0x3003);
    }

    #[test]
    fn test_tall_glyph_cell() {
        let cols = BuiltinFont.columns_for(Font::Tall, b'1').unwrap();
        assert_eq!(cols.len(), TALL_MAX_COLUMNS);
        assert_eq!(cols[0], 0);
        assert_eq!(cols[2], stretch_column(0x42));
        assert_eq!(cols[3], 0x3FFF);
        assert_eq!(&cols[6..], &[0, 0]);
    }
}
