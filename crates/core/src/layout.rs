//! Tile layout engine.
//!
//! A [`Layout`] owns a page-organised framebuffer and carves it into up to
//! [`MAX_TILES`] rectangular tiles. Writes go into the framebuffer and mark
//! the tile dirty; [`Layout::flush`] then pushes only dirty tiles to the
//! panel, each as one window-select followed by one data write per page
//! row.
//!
//! Tiles are addressed by the index returned from [`Layout::add_tile`]; the
//! table only grows, so a handle stays valid for the layout's lifetime.

use crate::addressing::{select_window, AddressingMode};
use crate::command::Controller;
use crate::error::Error;
use crate::font::{BuiltinFont, Font, GlyphProvider, NARROW_MAX_COLUMNS, TALL_MAX_COLUMNS};
use crate::geometry::{Geometry, Point};
use crate::transport::Transport;
use crate::MAX_TILES;

/// Rectangular region of the framebuffer, end point inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    start: Point,
    end: Point,
    dirty: bool,
}

impl Tile {
    fn new(start: Point, end: Point) -> Self {
        Tile { start, end, dirty: false }
    }

    pub fn start(&self) -> Point { self.start }

    pub fn end(&self) -> Point { self.end }

    /// Width in columns
    pub fn width(&self) -> usize {
        (self.end.column - self.start.column) as usize + 1
    }

    /// Height in pages
    pub fn height(&self) -> usize {
        (self.end.page - self.start.page) as usize + 1
    }

    pub fn is_dirty(&self) -> bool { self.dirty }

    /// Tiles collide only when they span the same page range and their
    /// column ranges intersect. Tiles on different (even partially
    /// shared) page ranges never count as overlapping.
    pub fn overlaps(&self, other: &Tile) -> bool {
        self.start.page == other.start.page
            && self.end.page == other.end.page
            && self.start.column <= other.end.column
            && self.end.column >= other.start.column
    }
}

pub struct Layout<T, G = BuiltinFont> {
    geometry: Geometry,
    /// Row-major, `geometry.pages()` rows of `geometry.columns()` bytes
    framebuffer: Box<[u8]>,
    tiles: Vec<Tile>,
    controller: Controller<T>,
    glyphs: G,
}

impl<T: Transport> Layout<T, BuiltinFont> {
    pub fn new(geometry: Geometry, controller: Controller<T>) -> Self {
        Self::with_glyphs(geometry, controller, BuiltinFont)
    }
}

impl<T: Transport, G: GlyphProvider> Layout<T, G> {
    pub fn with_glyphs(geometry: Geometry, controller: Controller<T>, glyphs: G) -> Self {
        Layout {
            geometry,
            framebuffer: vec![0u8; geometry.len()].into_boxed_slice(),
            tiles: Vec::with_capacity(MAX_TILES),
            controller,
            glyphs,
        }
    }

    pub fn geometry(&self) -> Geometry { self.geometry }

    pub fn tiles(&self) -> &[Tile] { &self.tiles }

    pub fn tile(&self, handle: usize) -> Result<&Tile, Error> {
        self.tiles.get(handle).ok_or(Error::InvalidHandle)
    }

    pub fn is_dirty(&self, handle: usize) -> Result<bool, Error> {
        Ok(self.tile(handle)?.dirty)
    }

    pub fn controller(&self) -> &Controller<T> { &self.controller }

    pub fn controller_mut(&mut self) -> &mut Controller<T> { &mut self.controller }

    pub fn into_controller(self) -> Controller<T> { self.controller }

    /// Read-only view of one page row of a tile (`row` is tile-relative).
    pub fn tile_row(&self, handle: usize, row: usize) -> Result<&[u8], Error> {
        let tile = self.tile(handle)?;
        if row >= tile.height() {
            return Err(Error::InvalidPoint);
        }
        let off = self.geometry.offset(Point::new(tile.start.page + row as u8, tile.start.column));
        Ok(&self.framebuffer[off..off + tile.width()])
    }

    /// Register a tile covering `start..=end` and return its handle.
    pub fn add_tile(&mut self, start: Point, end: Point) -> Result<usize, Error> {
        if self.tiles.len() >= MAX_TILES {
            tracing::warn!("tile table full ({} tiles)", MAX_TILES);
            return Err(Error::Full);
        }
        if start.page > end.page || start.column > end.column || !self.geometry.contains(end) {
            tracing::warn!("invalid tile bounds {:?}..={:?}", start, end);
            return Err(Error::InvalidGeometry);
        }
        let candidate = Tile::new(start, end);
        if let Some(i) = self.tiles.iter().position(|t| t.overlaps(&candidate)) {
            tracing::warn!("tile {:?}..={:?} overlaps tile {}", start, end, i);
            return Err(Error::Overlap);
        }
        self.tiles.push(candidate);
        let handle = self.tiles.len() - 1;
        tracing::debug!("tile {} = {:?}..={:?}", handle, start, end);
        Ok(handle)
    }

    /// Copy raw column bytes into one page row of a tile, starting at a
    /// tile-relative point. Writes never wrap onto the next page.
    pub fn edit_tile(&mut self, handle: usize, point: Point, data: &[u8]) -> Result<(), Error> {
        let tile = *self.tile(handle)?;
        let page = tile.start.page as usize + point.page as usize;
        let column = tile.start.column as usize + point.column as usize;
        if page > tile.end.page as usize || column > tile.end.column as usize {
            return Err(Error::InvalidPoint);
        }
        if column + data.len() > tile.end.column as usize + 1 {
            return Err(Error::SizeExceedsBounds);
        }
        let off = page * self.geometry.columns() as usize + column;
        self.framebuffer[off..off + data.len()].copy_from_slice(data);
        self.tiles[handle].dirty = true;
        tracing::trace!("tile {} edit at {:?}, {} bytes", handle, point, data.len());
        Ok(())
    }

    /// Render text into a tile from its top-left corner, wrapping at the
    /// tile's right edge, then blank everything after the last glyph column.
    ///
    /// Fails `NoSpace` as soon as a glyph column would land below the tile
    /// and `InvalidCharacter` on the first unknown code. On failure the
    /// columns already placed stay in the framebuffer and the tile is
    /// still marked dirty if anything was written.
    pub fn print(&mut self, handle: usize, text: &[u8], font: Font) -> Result<(), Error> {
        let tile = *self.tile(handle)?;
        let mut touched = false;
        let result = self.render(tile, text, font, &mut touched);
        if touched {
            self.tiles[handle].dirty = true;
        }
        match &result {
            Ok(()) => tracing::trace!("tile {} printed {} chars ({:?})", handle, text.len(), font),
            Err(e) => tracing::warn!("tile {} print failed: {}", handle, e),
        }
        result
    }

    fn render(&mut self, tile: Tile, text: &[u8], font: Font, touched: &mut bool) -> Result<(), Error> {
        let width = tile.width();
        let height = tile.height();
        let pitch = self.geometry.columns() as usize;
        let rows = font.pages() as usize;
        let origin = self.geometry.offset(tile.start);

        let mut page = 0usize;
        let mut column = 0usize;
        let mut columns = [0u16; NARROW_MAX_COLUMNS];

        for &ch in text {
            let n = match font {
                Font::Narrow => {
                    let mut buf = [0u8; NARROW_MAX_COLUMNS];
                    let n = self.glyphs.narrow_columns(ch, &mut buf)?.min(NARROW_MAX_COLUMNS);
                    for (dst, &b) in columns.iter_mut().zip(&buf[..n]) {
                        *dst = b as u16;
                    }
                    n
                }
                Font::Tall => {
                    let mut buf = [0u16; TALL_MAX_COLUMNS];
                    let n = self.glyphs.tall_columns(ch, &mut buf)?.min(TALL_MAX_COLUMNS);
                    columns[..n].copy_from_slice(&buf[..n]);
                    n
                }
            };
            for &value in &columns[..n] {
                if page + rows > height {
                    return Err(Error::NoSpace);
                }
                let off = origin + page * pitch + column;
                self.framebuffer[off] = (value & 0xFF) as u8;
                if rows == 2 {
                    self.framebuffer[off + pitch] = (value >> 8) as u8;
                }
                *touched = true;
                column += 1;
                if column >= width {
                    column = 0;
                    page += rows;
                }
            }
        }

        // Blank the rest of the current line and every line below it
        while page < height {
            for row in page..(page + rows).min(height) {
                let off = origin + row * pitch;
                self.framebuffer[off + column..off + width].fill(0);
            }
            *touched = true;
            column = 0;
            page += rows;
        }
        Ok(())
    }

    /// Send every dirty tile to the panel in handle order and return how
    /// many were sent. The first failure aborts the flush; that tile and
    /// all later dirty tiles stay dirty for the next call.
    pub fn flush(&mut self) -> Result<usize, Error> {
        let pitch = self.geometry.columns() as usize;
        let mut flushed = 0;
        for handle in 0..self.tiles.len() {
            let tile = self.tiles[handle];
            if !tile.dirty {
                continue;
            }
            if let Err(e) = select_window(&mut self.controller, AddressingMode::Horizontal, tile.start, tile.end) {
                tracing::warn!("flush: failed to set position for tile {}: {}", handle, e);
                return Err(e);
            }
            let width = tile.width();
            for page in tile.start.page as usize..=tile.end.page as usize {
                let off = page * pitch + tile.start.column as usize;
                if let Err(e) = self.controller.send_data(&self.framebuffer[off..off + width]) {
                    tracing::warn!("flush: failed to write page {} of tile {}: {}", page, handle, e);
                    return Err(e);
                }
            }
            self.tiles[handle].dirty = false;
            flushed += 1;
        }
        if flushed > 0 {
            tracing::debug!("flushed {} tiles", flushed);
        }
        Ok(flushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{NullSink, PayloadKind, Recorder};

    type TestLayout = Layout<Recorder<NullSink>>;

    fn layout(pages: u8, columns: u8) -> TestLayout {
        Layout::new(Geometry::new(pages, columns).unwrap(), Controller::new(Recorder::new(NullSink)))
    }

    fn p(page: u8, column: u8) -> Point {
        Point::new(page, column)
    }

    fn records(l: &TestLayout) -> &[crate::transport::Record] {
        l.controller().transport().records()
    }

    #[test]
    fn test_add_tile_returns_sequential_handles() {
        let mut l = layout(4, 64);
        assert_eq!(l.add_tile(p(0, 0), p(0, 31)), Ok(0));
        assert_eq!(l.add_tile(p(0, 32), p(0, 63)), Ok(1));
        assert_eq!(l.add_tile(p(1, 0), p(3, 63)), Ok(2));
        assert_eq!(l.tile(2).unwrap().width(), 64);
        assert_eq!(l.tile(2).unwrap().height(), 3);
        assert!(!l.is_dirty(0).unwrap());
    }

    #[test]
    fn test_add_tile_rejects_bad_geometry() {
        let mut l = layout(4, 64);
        assert_eq!(l.add_tile(p(1, 0), p(0, 10)), Err(Error::InvalidGeometry));
        assert_eq!(l.add_tile(p(0, 10), p(0, 9)), Err(Error::InvalidGeometry));
        assert_eq!(l.add_tile(p(0, 0), p(4, 10)), Err(Error::InvalidGeometry));
        assert_eq!(l.add_tile(p(0, 0), p(0, 64)), Err(Error::InvalidGeometry));
        assert!(l.tiles().is_empty());
    }

    #[test]
    fn test_overlap_is_same_page_range_only() {
        let mut l = layout(4, 64);
        l.add_tile(p(0, 0), p(1, 20)).unwrap();
        assert_eq!(l.add_tile(p(0, 20), p(1, 40)), Err(Error::Overlap));
        // Shares page 1 and columns, but a different page range
        assert_eq!(l.add_tile(p(1, 0), p(2, 20)), Ok(1));
        assert_eq!(l.add_tile(p(0, 21), p(1, 40)), Ok(2));
    }

    #[test]
    fn test_full_table() {
        let mut l = layout(4, 64);
        for i in 0..MAX_TILES as u8 {
            l.add_tile(p(0, i * 8), p(0, i * 8 + 7)).unwrap();
        }
        assert_eq!(l.add_tile(p(1, 0), p(1, 7)), Err(Error::Full));
        assert_eq!(l.tiles().len(), MAX_TILES);
    }

    #[test]
    fn test_edit_tile_bounds() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(1, 10), p(2, 19)).unwrap();
        assert_eq!(l.edit_tile(t, p(0, 5), &[1, 2, 3, 4, 5]), Ok(()));
        assert_eq!(l.edit_tile(t, p(0, 5), &[1, 2, 3, 4, 5, 6]), Err(Error::SizeExceedsBounds));
        assert_eq!(l.edit_tile(t, p(0, 10), &[1]), Err(Error::InvalidPoint));
        assert_eq!(l.edit_tile(t, p(2, 0), &[1]), Err(Error::InvalidPoint));
        assert_eq!(l.edit_tile(7, p(0, 0), &[1]), Err(Error::InvalidHandle));
        assert_eq!(l.tile_row(t, 0).unwrap()[5..], [1, 2, 3, 4, 5]);
        assert!(l.is_dirty(t).unwrap());
    }

    #[test]
    fn test_edit_tile_translates_to_absolute() {
        let mut l = layout(4, 64);
        l.add_tile(p(0, 0), p(0, 63)).unwrap();
        let t = l.add_tile(p(2, 40), p(3, 47)).unwrap();
        l.edit_tile(t, p(1, 2), &[0xAA, 0xBB]).unwrap();
        assert_eq!(l.tile_row(t, 1).unwrap(), &[0, 0, 0xAA, 0xBB, 0, 0, 0, 0]);
        assert_eq!(l.tile_row(t, 0).unwrap(), &[0; 8]);
        assert!(!l.is_dirty(0).unwrap());
    }

    #[test]
    fn test_print_narrow_wraps_by_column() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(0, 0), p(1, 7)).unwrap();
        l.print(t, b"AB", Font::Narrow).unwrap();
        // 'A' fills columns 0..6 of row 0, 'B' wraps after two columns
        assert_eq!(l.tile_row(t, 0).unwrap(), &[0x7C, 0x12, 0x11, 0x12, 0x7C, 0x00, 0x7F, 0x49]);
        assert_eq!(l.tile_row(t, 1).unwrap(), &[0x49, 0x49, 0x36, 0x00, 0, 0, 0, 0]);
    }

    #[test]
    fn test_print_empty_clears_previous_text() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(0, 0), p(2, 15)).unwrap();
        l.print(t, b"ABCDEFG", Font::Narrow).unwrap();
        assert!(l.tile_row(t, 2).unwrap().iter().any(|&b| b != 0));
        l.flush().unwrap();
        l.print(t, b"", Font::Narrow).unwrap();
        for row in 0..3 {
            assert!(l.tile_row(t, row).unwrap().iter().all(|&b| b == 0));
        }
        assert!(l.is_dirty(t).unwrap());
    }

    #[test]
    fn test_reprint_shorter_leaves_no_residue() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(0, 0), p(1, 11)).unwrap();
        l.print(t, b"WXYZ", Font::Narrow).unwrap();
        l.print(t, b"1", Font::Narrow).unwrap();
        assert_eq!(&l.tile_row(t, 0).unwrap()[6..], &[0; 6]);
        assert_eq!(l.tile_row(t, 1).unwrap(), &[0; 12]);
    }

    #[test]
    fn test_print_tall_splits_bytes_across_pages() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(2, 0), p(3, 63)).unwrap();
        l.print(t, b"1", Font::Tall).unwrap();
        let upper = l.tile_row(t, 0).unwrap().to_vec();
        let lower = l.tile_row(t, 1).unwrap().to_vec();
        // '1' middle column 0x7F stretched to 0x3FFF
        assert_eq!(upper[3], 0xFF);
        assert_eq!(lower[3], 0x3F);
        assert!(upper[8..].iter().chain(&lower[8..]).all(|&b| b == 0));
    }

    #[test]
    fn test_print_no_space_fails_mid_render() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(0, 0), p(0, 9)).unwrap();
        assert_eq!(l.print(t, b"AB", Font::Narrow), Err(Error::NoSpace));
        // First glyph and part of the second were written
        assert_eq!(&l.tile_row(t, 0).unwrap()[..6], &[0x7C, 0x12, 0x11, 0x12, 0x7C, 0x00]);
        assert!(l.is_dirty(t).unwrap());
    }

    #[test]
    fn test_print_tall_needs_two_pages() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(0, 0), p(0, 63)).unwrap();
        assert_eq!(l.print(t, b"1", Font::Tall), Err(Error::NoSpace));
        assert!(!l.is_dirty(t).unwrap());
    }

    #[test]
    fn test_print_invalid_character() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(0, 0), p(0, 63)).unwrap();
        assert_eq!(l.print(t, b"A\x01", Font::Narrow), Err(Error::InvalidCharacter(0x01)));
        assert_eq!(l.print(9, b"A", Font::Narrow), Err(Error::InvalidHandle));
    }

    #[test]
    fn test_flush_sends_window_then_rows() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(1, 8), p(2, 11)).unwrap();
        l.edit_tile(t, p(0, 0), &[1, 2, 3, 4]).unwrap();
        l.edit_tile(t, p(1, 0), &[5, 6, 7, 8]).unwrap();
        assert_eq!(l.flush(), Ok(1));
        let recs = records(&l);
        let payloads: Vec<&[u8]> = recs.iter().map(|r| r.payload.as_slice()).collect();
        assert_eq!(
            payloads,
            vec![&[0x20, 0x00][..], &[0x22, 1, 2][..], &[0x21, 8, 11][..], &[1, 2, 3, 4][..], &[5, 6, 7, 8][..]]
        );
        assert_eq!(recs[3].kind, PayloadKind::Data);
        assert!(!l.is_dirty(t).unwrap());
    }

    #[test]
    fn test_flush_is_idempotent_when_clean() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(0, 0), p(0, 7)).unwrap();
        assert_eq!(l.flush(), Ok(0));
        l.print(t, b"1", Font::Narrow).unwrap();
        assert_eq!(l.flush(), Ok(1));
        let before = records(&l).len();
        assert_eq!(l.flush(), Ok(0));
        assert_eq!(records(&l).len(), before);
    }

    #[test]
    fn test_flush_failure_keeps_dirty() {
        let mut l = layout(4, 64);
        let t = l.add_tile(p(0, 0), p(3, 7)).unwrap();
        l.print(t, b"", Font::Narrow).unwrap();
        // Window select is 3 writes; let one row through
        l.controller_mut().transport_mut().fail_after(4);
        assert!(matches!(l.flush(), Err(Error::TransportFailure(_))));
        assert!(l.is_dirty(t).unwrap());
        let rows = records(&l).iter().filter(|r| r.kind == PayloadKind::Data).count();
        assert_eq!(rows, 1);

        l.controller_mut().transport_mut().heal();
        assert_eq!(l.flush(), Ok(1));
        assert!(!l.is_dirty(t).unwrap());
    }

    #[test]
    fn test_flush_window_failure_aborts_remaining_tiles() {
        let mut l = layout(4, 64);
        let a = l.add_tile(p(0, 0), p(0, 7)).unwrap();
        let b = l.add_tile(p(1, 0), p(1, 7)).unwrap();
        l.edit_tile(a, p(0, 0), &[1]).unwrap();
        l.edit_tile(b, p(0, 0), &[2]).unwrap();
        l.controller_mut().transport_mut().fail_after(0);
        assert!(l.flush().is_err());
        assert!(l.is_dirty(a).unwrap());
        assert!(l.is_dirty(b).unwrap());
        assert!(records(&l).is_empty());
    }
}
