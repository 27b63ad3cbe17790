//! Framebuffer geometry and page/column points.
//!
//! The panel RAM is organised in pages: each page is an 8-pixel-tall band
//! and each column within a page is one byte, LSB at the top.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::{DEFAULT_COLUMNS, DEFAULT_PAGES, MAX_COLUMNS, MAX_PAGES};

/// One byte-column inside one page of the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub page: u8,
    pub column: u8,
}

impl Point {
    pub const fn new(page: u8, column: u8) -> Self {
        Point { page, column }
    }
}

/// Page count and column count of a framebuffer, fixed for its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pages: u8,
    columns: u8,
}

impl Geometry {
    /// Pages are limited by the 2-bit page-range mask of the controller.
    pub fn new(pages: u8, columns: u8) -> Result<Self, Error> {
        if pages == 0 || columns == 0 || pages as usize > MAX_PAGES || columns as usize > MAX_COLUMNS {
            return Err(Error::InvalidGeometry);
        }
        Ok(Geometry { pages, columns })
    }

    #[inline]
    pub fn pages(&self) -> u8 { self.pages }

    #[inline]
    pub fn columns(&self) -> u8 { self.columns }

    /// Height in pixel rows
    pub fn rows(&self) -> usize { self.pages as usize * 8 }

    /// Framebuffer size in bytes
    pub fn len(&self) -> usize { self.pages as usize * self.columns as usize }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn contains(&self, p: Point) -> bool {
        p.page < self.pages && p.column < self.columns
    }

    /// Byte offset of a point in a row-major framebuffer
    #[inline]
    pub fn offset(&self, p: Point) -> usize {
        p.page as usize * self.columns as usize + p.column as usize
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry { pages: DEFAULT_PAGES, columns: DEFAULT_COLUMNS }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let g = Geometry::default();
        assert_eq!(g.pages(), 4);
        assert_eq!(g.columns(), 128);
        assert_eq!(g.rows(), 32);
        assert_eq!(g.len(), 512);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(Geometry::new(0, 64), Err(Error::InvalidGeometry));
        assert_eq!(Geometry::new(4, 0), Err(Error::InvalidGeometry));
        assert_eq!(Geometry::new(5, 64), Err(Error::InvalidGeometry));
        assert_eq!(Geometry::new(4, 129), Err(Error::InvalidGeometry));
        assert!(Geometry::new(4, 64).is_ok());
    }

    #[test]
    fn test_offset_and_contains() {
        let g = Geometry::new(4, 64).unwrap();
        assert_eq!(g.offset(Point::new(2, 3)), 131);
        assert!(g.contains(Point::new(3, 63)));
        assert!(!g.contains(Point::new(4, 0)));
        assert!(!g.contains(Point::new(0, 64)));
    }
}
