//! # oled-tiles-core
//!
//! Tiled text layout for small SSD1306 monochrome OLED panels, plus the
//! controller command encoder it drives.
//!
//! The framebuffer is split into up to [`MAX_TILES`] rectangular tiles.
//! Printing renders glyphs into a tile's region and marks it dirty; a flush
//! pushes only the dirty tiles to the panel through a [`Transport`].
//!
//! ## Architecture
//!
//! - [`command`] — Command descriptors, argument masking and the [`Controller`] encoder
//! - [`addressing`] — Window selection in horizontal, vertical and page addressing
//! - [`layout`] — [`Layout`]: tile table, framebuffer, print and flush
//! - [`font`] — [`GlyphProvider`] and the built-in 5×7 / 16-pixel-tall font
//! - [`transport`] — Bus sinks: log, UDP, chunking, recording
//! - [`panel`] — [`VirtualPanel`]: software SSD1306 that renders what it receives
//! - [`capture`] — Recorded sessions on disk, replay, UDP frame decoding
//! - [`png`] — Grayscale PNG export of a virtual panel

pub mod addressing;
pub mod capture;
pub mod command;
pub mod error;
pub mod font;
pub mod geometry;
pub mod layout;
pub mod panel;
pub mod png;
pub mod transport;

pub use addressing::{select_window, AddressingMode};
pub use command::{Command, Controller, PanelConfig};
pub use error::Error;
pub use font::{BuiltinFont, Font, GlyphProvider};
pub use geometry::{Geometry, Point};
pub use layout::{Layout, Tile};
pub use panel::VirtualPanel;
pub use transport::{PayloadKind, Transport};

/// Tile table capacity
pub const MAX_TILES: usize = 8;
/// Page count limit, set by the 2-bit page-range argument mask
pub const MAX_PAGES: usize = 4;
/// Column count limit, set by the 7-bit column-range argument mask
pub const MAX_COLUMNS: usize = 128;
/// Default panel: 128×32
pub const DEFAULT_PAGES: u8 = 4;
pub const DEFAULT_COLUMNS: u8 = 128;

/// 7-bit I2C address of the controller
pub const I2C_ADDRESS: u8 = 0x3C;
/// Address byte for writes (R/W bit clear)
pub const I2C_ADDRESS_WRITE: u8 = I2C_ADDRESS << 1;
/// Address byte for reads (R/W bit set)
pub const I2C_ADDRESS_READ: u8 = (I2C_ADDRESS << 1) | 1;
/// Largest payload a single bus write carries
pub const BUS_CHUNK_SIZE: usize = 32;

/// Port the UDP sink targets and the panel listener binds
pub const DEFAULT_UDP_PORT: u16 = 12345;
/// Largest UDP frame, header included
pub const MAX_DATAGRAM: usize = 1024;
