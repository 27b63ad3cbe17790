//! Error type shared by the encoder, addressing protocol and layout engine.
//!
//! Every fallible operation in this crate returns one of these variants
//! instead of panicking, so callers can tell a rejected geometry from a
//! dead transport and decide whether a retry makes sense.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Tile handle does not name a registered tile
    InvalidHandle,
    /// Tile or framebuffer bounds are inverted or out of range
    InvalidGeometry,
    /// New tile collides with an existing tile on the same page range
    Overlap,
    /// Tile table already holds `MAX_TILES` entries
    Full,
    /// Tile-relative point lands outside the tile
    InvalidPoint,
    /// Write would run past the tile's right edge
    SizeExceedsBounds,
    /// Glyph provider has no columns for this character code
    InvalidCharacter(u8),
    /// Text needs more page rows than the tile has
    NoSpace,
    /// Option value is not on the command's whitelist
    InvalidOption { opcode: u8, option: u8 },
    /// Fewer argument bytes than the command requires
    InvalidArguments { opcode: u8, expected: usize, got: usize },
    /// Underlying byte sink refused or failed the write
    TransportFailure(String),
    /// Raw addressing mode value is not horizontal, vertical or page
    InvalidAddressingMode(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidHandle => write!(f, "invalid tile handle"),
            Error::InvalidGeometry => write!(f, "invalid tile geometry"),
            Error::Overlap => write!(f, "tile overlaps an existing tile"),
            Error::Full => write!(f, "tile table is full"),
            Error::InvalidPoint => write!(f, "point lies outside the tile"),
            Error::SizeExceedsBounds => write!(f, "data length exceeds tile bounds"),
            Error::InvalidCharacter(c) => write!(f, "invalid character 0x{:02X}", c),
            Error::NoSpace => write!(f, "no space left in tile"),
            Error::InvalidOption { opcode, option } => {
                write!(f, "option 0x{:02X} not allowed for command 0x{:02X}", option, opcode)
            }
            Error::InvalidArguments { opcode, expected, got } => write!(
                f,
                "command 0x{:02X} needs {} argument bytes, got {}",
                opcode, expected, got
            ),
            Error::TransportFailure(msg) => write!(f, "transport failure: {}", msg),
            Error::InvalidAddressingMode(m) => write!(f, "invalid addressing mode {}", m),
        }
    }
}

impl std::error::Error for Error {}
