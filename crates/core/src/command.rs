//! SSD1306 command descriptors and the encoder that turns them into bytes.
//!
//! Every controller register write is described by a static [`Command`]
//! in one of four shapes:
//!
//! - `Simple` — a fixed opcode byte
//! - `WithBitmask` — an option masked into the low bits of the opcode,
//!   optionally restricted to a whitelist of legal values
//! - `WithArgs` — the opcode followed by argument bytes, each masked by
//!   its own per-position mask
//! - `WithBitmaskAndArgs` — both of the above
//!
//! [`Controller`] owns the transport and exposes one typed method per
//! register write. A handful of them pack their input through a fixed bit
//! transform first (COM pins, VCOMH level, charge pump) because the
//! controller requires reserved bits to hold specific values.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::transport::{PayloadKind, Transport};
use crate::I2C_ADDRESS_WRITE;

/// Upper bound on argument bytes and whitelist entries per command
pub const MAX_COMMAND_ARGS: usize = 8;

/// Static description of one controller command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Simple {
        opcode: u8,
    },
    WithBitmask {
        opcode: u8,
        bitmask: u8,
        /// Legal option values; empty means any value is accepted
        options: &'static [u8],
    },
    WithArgs {
        opcode: u8,
        arg_masks: &'static [u8],
    },
    WithBitmaskAndArgs {
        opcode: u8,
        bitmask: u8,
        options: &'static [u8],
        arg_masks: &'static [u8],
    },
}

/// Encoded command: opcode byte plus up to `MAX_COMMAND_ARGS` arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBytes {
    bytes: [u8; MAX_COMMAND_ARGS + 1],
    len: usize,
}

impl CommandBytes {
    fn new(opcode: u8) -> Self {
        let mut bytes = [0u8; MAX_COMMAND_ARGS + 1];
        bytes[0] = opcode;
        CommandBytes { bytes, len: 1 }
    }

    fn push(&mut self, b: u8) {
        self.bytes[self.len] = b;
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }
}

impl std::ops::Deref for CommandBytes {
    type Target = [u8];
    fn deref(&self) -> &[u8] { self.as_slice() }
}

impl Command {
    pub const fn opcode(&self) -> u8 {
        match *self {
            Command::Simple { opcode }
            | Command::WithBitmask { opcode, .. }
            | Command::WithArgs { opcode, .. }
            | Command::WithBitmaskAndArgs { opcode, .. } => opcode,
        }
    }

    /// Number of argument bytes following the opcode
    pub fn argc(&self) -> usize {
        match self {
            Command::WithArgs { arg_masks, .. } | Command::WithBitmaskAndArgs { arg_masks, .. } => {
                arg_masks.len()
            }
            _ => 0,
        }
    }

    /// Build the byte sequence for this command.
    ///
    /// `option` is ignored by shapes without a bitmask, `args` by shapes
    /// without arguments. Extra argument bytes beyond the command's count
    /// are ignored.
    pub fn encode(&self, option: u8, args: &[u8]) -> Result<CommandBytes, Error> {
        match *self {
            Command::Simple { opcode } => Ok(CommandBytes::new(opcode)),
            Command::WithBitmask { opcode, bitmask, options } => {
                check_option(opcode, options, option)?;
                Ok(CommandBytes::new(opcode | (option & bitmask)))
            }
            Command::WithArgs { opcode, arg_masks } => {
                check_args(opcode, arg_masks, args)?;
                Ok(append_args(CommandBytes::new(opcode), arg_masks, args))
            }
            Command::WithBitmaskAndArgs { opcode, bitmask, options, arg_masks } => {
                check_option(opcode, options, option)?;
                check_args(opcode, arg_masks, args)?;
                Ok(append_args(CommandBytes::new(opcode | (option & bitmask)), arg_masks, args))
            }
        }
    }
}

fn check_option(opcode: u8, options: &[u8], option: u8) -> Result<(), Error> {
    if options.is_empty() || options.contains(&option) {
        Ok(())
    } else {
        Err(Error::InvalidOption { opcode, option })
    }
}

fn check_args(opcode: u8, arg_masks: &[u8], args: &[u8]) -> Result<(), Error> {
    if args.len() < arg_masks.len() {
        return Err(Error::InvalidArguments { opcode, expected: arg_masks.len(), got: args.len() });
    }
    Ok(())
}

fn append_args(mut out: CommandBytes, arg_masks: &[u8], args: &[u8]) -> CommandBytes {
    for (arg, mask) in args.iter().zip(arg_masks) {
        out.push(arg & mask);
    }
    out
}

// ─── Option values ──────────────────────────────────────────────────────────

pub mod option {
    pub const DISPLAY_ALLON_RESUME: u8 = 0x0;
    pub const DISPLAY_ALLON_CLEAR: u8 = 0x1;
    pub const DISPLAY_NORMAL: u8 = 0x2;
    pub const DISPLAY_INVERT: u8 = 0x3;
    pub const DISPLAY_OFF: u8 = 0xA;
    pub const DISPLAY_ON: u8 = 0xB;

    pub const HORIZONTAL_SCROLL_RIGHT: u8 = 0x0;
    pub const HORIZONTAL_SCROLL_LEFT: u8 = 0x1;

    pub const ADDRESSING_MODE_HORIZONTAL: u8 = 0x0;
    pub const ADDRESSING_MODE_VERTICAL: u8 = 0x1;
    pub const ADDRESSING_MODE_PAGE: u8 = 0x2;

    pub const SEGMENT_REMAP_SEG0_TO_0: u8 = 0x0;
    pub const SEGMENT_REMAP_SEG0_TO_127: u8 = 0x1;

    pub const COM_SCAN_DIR_NORMAL: u8 = 0x0;
    pub const COM_SCAN_DIR_REVERSE: u8 = 0x8;
}

use option::*;

// ─── Fundamental commands ───────────────────────────────────────────────────

pub const SET_CONTRAST: Command = Command::WithArgs { opcode: 0x81, arg_masks: &[0xFF] };

/// 0xA4/0xA5 entire display on, 0xA6/0xA7 invert, 0xAE/0xAF power
pub const SET_DISPLAY: Command = Command::WithBitmask {
    opcode: 0xA4,
    bitmask: 0x0B,
    options: &[
        DISPLAY_ALLON_RESUME,
        DISPLAY_ALLON_CLEAR,
        DISPLAY_NORMAL,
        DISPLAY_INVERT,
        DISPLAY_OFF,
        DISPLAY_ON,
    ],
};

// ─── Scrolling commands ─────────────────────────────────────────────────────

/// Args: dummy, start page, interval, end page, dummy, dummy
pub const SCROLL_HORIZONTAL: Command = Command::WithBitmaskAndArgs {
    opcode: 0x26,
    bitmask: 0x01,
    options: &[HORIZONTAL_SCROLL_RIGHT, HORIZONTAL_SCROLL_LEFT],
    arg_masks: &[0x00, 0x07, 0x07, 0x07, 0x00, 0xFF],
};

/// Args: dummy, start page, interval, end page, vertical offset
pub const SCROLL_HORIZONTAL_VERTICAL: Command = Command::WithBitmaskAndArgs {
    opcode: 0x29,
    bitmask: 0x01,
    options: &[HORIZONTAL_SCROLL_RIGHT, HORIZONTAL_SCROLL_LEFT],
    arg_masks: &[0x00, 0x07, 0x07, 0x07, 0x3F],
};

pub const SCROLL_DEACTIVATE: Command = Command::Simple { opcode: 0x2E };
pub const SCROLL_ACTIVATE: Command = Command::Simple { opcode: 0x2F };

/// Args: top fixed rows, scroll area rows
pub const SET_VERTICAL_SCROLL_AREA: Command = Command::WithArgs { opcode: 0xA3, arg_masks: &[0x3F, 0x7F] };

// ─── Address setting commands ───────────────────────────────────────────────

pub const SET_MEMORY_ADDRESSING_MODE: Command = Command::WithArgs { opcode: 0x20, arg_masks: &[0x03] };

pub const PAGE_MODE_SET_PAGE: Command = Command::WithBitmask { opcode: 0xB0, bitmask: 0x07, options: &[] };
pub const PAGE_MODE_SET_COLUMN_LOW: Command = Command::WithBitmask { opcode: 0x00, bitmask: 0x0F, options: &[] };
pub const PAGE_MODE_SET_COLUMN_HIGH: Command = Command::WithBitmask { opcode: 0x10, bitmask: 0x0F, options: &[] };

pub const SET_PAGE_RANGE: Command = Command::WithArgs { opcode: 0x22, arg_masks: &[0x03, 0x03] };
pub const SET_COLUMN_RANGE: Command = Command::WithArgs { opcode: 0x21, arg_masks: &[0x7F, 0x7F] };

// ─── Hardware configuration commands ────────────────────────────────────────

pub const SET_START_LINE: Command = Command::WithBitmask { opcode: 0x40, bitmask: 0x3F, options: &[] };

pub const SET_SEGMENT_REMAP: Command = Command::WithBitmask {
    opcode: 0xA0,
    bitmask: 0x01,
    options: &[SEGMENT_REMAP_SEG0_TO_0, SEGMENT_REMAP_SEG0_TO_127],
};

pub const SET_MULTIPLEX: Command = Command::WithArgs { opcode: 0xA8, arg_masks: &[0x3F] };

pub const SET_COM_SCAN_DIR: Command = Command::WithBitmask {
    opcode: 0xC0,
    bitmask: 0x08,
    options: &[COM_SCAN_DIR_NORMAL, COM_SCAN_DIR_REVERSE],
};

pub const SET_DISPLAY_OFFSET: Command = Command::WithArgs { opcode: 0xD3, arg_masks: &[0x3F] };

pub const SET_COM_PINS: Command =
    Command::WithBitmaskAndArgs { opcode: 0xDA, bitmask: 0xFF, options: &[], arg_masks: &[0xFF] };

// ─── Timing and driving scheme commands ─────────────────────────────────────

pub const SET_CLOCK_DIV: Command = Command::WithArgs { opcode: 0xD5, arg_masks: &[0xFF] };
pub const SET_PRECHARGE: Command = Command::WithArgs { opcode: 0xD9, arg_masks: &[0xFF] };

pub const SET_VCOM_DESELECT: Command =
    Command::WithBitmaskAndArgs { opcode: 0xDB, bitmask: 0xFF, options: &[], arg_masks: &[0xFF] };

pub const NOP: Command = Command::Simple { opcode: 0xE3 };

pub const CHARGE_PUMP: Command =
    Command::WithBitmaskAndArgs { opcode: 0x8D, bitmask: 0xFF, options: &[], arg_masks: &[0xFF] };

// Power source selectors carried over from the vendor init scripts; the
// datasheet does not document these opcodes.
pub const EXTERNAL_VCC: Command = Command::Simple { opcode: 0x01 };
pub const SWITCH_CAP_VCC: Command = Command::Simple { opcode: 0x02 };

/// COM pins: bit 4 alternative config, bit 5 left/right remap, bit 1 fixed high
pub const fn com_pins_arg(pins: u8) -> u8 {
    ((pins & 0x03) << 4) | 0x02
}

/// VCOMH deselect level lives in bits 4..6
pub const fn vcom_level_arg(level: u8) -> u8 {
    (level & 0x07) << 4
}

/// Charge pump: bit 2 enable, bit 4 fixed high
pub const fn charge_pump_arg(enable: u8) -> u8 {
    ((enable & 0x01) << 2) | 0x10
}

// ─── Panel configuration ────────────────────────────────────────────────────

/// Register values written by [`Controller::init_display`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub clock_div: u8,
    /// Rows - 1 (0x1F for 32 rows, 0x3F for 64)
    pub multiplex: u8,
    pub display_offset: u8,
    pub start_line: u8,
    pub charge_pump: bool,
    pub segment_remap: u8,
    pub com_scan_dir: u8,
    pub com_pins: u8,
    pub contrast: u8,
    pub precharge: u8,
    pub vcom_level: u8,
}

impl Default for PanelConfig {
    fn default() -> Self {
        PanelConfig {
            clock_div: 0x80,
            multiplex: 0x1F,
            display_offset: 0x00,
            start_line: 0x00,
            charge_pump: true,
            segment_remap: SEGMENT_REMAP_SEG0_TO_0,
            com_scan_dir: COM_SCAN_DIR_NORMAL,
            com_pins: 0x00,
            contrast: 0x8F,
            precharge: 0xF1,
            vcom_level: 0x4,
        }
    }
}

// ─── Controller ─────────────────────────────────────────────────────────────

/// Command/data writer bound to one transport and bus address.
pub struct Controller<T> {
    transport: T,
    address: u8,
}

impl<T: Transport> Controller<T> {
    pub fn new(transport: T) -> Self {
        Self::with_address(transport, I2C_ADDRESS_WRITE)
    }

    pub fn with_address(transport: T, address: u8) -> Self {
        Controller { transport, address }
    }

    pub fn address(&self) -> u8 { self.address }

    pub fn transport(&self) -> &T { &self.transport }

    pub fn transport_mut(&mut self) -> &mut T { &mut self.transport }

    pub fn into_transport(self) -> T { self.transport }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.transport.send(PayloadKind::Command, self.address, bytes)
    }

    /// Write pixel bytes at the controller's current RAM pointer.
    pub fn send_data(&mut self, data: &[u8]) -> Result<(), Error> {
        self.transport.send(PayloadKind::Data, self.address, data)
    }

    /// Encode and write any descriptor.
    pub fn send(&mut self, command: &Command, option: u8, args: &[u8]) -> Result<(), Error> {
        let bytes = command.encode(option, args)?;
        self.write(&bytes)
    }

    pub fn send_simple(&mut self, opcode: u8) -> Result<(), Error> {
        self.write(&[opcode])
    }

    pub fn send_with_bitmask(&mut self, command: &Command, option: u8) -> Result<(), Error> {
        self.send(command, option, &[])
    }

    pub fn send_with_args(&mut self, command: &Command, args: &[u8]) -> Result<(), Error> {
        self.send(command, 0, args)
    }

    pub fn send_with_bitmask_and_args(&mut self, command: &Command, option: u8, args: &[u8]) -> Result<(), Error> {
        self.send(command, option, args)
    }

    // Fundamental

    pub fn set_contrast(&mut self, contrast: u8) -> Result<(), Error> {
        self.send_with_args(&SET_CONTRAST, &[contrast])
    }

    pub fn set_display(&mut self, option: u8) -> Result<(), Error> {
        self.send_with_bitmask(&SET_DISPLAY, option)
    }

    // Scrolling

    pub fn set_scroll_horizontal(&mut self, direction: u8, args: &[u8]) -> Result<(), Error> {
        self.send_with_bitmask_and_args(&SCROLL_HORIZONTAL, direction, args)
    }

    pub fn set_scroll_horizontal_vertical(&mut self, direction: u8, args: &[u8]) -> Result<(), Error> {
        self.send_with_bitmask_and_args(&SCROLL_HORIZONTAL_VERTICAL, direction, args)
    }

    pub fn deactivate_scroll(&mut self) -> Result<(), Error> {
        self.send_simple(SCROLL_DEACTIVATE.opcode())
    }

    pub fn activate_scroll(&mut self) -> Result<(), Error> {
        self.send_simple(SCROLL_ACTIVATE.opcode())
    }

    pub fn set_vertical_scroll_area(&mut self, args: &[u8]) -> Result<(), Error> {
        self.send_with_args(&SET_VERTICAL_SCROLL_AREA, args)
    }

    // Addressing

    pub fn set_memory_addressing_mode(&mut self, mode: u8) -> Result<(), Error> {
        self.send_with_args(&SET_MEMORY_ADDRESSING_MODE, &[mode])
    }

    pub fn page_mode_set_page(&mut self, page: u8) -> Result<(), Error> {
        self.send_with_bitmask(&PAGE_MODE_SET_PAGE, page)
    }

    pub fn page_mode_set_column_low(&mut self, nibble: u8) -> Result<(), Error> {
        self.send_with_bitmask(&PAGE_MODE_SET_COLUMN_LOW, nibble)
    }

    pub fn page_mode_set_column_high(&mut self, nibble: u8) -> Result<(), Error> {
        self.send_with_bitmask(&PAGE_MODE_SET_COLUMN_HIGH, nibble)
    }

    pub fn set_page_range(&mut self, start: u8, end: u8) -> Result<(), Error> {
        self.send_with_args(&SET_PAGE_RANGE, &[start, end])
    }

    pub fn set_column_range(&mut self, start: u8, end: u8) -> Result<(), Error> {
        self.send_with_args(&SET_COLUMN_RANGE, &[start, end])
    }

    // Hardware configuration

    pub fn set_start_line(&mut self, line: u8) -> Result<(), Error> {
        self.send_with_bitmask(&SET_START_LINE, line)
    }

    pub fn set_segment_remap(&mut self, option: u8) -> Result<(), Error> {
        self.send_with_bitmask(&SET_SEGMENT_REMAP, option)
    }

    pub fn set_multiplex(&mut self, ratio: u8) -> Result<(), Error> {
        self.send_with_args(&SET_MULTIPLEX, &[ratio])
    }

    pub fn set_com_scan_dir(&mut self, option: u8) -> Result<(), Error> {
        self.send_with_bitmask(&SET_COM_SCAN_DIR, option)
    }

    pub fn set_display_offset(&mut self, offset: u8) -> Result<(), Error> {
        self.send_with_args(&SET_DISPLAY_OFFSET, &[offset])
    }

    pub fn set_com_pins(&mut self, pins: u8) -> Result<(), Error> {
        self.send_with_bitmask_and_args(&SET_COM_PINS, 0x00, &[com_pins_arg(pins)])
    }

    // Timing and driving scheme

    pub fn set_clock_div(&mut self, ratio: u8) -> Result<(), Error> {
        self.send_with_args(&SET_CLOCK_DIV, &[ratio])
    }

    pub fn set_precharge(&mut self, period: u8) -> Result<(), Error> {
        self.send_with_args(&SET_PRECHARGE, &[period])
    }

    pub fn set_vcom_deselect(&mut self, level: u8) -> Result<(), Error> {
        self.send_with_bitmask_and_args(&SET_VCOM_DESELECT, 0x00, &[vcom_level_arg(level)])
    }

    pub fn nop(&mut self) -> Result<(), Error> {
        self.send_simple(NOP.opcode())
    }

    pub fn charge_pump(&mut self, enable: bool) -> Result<(), Error> {
        self.send_with_bitmask_and_args(&CHARGE_PUMP, 0x00, &[charge_pump_arg(enable as u8)])
    }

    pub fn set_external_vcc(&mut self) -> Result<(), Error> {
        self.send_simple(EXTERNAL_VCC.opcode())
    }

    pub fn set_switch_cap_vcc(&mut self) -> Result<(), Error> {
        self.send_simple(SWITCH_CAP_VCC.opcode())
    }

    /// Power-on register sequence. Stops at the first failed write.
    pub fn init_display(&mut self, config: &PanelConfig) -> Result<(), Error> {
        tracing::debug!("initialising panel at 0x{:02X}: {:?}", self.address, config);
        self.set_display(DISPLAY_OFF)?;
        self.set_clock_div(config.clock_div)?;
        self.set_multiplex(config.multiplex)?;
        self.set_display_offset(config.display_offset)?;
        self.set_start_line(config.start_line)?;
        self.charge_pump(config.charge_pump)?;
        self.set_segment_remap(config.segment_remap)?;
        self.set_com_scan_dir(config.com_scan_dir)?;
        self.set_com_pins(config.com_pins)?;
        self.set_contrast(config.contrast)?;
        self.set_precharge(config.precharge)?;
        self.set_vcom_deselect(config.vcom_level)?;
        self.set_display(DISPLAY_ALLON_RESUME)?;
        self.set_display(DISPLAY_NORMAL)?;
        self.set_display(DISPLAY_ON)?;
        Ok(())
    }
}
