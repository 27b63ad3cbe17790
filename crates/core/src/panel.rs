//! Software model of the SSD1306 controller.
//!
//! Consumes the same command and data bytes a real panel would receive and
//! keeps its own copy of display RAM. Supports horizontal, vertical and
//! page addressing, column/page windows, the page-mode nibble commands,
//! contrast, invert, entire-display-on and display on/off. Commands that
//! only affect the analog side (timing, charge pump, scrolling) have their
//! argument bytes consumed and are otherwise ignored.
//!
//! Used as a transport in tests and by the frontend's panel viewer.

use crate::error::Error;
use crate::geometry::Geometry;
use crate::transport::{PayloadKind, Transport};

/// Controller RAM is 128 columns by 8 pages regardless of the glass size
const RAM_COLUMNS: u8 = 128;
const RAM_PAGES: u8 = 8;

pub struct VirtualPanel {
    geometry: Geometry,
    /// Display RAM, 8 pages × 128 columns
    ram: Vec<u8>,
    /// Current column pointer
    col: u8,
    /// Current page pointer (each page = 8 rows)
    page: u8,
    col_start: u8,
    col_end: u8,
    page_start: u8,
    page_end: u8,
    mode: u8,
    inverted: bool,
    /// 0xA5: every pixel lit regardless of RAM
    all_on: bool,
    display_on: bool,
    /// Contrast level (0x00–0xFF, reset value 0x7F)
    pub contrast: u8,
    /// Set whenever RAM or a visible attribute changes
    pub dirty: bool,
    pub cmd_count: u64,
    pub data_count: u64,
    /// Multi-byte command state
    cmd_state: CmdState,
    /// Number of remaining parameter bytes to ignore
    cmd_skip: u8,
}

#[derive(Debug, Clone, Copy)]
enum CmdState {
    Ready,
    SetMode,
    SetColStart,
    SetColEnd,
    SetPageStart,
    SetPageEnd,
    SetContrast,
}

impl VirtualPanel {
    pub fn new(geometry: Geometry) -> Self {
        VirtualPanel {
            geometry,
            ram: vec![0; RAM_COLUMNS as usize * RAM_PAGES as usize],
            col: 0,
            page: 0,
            col_start: 0,
            col_end: RAM_COLUMNS - 1,
            page_start: 0,
            page_end: RAM_PAGES - 1,
            // Controller resets into page addressing
            mode: 0x02,
            inverted: false,
            all_on: false,
            display_on: false,
            contrast: 0x7F,
            dirty: false,
            cmd_count: 0,
            data_count: 0,
            cmd_state: CmdState::Ready,
            cmd_skip: 0,
        }
    }

    pub fn geometry(&self) -> Geometry { self.geometry }

    pub fn is_on(&self) -> bool { self.display_on }

    pub fn is_inverted(&self) -> bool { self.inverted }

    /// 0 horizontal, 1 vertical, 2 page
    pub fn addressing_mode(&self) -> u8 { self.mode }

    /// Current write cursor as (page, column)
    pub fn cursor(&self) -> (u8, u8) { (self.page, self.col) }

    /// Raw RAM byte at a page/column
    pub fn ram_byte(&self, page: u8, column: u8) -> u8 {
        if page >= RAM_PAGES || column >= RAM_COLUMNS {
            return 0;
        }
        self.ram[page as usize * RAM_COLUMNS as usize + column as usize]
    }

    /// One visible page row of RAM
    pub fn page_bytes(&self, page: u8) -> &[u8] {
        let start = page.min(RAM_PAGES - 1) as usize * RAM_COLUMNS as usize;
        &self.ram[start..start + self.geometry.columns() as usize]
    }

    /// Receive a command byte (control byte 0x00)
    pub fn receive_command(&mut self, byte: u8) {
        self.cmd_count += 1;
        if self.cmd_skip > 0 {
            self.cmd_skip -= 1;
            return;
        }

        match self.cmd_state {
            CmdState::SetMode => {
                self.mode = byte & 0x03;
                self.cmd_state = CmdState::Ready;
                return;
            }
            CmdState::SetColStart => {
                self.col_start = byte & 0x7F;
                self.col = self.col_start;
                self.cmd_state = CmdState::SetColEnd;
                return;
            }
            CmdState::SetColEnd => {
                self.col_end = byte & 0x7F;
                self.cmd_state = CmdState::Ready;
                return;
            }
            CmdState::SetPageStart => {
                self.page_start = byte & 0x07;
                self.page = self.page_start;
                self.cmd_state = CmdState::SetPageEnd;
                return;
            }
            CmdState::SetPageEnd => {
                self.page_end = byte & 0x07;
                self.cmd_state = CmdState::Ready;
                return;
            }
            CmdState::SetContrast => {
                self.contrast = byte;
                self.dirty = true;
                self.cmd_state = CmdState::Ready;
                return;
            }
            CmdState::Ready => {}
        }

        match byte {
            0x20 => self.cmd_state = CmdState::SetMode,
            0x21 => self.cmd_state = CmdState::SetColStart,
            0x22 => self.cmd_state = CmdState::SetPageStart,
            0x81 => self.cmd_state = CmdState::SetContrast,
            // Page addressing: column nibbles and page start
            0x00..=0x0F => self.col = (self.col & 0xF0) | (byte & 0x0F),
            0x10..=0x1F => self.col = ((byte & 0x07) << 4) | (self.col & 0x0F),
            0xB0..=0xB7 => self.page = byte & 0x07,
            0xA4 | 0xA5 => {
                self.all_on = byte == 0xA5;
                self.dirty = true;
            }
            0xA6 | 0xA7 => {
                self.inverted = byte == 0xA7;
                self.dirty = true;
            }
            0xAE | 0xAF => {
                self.display_on = byte == 0xAF;
                self.dirty = true;
            }
            0x26 | 0x27 => self.cmd_skip = 6,
            0x29 | 0x2A => self.cmd_skip = 5,
            0xA3 => self.cmd_skip = 2,
            0xA8 | 0xD3 | 0xD5 | 0xD9 | 0xDA | 0xDB | 0x8D => self.cmd_skip = 1,
            // Scroll on/off, start line, remap, scan direction, NOP
            0x2E | 0x2F | 0x40..=0x7F | 0xA0 | 0xA1 | 0xC0 | 0xC8 | 0xE3 => {}
            _ => {}
        }
    }

    /// Receive a data byte (control byte 0x40)
    pub fn receive_data(&mut self, byte: u8) {
        self.data_count += 1;
        if self.col < RAM_COLUMNS && self.page < RAM_PAGES {
            self.ram[self.page as usize * RAM_COLUMNS as usize + self.col as usize] = byte;
            self.dirty = true;
        }

        match self.mode {
            0x00 => {
                self.col += 1;
                if self.col > self.col_end {
                    self.col = self.col_start;
                    self.page += 1;
                    if self.page > self.page_end {
                        self.page = self.page_start;
                    }
                }
            }
            0x01 => {
                self.page += 1;
                if self.page > self.page_end {
                    self.page = self.page_start;
                    self.col += 1;
                    if self.col > self.col_end {
                        self.col = self.col_start;
                    }
                }
            }
            _ => {
                // Page mode wraps within the page
                self.col += 1;
                if self.col >= RAM_COLUMNS {
                    self.col = 0;
                }
            }
        }
    }

    /// Whether the pixel at (x, y) is lit, after invert and power state
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if !self.display_on || x >= self.geometry.columns() as usize || y >= self.geometry.rows() {
            return false;
        }
        if self.all_on {
            return true;
        }
        let byte = self.ram_byte((y / 8) as u8, x as u8);
        ((byte >> (y % 8)) & 1 != 0) ^ self.inverted
    }

    /// Row-major lit/unlit pixels
    pub fn as_mono_pixels(&self) -> Vec<bool> {
        let w = self.geometry.columns() as usize;
        let h = self.geometry.rows();
        let mut pixels = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                pixels.push(self.pixel(x, y));
            }
        }
        pixels
    }

    /// 0xRRGGBB pixels scaled by contrast, for window frontends
    pub fn as_pixel_buffer(&self) -> Vec<u32> {
        let bright = self.contrast as u32;
        let on = (bright << 16) | (bright << 8) | bright;
        self.as_mono_pixels().into_iter().map(|lit| if lit { on } else { 0 }).collect()
    }

    /// Text rendering, two pixel rows per line using half blocks
    pub fn to_ascii(&self) -> String {
        let w = self.geometry.columns() as usize;
        let h = self.geometry.rows();
        let mut out = String::with_capacity((w + 1) * h / 2);
        for y in (0..h).step_by(2) {
            for x in 0..w {
                let top = self.pixel(x, y);
                let bottom = self.pixel(x, y + 1);
                out.push(match (top, bottom) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                });
            }
            out.push('\n');
        }
        out
    }
}

impl Transport for VirtualPanel {
    fn send(&mut self, kind: PayloadKind, _address: u8, payload: &[u8]) -> Result<(), Error> {
        match kind {
            PayloadKind::Command => payload.iter().for_each(|&b| self.receive_command(b)),
            PayloadKind::Data => payload.iter().for_each(|&b| self.receive_data(b)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> VirtualPanel {
        VirtualPanel::new(Geometry::default())
    }

    #[test]
    fn test_panel_creation() {
        let p = panel();
        assert_eq!(p.addressing_mode(), 2);
        assert!(!p.is_on());
        assert_eq!(p.cursor(), (0, 0));
    }

    #[test]
    fn test_set_column_address() {
        let mut p = panel();
        p.receive_command(0x21);
        p.receive_command(10);
        p.receive_command(50);
        assert_eq!(p.col_start, 10);
        assert_eq!(p.col_end, 50);
        assert_eq!(p.cursor(), (0, 10));
    }

    #[test]
    fn test_horizontal_window_wraps_to_next_page() {
        let mut p = panel();
        for b in [0x20, 0x00, 0x22, 1, 2, 0x21, 4, 5] {
            p.receive_command(b);
        }
        for b in [0x11, 0x22, 0x33, 0x44] {
            p.receive_data(b);
        }
        assert_eq!(p.ram_byte(1, 4), 0x11);
        assert_eq!(p.ram_byte(1, 5), 0x22);
        assert_eq!(p.ram_byte(2, 4), 0x33);
        assert_eq!(p.ram_byte(2, 5), 0x44);
        assert_eq!(p.cursor(), (1, 4));
    }

    #[test]
    fn test_vertical_mode_walks_pages_first() {
        let mut p = panel();
        for b in [0x20, 0x01, 0x22, 0, 1, 0x21, 0, 127] {
            p.receive_command(b);
        }
        for b in [1, 2, 3] {
            p.receive_data(b);
        }
        assert_eq!(p.ram_byte(0, 0), 1);
        assert_eq!(p.ram_byte(1, 0), 2);
        assert_eq!(p.ram_byte(0, 1), 3);
    }

    #[test]
    fn test_page_mode_nibbles() {
        let mut p = panel();
        for b in [0x20, 0x02, 0xB3, 0x0A, 0x15] {
            p.receive_command(b);
        }
        assert_eq!(p.cursor(), (3, 0x5A));
        p.receive_data(0xFF);
        assert_eq!(p.ram_byte(3, 0x5A), 0xFF);
    }

    #[test]
    fn test_argument_bytes_are_skipped() {
        let mut p = panel();
        // Multiplex 0xAF would otherwise read as display on
        p.receive_command(0xA8);
        p.receive_command(0xAF);
        assert!(!p.is_on());
        p.receive_command(0xAF);
        assert!(p.is_on());
    }

    #[test]
    fn test_pixels_follow_invert_and_power() {
        let mut p = panel();
        p.receive_command(0x21);
        p.receive_command(0);
        p.receive_command(127);
        p.receive_data(0x01);
        assert!(!p.pixel(0, 0));
        p.receive_command(0xAF);
        assert!(p.pixel(0, 0));
        assert!(!p.pixel(0, 1));
        p.receive_command(0xA7);
        assert!(!p.pixel(0, 0));
        assert!(p.pixel(0, 1));
        p.receive_command(0xA5);
        assert!(p.pixel(0, 0));
    }

    #[test]
    fn test_ascii_dimensions() {
        let p = panel();
        let art = p.to_ascii();
        assert_eq!(art.lines().count(), 16);
        assert!(art.lines().all(|l| l.chars().count() == 128));
    }

    #[test]
    fn test_transport_routes_by_kind() {
        let mut p = panel();
        p.send(PayloadKind::Command, 0x78, &[0x20, 0x00, 0x81, 0x10]).unwrap();
        p.send(PayloadKind::Data, 0x78, &[0xAB]).unwrap();
        assert_eq!(p.addressing_mode(), 0);
        assert_eq!(p.contrast, 0x10);
        assert_eq!(p.ram_byte(0, 0), 0xAB);
        assert_eq!(p.data_count, 1);
    }
}
