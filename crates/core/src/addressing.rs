//! Window selection: turns a rectangle of panel RAM into the command
//! sequence that points the controller's write cursor at it.
//!
//! Horizontal and vertical mode send the same window commands and differ
//! only in the mode value; the controller decides which way the cursor
//! advances. Page mode can only select a single page and a start column,
//! the latter split into two nibble commands.

use crate::command::{option, Controller};
use crate::error::Error;
use crate::geometry::Point;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Horizontal,
    Vertical,
    Page,
}

impl AddressingMode {
    /// Register value for the memory addressing mode command
    pub const fn register_value(self) -> u8 {
        match self {
            AddressingMode::Horizontal => option::ADDRESSING_MODE_HORIZONTAL,
            AddressingMode::Vertical => option::ADDRESSING_MODE_VERTICAL,
            AddressingMode::Page => option::ADDRESSING_MODE_PAGE,
        }
    }
}

impl TryFrom<u8> for AddressingMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(AddressingMode::Horizontal),
            1 => Ok(AddressingMode::Vertical),
            2 => Ok(AddressingMode::Page),
            other => Err(Error::InvalidAddressingMode(other)),
        }
    }
}

/// One encoder call in a window-select sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStep {
    Mode(AddressingMode),
    PageRange { start: u8, end: u8 },
    ColumnRange { start: u8, end: u8 },
    Page(u8),
    ColumnLow(u8),
    ColumnHigh(u8),
}

/// Translate a window into encoder calls without touching any transport.
pub fn plan_window(mode: AddressingMode, start: Point, end: Point) -> Vec<WindowStep> {
    match mode {
        AddressingMode::Horizontal | AddressingMode::Vertical => vec![
            WindowStep::Mode(mode),
            WindowStep::PageRange { start: start.page, end: end.page },
            WindowStep::ColumnRange { start: start.column, end: end.column },
        ],
        AddressingMode::Page => vec![
            WindowStep::Mode(mode),
            WindowStep::Page(start.page),
            WindowStep::ColumnLow(start.column & 0x0F),
            WindowStep::ColumnHigh(start.column >> 4),
        ],
    }
}

impl<T: Transport> Controller<T> {
    /// Run a single window step.
    pub fn apply_window_step(&mut self, step: WindowStep) -> Result<(), Error> {
        match step {
            WindowStep::Mode(mode) => self.set_memory_addressing_mode(mode.register_value()),
            WindowStep::PageRange { start, end } => self.set_page_range(start, end),
            WindowStep::ColumnRange { start, end } => self.set_column_range(start, end),
            WindowStep::Page(page) => self.page_mode_set_page(page),
            WindowStep::ColumnLow(nibble) => self.page_mode_set_column_low(nibble),
            WindowStep::ColumnHigh(nibble) => self.page_mode_set_column_high(nibble),
        }
    }
}

/// Point the controller's write cursor at a window. The first failing
/// step aborts the sequence; the controller's window state is then
/// unknown and the caller must not stream data into it.
pub fn select_window<T: Transport>(
    controller: &mut Controller<T>,
    mode: AddressingMode,
    start: Point,
    end: Point,
) -> Result<(), Error> {
    for step in plan_window(mode, start, end) {
        if let Err(e) = controller.apply_window_step(step) {
            tracing::warn!("window select {:?} failed at {:?}: {}", mode, step, e);
            return Err(e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{NullSink, Recorder};

    fn run(mode: AddressingMode, start: Point, end: Point) -> Vec<Vec<u8>> {
        let mut c = Controller::new(Recorder::new(NullSink));
        select_window(&mut c, mode, start, end).unwrap();
        c.transport().records().iter().map(|r| r.payload.clone()).collect()
    }

    #[test]
    fn test_horizontal_window() {
        let bytes = run(AddressingMode::Horizontal, Point::new(1, 8), Point::new(2, 103));
        assert_eq!(bytes, vec![vec![0x20, 0x00], vec![0x22, 1, 2], vec![0x21, 8, 103]]);
    }

    #[test]
    fn test_vertical_differs_only_in_mode() {
        let h = run(AddressingMode::Horizontal, Point::new(0, 0), Point::new(3, 127));
        let v = run(AddressingMode::Vertical, Point::new(0, 0), Point::new(3, 127));
        assert_eq!(v[0], vec![0x20, 0x01]);
        assert_eq!(h[1..], v[1..]);
    }

    #[test]
    fn test_page_mode_nibbles() {
        let bytes = run(AddressingMode::Page, Point::new(2, 0x5A), Point::new(3, 0x7F));
        assert_eq!(bytes, vec![vec![0x20, 0x02], vec![0xB2], vec![0x0A], vec![0x15]]);
    }

    #[test]
    fn test_plan_is_pure() {
        let plan = plan_window(AddressingMode::Page, Point::new(1, 0x23), Point::new(1, 0x30));
        assert_eq!(
            plan,
            vec![
                WindowStep::Mode(AddressingMode::Page),
                WindowStep::Page(1),
                WindowStep::ColumnLow(0x3),
                WindowStep::ColumnHigh(0x2),
            ]
        );
    }

    #[test]
    fn test_failure_aborts_sequence() {
        let mut c = Controller::new(Recorder::new(NullSink));
        c.transport_mut().fail_after(1);
        let r = select_window(&mut c, AddressingMode::Horizontal, Point::new(0, 0), Point::new(0, 10));
        assert!(matches!(r, Err(Error::TransportFailure(_))));
        assert_eq!(c.transport().records().len(), 1);
    }

    #[test]
    fn test_mode_from_raw() {
        assert_eq!(AddressingMode::try_from(1), Ok(AddressingMode::Vertical));
        assert_eq!(AddressingMode::try_from(3), Err(Error::InvalidAddressingMode(3)));
    }
}
