//! Byte sinks between the controller encoder and the panel.
//!
//! Every write is tagged as either a command or pixel data and carries the
//! bus address it is destined for. The core never retries: a failed send is
//! reported straight back to the caller.
//!
//! - [`LogSink`] — diagnostic sink that only logs the bytes
//! - [`UdpSink`] — datagram sink with a 2-byte `[address, kind]` header
//! - [`ChunkedSink`] — splits payloads into bus-sized chunks for an inner sink
//! - [`Recorder`] — records writes (with optional failure injection)
//! - [`NullSink`] — accepts and drops everything

mod chunked;
mod diagnostic;
mod recorder;
mod udp;

pub use chunked::ChunkedSink;
pub use diagnostic::LogSink;
pub use recorder::{NullSink, Recorder, Record};
pub use udp::UdpSink;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Control byte selecting how the controller interprets a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadKind {
    Command,
    Data,
}

impl PayloadKind {
    /// Control byte sent ahead of the payload on the bus
    pub const fn control_byte(self) -> u8 {
        match self {
            PayloadKind::Command => 0x00,
            PayloadKind::Data => 0x40,
        }
    }

    pub fn from_control_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(PayloadKind::Command),
            0x40 => Some(PayloadKind::Data),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PayloadKind::Command => "command",
            PayloadKind::Data => "data",
        }
    }
}

/// A synchronous byte sink.
pub trait Transport {
    fn init(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn send(&mut self, kind: PayloadKind, address: u8, payload: &[u8]) -> Result<(), Error>;

    fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn init(&mut self) -> Result<(), Error> {
        (**self).init()
    }

    fn send(&mut self, kind: PayloadKind, address: u8, payload: &[u8]) -> Result<(), Error> {
        (**self).send(kind, address, payload)
    }

    fn close(&mut self) -> Result<(), Error> {
        (**self).close()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn init(&mut self) -> Result<(), Error> {
        (**self).init()
    }

    fn send(&mut self, kind: PayloadKind, address: u8, payload: &[u8]) -> Result<(), Error> {
        (**self).send(kind, address, payload)
    }

    fn close(&mut self) -> Result<(), Error> {
        (**self).close()
    }
}

/// Space-separated uppercase hex, as printed by the diagnostic sinks
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        s.push_str(&format!("{:02X}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_bytes() {
        assert_eq!(PayloadKind::Command.control_byte(), 0x00);
        assert_eq!(PayloadKind::Data.control_byte(), 0x40);
        assert_eq!(PayloadKind::from_control_byte(0x40), Some(PayloadKind::Data));
        assert_eq!(PayloadKind::from_control_byte(0x80), None);
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x78, 0x00, 0xAF]), "78 00 AF");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn test_boxed_transport_forwards() {
        let mut rec = Recorder::new(NullSink);
        {
            let mut boxed: Box<dyn Transport + '_> = Box::new(&mut rec);
            boxed.send(PayloadKind::Command, 0x78, &[0xAE]).unwrap();
        }
        assert_eq!(rec.records().len(), 1);
    }
}
