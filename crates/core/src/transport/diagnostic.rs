//! Diagnostic sink: logs every payload and reports success.

use super::{hex_dump, PayloadKind, Transport};
use crate::error::Error;

/// Local sink for bring-up without hardware. Nothing leaves the process.
#[derive(Debug, Default)]
pub struct LogSink {
    /// Payloads logged since creation
    pub sent: u64,
}

impl LogSink {
    pub fn new() -> Self {
        LogSink { sent: 0 }
    }
}

impl Transport for LogSink {
    fn send(&mut self, kind: PayloadKind, address: u8, payload: &[u8]) -> Result<(), Error> {
        self.sent += 1;
        tracing::info!(
            "[I2C] Sending {}: {:02X} {:02X} {}",
            kind.label(),
            address,
            kind.control_byte(),
            hex_dump(payload)
        );
        Ok(())
    }
}
