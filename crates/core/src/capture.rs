//! Recorded bus sessions.
//!
//! A capture holds the panel geometry and every write that crossed the
//! transport, in order. It can be written to disk and replayed into a
//! [`VirtualPanel`] later.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "OTCP"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geometry::Geometry;
use crate::panel::VirtualPanel;
use crate::transport::{PayloadKind, Record, Transport};

/// Magic bytes identifying a capture file.
const MAGIC: &[u8; 4] = b"OTCP";
/// Current capture format version.
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub geometry: Geometry,
    pub records: Vec<Record>,
}

impl Capture {
    pub fn new(geometry: Geometry, records: Vec<Record>) -> Self {
        Capture { geometry, records }
    }

    pub fn data_bytes(&self) -> usize {
        self.records.iter().filter(|r| r.kind == PayloadKind::Data).map(|r| r.payload.len()).sum()
    }

    /// Feed every record into a fresh panel of the captured geometry.
    pub fn replay(&self) -> VirtualPanel {
        let mut panel = VirtualPanel::new(self.geometry);
        self.replay_into(&mut panel);
        panel
    }

    pub fn replay_into(&self, panel: &mut VirtualPanel) {
        for r in &self.records {
            // The virtual panel accepts every write
            let _ = panel.send(r.kind, r.address, &r.payload);
        }
        tracing::debug!("replayed {} records ({} data bytes)", self.records.len(), self.data_bytes());
    }
}

// ─── File I/O ───────────────────────────────────────────────────────────────

pub fn encode(capture: &Capture) -> Result<Vec<u8>, String> {
    let payload = bincode::serialize(capture)
        .map_err(|e| format!("Serialize error: {}", e))?;

    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

pub fn decode(data: &[u8]) -> Result<Capture, String> {
    if data.len() < HEADER_LEN {
        return Err("File too small".into());
    }
    if &data[0..4] != MAGIC {
        return Err("Invalid capture file (bad magic)".into());
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(format!("Unsupported capture version {} (expected {})",
            version, FORMAT_VERSION));
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
        .map_err(|e| format!("Decompress error: {:?}", e))?;

    bincode::deserialize(&decompressed)
        .map_err(|e| format!("Deserialize error: {}", e))
}

pub fn save_to_file(capture: &Capture, path: &Path) -> Result<(), String> {
    let out = encode(capture)?;
    std::fs::write(path, &out)
        .map_err(|e| format!("Write error: {}", e))
}

pub fn load_from_file(path: &Path) -> Result<Capture, String> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Read error: {}", e))?;
    decode(&data)
}

/// Split a UDP frame into (address, kind, payload). `None` for frames
/// shorter than the header or with an unknown control byte.
pub fn decode_datagram(frame: &[u8]) -> Option<(u8, PayloadKind, &[u8])> {
    match frame {
        [address, control, payload @ ..] => {
            PayloadKind::from_control_byte(*control).map(|kind| (*address, kind, payload))
        }
        _ => None,
    }
}
