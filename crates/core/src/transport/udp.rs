//! Datagram sink for driving a remote (or simulated) panel over UDP.
//!
//! ## Datagram format
//!
//! ```text
//! +---------+---------+----------------------+
//! | address | kind    | payload ...          |
//! | 1 byte  | 1 byte  | up to 1022 bytes     |
//! +---------+---------+----------------------+
//! ```
//!
//! `kind` is the bus control byte (0x00 command, 0x40 data).

use std::net::{SocketAddr, UdpSocket};

use super::{hex_dump, PayloadKind, Transport};
use crate::error::Error;
use crate::{DEFAULT_UDP_PORT, MAX_DATAGRAM};

pub struct UdpSink {
    target: SocketAddr,
    socket: Option<UdpSocket>,
}

impl UdpSink {
    pub fn new(target: SocketAddr) -> Self {
        UdpSink { target, socket: None }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Build the datagram for one payload.
    pub fn frame(kind: PayloadKind, address: u8, payload: &[u8]) -> Result<Vec<u8>, Error> {
        if payload.len() + 2 > MAX_DATAGRAM {
            return Err(Error::TransportFailure(format!(
                "payload of {} bytes exceeds datagram limit", payload.len()
            )));
        }
        let mut buf = Vec::with_capacity(payload.len() + 2);
        buf.push(address);
        buf.push(kind.control_byte());
        buf.extend_from_slice(payload);
        Ok(buf)
    }
}

impl Default for UdpSink {
    fn default() -> Self {
        UdpSink::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_UDP_PORT)))
    }
}

impl Transport for UdpSink {
    fn init(&mut self) -> Result<(), Error> {
        let bind: SocketAddr = if self.target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind)
            .map_err(|e| Error::TransportFailure(format!("bind: {}", e)))?;
        socket
            .connect(self.target)
            .map_err(|e| Error::TransportFailure(format!("connect {}: {}", self.target, e)))?;
        tracing::debug!("UDP sink ready, sending to {}", self.target);
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, kind: PayloadKind, address: u8, payload: &[u8]) -> Result<(), Error> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| Error::TransportFailure("UDP sink not initialised".into()))?;
        let datagram = Self::frame(kind, address, payload)?;
        tracing::trace!("[UDP] Sending {}: {}", kind.label(), hex_dump(&datagram));
        socket
            .send(&datagram)
            .map_err(|e| Error::TransportFailure(format!("send: {}", e)))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.socket = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_frame_layout() {
        let d = UdpSink::frame(PayloadKind::Data, 0x78, &[0xAA, 0x55]).unwrap();
        assert_eq!(d, vec![0x78, 0x40, 0xAA, 0x55]);
        let c = UdpSink::frame(PayloadKind::Command, 0x78, &[0xAF]).unwrap();
        assert_eq!(c, vec![0x78, 0x00, 0xAF]);
    }

    #[test]
    fn test_frame_rejects_oversize() {
        let payload = vec![0u8; MAX_DATAGRAM - 1];
        assert!(matches!(
            UdpSink::frame(PayloadKind::Data, 0x78, &payload),
            Err(Error::TransportFailure(_))
        ));
    }

    #[test]
    fn test_send_before_init_fails() {
        let mut sink = UdpSink::default();
        assert!(sink.send(PayloadKind::Command, 0x78, &[0xAE]).is_err());
    }

    #[test]
    fn test_loopback_delivery() {
        let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
        rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let mut sink = UdpSink::new(rx.local_addr().unwrap());
        sink.init().unwrap();
        sink.send(PayloadKind::Command, 0x78, &[0x81, 0x8F]).unwrap();
        let mut buf = [0u8; 64];
        let n = rx.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x78, 0x00, 0x81, 0x8F]);
        sink.close().unwrap();
    }
}
