//! Bus framing: payloads longer than the bus buffer go out in fixed chunks.

use super::{PayloadKind, Transport};
use crate::error::Error;
use crate::BUS_CHUNK_SIZE;

/// Splits every payload into `BUS_CHUNK_SIZE`-byte pieces before handing
/// them to the inner sink. A failed chunk fails the whole send; chunks
/// already delivered are not recalled.
pub struct ChunkedSink<T> {
    inner: T,
    chunk_size: usize,
}

impl<T: Transport> ChunkedSink<T> {
    pub fn new(inner: T) -> Self {
        Self::with_chunk_size(inner, BUS_CHUNK_SIZE)
    }

    pub fn with_chunk_size(inner: T, chunk_size: usize) -> Self {
        ChunkedSink { inner, chunk_size: chunk_size.max(1) }
    }

    pub fn inner(&self) -> &T { &self.inner }

    pub fn inner_mut(&mut self) -> &mut T { &mut self.inner }

    pub fn into_inner(self) -> T { self.inner }
}

impl<T: Transport> Transport for ChunkedSink<T> {
    fn init(&mut self) -> Result<(), Error> {
        self.inner.init()
    }

    fn send(&mut self, kind: PayloadKind, address: u8, payload: &[u8]) -> Result<(), Error> {
        if payload.len() <= self.chunk_size {
            return self.inner.send(kind, address, payload);
        }
        for (i, chunk) in payload.chunks(self.chunk_size).enumerate() {
            if let Err(e) = self.inner.send(kind, address, chunk) {
                tracing::warn!("chunk {} of {}-byte {} payload failed: {}", i, payload.len(), kind.label(), e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{NullSink, Recorder};

    #[test]
    fn test_short_payload_passes_through() {
        let mut sink = ChunkedSink::new(Recorder::new(NullSink));
        sink.send(PayloadKind::Data, 0x78, &[1, 2, 3]).unwrap();
        assert_eq!(sink.inner().records().len(), 1);
        assert_eq!(sink.inner().records()[0].payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_long_payload_is_chunked() {
        let payload: Vec<u8> = (0..100).collect();
        let mut sink = ChunkedSink::new(Recorder::new(NullSink));
        sink.send(PayloadKind::Data, 0x78, &payload).unwrap();
        let sizes: Vec<usize> = sink.inner().records().iter().map(|r| r.payload.len()).collect();
        assert_eq!(sizes, vec![32, 32, 32, 4]);
        assert_eq!(sink.inner().records()[3].payload, vec![96, 97, 98, 99]);
        assert!(sink.inner().records().iter().all(|r| r.kind == PayloadKind::Data && r.address == 0x78));
    }

    #[test]
    fn test_chunk_failure_fails_send() {
        let mut rec = Recorder::new(NullSink);
        rec.fail_after(1);
        let mut sink = ChunkedSink::new(rec);
        let payload = [0xAAu8; 64];
        assert!(matches!(
            sink.send(PayloadKind::Data, 0x78, &payload),
            Err(Error::TransportFailure(_))
        ));
        assert_eq!(sink.inner().records().len(), 1);
    }
}
