//! Recording sink used by tests, captures and the replay tooling.

use serde::{Deserialize, Serialize};

use super::{PayloadKind, Transport};
use crate::error::Error;

/// One write as it crossed the transport boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub kind: PayloadKind,
    pub address: u8,
    pub payload: Vec<u8>,
}

/// Accepts and drops every payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Transport for NullSink {
    fn send(&mut self, _kind: PayloadKind, _address: u8, _payload: &[u8]) -> Result<(), Error> {
        Ok(())
    }
}

/// Forwards writes to an inner sink and keeps a copy of each one that
/// succeeded.
pub struct Recorder<T> {
    inner: T,
    records: Vec<Record>,
    /// Successful sends allowed before every further send fails
    fail_after: Option<usize>,
    attempts: usize,
}

impl<T: Transport> Recorder<T> {
    pub fn new(inner: T) -> Self {
        Recorder { inner, records: Vec::new(), fail_after: None, attempts: 0 }
    }

    /// Let `n` more sends through, then fail every send after that.
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(self.attempts + n);
    }

    /// Stop injecting failures.
    pub fn heal(&mut self) {
        self.fail_after = None;
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records of one kind only
    pub fn of_kind(&self, kind: PayloadKind) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    pub fn inner(&self) -> &T { &self.inner }

    pub fn inner_mut(&mut self) -> &mut T { &mut self.inner }

    pub fn into_inner(self) -> T { self.inner }
}

impl<T: Transport> Transport for Recorder<T> {
    fn init(&mut self) -> Result<(), Error> {
        self.inner.init()
    }

    fn send(&mut self, kind: PayloadKind, address: u8, payload: &[u8]) -> Result<(), Error> {
        if let Some(limit) = self.fail_after {
            if self.attempts >= limit {
                self.attempts += 1;
                return Err(Error::TransportFailure("injected failure".into()));
            }
        }
        self.attempts += 1;
        self.inner.send(kind, address, payload)?;
        self.records.push(Record { kind, address, payload: payload.to_vec() });
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let mut rec = Recorder::new(NullSink);
        rec.send(PayloadKind::Command, 0x78, &[0x20, 0x00]).unwrap();
        rec.send(PayloadKind::Data, 0x78, &[0xFF]).unwrap();
        assert_eq!(rec.records().len(), 2);
        assert_eq!(rec.records()[0].payload, vec![0x20, 0x00]);
        assert_eq!(rec.of_kind(PayloadKind::Data).count(), 1);
    }

    #[test]
    fn test_fail_after_and_heal() {
        let mut rec = Recorder::new(NullSink);
        rec.fail_after(2);
        assert!(rec.send(PayloadKind::Data, 0x78, &[1]).is_ok());
        assert!(rec.send(PayloadKind::Data, 0x78, &[2]).is_ok());
        assert!(rec.send(PayloadKind::Data, 0x78, &[3]).is_err());
        assert!(rec.send(PayloadKind::Data, 0x78, &[4]).is_err());
        assert_eq!(rec.records().len(), 2);
        rec.heal();
        assert!(rec.send(PayloadKind::Data, 0x78, &[5]).is_ok());
        assert_eq!(rec.take_records().len(), 3);
        assert!(rec.records().is_empty());
    }
}
