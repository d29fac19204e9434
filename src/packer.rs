//! The pack collaborator boundary.
//!
//! The production signal codec (named-field dictionary to payload bytes, checksum
//! applied per the platform's signal database) lives outside this crate; here it
//! is consumed behind the [`CanPacker`] trait. [`CapturePacker`] is the in-repo
//! stand-in used by the replay binary and the test suite: it produces a minimal
//! deterministic payload carrying the counter nibble and a valid checksum, and
//! records every pack call for inspection.

use core::cell::RefCell;

use thiserror::Error;

use crate::checksum::{crc8h2f, xor_checksum, ChecksumKind};
use crate::platform::MessageCatalog;
use crate::types::{Bus, FieldMap, PayloadBuf, COUNTER_FIELD};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PackError {
    #[error("message `{0}` is not in the signal database")]
    UnknownMessage(&'static str),
    #[error("payload buffer capacity exceeded")]
    Capacity,
}

/// Opaque `pack(message, bus, fields) -> payload` collaborator.
pub trait CanPacker {
    fn pack(
        &self,
        message: &'static str,
        bus: Bus,
        values: &FieldMap,
    ) -> Result<PayloadBuf, PackError>;
}

#[derive(Debug, Clone)]
pub struct PackRecord {
    pub message: &'static str,
    pub bus: Bus,
    pub values: FieldMap,
}

/// Deterministic packer double over a platform catalog.
#[derive(Debug)]
pub struct CapturePacker {
    catalog: &'static MessageCatalog,
    records: RefCell<Vec<PackRecord>>,
}

impl CapturePacker {
    pub fn new(catalog: &'static MessageCatalog) -> Self {
        Self {
            catalog,
            records: RefCell::new(Vec::new()),
        }
    }

    /// Pack calls made so far, oldest first.
    pub fn records(&self) -> Vec<PackRecord> {
        self.records.borrow().clone()
    }

    pub fn record_count(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    /// Records for one message name, oldest first.
    pub fn records_for(&self, message: &str) -> Vec<PackRecord> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.message == message)
            .cloned()
            .collect()
    }
}

impl CanPacker for CapturePacker {
    fn pack(
        &self,
        message: &'static str,
        bus: Bus,
        values: &FieldMap,
    ) -> Result<PayloadBuf, PackError> {
        let spec = self
            .catalog
            .find(message)
            .ok_or(PackError::UnknownMessage(message))?;

        let mut payload = PayloadBuf::new();
        payload.resize(8, 0).map_err(|_| PackError::Capacity)?;
        let counter = values.get(COUNTER_FIELD).copied().unwrap_or(0.0) as u8;
        payload[1] = counter & 0x0F;
        payload[0] = match spec.checksum {
            ChecksumKind::Crc8h2f => crc8h2f(spec.address, &payload),
            ChecksumKind::Xor => xor_checksum(0, &payload),
        };

        self.records.borrow_mut().push(PackRecord {
            message,
            bus,
            values: values.clone(),
        });
        Ok(payload)
    }
}
