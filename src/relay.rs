//! Counter-gated message forwarding.
//!
//! Every outgoing message — pure relay, relay-with-override, or fully
//! synthesized — goes through this one path, so the counter-dedup and
//! checksum-stripping invariants are enforced in exactly one place.

use heapless::FnvIndexMap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::packer::{CanPacker, PackError};
use crate::types::{
    Bus, FieldMap, FrameList, OutgoingFrame, VehicleStateSnapshot, CHECKSUM_FIELD, COUNTER_FIELD,
};

const MAX_TRACKED_MESSAGES: usize = 16;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Pack(#[from] PackError),
    #[error("outgoing frame list capacity exceeded")]
    FrameOverflow,
    #[error("relay counter table capacity exceeded")]
    CounterOverflow,
}

/// A field transform applied before packing; it may veto emission entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    Emit,
    Skip,
}

#[derive(Debug, Clone, Copy)]
pub struct ForwardOptions {
    /// Suppress emission while the observed counter has not advanced. Bypassing
    /// the gate also drops the counter field so the pack step re-advances it.
    pub gate_counter: bool,
    /// Emit nothing if the message has never been observed.
    pub require_stock: bool,
}

impl Default for ForwardOptions {
    fn default() -> Self {
        Self {
            gate_counter: true,
            require_stock: true,
        }
    }
}

impl ForwardOptions {
    /// For fully synthesized messages: no stock frame needed, own cadence.
    pub fn synthesized() -> Self {
        Self {
            gate_counter: false,
            require_stock: false,
        }
    }

    /// For verbatim relay with the counter gate bypassed (fault-forward).
    pub fn ungated() -> Self {
        Self {
            gate_counter: false,
            require_stock: true,
        }
    }
}

/// Per-message last-relayed sequence counters.
#[derive(Debug, Default)]
pub struct ForwardingRelay {
    last_counters: FnvIndexMap<&'static str, u8, MAX_TRACKED_MESSAGES>,
}

impl ForwardingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a gated forward of `message` would emit this cycle.
    pub fn can_forward(&self, snapshot: &VehicleStateSnapshot, message: &str) -> bool {
        let Some(stock) = snapshot.observed(message) else {
            return false;
        };
        match stock.get(COUNTER_FIELD) {
            // No counter on this message; no dedup needed.
            None => true,
            Some(counter) => self.last_counters.get(message) != Some(&(*counter as u8)),
        }
    }

    /// Forward `message` verbatim (minus checksum/counter bookkeeping fields).
    pub fn relay(
        &mut self,
        snapshot: &VehicleStateSnapshot,
        message: &'static str,
        bus: Bus,
        options: ForwardOptions,
        packer: &dyn CanPacker,
        frames: &mut FrameList,
    ) -> Result<bool, SynthesisError> {
        self.relay_with(snapshot, message, bus, options, packer, frames, |_| {
            TransformOutcome::Emit
        })
    }

    /// Forward `message`, letting `transform` override fields or veto emission.
    #[allow(clippy::too_many_arguments)]
    pub fn relay_with<F>(
        &mut self,
        snapshot: &VehicleStateSnapshot,
        message: &'static str,
        bus: Bus,
        options: ForwardOptions,
        packer: &dyn CanPacker,
        frames: &mut FrameList,
        transform: F,
    ) -> Result<bool, SynthesisError>
    where
        F: FnOnce(&mut FieldMap) -> TransformOutcome,
    {
        let mut values = match snapshot.observed(message) {
            Some(stock) => stock.clone(),
            None if options.require_stock => {
                trace!("{message}: no stock frame observed, skipping");
                return Ok(false);
            }
            None => FieldMap::new(),
        };

        let counter = values.get(COUNTER_FIELD).map(|c| *c as u8);
        if let Some(counter) = counter {
            if options.gate_counter && self.last_counters.get(message) == Some(&counter) {
                debug!("{message}: counter {counter} unchanged, suppressing relay");
                return Ok(false);
            }
            self.last_counters
                .insert(message, counter)
                .map_err(|_| SynthesisError::CounterOverflow)?;
        }

        // The checksum is recomputed on pack; a bypassed counter is re-advanced
        // by the pack step or by the transform.
        values.remove(CHECKSUM_FIELD);
        if !options.gate_counter {
            values.remove(COUNTER_FIELD);
        }

        match transform(&mut values) {
            TransformOutcome::Skip => {
                trace!("{message}: transform vetoed emission");
                Ok(false)
            }
            TransformOutcome::Emit => {
                let payload = packer.pack(message, bus, &values)?;
                frames
                    .push(OutgoingFrame {
                        bus,
                        message,
                        payload,
                    })
                    .map_err(|_| SynthesisError::FrameOverflow)?;
                Ok(true)
            }
        }
    }
}
