//! # Outbound Command Synthesis
//!
//! The outbound half of an assisted-driving vehicle interface: each control
//! cycle it turns the planner's intent and the latest vehicle-state snapshot
//! into the bus frames that steer, accelerate, and drive the instrument
//! cluster, while relaying the stock frames the rest of the car expects.
//!
//! ## Features
//!
//! - **Steering torque limiting**: rate, magnitude, driver-override, and
//!   stuck-value limits matching the EPS acceptance envelope
//! - **Longitudinal synthesis**: clamped acceleration with jerk and comfort
//!   band encoding, stop/go handling, and ESP hold release
//! - **Button emulation**: stock-ACC set-speed coercion via emulated presses
//! - **Counter-gated relay**: every forwarded frame deduplicated on its
//!   sequence counter, checksums stripped and recomputed on pack
//! - **Embedded-friendly**: bounded field maps and frame lists, no per-cycle
//!   heap growth
//!
//! ## Quick Start
//!
//! ```rust
//! use carcmd::{CapturePacker, CommandController, DriveIntent, VehicleStateSnapshot};
//! use carcmd::platform::mqb::MQB_CATALOG;
//!
//! let mut controller = CommandController::mqb();
//! let packer = CapturePacker::new(&MQB_CATALOG);
//!
//! let intent = DriveIntent::default();
//! let snapshot = VehicleStateSnapshot::default();
//! let output = controller.update(&intent, &snapshot, &packer).unwrap();
//! for frame in &output.frames {
//!     println!("bus {:?}: {}", frame.bus, frame.message);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`controller`] - Per-cycle orchestrator and public API
//! - [`steering`] - Torque rate limiting and the EPS overlay
//! - [`longitudinal`] - Acceleration plan and lead-distance display encoding
//! - [`buttons`] - Stock cruise-button press emulation
//! - [`relay`] - Counter-gated message forwarding
//! - [`platform`] - Per-platform signal encoders behind [`platform::PlatformCodec`]
//! - [`checksum`] - Bus checksum variants
//! - [`packer`] - The pack collaborator boundary and its test double

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod buttons;
pub mod checksum;
pub mod controller;
pub mod longitudinal;
pub mod packer;
pub mod platform;
pub mod relay;
pub mod steering;
pub mod types;

// Re-export main public types for convenience
pub use controller::CommandController;
pub use packer::{CanPacker, CapturePacker, PackError};
pub use relay::{ForwardOptions, ForwardingRelay, SynthesisError, TransformOutcome};
pub use types::{
    Bus, ButtonEvent, CycleOutput, DriveIntent, HudDirectives, LongControlPhase, OutgoingFrame,
    VehicleLimits, VehicleStateSnapshot,
};
