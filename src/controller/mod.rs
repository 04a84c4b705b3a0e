//! Controller subsystem for game controller input
//!
//! 1. [`backend`] - Raw device access for both controller protocols
//! 2. [`source`] - Normalization and edge detection per protocol
//! 3. [`arbiter`] - Hot-plug scanning and ownership of the single live source
//! 4. [`gilrs_backend`] - The gilrs implementation of the device seam
//!
//! # Architecture
//!
//! ```text
//! gilrs ──► DeviceBackend ──► ControllerSource ──► DeviceArbiter ──► ControllerInput
//!           (raw state)       (normalized)         (hot-plug)
//! ```
//!
//! Everything runs inside the engine tick; no call here blocks.

pub mod arbiter;
pub mod backend;
pub mod gilrs_backend;
pub mod source;

pub use arbiter::{DeviceArbiter, DEFAULT_SCAN_INTERVAL_TICKS};
pub use backend::{DeviceBackend, DeviceError};
pub use gilrs_backend::GilrsBackend;

use std::fmt;

/// Connection state published to the UI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ControllerStatus {
    #[default]
    Scanning,
    Native {
        slot: u8,
    },
    Generic {
        name: String,
    },
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerStatus::Scanning => write!(f, "No controller"),
            ControllerStatus::Native { slot } => write!(f, "Native controller (slot {})", slot),
            ControllerStatus::Generic { name } => write!(f, "Generic controller: {}", name),
        }
    }
}
