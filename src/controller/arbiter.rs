//! Device arbitration and hot-plug scanning
//!
//! ```text
//!            scan finds device
//!  Scanning ──────────────────► Connected(Native | Generic)
//!     ▲                                   │
//!     └────────── poll failure ───────────┘
//! ```
//!
//! While scanning, enumeration runs at most once every `scan_interval_ticks`.
//! Native slots always win over generic devices.

use super::backend::{
    DeviceBackend, DeviceClass, GenericDeviceInfo, GENERIC_BUFFER_SIZE, NATIVE_SLOT_COUNT,
};
use super::source::{ControllerSource, GenericSource, NativeSource};
use super::ControllerStatus;
use crate::input::ControllerInput;
use tracing::{debug, info, warn};

/// Default scan cadence, about 1 Hz at a 15 ms tick
pub const DEFAULT_SCAN_INTERVAL_TICKS: u32 = 60;

#[derive(Debug)]
pub struct DeviceArbiter {
    scan_interval_ticks: u32,
    // Ticks left before the next scan; zero means scan on this tick
    ticks_until_scan: u32,
    source: Option<ControllerSource>,
}

impl DeviceArbiter {
    pub fn new(scan_interval_ticks: u32) -> Self {
        Self {
            scan_interval_ticks: scan_interval_ticks.max(1),
            ticks_until_scan: 0,
            source: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    pub fn status(&self) -> ControllerStatus {
        self.source
            .as_ref()
            .map(ControllerSource::status)
            .unwrap_or_default()
    }

    /// Runs one tick: polls the active source, or scans when it is time to.
    ///
    /// Returns `None` whenever no controller input is available this tick,
    /// including the tick on which a device is first acquired.
    pub fn tick(&mut self, backend: &mut dyn DeviceBackend) -> Option<ControllerInput> {
        backend.refresh();

        if let Some(source) = self.source.as_mut() {
            match source.poll(backend) {
                Ok(input) => return Some(input),
                Err(e) => {
                    warn!("Controller lost: {}", e);
                    self.release(backend);
                    return None;
                }
            }
        }

        if self.ticks_until_scan > 0 {
            self.ticks_until_scan -= 1;
            return None;
        }

        self.scan(backend);
        self.ticks_until_scan = self.scan_interval_ticks - 1;
        None
    }

    /// Drops the active source (if any) and goes back to scanning
    pub fn release(&mut self, backend: &mut dyn DeviceBackend) {
        if let Some(source) = self.source.take() {
            source.release(backend);
            self.ticks_until_scan = self.scan_interval_ticks - 1;
        }
    }

    fn scan(&mut self, backend: &mut dyn DeviceBackend) {
        debug!("Scanning for controllers");

        for slot in 0..NATIVE_SLOT_COUNT {
            if let Some(state) = backend.native_state(slot) {
                info!("Native controller connected in slot {}", slot);
                self.source = Some(ControllerSource::Native(NativeSource::new(slot, &state)));
                return;
            }
        }

        let mut devices = backend.enumerate(DeviceClass::Gamepad);
        if devices.is_empty() {
            devices = backend.enumerate(DeviceClass::Joystick);
        }

        if let Some(info) = devices.into_iter().next() {
            self.source = acquire_generic(backend, info).map(ControllerSource::Generic);
        }
    }
}

impl Default for DeviceArbiter {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_INTERVAL_TICKS)
    }
}

fn acquire_generic(
    backend: &mut dyn DeviceBackend,
    info: GenericDeviceInfo,
) -> Option<GenericSource> {
    if let Err(e) = backend.acquire(info.id, GENERIC_BUFFER_SIZE) {
        warn!("Could not acquire '{}': {}", info.name, e);
        return None;
    }

    // Seed edge detection so buttons held during acquisition do not fire
    match backend.generic_state(info.id) {
        Ok(initial) => {
            info!("Generic controller connected: '{}'", info.name);
            Some(GenericSource::new(info, &initial))
        }
        Err(e) => {
            warn!("Initial read of '{}' failed: {}", info.name, e);
            backend.release(info.id);
            None
        }
    }
}
