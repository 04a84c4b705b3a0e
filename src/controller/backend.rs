//! Hardware seam for game controllers
//!
//! The engine speaks to controllers through two protocols:
//!
//! - **Native**: fixed four-slot enumeration, signed 16-bit thumb axes, a
//!   16-bit button mask and a packet counter that advances whenever the
//!   device state changes.
//! - **Generic**: HID-class enumeration by device class, unsigned 16-bit axes
//!   centred on 32767, a boolean button array and a point-of-view hat.
//!
//! [`DeviceBackend`] exposes both as raw state so the normalization and edge
//! detection in [`super::source`] stay independent of the actual driver.

use thiserror::Error;

/// Number of native slots checked during a scan
pub const NATIVE_SLOT_COUNT: u8 = 4;

/// Input buffer requested when acquiring a generic device
pub const GENERIC_BUFFER_SIZE: usize = 16;

/// Bit layout of [`NativeState::buttons`]
pub mod native_buttons {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;
}

/// Snapshot of one native-protocol slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeState {
    pub packet_number: u32,
    pub buttons: u16,
    pub left_thumb_x: i16,
    pub left_thumb_y: i16,
    pub right_thumb_x: i16,
    pub right_thumb_y: i16,
}

/// Immediate state of an acquired generic-protocol device.
///
/// Axes follow the HID convention: `0` is fully up/left, `65535` fully down/right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericState {
    pub x: u16,
    pub y: u16,
    pub rx: u16,
    pub ry: u16,
    pub buttons: Vec<bool>,
    /// Hat direction in centidegrees clockwise from up, `None` when centred
    pub pov: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Gamepad,
    Joystick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericDeviceId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericDeviceInfo {
    pub id: GenericDeviceId,
    pub name: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Controller backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Native controller in slot {0} is not connected")]
    NativeDisconnected(u8),

    #[error("Generic device {0:?} is not connected")]
    GenericDisconnected(GenericDeviceId),

    #[error("Failed to acquire device: {0}")]
    AcquisitionFailed(String),

    #[error("Failed to read device state: {0}")]
    ReadFailed(String),
}

/// Raw access to both controller protocols.
///
/// Implementations must never block; every method is called from the tick.
pub trait DeviceBackend {
    /// Pumps pending driver events; called once at the start of every tick
    fn refresh(&mut self) {}

    /// State of a native slot, `None` if nothing is connected there
    fn native_state(&mut self, slot: u8) -> Option<NativeState>;

    /// Generic devices of the given class, in enumeration order
    fn enumerate(&mut self, class: DeviceClass) -> Vec<GenericDeviceInfo>;

    /// Takes exclusive ownership of a generic device
    fn acquire(&mut self, device: GenericDeviceId, buffer_size: usize)
        -> Result<(), DeviceError>;

    /// Immediate-state query of an acquired generic device
    fn generic_state(&mut self, device: GenericDeviceId) -> Result<GenericState, DeviceError>;

    /// Gives an acquired generic device back
    fn release(&mut self, device: GenericDeviceId);
}
