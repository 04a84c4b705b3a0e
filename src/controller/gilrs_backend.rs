//! [`DeviceBackend`] on top of gilrs
//!
//! gilrs hides the platform API, so both protocols are emulated from one
//! device list:
//!
//! - gamepads with a known mapping (SDL database or driver) fill the four
//!   native slots; a pad keeps its slot until it disconnects
//! - unmapped devices are offered as generic devices; the ones exposing a
//!   right stick enumerate as [`DeviceClass::Gamepad`], the rest as
//!   [`DeviceClass::Joystick`]
//!
//! Raw values are rebuilt in each protocol's wire convention so the
//! normalization in [`super::source`] sees what real hardware would report.

use super::backend::{
    native_buttons, DeviceBackend, DeviceClass, DeviceError, GenericDeviceId, GenericDeviceInfo,
    GenericState, NativeState, NATIVE_SLOT_COUNT,
};
use gilrs::{Axis, Button, Event, Gamepad, GamepadId, Gilrs, MappingSource};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info};

/// Generic button order, matching the usual DirectInput layout of an Xbox-style pad
const GENERIC_BUTTON_ORDER: [Button; 10] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
];

const NATIVE_BUTTON_BITS: [(Button, u16); 14] = [
    (Button::DPadUp, native_buttons::DPAD_UP),
    (Button::DPadDown, native_buttons::DPAD_DOWN),
    (Button::DPadLeft, native_buttons::DPAD_LEFT),
    (Button::DPadRight, native_buttons::DPAD_RIGHT),
    (Button::Start, native_buttons::START),
    (Button::Select, native_buttons::BACK),
    (Button::LeftThumb, native_buttons::LEFT_THUMB),
    (Button::RightThumb, native_buttons::RIGHT_THUMB),
    (Button::LeftTrigger, native_buttons::LEFT_SHOULDER),
    (Button::RightTrigger, native_buttons::RIGHT_SHOULDER),
    (Button::South, native_buttons::A),
    (Button::East, native_buttons::B),
    (Button::West, native_buttons::X),
    (Button::North, native_buttons::Y),
];

/// Native slot assignment; an id keeps its slot until it leaves the connected set
#[derive(Debug)]
struct NativeSlots<Id> {
    slots: [Option<Id>; NATIVE_SLOT_COUNT as usize],
}

impl<Id> Default for NativeSlots<Id> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }
}

impl<Id: Copy + Eq + std::fmt::Display> NativeSlots<Id> {
    /// Frees slots of ids that are gone, then gives new ids the lowest free
    /// slot in the order they are listed
    fn sync(&mut self, connected: impl IntoIterator<Item = Id>) {
        let connected: Vec<Id> = connected.into_iter().collect();

        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if let Some(id) = *entry {
                if !connected.contains(&id) {
                    info!("Native slot {} freed, gamepad {} disconnected", slot, id);
                    *entry = None;
                }
            }
        }

        for id in connected {
            if self.slot_of(id).is_some() {
                continue;
            }
            match self.slots.iter().position(Option::is_none) {
                Some(slot) => {
                    info!("Gamepad {} assigned to native slot {}", id, slot);
                    self.slots[slot] = Some(id);
                }
                None => break,
            }
        }
    }

    fn get(&self, slot: u8) -> Option<Id> {
        self.slots.get(slot as usize).copied().flatten()
    }

    fn slot_of(&self, id: Id) -> Option<usize> {
        self.slots.iter().position(|entry| *entry == Some(id))
    }
}

pub struct GilrsBackend {
    gilrs: Gilrs,
    native_slots: NativeSlots<GamepadId>,
    // Per-gamepad event counter standing in for the native packet number
    packet_numbers: HashMap<GamepadId, u32>,
    acquired: HashSet<GamepadId>,
}

impl GilrsBackend {
    pub fn new() -> Result<Self, DeviceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = Gilrs::new().map_err(|e| {
            error!("Failed to initialize gilrs: {}", e);
            DeviceError::BackendUnavailable(e.to_string())
        })?;

        for (id, gamepad) in gilrs.gamepads() {
            info!(
                "  Found gamepad {}: '{}' (mapping: {:?})",
                id,
                gamepad.name(),
                gamepad.mapping_source()
            );
        }

        Ok(Self {
            gilrs,
            native_slots: NativeSlots::default(),
            packet_numbers: HashMap::new(),
            acquired: HashSet::new(),
        })
    }

    fn sync_native_slots(&mut self) {
        let mut connected: Vec<GamepadId> = self
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| is_native(gamepad))
            .map(|(id, _)| id)
            .collect();
        connected.sort_by_key(|id| usize::from(*id));
        self.native_slots.sync(connected);
    }

    fn generic_id(&self, device: GenericDeviceId) -> Option<GamepadId> {
        self.gilrs
            .gamepads()
            .find(|(id, gamepad)| usize::from(*id) == device.0 && !is_native(gamepad))
            .map(|(id, _)| id)
    }
}

impl DeviceBackend for GilrsBackend {
    fn refresh(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            debug!("Gamepad {} event: {:?}", id, event);
            let counter = self.packet_numbers.entry(id).or_insert(0);
            *counter = counter.wrapping_add(1);
        }
    }

    fn native_state(&mut self, slot: u8) -> Option<NativeState> {
        self.sync_native_slots();
        let id = self.native_slots.get(slot)?;
        let gamepad = self.gilrs.connected_gamepad(id)?;

        let buttons = NATIVE_BUTTON_BITS
            .iter()
            .filter(|(button, _)| gamepad.is_pressed(*button))
            .fold(0u16, |mask, (_, bit)| mask | bit);

        Some(NativeState {
            packet_number: self.packet_numbers.get(&id).copied().unwrap_or(0),
            buttons,
            left_thumb_x: to_i16(gamepad.value(Axis::LeftStickX)),
            left_thumb_y: to_i16(gamepad.value(Axis::LeftStickY)),
            right_thumb_x: to_i16(gamepad.value(Axis::RightStickX)),
            right_thumb_y: to_i16(gamepad.value(Axis::RightStickY)),
        })
    }

    fn enumerate(&mut self, class: DeviceClass) -> Vec<GenericDeviceInfo> {
        let mut devices: Vec<GenericDeviceInfo> = self
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| !is_native(gamepad) && device_class(gamepad) == class)
            .map(|(id, gamepad)| GenericDeviceInfo {
                id: GenericDeviceId(usize::from(id)),
                name: gamepad.name().to_string(),
            })
            .collect();
        devices.sort_by_key(|info| info.id.0);
        debug!("Enumerated {} {:?} device(s)", devices.len(), class);
        devices
    }

    fn acquire(&mut self, device: GenericDeviceId, buffer_size: usize) -> Result<(), DeviceError> {
        let id = self.generic_id(device).ok_or_else(|| {
            DeviceError::AcquisitionFailed(format!("device {} is not connected", device.0))
        })?;
        if !self.acquired.insert(id) {
            return Err(DeviceError::AcquisitionFailed(format!(
                "device {} is already acquired",
                device.0
            )));
        }
        debug!("Acquired gamepad {} (buffer size {})", id, buffer_size);
        Ok(())
    }

    fn generic_state(&mut self, device: GenericDeviceId) -> Result<GenericState, DeviceError> {
        let id = self
            .generic_id(device)
            .ok_or(DeviceError::GenericDisconnected(device))?;
        if !self.acquired.contains(&id) {
            return Err(DeviceError::ReadFailed(format!(
                "device {} was not acquired",
                device.0
            )));
        }
        let gamepad = self
            .gilrs
            .connected_gamepad(id)
            .ok_or(DeviceError::GenericDisconnected(device))?;

        // HID vertical axes grow downwards
        Ok(GenericState {
            x: to_u16(gamepad.value(Axis::LeftStickX)),
            y: to_u16(-gamepad.value(Axis::LeftStickY)),
            rx: to_u16(gamepad.value(Axis::RightStickX)),
            ry: to_u16(-gamepad.value(Axis::RightStickY)),
            buttons: GENERIC_BUTTON_ORDER
                .iter()
                .map(|button| gamepad.is_pressed(*button))
                .collect(),
            pov: pov_from_dpad(
                gamepad.is_pressed(Button::DPadUp),
                gamepad.is_pressed(Button::DPadRight),
                gamepad.is_pressed(Button::DPadDown),
                gamepad.is_pressed(Button::DPadLeft),
            ),
        })
    }

    fn release(&mut self, device: GenericDeviceId) {
        self.acquired.retain(|id| usize::from(*id) != device.0);
        debug!("Released generic device {}", device.0);
    }
}

fn is_native(gamepad: &Gamepad<'_>) -> bool {
    gamepad.mapping_source() != MappingSource::None
}

fn device_class(gamepad: &Gamepad<'_>) -> DeviceClass {
    if gamepad.axis_code(Axis::RightStickX).is_some() {
        DeviceClass::Gamepad
    } else {
        DeviceClass::Joystick
    }
}

fn to_i16(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

fn to_u16(value: f32) -> u16 {
    (value.clamp(-1.0, 1.0) * 32767.0 + 32767.0).round() as u16
}

/// Hat angle in centidegrees clockwise from up
fn pov_from_dpad(up: bool, right: bool, down: bool, left: bool) -> Option<u32> {
    match (up && !down, right && !left, down && !up, left && !right) {
        (true, false, _, false) => Some(0),
        (true, true, _, _) => Some(4500),
        (false, true, false, _) => Some(9000),
        (_, true, true, _) => Some(13500),
        (_, false, true, false) => Some(18000),
        (_, _, true, true) => Some(22500),
        (false, _, false, true) => Some(27000),
        (true, _, _, true) => Some(31500),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::source::{normalize_generic, normalize_native, NATIVE_MOVE_DEADZONE};

    #[test]
    fn axis_conversion_hits_protocol_extremes() {
        assert_eq!(to_i16(1.0), 32767);
        assert_eq!(to_i16(-1.0), -32767);
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_u16(0.0), 32767);
        assert_eq!(to_u16(1.0), 65534);
        assert_eq!(to_u16(-1.0), 0);
        assert_eq!(to_u16(2.0), 65534);
    }

    #[test]
    fn converted_values_normalize_back() {
        assert!((normalize_native(to_i16(0.5), NATIVE_MOVE_DEADZONE) - 0.5).abs() < 1e-3);
        assert!((normalize_generic(to_u16(-0.5)) + 0.5).abs() < 1e-3);
        assert_eq!(normalize_generic(to_u16(0.1)), 0.0);
    }

    #[test]
    fn native_slot_survives_other_pad_leaving() {
        let mut slots = NativeSlots::<usize>::default();
        slots.sync([0, 1]);
        assert_eq!(slots.get(0), Some(0));
        assert_eq!(slots.get(1), Some(1));

        // Pad 0 unplugged: its slot empties instead of shifting pad 1 down
        slots.sync([1]);
        assert_eq!(slots.get(0), None);
        assert_eq!(slots.get(1), Some(1));

        slots.sync([1, 7]);
        assert_eq!(slots.get(0), Some(7));
        assert_eq!(slots.get(1), Some(1));
    }

    #[test]
    fn native_slots_ignore_pads_beyond_capacity() {
        let mut slots = NativeSlots::<usize>::default();
        slots.sync([0, 1, 2, 3, 4]);
        assert_eq!(
            (0..NATIVE_SLOT_COUNT).map(|slot| slots.get(slot)).collect::<Vec<_>>(),
            vec![Some(0), Some(1), Some(2), Some(3)]
        );
        assert_eq!(slots.get(NATIVE_SLOT_COUNT), None);

        // Pad 4 moves in once a slot frees up
        slots.sync([0, 1, 3, 4]);
        assert_eq!(slots.get(2), Some(4));
    }

    #[test]
    fn dpad_maps_to_hat_angles() {
        assert_eq!(pov_from_dpad(false, false, false, false), None);
        assert_eq!(pov_from_dpad(true, false, false, false), Some(0));
        assert_eq!(pov_from_dpad(true, true, false, false), Some(4500));
        assert_eq!(pov_from_dpad(false, true, false, false), Some(9000));
        assert_eq!(pov_from_dpad(false, true, true, false), Some(13500));
        assert_eq!(pov_from_dpad(false, false, true, false), Some(18000));
        assert_eq!(pov_from_dpad(false, false, true, true), Some(22500));
        assert_eq!(pov_from_dpad(false, false, false, true), Some(27000));
        assert_eq!(pov_from_dpad(true, false, false, true), Some(31500));
        // Opposite directions cancel
        assert_eq!(pov_from_dpad(true, false, true, false), None);
    }
}
