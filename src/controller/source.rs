//! Controller sources
//!
//! A [`ControllerSource`] is the single live connection to a controller. Both
//! protocol variants share one capability, [`ControllerSource::poll`], which
//! turns the raw device state into a normalized [`ControllerInput`] or reports
//! the device as gone.
//!
//! # Button mapping
//!
//! | Action        | Native           | Generic          | Trigger |
//! |---------------|------------------|------------------|---------|
//! | Toggle gimbal | Y                | button 3         | edge    |
//! | Reset         | Start            | button 7         | edge    |
//! | Speed up      | D-pad up         | hat 0°           | edge    |
//! | Speed down    | D-pad down       | hat 180°         | edge    |
//! | Zoom in       | right shoulder   | button 5         | level   |
//! | Zoom out      | left shoulder    | button 4         | level   |

use super::backend::{
    native_buttons, DeviceBackend, DeviceError, GenericDeviceId, GenericDeviceInfo, GenericState,
    NativeState,
};
use super::ControllerStatus;
use crate::input::{AxisPair, ControllerInput, InputEvents};
use tracing::{debug, info};

/// Native move (left) stick dead-zone in raw units
pub const NATIVE_MOVE_DEADZONE: i16 = 7849;
/// Native look (right) stick dead-zone in raw units
pub const NATIVE_LOOK_DEADZONE: i16 = 8689;
const NATIVE_FULL_SCALE: f32 = 32768.0;

/// Generic axis centre; also the normalization divisor
pub const GENERIC_CENTER: f32 = 32767.0;
/// Generic dead-zone on the normalized value
pub const GENERIC_DEADZONE: f32 = 0.15;

pub const HAT_UP: u32 = 0;
pub const HAT_DOWN: u32 = 18000;

pub const GENERIC_ZOOM_OUT_BUTTON: usize = 4;
pub const GENERIC_ZOOM_IN_BUTTON: usize = 5;
pub const GENERIC_GIMBAL_BUTTON: usize = 3;
pub const GENERIC_RESET_BUTTON: usize = 7;

/// Native axis normalization: inside the dead-zone is exactly zero, the rest is
/// divided by the full amplitude without rescaling
pub fn normalize_native(raw: i16, deadzone: i16) -> f32 {
    if (raw as i32).abs() < deadzone as i32 {
        0.0
    } else {
        (raw as f32 / NATIVE_FULL_SCALE).clamp(-1.0, 1.0)
    }
}

/// Generic axis normalization around the HID centre with a relative dead-zone
pub fn normalize_generic(raw: u16) -> f32 {
    let value = ((raw as f32 - GENERIC_CENTER) / GENERIC_CENTER).clamp(-1.0, 1.0);
    if value.abs() < GENERIC_DEADZONE {
        0.0
    } else {
        value
    }
}

#[derive(Debug, Clone)]
pub struct NativeSource {
    slot: u8,
    last_packet: u32,
    previous_buttons: u16,
}

impl NativeSource {
    /// Starts tracking a slot; edge state is seeded from `initial` so buttons
    /// already held at connect time do not fire
    pub fn new(slot: u8, initial: &NativeState) -> Self {
        Self {
            slot,
            last_packet: initial.packet_number,
            previous_buttons: initial.buttons,
        }
    }

    pub fn poll(&mut self, backend: &mut dyn DeviceBackend) -> Result<ControllerInput, DeviceError> {
        let state = backend
            .native_state(self.slot)
            .ok_or(DeviceError::NativeDisconnected(self.slot))?;

        let move_axes = AxisPair::new(
            normalize_native(state.left_thumb_x, NATIVE_MOVE_DEADZONE),
            normalize_native(state.left_thumb_y, NATIVE_MOVE_DEADZONE),
        );
        // Stick up must read like dragging the UI knob up
        let look_axes = AxisPair::new(
            normalize_native(state.right_thumb_x, NATIVE_LOOK_DEADZONE),
            -normalize_native(state.right_thumb_y, NATIVE_LOOK_DEADZONE),
        );

        let mut events = InputEvents::default();
        if state.packet_number != self.last_packet {
            let pressed = state.buttons & !self.previous_buttons;
            events.toggle_gimbal = pressed & native_buttons::Y != 0;
            events.reset = pressed & native_buttons::START != 0;
            events.speed_up = pressed & native_buttons::DPAD_UP != 0;
            events.speed_down = pressed & native_buttons::DPAD_DOWN != 0;

            if pressed != 0 {
                debug!(
                    "Native slot {} packet {} pressed mask {:#06x}",
                    self.slot, state.packet_number, pressed
                );
            }
            self.last_packet = state.packet_number;
            self.previous_buttons = state.buttons;
        }

        events.zoom_in = state.buttons & native_buttons::RIGHT_SHOULDER != 0;
        events.zoom_out = state.buttons & native_buttons::LEFT_SHOULDER != 0;

        Ok(ControllerInput {
            move_axes,
            look_axes,
            events,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GenericSource {
    device: GenericDeviceId,
    name: String,
    previous_buttons: Vec<bool>,
    previous_hat: Option<u32>,
}

impl GenericSource {
    /// Starts tracking an acquired device; edge state is seeded from `initial`
    pub fn new(info: GenericDeviceInfo, initial: &GenericState) -> Self {
        Self {
            device: info.id,
            name: info.name,
            previous_buttons: initial.buttons.clone(),
            previous_hat: initial.pov,
        }
    }

    pub fn poll(&mut self, backend: &mut dyn DeviceBackend) -> Result<ControllerInput, DeviceError> {
        let state = backend.generic_state(self.device)?;

        // HID y grows downwards, forward must be positive
        let move_axes = AxisPair::new(normalize_generic(state.x), -normalize_generic(state.y));
        let look_axes = AxisPair::new(normalize_generic(state.rx), normalize_generic(state.ry));

        let hat = hat_direction(state.pov);
        let hat_changed = hat != hat_direction(self.previous_hat);

        let events = InputEvents {
            toggle_gimbal: self.pressed(&state.buttons, GENERIC_GIMBAL_BUTTON),
            reset: self.pressed(&state.buttons, GENERIC_RESET_BUTTON),
            speed_up: hat_changed && hat == Some(HAT_UP),
            speed_down: hat_changed && hat == Some(HAT_DOWN),
            zoom_in: is_held(&state.buttons, GENERIC_ZOOM_IN_BUTTON),
            zoom_out: is_held(&state.buttons, GENERIC_ZOOM_OUT_BUTTON),
        };

        self.previous_buttons = state.buttons;
        self.previous_hat = state.pov;

        Ok(ControllerInput {
            move_axes,
            look_axes,
            events,
        })
    }

    fn pressed(&self, buttons: &[bool], index: usize) -> bool {
        is_held(buttons, index) && !is_held(&self.previous_buttons, index)
    }
}

fn is_held(buttons: &[bool], index: usize) -> bool {
    buttons.get(index).copied().unwrap_or(false)
}

/// Only the exact up and down directions count; diagonals are neutral
fn hat_direction(pov: Option<u32>) -> Option<u32> {
    pov.filter(|value| *value == HAT_UP || *value == HAT_DOWN)
}

/// The one live controller connection
#[derive(Debug, Clone)]
pub enum ControllerSource {
    Native(NativeSource),
    Generic(GenericSource),
}

impl ControllerSource {
    pub fn poll(&mut self, backend: &mut dyn DeviceBackend) -> Result<ControllerInput, DeviceError> {
        match self {
            ControllerSource::Native(source) => source.poll(backend),
            ControllerSource::Generic(source) => source.poll(backend),
        }
    }

    /// Hands the device back to the backend
    pub fn release(self, backend: &mut dyn DeviceBackend) {
        match self {
            ControllerSource::Native(source) => {
                info!("Releasing native controller slot {}", source.slot);
            }
            ControllerSource::Generic(source) => {
                info!("Releasing generic controller '{}'", source.name);
                backend.release(source.device);
            }
        }
    }

    pub fn status(&self) -> ControllerStatus {
        match self {
            ControllerSource::Native(source) => ControllerStatus::Native { slot: source.slot },
            ControllerSource::Generic(source) => ControllerStatus::Generic {
                name: source.name.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::backend::{DeviceClass, GenericDeviceInfo};
    use std::collections::VecDeque;

    /// Backend replaying queued states for a single slot/device
    #[derive(Default)]
    struct ScriptedBackend {
        native: VecDeque<Option<NativeState>>,
        generic: VecDeque<Result<GenericState, DeviceError>>,
        released: Vec<GenericDeviceId>,
    }

    impl DeviceBackend for ScriptedBackend {
        fn native_state(&mut self, _slot: u8) -> Option<NativeState> {
            self.native.pop_front().flatten()
        }

        fn enumerate(&mut self, _class: DeviceClass) -> Vec<GenericDeviceInfo> {
            Vec::new()
        }

        fn acquire(&mut self, _device: GenericDeviceId, _buffer: usize) -> Result<(), DeviceError> {
            Ok(())
        }

        fn generic_state(&mut self, device: GenericDeviceId) -> Result<GenericState, DeviceError> {
            self.generic
                .pop_front()
                .unwrap_or(Err(DeviceError::GenericDisconnected(device)))
        }

        fn release(&mut self, device: GenericDeviceId) {
            self.released.push(device);
        }
    }

    fn generic_info() -> GenericDeviceInfo {
        GenericDeviceInfo {
            id: GenericDeviceId(7),
            name: "Flight stick".to_string(),
        }
    }

    fn centred() -> GenericState {
        GenericState {
            x: 32767,
            y: 32767,
            rx: 32767,
            ry: 32767,
            buttons: vec![false; 10],
            pov: None,
        }
    }

    #[test]
    fn native_values_inside_deadzone_are_zero() {
        for raw in [0, 1, -1, 7848, -7848] {
            assert_eq!(normalize_native(raw, NATIVE_MOVE_DEADZONE), 0.0);
        }
        for raw in [8688, -8688, 7849] {
            assert_eq!(normalize_native(raw, NATIVE_LOOK_DEADZONE), 0.0);
        }
    }

    #[test]
    fn native_values_outside_deadzone_divide_by_full_scale() {
        assert_eq!(normalize_native(7849, NATIVE_MOVE_DEADZONE), 7849.0 / 32768.0);
        assert_eq!(normalize_native(i16::MIN, NATIVE_MOVE_DEADZONE), -1.0);
        assert_eq!(normalize_native(16384, NATIVE_LOOK_DEADZONE), 0.5);
    }

    #[test]
    fn generic_values_below_threshold_are_zero() {
        assert_eq!(normalize_generic(32767), 0.0);
        // 0.149 * 32767 ≈ 4882
        assert_eq!(normalize_generic(32767 + 4882), 0.0);
        assert_eq!(normalize_generic(32767 - 4882), 0.0);
        assert!(normalize_generic(32767 + 4916) > 0.15);
        assert_eq!(normalize_generic(65535), 1.0);
        assert_eq!(normalize_generic(0), -1.0);
    }

    #[test]
    fn native_look_vertical_is_inverted() {
        let mut backend = ScriptedBackend::default();
        let state = NativeState {
            packet_number: 1,
            right_thumb_y: 32767,
            left_thumb_y: 32767,
            ..Default::default()
        };
        backend.native.push_back(Some(state));

        let mut source = NativeSource::new(0, &NativeState::default());
        let input = source.poll(&mut backend).unwrap();
        assert!(input.look_axes.y < -0.99);
        assert!(input.move_axes.y > 0.99);
    }

    #[test]
    fn native_edges_need_packet_advance_and_fresh_press() {
        let mut backend = ScriptedBackend::default();
        let pressed = NativeState {
            packet_number: 5,
            buttons: native_buttons::Y,
            ..Default::default()
        };
        // press, same packet again, held with newer packet
        backend.native.push_back(Some(pressed));
        backend.native.push_back(Some(pressed));
        backend.native.push_back(Some(NativeState {
            packet_number: 6,
            ..pressed
        }));

        let mut source = NativeSource::new(0, &NativeState::default());
        assert!(source.poll(&mut backend).unwrap().events.toggle_gimbal);
        assert!(!source.poll(&mut backend).unwrap().events.toggle_gimbal);
        assert!(!source.poll(&mut backend).unwrap().events.toggle_gimbal);
    }

    #[test]
    fn native_button_held_at_connect_does_not_fire() {
        let held = NativeState {
            packet_number: 9,
            buttons: native_buttons::START,
            ..Default::default()
        };
        let mut backend = ScriptedBackend::default();
        backend.native.push_back(Some(NativeState {
            packet_number: 10,
            ..held
        }));

        let mut source = NativeSource::new(2, &held);
        assert!(!source.poll(&mut backend).unwrap().events.reset);
    }

    #[test]
    fn native_zoom_is_level_triggered() {
        let mut backend = ScriptedBackend::default();
        let zooming = NativeState {
            packet_number: 3,
            buttons: native_buttons::RIGHT_SHOULDER,
            ..Default::default()
        };
        backend.native.push_back(Some(zooming));
        backend.native.push_back(Some(zooming));

        let mut source = NativeSource::new(0, &NativeState::default());
        assert!(source.poll(&mut backend).unwrap().events.zoom_in);
        assert!(source.poll(&mut backend).unwrap().events.zoom_in);
    }

    #[test]
    fn native_disconnect_is_an_error() {
        let mut backend = ScriptedBackend::default();
        backend.native.push_back(None);
        let mut source = NativeSource::new(1, &NativeState::default());
        assert_eq!(
            source.poll(&mut backend),
            Err(DeviceError::NativeDisconnected(1))
        );
    }

    #[test]
    fn generic_move_vertical_is_inverted_and_look_uses_rotation_axes() {
        let mut backend = ScriptedBackend::default();
        backend.generic.push_back(Ok(GenericState {
            y: 0,
            rx: 65535,
            ry: 0,
            ..centred()
        }));

        let mut source = GenericSource::new(generic_info(), &centred());
        let input = source.poll(&mut backend).unwrap();
        assert_eq!(input.move_axes, AxisPair::new(0.0, 1.0));
        assert_eq!(input.look_axes, AxisPair::new(1.0, -1.0));
    }

    #[test]
    fn generic_buttons_fire_on_transition_only() {
        let mut pressed = centred();
        pressed.buttons[GENERIC_GIMBAL_BUTTON] = true;

        let mut backend = ScriptedBackend::default();
        backend.generic.push_back(Ok(pressed.clone()));
        backend.generic.push_back(Ok(pressed));
        backend.generic.push_back(Ok(centred()));

        let mut source = GenericSource::new(generic_info(), &centred());
        assert!(source.poll(&mut backend).unwrap().events.toggle_gimbal);
        assert!(!source.poll(&mut backend).unwrap().events.toggle_gimbal);
        assert!(!source.poll(&mut backend).unwrap().events.toggle_gimbal);
    }

    #[test]
    fn generic_hat_maps_up_and_down_only() {
        let mut backend = ScriptedBackend::default();
        for pov in [Some(HAT_UP), None, Some(HAT_DOWN), Some(9000), Some(4500)] {
            backend.generic.push_back(Ok(GenericState { pov, ..centred() }));
        }

        let mut source = GenericSource::new(generic_info(), &centred());
        let events: Vec<InputEvents> = (0..5)
            .map(|_| source.poll(&mut backend).unwrap().events)
            .collect();

        assert!(events[0].speed_up && !events[0].speed_down);
        assert!(!events[1].any());
        assert!(events[2].speed_down && !events[2].speed_up);
        assert!(!events[3].any());
        assert!(!events[4].any());
    }

    #[test]
    fn generic_read_error_propagates_and_release_returns_device() {
        let mut backend = ScriptedBackend::default();
        backend
            .generic
            .push_back(Err(DeviceError::ReadFailed("unplugged".to_string())));

        let mut source =
            ControllerSource::Generic(GenericSource::new(generic_info(), &centred()));
        assert!(source.poll(&mut backend).is_err());

        source.release(&mut backend);
        assert_eq!(backend.released, vec![GenericDeviceId(7)]);
    }
}
