//! Input fusion
//!
//! Merges the on-screen virtual joysticks and the active game controller into
//! one [`InputFrame`] per tick.
//!
//! # Source priority
//!
//! ```text
//! move pair:  UI move stick (while dragged)  ──else──►  controller left stick
//! look pair:  UI look stick (while dragged)  ──else──►  controller look axes
//! ```
//!
//! The two pairs are decided independently, so a dragged UI move stick can
//! coexist with controller look input in the same tick. Values of one pair are
//! never blended across sources.
//!
//! # Axis conventions
//!
//! `move_y > 0` means forward. `look_y` keeps the screen convention of the UI
//! widget (dragging up is negative), which is why the controller sources invert
//! their look-vertical channel before it reaches this module.

/// One virtual joystick as reported by the UI widget, already normalized to `[-1, 1]`
/// in screen coordinates (down is positive y)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickInput {
    pub x: f32,
    pub y: f32,
    pub is_interacting: bool,
}

impl StickInput {
    pub fn dragged(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            is_interacting: true,
        }
    }
}

/// Both on-screen joysticks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UiSticks {
    pub move_stick: StickInput,
    pub look_stick: StickInput,
}

impl UiSticks {
    pub fn any_interacting(&self) -> bool {
        self.move_stick.is_interacting || self.look_stick.is_interacting
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisPair {
    pub x: f32,
    pub y: f32,
}

impl AxisPair {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Discrete one-shot actions produced by a controller during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputEvents {
    pub toggle_gimbal: bool,
    pub reset: bool,
    pub speed_up: bool,
    pub speed_down: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
}

impl InputEvents {
    pub fn any(&self) -> bool {
        self.toggle_gimbal
            || self.reset
            || self.speed_up
            || self.speed_down
            || self.zoom_in
            || self.zoom_out
    }
}

/// Normalized output of one controller poll
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerInput {
    pub move_axes: AxisPair,
    pub look_axes: AxisPair,
    pub events: InputEvents,
}

/// Merged input for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    pub move_x: f32,
    pub move_y: f32,
    pub look_x: f32,
    pub look_y: f32,
    pub events: InputEvents,
    /// False when nothing is driving the pose; the tick then neither integrates nor sends
    pub has_input: bool,
}

/// Builds the tick's [`InputFrame`] from the UI sticks and the controller poll result.
///
/// `controller` is `None` when no controller is connected (or it failed this tick).
pub fn aggregate(ui: &UiSticks, controller: Option<&ControllerInput>) -> InputFrame {
    let move_axes = if ui.move_stick.is_interacting {
        // Screen up is negative; world forward is positive
        AxisPair::new(ui.move_stick.x, -ui.move_stick.y)
    } else {
        controller.map(|c| c.move_axes).unwrap_or_default()
    };

    let look_axes = if ui.look_stick.is_interacting {
        AxisPair::new(ui.look_stick.x, ui.look_stick.y)
    } else {
        controller.map(|c| c.look_axes).unwrap_or_default()
    };

    InputFrame {
        move_x: unit(move_axes.x),
        move_y: unit(move_axes.y),
        look_x: unit(look_axes.x),
        look_y: unit(look_axes.y),
        events: controller.map(|c| c.events).unwrap_or_default(),
        has_input: ui.any_interacting() || controller.is_some(),
    }
}

fn unit(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(move_axes: AxisPair, look_axes: AxisPair) -> ControllerInput {
        ControllerInput {
            move_axes,
            look_axes,
            events: InputEvents::default(),
        }
    }

    #[test]
    fn idle_sources_produce_no_input() {
        let frame = aggregate(&UiSticks::default(), None);
        assert!(!frame.has_input);
        assert_eq!(frame.move_y, 0.0);
    }

    #[test]
    fn ui_move_stick_vertical_is_inverted() {
        let ui = UiSticks {
            move_stick: StickInput::dragged(0.5, -1.0),
            ..Default::default()
        };
        let frame = aggregate(&ui, None);
        assert!(frame.has_input);
        assert_eq!(frame.move_x, 0.5);
        assert_eq!(frame.move_y, 1.0);
    }

    #[test]
    fn ui_wins_per_pair_while_dragged() {
        let ui = UiSticks {
            move_stick: StickInput::dragged(0.2, 0.0),
            ..Default::default()
        };
        let pad = controller(AxisPair::new(1.0, 1.0), AxisPair::new(-0.7, 0.3));
        let frame = aggregate(&ui, Some(&pad));

        // move comes from the UI, look from the controller
        assert_eq!((frame.move_x, frame.move_y), (0.2, 0.0));
        assert_eq!((frame.look_x, frame.look_y), (-0.7, 0.3));
    }

    #[test]
    fn released_ui_stick_falls_back_to_controller() {
        let ui = UiSticks {
            look_stick: StickInput {
                x: 0.9,
                y: 0.9,
                is_interacting: false,
            },
            ..Default::default()
        };
        let pad = controller(AxisPair::default(), AxisPair::new(0.1, -0.1));
        let frame = aggregate(&ui, Some(&pad));
        assert_eq!((frame.look_x, frame.look_y), (0.1, -0.1));
        assert!(frame.has_input);
    }

    #[test]
    fn controller_events_pass_through() {
        let mut pad = controller(AxisPair::default(), AxisPair::default());
        pad.events.toggle_gimbal = true;
        let frame = aggregate(&UiSticks::default(), Some(&pad));
        assert!(frame.events.toggle_gimbal);
        assert!(frame.events.any());
    }
}
