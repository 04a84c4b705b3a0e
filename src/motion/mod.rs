//! Motion integration
//!
//! Turns one [`InputFrame`] into a new absolute [`Pose`]. The planar move
//! vector is rotated into world space by the current yaw, the look pair drives
//! yaw plus either pitch (gimbal mode) or altitude. The result is always
//! clamped, never rejected.

use crate::input::InputFrame;
use crate::pose::{clamp_position, Pose, PITCH_LIMIT, YAW_LIMIT};

/// Metres per tick at multiplier 1.0
pub const BASE_MOVE_SPEED: f32 = 0.15;
/// Degrees per tick at multiplier 1.0
pub const BASE_ROTATION_SPEED: f32 = 1.5;

/// Speed multiplier stored in tenths (slider value 1-50, i.e. 0.1x - 5.0x)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedConfig {
    multiplier_tenths: u8,
}

impl SpeedConfig {
    pub const MIN_TENTHS: u8 = 1;
    pub const MAX_TENTHS: u8 = 50;
    pub const DEFAULT_TENTHS: u8 = 10;

    pub fn new(multiplier_tenths: u8) -> Self {
        Self {
            multiplier_tenths: multiplier_tenths.clamp(Self::MIN_TENTHS, Self::MAX_TENTHS),
        }
    }

    pub fn tenths(&self) -> u8 {
        self.multiplier_tenths
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier_tenths as f32 / 10.0
    }

    pub fn step_up(&mut self) {
        *self = Self::new(self.multiplier_tenths.saturating_add(1));
    }

    pub fn step_down(&mut self) {
        *self = Self::new(self.multiplier_tenths.saturating_sub(1));
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TENTHS)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeConfig {
    /// Look-vertical drives pitch instead of altitude
    pub gimbal_mode: bool,
}

/// Integrates one tick of input into `pose`
pub fn integrate(pose: &Pose, frame: &InputFrame, speed: SpeedConfig, mode: ModeConfig) -> Pose {
    let multiplier = speed.multiplier();
    let move_speed = BASE_MOVE_SPEED * multiplier;
    let rot_speed = BASE_ROTATION_SPEED * multiplier;

    let strafe = (frame.move_x * move_speed) as f64;
    let forward = (frame.move_y * move_speed) as f64;

    let yaw_rad = (pose.yaw as f64).to_radians();
    let (sin, cos) = yaw_rad.sin_cos();
    let world_dx = (strafe * cos + forward * sin) as f32;
    let world_dz = (forward * cos - strafe * sin) as f32;

    let mut y = pose.y;
    let mut pitch = pose.pitch;
    if mode.gimbal_mode {
        pitch += frame.look_y * rot_speed;
    } else {
        y -= frame.look_y * move_speed;
    }
    let yaw = pose.yaw + frame.look_x * rot_speed;

    Pose {
        x: clamp_position(pose.x + world_dx),
        y: clamp_position(y),
        z: clamp_position(pose.z + world_dz),
        pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
        yaw: yaw.clamp(-YAW_LIMIT, YAW_LIMIT),
        roll: pose.roll,
    }
}
