//! Camera pose state
//!
//! Holds the six-axis pose that the engine integrates every tick and mirrors
//! back from the remote camera. All bounds live here so the integrator, the
//! direct-set path and the remote sync path clamp against the same limits.
//!
//! ```text
//! x, y, z  ∈ [-10000, 10000]   (metres)
//! pitch    ∈ [-90, 90]         (degrees)
//! yaw      ∈ [-360, 360]       (degrees)
//! roll     only set directly, clamped to [-360, 360]
//! ```

pub mod presets;

pub use presets::{PresetError, PresetStore, PRESET_SLOTS};

pub const POSITION_LIMIT: f32 = 10_000.0;
pub const PITCH_LIMIT: f32 = 90.0;
pub const YAW_LIMIT: f32 = 360.0;
pub const ROLL_LIMIT: f32 = 360.0;

/// Minimum per-axis difference before a remote position overrides the local one
pub const REMOTE_SYNC_THRESHOLD: f32 = 0.05;

/// Absolute camera pose as sent over the wire: `(x, y, z, pitch, yaw, roll)`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Pose {
    pub const ZERO: Pose = Pose {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        pitch: 0.0,
        yaw: 0.0,
        roll: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32, pitch: f32, yaw: f32, roll: f32) -> Self {
        Self {
            x,
            y,
            z,
            pitch,
            yaw,
            roll,
        }
    }

    /// Builds a pose from the wire order `(x, y, z, pitch, yaw, roll)`
    pub fn from_array(values: [f32; 6]) -> Self {
        let [x, y, z, pitch, yaw, roll] = values;
        Self::new(x, y, z, pitch, yaw, roll)
    }

    /// Wire order `(x, y, z, pitch, yaw, roll)`, also the auxiliary fan-out order
    pub fn to_array(&self) -> [f32; 6] {
        [self.x, self.y, self.z, self.pitch, self.yaw, self.roll]
    }

    /// Clamps every axis, roll included, to its bound
    pub fn clamped(self) -> Self {
        Self {
            x: clamp_position(self.x),
            y: clamp_position(self.y),
            z: clamp_position(self.z),
            pitch: self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            yaw: self.yaw.clamp(-YAW_LIMIT, YAW_LIMIT),
            roll: self.roll.clamp(-ROLL_LIMIT, ROLL_LIMIT),
        }
    }

    /// Pulls x/y/z towards a remote pose, axis by axis.
    ///
    /// An axis only changes when it differs from the remote value by more than
    /// [`REMOTE_SYNC_THRESHOLD`], which keeps the local send and the remote
    /// echo from chasing each other. Rotation is never synced.
    ///
    /// Returns `true` if any axis changed.
    pub fn sync_position_from(&mut self, remote: &Pose) -> bool {
        let x = sync_axis(&mut self.x, remote.x);
        let y = sync_axis(&mut self.y, remote.y);
        let z = sync_axis(&mut self.z, remote.z);
        x || y || z
    }
}

pub fn clamp_position(value: f32) -> f32 {
    value.clamp(-POSITION_LIMIT, POSITION_LIMIT)
}

fn sync_axis(local: &mut f32, remote: f32) -> bool {
    if (*local - remote).abs() > REMOTE_SYNC_THRESHOLD {
        *local = clamp_position(remote);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_limits_every_axis() {
        let pose = Pose::new(20_000.0, -20_000.0, 5.0, 120.0, -400.0, 500.0).clamped();
        assert_eq!(pose, Pose::new(10_000.0, -10_000.0, 5.0, 90.0, -360.0, 360.0));
    }

    #[test]
    fn sync_ignores_small_deltas() {
        let mut local = Pose::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0);
        let remote = Pose::new(1.04, 2.0, 2.97, 0.0, 0.0, 0.0);
        assert!(!local.sync_position_from(&remote));
        assert_eq!(local, Pose::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn sync_updates_axes_independently_and_keeps_rotation() {
        let mut local = Pose::new(0.0, 0.0, 0.0, 10.0, 20.0, 30.0);
        let remote = Pose::new(1.0, 0.01, -2.0, 45.0, 45.0, 45.0);
        assert!(local.sync_position_from(&remote));
        assert_eq!(local, Pose::new(1.0, 0.0, -2.0, 10.0, 20.0, 30.0));
    }

    #[test]
    fn sync_clamps_remote_position() {
        let mut local = Pose::ZERO;
        local.sync_position_from(&Pose::new(50_000.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(local.x, POSITION_LIMIT);
    }
}
