//! Tick-owned control state

use super::lens::LensSettings;
use crate::input::UiSticks;
use crate::motion::{ModeConfig, SpeedConfig};
use crate::pose::{Pose, PresetStore};
use crate::transport::RemotePose;

/// Everything the tick mutates, owned by the engine and never shared
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    pub pose: Pose,
    pub speed: SpeedConfig,
    pub mode: ModeConfig,
    pub presets: PresetStore,
    pub lens: LensSettings,
    pub ui_sticks: UiSticks,
    // Last pose reported by the remote side, kept for display
    pub remote: Option<RemotePose>,
}

impl ControlState {
    pub fn new(speed: SpeedConfig) -> Self {
        Self {
            speed,
            ..Self::default()
        }
    }

    /// Records a remote pose and mirrors its position when nothing local drives the pose.
    ///
    /// Returns true if the local position changed.
    pub fn apply_remote(&mut self, remote: RemotePose, controller_connected: bool) -> bool {
        let idle = !self.ui_sticks.any_interacting() && !controller_connected;
        let changed = idle && self.pose.sync_position_from(&remote.pose);
        self.remote = Some(remote);
        changed
    }
}
