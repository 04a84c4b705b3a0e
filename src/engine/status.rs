//! Status snapshot published to the UI over a watch channel

use super::lens::LensSettings;
use crate::controller::ControllerStatus;
use crate::pose::{Pose, PRESET_SLOTS};
use crate::transport::{RemotePose, TransportStatus};
use chrono::{DateTime, Local};

/// Snapshot published to the UI after every tick that changed something
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStatus {
    pub pose: Pose,
    pub remote: Option<RemotePose>,
    pub speed_tenths: u8,
    pub gimbal_mode: bool,
    pub lens: LensSettings,
    pub presets_filled: [bool; PRESET_SLOTS],
    pub controller: ControllerStatus,
    pub transport: TransportStatus,
    pub last_send: Option<DateTime<Local>>,
}
