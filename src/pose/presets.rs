//! In-memory pose presets (three slots, numbered 1-3 at the UI boundary)

use super::Pose;
use thiserror::Error;
use tracing::{debug, info};

pub const PRESET_SLOTS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresetError {
    #[error("Preset slot {0} does not exist (valid slots: 1-{PRESET_SLOTS})")]
    InvalidSlot(usize),
}

#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    slots: [Option<Pose>; PRESET_SLOTS],
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a snapshot of `pose`, overwriting whatever the slot held
    pub fn save(&mut self, slot: usize, pose: Pose) -> Result<(), PresetError> {
        let index = slot_index(slot)?;
        info!("Saving pose to preset slot {}: {:?}", slot, pose);
        self.slots[index] = Some(pose);
        Ok(())
    }

    /// Returns the stored snapshot without clearing it; `None` if never saved
    pub fn load(&self, slot: usize) -> Result<Option<Pose>, PresetError> {
        let index = slot_index(slot)?;
        let pose = self.slots[index];
        if pose.is_none() {
            debug!("Preset slot {} is empty", slot);
        }
        Ok(pose)
    }

    /// Which slots currently hold a snapshot, in slot order
    pub fn filled(&self) -> [bool; PRESET_SLOTS] {
        self.slots.map(|slot| slot.is_some())
    }
}

fn slot_index(slot: usize) -> Result<usize, PresetError> {
    if (1..=PRESET_SLOTS).contains(&slot) {
        Ok(slot - 1)
    } else {
        Err(PresetError::InvalidSlot(slot))
    }
}
