//! UI-facing engine handle
//!
//! The UI never touches engine state. It pushes [`UiCommand`]s through an
//! [`EngineHandle`] and watches [`EngineStatus`] snapshots.

use super::lens::LensSetting;
use super::status::EngineStatus;
use super::EngineError;
use crate::input::UiSticks;
use crate::pose::{Pose, PresetError, PRESET_SLOTS};
use crate::transport::{AuxChannel, AUX_CHANNELS};
use std::net::SocketAddr;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const COMMAND_QUEUE_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    SetUiSticks(UiSticks),
    SetSpeed(u8),
    SetGimbalMode(bool),
    SetPose(Pose),
    Reset,
    SavePreset(usize),
    LoadPreset(usize),
    SetLens(LensSetting, f32),
    SetLookAtMe(bool),
    SetSendAddress(String),
    SetSendTarget(SocketAddr),
    SetAux(usize, AuxChannel),
}

#[derive(Debug, Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<UiCommand>,
    status_rx: watch::Receiver<EngineStatus>,
    cancel: CancellationToken,
}

impl EngineHandle {
    pub(super) fn new(
        command_tx: mpsc::Sender<UiCommand>,
        status_rx: watch::Receiver<EngineStatus>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            command_tx,
            status_rx,
            cancel,
        }
    }

    fn send(&self, command: UiCommand) -> Result<(), EngineError> {
        debug!("UI command: {:?}", command);
        self.command_tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => EngineError::CommandQueueFull,
            TrySendError::Closed(_) => EngineError::Stopped,
        })
    }

    pub fn set_ui_sticks(&self, sticks: UiSticks) -> Result<(), EngineError> {
        self.send(UiCommand::SetUiSticks(sticks))
    }

    /// Speed slider value in tenths, clamped to 1-50 by the engine
    pub fn set_speed(&self, multiplier_tenths: u8) -> Result<(), EngineError> {
        self.send(UiCommand::SetSpeed(multiplier_tenths))
    }

    pub fn set_gimbal_mode(&self, enabled: bool) -> Result<(), EngineError> {
        self.send(UiCommand::SetGimbalMode(enabled))
    }

    /// Sets the pose directly; it is clamped and sent right away
    pub fn set_pose(&self, pose: Pose) -> Result<(), EngineError> {
        self.send(UiCommand::SetPose(pose))
    }

    pub fn reset(&self) -> Result<(), EngineError> {
        self.send(UiCommand::Reset)
    }

    pub fn save_preset(&self, slot: usize) -> Result<(), EngineError> {
        check_slot(slot)?;
        self.send(UiCommand::SavePreset(slot))
    }

    pub fn load_preset(&self, slot: usize) -> Result<(), EngineError> {
        check_slot(slot)?;
        self.send(UiCommand::LoadPreset(slot))
    }

    pub fn set_lens(&self, setting: LensSetting, value: f32) -> Result<(), EngineError> {
        self.send(UiCommand::SetLens(setting, value))
    }

    pub fn set_look_at_me(&self, enabled: bool) -> Result<(), EngineError> {
        self.send(UiCommand::SetLookAtMe(enabled))
    }

    /// Changes the OSC address of the primary pose message
    pub fn set_send_address(&self, address: impl Into<String>) -> Result<(), EngineError> {
        self.send(UiCommand::SetSendAddress(address.into()))
    }

    /// Changes the UDP endpoint pose messages are sent to
    pub fn set_send_target(&self, target: SocketAddr) -> Result<(), EngineError> {
        self.send(UiCommand::SetSendTarget(target))
    }

    pub fn set_aux(&self, index: usize, channel: AuxChannel) -> Result<(), EngineError> {
        if index >= AUX_CHANNELS {
            return Err(EngineError::InvalidAuxIndex(index));
        }
        self.send(UiCommand::SetAux(index, channel))
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status_rx.clone()
    }

    pub fn status(&self) -> EngineStatus {
        self.status_rx.borrow().clone()
    }

    pub fn shutdown(&self) {
        info!("Engine shutdown requested");
        self.cancel.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn check_slot(slot: usize) -> Result<(), PresetError> {
    if (1..=PRESET_SLOTS).contains(&slot) {
        Ok(())
    } else {
        Err(PresetError::InvalidSlot(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(capacity: usize) -> (EngineHandle, mpsc::Receiver<UiCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        let (_status_tx, status_rx) = watch::channel(EngineStatus::default());
        (EngineHandle::new(tx, status_rx, CancellationToken::new()), rx)
    }

    #[test]
    fn commands_are_queued_in_order() {
        let (handle, mut rx) = handle(8);
        handle.set_speed(20).unwrap();
        handle.reset().unwrap();
        assert_eq!(rx.try_recv().unwrap(), UiCommand::SetSpeed(20));
        assert_eq!(rx.try_recv().unwrap(), UiCommand::Reset);
    }

    #[test]
    fn invalid_slots_fail_before_queueing() {
        let (handle, mut rx) = handle(8);
        assert!(matches!(
            handle.save_preset(0),
            Err(EngineError::Preset(PresetError::InvalidSlot(0)))
        ));
        assert!(handle.load_preset(4).is_err());
        assert!(handle.set_aux(6, AuxChannel::new("/x", true)).is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_and_closed_queues_are_reported() {
        let (handle, rx) = handle(1);
        handle.reset().unwrap();
        assert!(matches!(handle.reset(), Err(EngineError::CommandQueueFull)));

        drop(rx);
        assert!(matches!(handle.reset(), Err(EngineError::Stopped)));
    }

    #[test]
    fn shutdown_cancels_token() {
        let (handle, _rx) = handle(1);
        let other = handle.clone();
        handle.shutdown();
        assert!(other.is_shutdown());
    }
}
