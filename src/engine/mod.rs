//! Drone camera engine with statum lifecycle
//!
//! Owns all tick-context state and runs the fixed-period control loop.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Running ──► Stopped
//!      (start/activate)  (cancel)
//! ```
//!
//! # Tick
//!
//! ```text
//! UI commands ──┐
//! remote poses ─┼─► ControlState ──► aggregate ──► events ──► integrate ──► send ──► status
//! arbiter ──────┘
//! ```
//!
//! The remote receive task is the only other context; it hands poses over an
//! mpsc channel that the tick drains, so no engine state is ever locked.

pub mod command;
pub mod lens;
pub mod state;
pub mod status;

pub use command::{EngineHandle, UiCommand};
pub use lens::{LensSetting, LensSettings};
pub use state::ControlState;
pub use status::EngineStatus;

use crate::config::{ConfigError, EngineConfig};
use crate::controller::{DeviceArbiter, DeviceBackend, DeviceError};
use crate::input::{aggregate, InputEvents};
use crate::motion::{integrate, SpeedConfig};
use crate::pose::{Pose, PresetError};
use crate::transport::receiver::bind_receiver;
use crate::transport::{
    spawn_receiver, MessageSink, PoseSender, RemotePose, TransportError, TransportStatus,
    LOOK_AT_ME_ADDRESS,
};
use chrono::{DateTime, Local};
use statum::{machine, state};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const REMOTE_QUEUE_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Auxiliary channel {0} does not exist")]
    InvalidAuxIndex(usize),

    #[error("Engine command queue is full")]
    CommandQueueFull,

    #[error("Engine has stopped")]
    Stopped,
}

#[state]
#[derive(Debug, Clone)]
pub enum EngineLifecycle {
    Initializing, // Built, nothing sent yet
    Running,      // Ticking
    Stopped,      // Device released, receive task joined
}

#[machine]
pub struct Engine<S: EngineLifecycle> {
    config: EngineConfig,
    state: ControlState,
    arbiter: DeviceArbiter,
    backend: Box<dyn DeviceBackend>,
    sender: PoseSender,
    transport_status: TransportStatus,
    last_send: Option<DateTime<Local>>,
    commands: mpsc::Receiver<UiCommand>,
    remote_tx: mpsc::Sender<RemotePose>,
    remote_rx: mpsc::Receiver<RemotePose>,
    status_tx: watch::Sender<EngineStatus>,
    cancel: CancellationToken,
    receiver_task: Option<JoinHandle<()>>,
}

impl<S: EngineLifecycle> Engine<S> {
    pub fn pose(&self) -> Pose {
        self.state.pose
    }

    pub fn control_state(&self) -> &ControlState {
        &self.state
    }

    pub fn transport_status(&self) -> &TransportStatus {
        &self.transport_status
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Engine<Initializing> {
    /// Builds the engine and the handle the UI talks to
    pub fn create(
        config: EngineConfig,
        backend: Box<dyn DeviceBackend>,
        sink: Box<dyn MessageSink>,
    ) -> Result<(Self, EngineHandle), EngineError> {
        config.validate()?;
        info!(
            "Creating engine (tick {} ms, scan every {} ticks)",
            config.tick_period_ms, config.scan_interval_ticks
        );

        let sender = PoseSender::new(
            sink,
            config.network.pose_address.clone(),
            config.network.aux_channels()?,
        );
        let state = ControlState::new(SpeedConfig::new(config.initial_speed_tenths));
        let arbiter = DeviceArbiter::new(config.scan_interval_ticks);

        let (command_tx, commands) = mpsc::channel(command::COMMAND_QUEUE_SIZE);
        let (remote_tx, remote_rx) = mpsc::channel(REMOTE_QUEUE_SIZE);
        let (status_tx, status_rx) = watch::channel(EngineStatus::default());
        let cancel = CancellationToken::new();

        let handle = EngineHandle::new(command_tx, status_rx, cancel.clone());
        let engine = Self::new(
            config,
            state,
            arbiter,
            backend,
            sender,
            TransportStatus::Idle,
            None, // last_send
            commands,
            remote_tx,
            remote_rx,
            status_tx,
            cancel,
            None, // receiver_task
        );
        engine.publish_status();
        Ok((engine, handle))
    }

    /// Sender feeding the same queue as the network receive task
    pub fn remote_sender(&self) -> mpsc::Sender<RemotePose> {
        self.remote_tx.clone()
    }

    /// Binds the receive socket, spawns the receive task and activates
    pub async fn start(mut self) -> Result<Engine<Running>, EngineError> {
        let socket = bind_receiver(self.config.network.receive_addr()).await?;
        self.receiver_task = Some(spawn_receiver(
            socket,
            self.remote_tx.clone(),
            self.cancel.child_token(),
        ));
        Ok(self.activate())
    }

    /// Sends the startup control messages and switches to Running
    pub fn activate(mut self) -> Engine<Running> {
        let strength = self.config.smoothing_strength;
        let result = self.sender.enable_smoothing(strength);
        self.record_send(result);
        info!("Engine running");
        self.transition()
    }
}

impl Engine<Running> {
    /// One control step; never blocks and never fails
    pub fn tick(&mut self) {
        self.drain_commands();
        self.drain_remote();

        let controller = self.arbiter.tick(self.backend.as_mut());
        let frame = aggregate(&self.state.ui_sticks, controller.as_ref());

        self.apply_events(frame.events);

        if frame.has_input {
            self.state.pose = integrate(&self.state.pose, &frame, self.state.speed, self.state.mode);
            self.send_pose();
        }

        self.publish_status();
    }

    pub async fn run_until_shutdown(mut self) -> Engine<Stopped> {
        let period = Duration::from_millis(self.config.tick_period_ms);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Starting control loop ({:?} period)", period);

        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = interval.tick() => self.tick(),
            }
        }

        self.stop().await
    }

    async fn stop(mut self) -> Engine<Stopped> {
        self.cancel.cancel();
        self.arbiter.release(self.backend.as_mut());

        if let Some(task) = self.receiver_task.take() {
            if let Err(e) = task.await {
                error!("Receive task ended abnormally: {}", e);
            }
        }

        self.publish_status();
        info!("Engine stopped");
        self.transition()
    }

    fn drain_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.handle_command(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.cancel.is_cancelled() {
                        info!("All engine handles dropped, shutting down");
                        self.cancel.cancel();
                    }
                    break;
                }
            }
        }
    }

    fn drain_remote(&mut self) {
        let connected = self.arbiter.is_connected();
        while let Ok(remote) = self.remote_rx.try_recv() {
            if self.state.apply_remote(remote, connected) {
                debug!("Local position synced to remote: {:?}", self.state.pose);
            }
        }
    }

    fn handle_command(&mut self, command: UiCommand) {
        match command {
            UiCommand::SetUiSticks(sticks) => self.state.ui_sticks = sticks,
            UiCommand::SetSpeed(tenths) => {
                self.state.speed = SpeedConfig::new(tenths);
                info!("Speed set to {:.1}x", self.state.speed.multiplier());
            }
            UiCommand::SetGimbalMode(enabled) => {
                self.state.mode.gimbal_mode = enabled;
                info!("Gimbal mode {}", if enabled { "on" } else { "off" });
            }
            UiCommand::SetPose(pose) => {
                self.state.pose = pose.clamped();
                self.send_pose();
            }
            UiCommand::Reset => self.reset(),
            UiCommand::SavePreset(slot) => {
                if let Err(e) = self.state.presets.save(slot, self.state.pose) {
                    warn!("Save preset failed: {}", e);
                }
            }
            UiCommand::LoadPreset(slot) => match self.state.presets.load(slot) {
                Ok(Some(pose)) => {
                    info!("Loaded preset {}", slot);
                    self.state.pose = pose;
                    self.send_pose();
                }
                Ok(None) => {}
                Err(e) => warn!("Load preset failed: {}", e),
            },
            UiCommand::SetLens(setting, value) => {
                let value = self.state.lens.set(setting, value);
                debug!("Lens {} set to {}", setting, value);
                let result = self.sender.send_float(setting.address(), value);
                self.record_send(result);
            }
            UiCommand::SetLookAtMe(enabled) => {
                self.state.lens.look_at_me = enabled;
                let result = self.sender.send_bool(LOOK_AT_ME_ADDRESS, enabled);
                self.record_send(result);
            }
            UiCommand::SetSendAddress(address) => {
                let address = address.trim();
                if address.is_empty() {
                    warn!("Ignoring empty pose address");
                } else {
                    self.sender.set_pose_address(address);
                }
            }
            UiCommand::SetSendTarget(target) => self.sender.set_target(target),
            UiCommand::SetAux(index, channel) => {
                if let Err(e) = self.sender.set_aux(index, channel) {
                    warn!("Aux update failed: {}", e);
                }
            }
        }
    }

    fn apply_events(&mut self, events: InputEvents) {
        if events.toggle_gimbal {
            self.state.mode.gimbal_mode = !self.state.mode.gimbal_mode;
            info!(
                "Gimbal mode toggled {}",
                if self.state.mode.gimbal_mode { "on" } else { "off" }
            );
        }
        if events.reset {
            self.reset();
        }
        if events.speed_up {
            self.state.speed.step_up();
            info!("Speed up: {:.1}x", self.state.speed.multiplier());
        }
        if events.speed_down {
            self.state.speed.step_down();
            info!("Speed down: {:.1}x", self.state.speed.multiplier());
        }

        let zoom_delta = match (events.zoom_in, events.zoom_out) {
            (true, false) => lens::ZOOM_STEP,
            (false, true) => -lens::ZOOM_STEP,
            _ => 0.0,
        };
        if zoom_delta != 0.0 {
            let zoom = self.state.lens.step_zoom(zoom_delta);
            let result = self.sender.send_float(LensSetting::Zoom.address(), zoom);
            self.record_send(result);
        }
    }

    /// Zeroes the pose and restores the lens, sending everything
    fn reset(&mut self) {
        info!("Resetting camera pose and lens");
        self.state.pose = Pose::ZERO;
        self.send_pose();

        self.state.lens.reset_lens();
        for setting in LensSetting::ALL {
            let result = self
                .sender
                .send_float(setting.address(), self.state.lens.get(setting));
            self.record_send(result);
        }
    }

    fn send_pose(&mut self) {
        let result = self.sender.send_pose(&self.state.pose);
        self.record_send(result);
    }
}

impl Engine<Stopped> {
    pub fn final_status(&self) -> EngineStatus {
        self.status_tx.borrow().clone()
    }
}

impl<S: EngineLifecycle> Engine<S> {
    fn record_send(&mut self, result: Result<(), TransportError>) {
        match result {
            Ok(()) => {
                self.transport_status = TransportStatus::Sending;
                self.last_send = Some(Local::now());
            }
            Err(e) => {
                // Only log transitions into the failed state
                if !matches!(self.transport_status, TransportStatus::SendFailed(_)) {
                    warn!("OSC send failed: {}", e);
                }
                self.transport_status = TransportStatus::SendFailed(e.to_string());
            }
        }
    }

    fn snapshot(&self) -> EngineStatus {
        EngineStatus {
            pose: self.state.pose,
            remote: self.state.remote.clone(),
            speed_tenths: self.state.speed.tenths(),
            gimbal_mode: self.state.mode.gimbal_mode,
            lens: self.state.lens,
            presets_filled: self.state.presets.filled(),
            controller: self.arbiter.status(),
            transport: self.transport_status.clone(),
            last_send: self.last_send,
        }
    }

    fn publish_status(&self) {
        let next = self.snapshot();
        self.status_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
