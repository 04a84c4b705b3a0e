//! Outbound pose and control messages
//!
//! Every pose goes to the primary address as six floats. It is then fanned out
//! field by field to the auxiliary channels, in the fixed order
//! `x, y, z, pitch, yaw, roll`.

use super::message::pose_args;
use super::{
    MessageSink, TransportError, DEFAULT_AUX_ADDRESSES, DEFAULT_POSE_ADDRESS,
    SMOOTHING_STRENGTH_ADDRESS, SMOOTH_MOVEMENT_ADDRESS,
};
use crate::pose::Pose;
use rosc::OscType;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::{debug, info};

pub const AUX_CHANNELS: usize = 6;

/// One auxiliary single-float output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxChannel {
    pub address: String,
    #[serde(default)]
    pub enabled: bool,
}

impl AuxChannel {
    pub fn new(address: impl Into<String>, enabled: bool) -> Self {
        Self {
            address: address.into(),
            enabled,
        }
    }

    /// Address to send to, or `None` when disabled or blank
    fn target(&self) -> Option<&str> {
        let address = self.address.trim();
        (self.enabled && !address.is_empty()).then_some(address)
    }
}

pub fn default_aux_channels() -> [AuxChannel; AUX_CHANNELS] {
    DEFAULT_AUX_ADDRESSES.map(|address| AuxChannel::new(address, false))
}

pub struct PoseSender {
    sink: Box<dyn MessageSink>,
    pose_address: String,
    aux: [AuxChannel; AUX_CHANNELS],
}

impl PoseSender {
    pub fn new(
        sink: Box<dyn MessageSink>,
        pose_address: impl Into<String>,
        aux: [AuxChannel; AUX_CHANNELS],
    ) -> Self {
        Self {
            sink,
            pose_address: pose_address.into(),
            aux,
        }
    }

    pub fn with_defaults(sink: Box<dyn MessageSink>) -> Self {
        Self::new(sink, DEFAULT_POSE_ADDRESS, default_aux_channels())
    }

    pub fn set_pose_address(&mut self, address: impl Into<String>) {
        self.pose_address = address.into();
        info!("Pose address set to '{}'", self.pose_address);
    }

    pub fn set_aux(&mut self, index: usize, channel: AuxChannel) -> Result<(), TransportError> {
        let slot = self
            .aux
            .get_mut(index)
            .ok_or(TransportError::InvalidAuxIndex(index))?;
        info!(
            "Aux channel {} -> '{}' ({})",
            index,
            channel.address,
            if channel.enabled { "enabled" } else { "disabled" }
        );
        *slot = channel;
        Ok(())
    }

    pub fn set_target(&mut self, target: SocketAddr) {
        self.sink.set_target(target);
    }

    /// Sends the primary pose message, then every usable aux channel.
    ///
    /// Stops at the first failing send.
    pub fn send_pose(&mut self, pose: &Pose) -> Result<(), TransportError> {
        self.sink.send(&self.pose_address, pose_args(pose))?;

        for (channel, value) in self.aux.iter().zip(pose.to_array()) {
            match channel.target() {
                Some(address) => self.sink.send(address, vec![OscType::Float(value)])?,
                None if channel.enabled => debug!("Skipping enabled aux channel with empty address"),
                None => {}
            }
        }
        Ok(())
    }

    pub fn send_float(&mut self, address: &str, value: f32) -> Result<(), TransportError> {
        self.sink.send(address, vec![OscType::Float(value)])
    }

    pub fn send_bool(&mut self, address: &str, value: bool) -> Result<(), TransportError> {
        self.sink.send(address, vec![OscType::Bool(value)])
    }

    /// Startup control messages: smoothing on, then its strength
    pub fn enable_smoothing(&mut self, strength: f32) -> Result<(), TransportError> {
        info!("Enabling camera smoothing (strength {})", strength);
        self.send_bool(SMOOTH_MOVEMENT_ADDRESS, true)?;
        self.send_float(SMOOTHING_STRENGTH_ADDRESS, strength)
    }
}
