//! OSC over UDP transport
//!
//! ```text
//!  tick ──► PoseSender ──► MessageSink (UdpSink) ──► 127.0.0.1:9000
//!
//!  0.0.0.0:9001 ──► receive task ──► mpsc<RemotePose> ──► tick
//! ```
//!
//! The send side is synchronous and non-blocking so it can run inside the tick.
//! The receive side is one background task that only decodes and forwards.

pub mod message;
pub mod receiver;
pub mod sender;

pub use message::RemotePose;
pub use receiver::spawn_receiver;
pub use sender::{AuxChannel, PoseSender, AUX_CHANNELS};

use rosc::OscType;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

pub const DEFAULT_SEND_PORT: u16 = 9000;
pub const DEFAULT_RECEIVE_PORT: u16 = 9001;

pub const DEFAULT_POSE_ADDRESS: &str = "/usercamera/Pose";
pub const DEFAULT_AUX_ADDRESSES: [&str; AUX_CHANNELS] = [
    "/avatar/parameters/DroneX",
    "/avatar/parameters/DroneY",
    "/avatar/parameters/DroneZ",
    "/avatar/parameters/DroneRotX",
    "/avatar/parameters/DroneRotY",
    "/avatar/parameters/DroneRotZ",
];

pub const SMOOTH_MOVEMENT_ADDRESS: &str = "/usercamera/SmoothMovement";
pub const SMOOTHING_STRENGTH_ADDRESS: &str = "/usercamera/SmoothingStrength";
pub const ZOOM_ADDRESS: &str = "/usercamera/Zoom";
pub const APERTURE_ADDRESS: &str = "/usercamera/Aperture";
pub const FOCAL_DISTANCE_ADDRESS: &str = "/usercamera/FocalDistance";
pub const EXPOSURE_ADDRESS: &str = "/usercamera/Exposure";
pub const LOOK_AT_ME_ADDRESS: &str = "/usercamera/LookAtMe";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to encode OSC message: {0}")]
    Encode(String),

    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Auxiliary channel {0} does not exist")]
    InvalidAuxIndex(usize),

    #[error("Socket not ready for writing, dropped message to {0}")]
    NotReady(SocketAddr),
}

/// Outcome of the most recent send, shown by the UI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransportStatus {
    #[default]
    Idle,
    Sending,
    SendFailed(String),
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportStatus::Idle => write!(f, "Idle"),
            TransportStatus::Sending => write!(f, "Sending"),
            TransportStatus::SendFailed(reason) => write!(f, "Send failed: {}", reason),
        }
    }
}

/// Destination for outbound OSC messages; must not block
pub trait MessageSink {
    fn send(&mut self, address: &str, args: Vec<OscType>) -> Result<(), TransportError>;

    /// Changes where messages go; sinks without a network target ignore it
    fn set_target(&mut self, _target: SocketAddr) {}
}

/// UDP sink writing one datagram per message with `try_send_to`
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSink {
    pub async fn bind(target: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Bind {
                addr: local,
                source,
            })?;
        // try_send_to reports WouldBlock until the reactor has seen the socket writable
        socket.writable().await?;
        info!("OSC sender ready, target {}", target);
        Ok(Self { socket, target })
    }
}

impl MessageSink for UdpSink {
    fn send(&mut self, address: &str, args: Vec<OscType>) -> Result<(), TransportError> {
        let bytes = message::encode_message(address, args)?;
        let sent = match self.socket.try_send_to(&bytes, self.target) {
            Ok(sent) => sent,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                warn!("Send buffer full, dropping {} to {}", address, self.target);
                return Err(TransportError::NotReady(self.target));
            }
            Err(e) => return Err(e.into()),
        };
        debug!("Sent {} bytes to {} ({})", sent, self.target, address);
        Ok(())
    }

    fn set_target(&mut self, target: SocketAddr) {
        info!("OSC send target changed to {}", target);
        self.target = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;
    use std::time::Duration;

    #[tokio::test]
    async fn udp_sink_delivers_encoded_pose() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();

        let mut sink = UdpSink::bind(target).await.unwrap();
        sink.send(
            DEFAULT_POSE_ADDRESS,
            message::pose_args(&Pose::new(0.0, 0.0, 0.15, 0.0, 0.0, 0.0)),
        )
        .unwrap();

        let mut buf = [0u8; rosc::decoder::MTU];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();

        let poses = message::decode_remote_poses(&buf[..len]);
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].pose.z, 0.15);
    }

    #[tokio::test]
    async fn udp_sink_sends_right_after_bind() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();

        let mut sink = UdpSink::bind(target).await.unwrap();
        for strength in [1.0f32, 2.0, 3.0] {
            sink.send(SMOOTHING_STRENGTH_ADDRESS, vec![OscType::Float(strength)])
                .unwrap();
        }

        let mut buf = [0u8; rosc::decoder::MTU];
        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
                .await
                .unwrap()
                .unwrap();
        }
    }

    #[test]
    fn not_ready_names_target() {
        let target: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(
            TransportError::NotReady(target).to_string(),
            "Socket not ready for writing, dropped message to 127.0.0.1:9000"
        );
    }

    #[test]
    fn status_display() {
        assert_eq!(TransportStatus::Idle.to_string(), "Idle");
        assert_eq!(
            TransportStatus::SendFailed("refused".to_string()).to_string(),
            "Send failed: refused"
        );
    }
}
