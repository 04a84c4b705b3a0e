//! OSC message codec
//!
//! Outbound messages are plain OSC messages (never bundles). Inbound datagrams
//! may be either; bundles are flattened and every contained message is looked
//! at on its own.

use super::TransportError;
use crate::pose::Pose;
use chrono::{DateTime, Local};
use rosc::{OscMessage, OscPacket, OscType};
use tracing::debug;

/// Address fragment identifying a pose message
pub const POSE_ADDRESS_MARKER: &str = "Pose";

/// A pose reported by the remote side
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePose {
    pub address: String,
    pub pose: Pose,
    pub received_at: DateTime<Local>,
}

pub fn encode_message(address: &str, args: Vec<OscType>) -> Result<Vec<u8>, TransportError> {
    let packet = OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args,
    });
    rosc::encoder::encode(&packet).map_err(|e| TransportError::Encode(format!("{:?}", e)))
}

/// Six floats in wire order `(x, y, z, pitch, yaw, roll)`
pub fn pose_args(pose: &Pose) -> Vec<OscType> {
    pose.to_array().into_iter().map(OscType::Float).collect()
}

/// Extracts every pose message from one datagram.
///
/// Anything that does not decode, or whose first six arguments are not
/// numeric, is dropped without error.
pub fn decode_remote_poses(datagram: &[u8]) -> Vec<RemotePose> {
    let packet = match rosc::decoder::decode_udp(datagram) {
        Ok((_, packet)) => packet,
        Err(e) => {
            debug!("Ignoring undecodable datagram ({} bytes): {:?}", datagram.len(), e);
            return Vec::new();
        }
    };

    let mut messages = Vec::new();
    flatten(packet, &mut messages);

    let received_at = Local::now();
    messages
        .into_iter()
        .filter_map(|message| {
            let pose = pose_from_message(&message)?;
            Some(RemotePose {
                address: message.addr,
                pose,
                received_at,
            })
        })
        .collect()
}

pub fn pose_from_message(message: &OscMessage) -> Option<Pose> {
    if !message.addr.contains(POSE_ADDRESS_MARKER) || message.args.len() < 6 {
        return None;
    }

    let mut values = [0.0f32; 6];
    for (slot, arg) in values.iter_mut().zip(&message.args) {
        *slot = numeric(arg)?;
    }
    Some(Pose::from_array(values))
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(message) => out.push(message),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}

fn numeric(arg: &OscType) -> Option<f32> {
    match arg {
        OscType::Float(v) => Some(*v),
        OscType::Double(v) => Some(*v as f32),
        OscType::Int(v) => Some(*v as f32),
        OscType::Long(v) => Some(*v as f32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{OscBundle, OscTime};

    fn message(addr: &str, args: Vec<OscType>) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        })
    }

    #[test]
    fn float_pose_message_is_decoded() {
        let bytes = encode_message(
            "/usercamera/Pose",
            pose_args(&Pose::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0)),
        )
        .unwrap();

        let poses = decode_remote_poses(&bytes);
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].address, "/usercamera/Pose");
        assert_eq!(poses[0].pose, Pose::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
    }

    #[test]
    fn mixed_numeric_arguments_are_accepted() {
        let packet = message(
            "/usercamera/Pose",
            vec![
                OscType::Int(1),
                OscType::Double(2.5),
                OscType::Long(3),
                OscType::Float(4.0),
                OscType::Float(5.0),
                OscType::Float(6.0),
                OscType::String("extra".to_string()),
            ],
        );
        let bytes = rosc::encoder::encode(&packet).unwrap();

        let poses = decode_remote_poses(&bytes);
        assert_eq!(poses[0].pose, Pose::new(1.0, 2.5, 3.0, 4.0, 5.0, 6.0));
    }

    #[test]
    fn malformed_messages_are_ignored() {
        let too_short = rosc::encoder::encode(&message(
            "/usercamera/Pose",
            vec![OscType::Float(1.0); 5],
        ))
        .unwrap();
        assert!(decode_remote_poses(&too_short).is_empty());

        let mut wrong_type = vec![OscType::Float(1.0); 6];
        wrong_type[2] = OscType::Bool(true);
        let wrong_type =
            rosc::encoder::encode(&message("/usercamera/Pose", wrong_type)).unwrap();
        assert!(decode_remote_poses(&wrong_type).is_empty());

        let other_address =
            rosc::encoder::encode(&message("/usercamera/Zoom", vec![OscType::Float(1.0); 6]))
                .unwrap();
        assert!(decode_remote_poses(&other_address).is_empty());

        assert!(decode_remote_poses(b"not osc at all").is_empty());
        assert!(decode_remote_poses(&[]).is_empty());
    }

    #[test]
    fn bundles_are_flattened() {
        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime::from((0, 1)),
            content: vec![
                message("/avatar/parameters/DroneX", vec![OscType::Float(1.0)]),
                message("/usercamera/Pose", vec![OscType::Float(7.0); 6]),
            ],
        });
        let bytes = rosc::encoder::encode(&bundle).unwrap();

        let poses = decode_remote_poses(&bytes);
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].pose.x, 7.0);
    }
}
