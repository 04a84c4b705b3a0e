//! Background receive loop for remote pose echoes

use super::message::{decode_remote_poses, RemotePose};
use super::TransportError;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub async fn bind_receiver(addr: SocketAddr) -> Result<UdpSocket, TransportError> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })?;
    info!("OSC receiver listening on {}", addr);
    Ok(socket)
}

/// Spawns the receive task. It owns the socket and drops it when `cancel` fires.
pub fn spawn_receiver(
    socket: UdpSocket,
    poses: mpsc::Sender<RemotePose>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(receive_loop(socket, poses, cancel))
}

async fn receive_loop(
    socket: UdpSocket,
    poses: mpsc::Sender<RemotePose>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; rosc::decoder::MTU];

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Receive loop cancelled");
                break;
            }
            result = socket.recv_from(&mut buf) => result,
        };

        let len = match received {
            Ok((len, from)) => {
                debug!("Received {} bytes from {}", len, from);
                len
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    break;
                }
                // e.g. ICMP port unreachable surfacing on some platforms
                warn!("Receive error: {}", e);
                continue;
            }
        };

        for remote in decode_remote_poses(&buf[..len]) {
            match poses.try_send(remote) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => debug!("Remote pose queue full, dropping pose"),
                Err(TrySendError::Closed(_)) => {
                    info!("Remote pose consumer gone, stopping receive loop");
                    return;
                }
            }
        }
    }

    info!("Receive loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;
    use crate::transport::message::{encode_message, pose_args};
    use std::time::Duration;

    async fn start() -> (
        SocketAddr,
        mpsc::Receiver<RemotePose>,
        CancellationToken,
        JoinHandle<()>,
    ) {
        let socket = bind_receiver("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = socket.local_addr().unwrap();
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = spawn_receiver(socket, tx, cancel.clone());
        (addr, rx, cancel, handle)
    }

    #[tokio::test]
    async fn forwards_decoded_poses_and_skips_garbage() {
        let (addr, mut rx, cancel, handle) = start().await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        client.send_to(b"garbage", addr).await.unwrap();
        let bytes = encode_message(
            "/usercamera/Pose",
            pose_args(&Pose::new(1.0, 2.0, 3.0, 0.0, 90.0, 0.0)),
        )
        .unwrap();
        client.send_to(&bytes, addr).await.unwrap();

        let remote = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(remote.pose, Pose::new(1.0, 2.0, 3.0, 0.0, 90.0, 0.0));
        assert!(rx.try_recv().is_err());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn cancellation_stops_idle_loop() {
        let (_addr, _rx, cancel, handle) = start().await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();
        assert!(matches!(
            bind_receiver(addr).await,
            Err(TransportError::Bind { .. })
        ));
    }
}
