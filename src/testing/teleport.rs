use crate::{
    net::{tcp_transceiver::TcpTransceiver, CreationError, SendError},
    pose::Pose,
    services::{ServiceClient, ServiceError},
};
use std::net::IpAddr;
use tracing::debug;

/// Client of the robot's teleport actuator stream.
pub struct TeleportController {
    socket: TcpTransceiver,
}

#[derive(Debug)]
pub enum TeleportError {
    PortLookupError(ServiceError),
    ConnectionError(CreationError),
    TeleportRequestError(SendError),
}

impl TeleportController {
    /// Resolves the actuator's stream port through the simulator services, then connects to it.
    pub async fn open(
        services: &mut ServiceClient,
        ip: IpAddr,
        stream: &str,
    ) -> Result<Self, TeleportError> {
        let port = services
            .get_stream_port(stream)
            .await
            .map_err(TeleportError::PortLookupError)?;
        Self::connect(ip, port).await
    }

    pub async fn connect(ip: IpAddr, port: u16) -> Result<Self, TeleportError> {
        Ok(Self {
            socket: TcpTransceiver::connect(ip, port)
                .await
                .map_err(TeleportError::ConnectionError)?,
        })
    }

    /// Sends `pose` as a `{x, y, z, yaw, pitch, roll}` object.
    pub async fn send_pose(&mut self, pose: &Pose) -> Result<(), TeleportError> {
        debug!("teleporting to {}", pose);
        self.socket
            .send(pose)
            .await
            .map(|_| ())
            .map_err(TeleportError::TeleportRequestError)
    }

    pub async fn tp(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        yaw: f64,
        pitch: f64,
        roll: f64,
    ) -> Result<(), TeleportError> {
        self.send_pose(&Pose::new(x, y, z, yaw, pitch, roll)).await
    }
}
