//! Data stream subscription.
//!
//! A `DataStream` owns a reader task that decodes every line published by a
//! simulator component and keeps the most recent sample around.
//!
//! # Examples
//!
//! ```no_run
//! use morse_teleport::{
//!     services::ServiceClient,
//!     stream::PoseStream,
//!     DEFAULT_HOST, DEFAULT_SERVICE_PORT, POSE_STREAM,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut services = ServiceClient::connect(DEFAULT_HOST, DEFAULT_SERVICE_PORT)
//!         .await
//!         .expect("couldn't reach the simulator");
//!     let mut pose_stream = PoseStream::open(&mut services, DEFAULT_HOST.into(), POSE_STREAM)
//!         .await
//!         .expect("couldn't open the pose stream");
//!     let pose = pose_stream.get().await.expect("the pose stream closed");
//!     println!("{}", pose);
//! }
//! ```

use crate::{
    net::{tcp_transceiver::TcpTransceiver, CreationError, ReceiveError},
    pose::Pose,
    services::{ServiceClient, ServiceError},
};
use serde::de::DeserializeOwned;
use std::{fmt::Debug, net::IpAddr, time::Duration};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

pub type PoseStream = DataStream<Pose>;

#[derive(Debug)]
pub enum StreamError {
    PortLookupError(ServiceError),
    ConnectionError(CreationError),
    /// the reader task stopped, no more samples will come
    Closed,
    Timeout(Duration),
}

pub struct DataStream<T> {
    name: String,
    receiver: watch::Receiver<Option<T>>,
    reader_handle: JoinHandle<()>,
}

impl<T> DataStream<T>
where
    T: DeserializeOwned + Clone + Debug + Send + Sync + 'static,
{
    /// Resolves the port of `name` through the simulator services, then subscribes to it.
    pub async fn open(
        services: &mut ServiceClient,
        ip: IpAddr,
        name: &str,
    ) -> Result<Self, StreamError> {
        let port = services
            .get_stream_port(name)
            .await
            .map_err(StreamError::PortLookupError)?;
        Self::connect(ip, port, name).await
    }

    pub async fn connect(ip: IpAddr, port: u16, name: &str) -> Result<Self, StreamError> {
        let socket = TcpTransceiver::connect(ip, port)
            .await
            .map_err(StreamError::ConnectionError)?;
        info!("subscribed to stream {} on port {}", name, port);

        let (sender, receiver) = watch::channel(None);
        let mut reader = socket.into_reader();
        let stream_name = name.to_owned();
        let reader_handle = tokio::spawn(async move {
            loop {
                match reader.receive::<T>().await {
                    Ok(sample) => {
                        sender.send_replace(Some(sample));
                    }
                    Err(ReceiveError::ConnectionClosed) => {
                        info!("stream {} closed by the simulator", stream_name);
                        break;
                    }
                    Err(ReceiveError::DecodeError(e)) => {
                        // one bad line doesn't kill the stream
                        warn!("couldn't decode sample on stream {}: {}", stream_name, e);
                    }
                    Err(e) => {
                        warn!("stream {} failed: {:?}", stream_name, e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            name: name.to_owned(),
            receiver,
            reader_handle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for a sample newer than the one returned by the previous `get`.
    pub async fn get(&mut self) -> Result<T, StreamError> {
        loop {
            self.receiver
                .changed()
                .await
                .map_err(|_| StreamError::Closed)?;
            if let Some(sample) = self.receiver.borrow_and_update().clone() {
                debug!("{}: {:?}", self.name, sample);
                return Ok(sample);
            }
        }
    }

    pub async fn get_timeout(&mut self, timeout: Duration) -> Result<T, StreamError> {
        tokio::time::timeout(timeout, self.get())
            .await
            .map_err(|_| StreamError::Timeout(timeout))?
    }

    /// Latest received sample, if any, without waiting.
    pub fn last(&self) -> Option<T> {
        self.receiver.borrow().clone()
    }

    /// True once the reader task dropped its end of the channel.
    pub fn is_closed(&self) -> bool {
        self.receiver.has_changed().is_err()
    }
}

impl<T> Drop for DataStream<T> {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}
