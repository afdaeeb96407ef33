use std::io;

pub mod tcp_transceiver;

#[derive(Debug)]
pub enum CreationError {
    SocketConnectError(io::Error),
    SocketNoDelayError(io::Error),
}

#[derive(Debug)]
pub enum ReceiveError {
    SocketReceiveError(io::Error),
    DecodeError(serde_json::Error),
    /// the peer closed the connection
    ConnectionClosed,
}

#[derive(Debug)]
pub enum SendError {
    SocketSendError(io::Error),
    EncodeError(serde_json::Error),
}
