use super::{CreationError, ReceiveError, SendError};
use serde::{de::DeserializeOwned, Serialize};
use std::net::{IpAddr, SocketAddr};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};

/// A TCP connection exchanging newline delimited JSON documents.
pub struct TcpTransceiver {
    reader: LineReader,
    writer: OwnedWriteHalf,
}

/// Read side of a `TcpTransceiver`, decoding one JSON document per line.
pub struct LineReader {
    reader: BufReader<OwnedReadHalf>,
    line: String,
}

impl TcpTransceiver {
    pub async fn connect(ip: impl Into<IpAddr>, port: u16) -> Result<Self, CreationError> {
        let stream = TcpStream::connect(SocketAddr::new(ip.into(), port))
            .await
            .map_err(CreationError::SocketConnectError)?;
        // commands are tiny, don't let Nagle hold them back
        stream
            .set_nodelay(true)
            .map_err(CreationError::SocketNoDelayError)?;
        let (read_half, writer) = stream.into_split();

        Ok(Self {
            reader: LineReader::new(read_half),
            writer,
        })
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.writer.peer_addr().ok()
    }

    /// Writes `packet` as a single line of JSON.
    pub async fn send<T: Serialize>(&mut self, packet: &T) -> Result<usize, SendError> {
        let mut buf = serde_json::to_vec(packet).map_err(SendError::EncodeError)?;
        buf.push(b'\n');
        self.writer
            .write_all(&buf)
            .await
            .map_err(SendError::SocketSendError)?;
        Ok(buf.len())
    }

    /// Writes an already encoded line, appending the terminator if missing.
    pub async fn send_line(&mut self, line: &str) -> Result<usize, SendError> {
        let mut buf = line.as_bytes().to_vec();
        if !line.ends_with('\n') {
            buf.push(b'\n');
        }
        self.writer
            .write_all(&buf)
            .await
            .map_err(SendError::SocketSendError)?;
        Ok(buf.len())
    }

    pub async fn receive<T: DeserializeOwned>(&mut self) -> Result<T, ReceiveError> {
        self.reader.receive().await
    }

    /// Reads the next raw line, without its terminator.
    pub async fn receive_line(&mut self) -> Result<String, ReceiveError> {
        self.reader.receive_line().await.map(str::to_owned)
    }

    /// Drops the write side and keeps only the reader.
    pub fn into_reader(self) -> LineReader {
        self.reader
    }
}

impl LineReader {
    fn new(read_half: OwnedReadHalf) -> Self {
        Self {
            reader: BufReader::new(read_half),
            line: String::new(),
        }
    }

    pub async fn receive_line(&mut self) -> Result<&str, ReceiveError> {
        loop {
            self.line.clear();
            let read_bytes_count = self
                .reader
                .read_line(&mut self.line)
                .await
                .map_err(ReceiveError::SocketReceiveError)?;
            if read_bytes_count == 0 {
                return Err(ReceiveError::ConnectionClosed);
            }
            if !self.line.trim().is_empty() {
                break;
            }
        }
        Ok(self.line.trim())
    }

    pub async fn receive<T: DeserializeOwned>(&mut self) -> Result<T, ReceiveError> {
        let line = self.receive_line().await?;
        serde_json::from_str(line).map_err(ReceiveError::DecodeError)
    }
}
