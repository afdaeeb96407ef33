//! Client for the simulator's socket services.
//!
//! A request is a single line `<id> <component> <service> <json args>`, the
//! simulator answers with `<id> <status> [<json result>]` where status is one
//! of `SUCCESS`, `FAILED` or `PREEMPTED`.

use crate::net::{tcp_transceiver::TcpTransceiver, CreationError, ReceiveError, SendError};
use serde_json::Value;
use std::{fmt, net::IpAddr};
use tracing::{debug, warn};

const SIMULATION_COMPONENT: &str = "simulation";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ServiceStatus {
    Success,
    Failed,
    Preempted,
}

impl ServiceStatus {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(ServiceStatus::Success),
            "FAILED" => Some(ServiceStatus::Failed),
            "PREEMPTED" => Some(ServiceStatus::Preempted),
            _ => None,
        }
    }
}

/// A decoded service response line.
#[derive(Clone, PartialEq, Debug)]
pub struct ServiceResponse {
    pub id: String,
    pub status: ServiceStatus,
    pub result: Value,
}

#[derive(Debug)]
pub enum ServiceError {
    ConnectionError(CreationError),
    RequestError(SendError),
    ResponseError(ReceiveError),
    MalformedResponse(String),
    Failed {
        component: String,
        service: String,
        message: Value,
    },
    Preempted {
        component: String,
        service: String,
    },
    UnexpectedResult(Value),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::ConnectionError(e) => {
                write!(f, "couldn't connect to the simulator services: {:?}", e)
            }
            ServiceError::RequestError(e) => write!(f, "couldn't send service request: {:?}", e),
            ServiceError::ResponseError(e) => {
                write!(f, "couldn't receive service response: {:?}", e)
            }
            ServiceError::MalformedResponse(line) => write!(f, "malformed response {:?}", line),
            ServiceError::Failed {
                component,
                service,
                message,
            } => write!(f, "{}.{} failed: {}", component, service, message),
            ServiceError::Preempted { component, service } => {
                write!(f, "{}.{} was preempted", component, service)
            }
            ServiceError::UnexpectedResult(v) => write!(f, "unexpected service result {}", v),
        }
    }
}

/// Parses `<id> <status> [<result>]`. A result that isn't valid JSON is kept as a string.
pub fn parse_response(line: &str) -> Result<ServiceResponse, ServiceError> {
    let mut parts = line.trim().splitn(3, ' ');
    let (Some(id), Some(status)) = (parts.next(), parts.next()) else {
        return Err(ServiceError::MalformedResponse(line.to_owned()));
    };
    let status = ServiceStatus::parse(status)
        .ok_or_else(|| ServiceError::MalformedResponse(line.to_owned()))?;
    let result = match parts.next().map(str::trim) {
        None | Some("") => Value::Null,
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned())),
    };
    Ok(ServiceResponse {
        id: id.to_owned(),
        status,
        result,
    })
}

pub struct ServiceClient {
    socket: TcpTransceiver,
    next_request_id: u64,
}

impl ServiceClient {
    pub async fn connect(ip: impl Into<IpAddr>, port: u16) -> Result<Self, ServiceError> {
        let socket = TcpTransceiver::connect(ip, port)
            .await
            .map_err(ServiceError::ConnectionError)?;
        debug!("connected to simulator services at {:?}", socket.peer_addr());
        Ok(Self {
            socket,
            next_request_id: 0,
        })
    }

    fn make_request_id(&mut self) -> String {
        self.next_request_id += 1;
        format!("req{}", self.next_request_id)
    }

    /// Calls `component.service(args)` and waits for its result.
    pub async fn call(
        &mut self,
        component: &str,
        service: &str,
        args: &[Value],
    ) -> Result<Value, ServiceError> {
        let id = self.make_request_id();
        let encoded_args = serde_json::to_string(args)
            .map_err(|e| ServiceError::RequestError(SendError::EncodeError(e)))?;
        let request = format!("{} {} {} {}\n", id, component, service, encoded_args);
        debug!("service request: {}", request.trim_end());
        self.send_raw(&request).await?;

        loop {
            let line = self
                .socket
                .receive_line()
                .await
                .map_err(ServiceError::ResponseError)?;
            let response = parse_response(&line)?;
            if response.id != id {
                warn!("skipping response {} while waiting for {}", response.id, id);
                continue;
            }
            return match response.status {
                ServiceStatus::Success => Ok(response.result),
                ServiceStatus::Failed => Err(ServiceError::Failed {
                    component: component.to_owned(),
                    service: service.to_owned(),
                    message: response.result,
                }),
                ServiceStatus::Preempted => Err(ServiceError::Preempted {
                    component: component.to_owned(),
                    service: service.to_owned(),
                }),
            };
        }
    }

    async fn send_raw(&mut self, request: &str) -> Result<(), ServiceError> {
        self.socket
            .send_line(request)
            .await
            .map(|_| ())
            .map_err(ServiceError::RequestError)
    }

    /// Port on which the simulator exposes the data stream of `stream`.
    pub async fn get_stream_port(&mut self, stream: &str) -> Result<u16, ServiceError> {
        let result = self
            .call(SIMULATION_COMPONENT, "get_stream_port", &[Value::from(stream)])
            .await?;
        result
            .as_u64()
            .and_then(|port| u16::try_from(port).ok())
            .ok_or(ServiceError::UnexpectedResult(result))
    }

    pub async fn list_streams(&mut self) -> Result<Vec<String>, ServiceError> {
        let result = self.call(SIMULATION_COMPONENT, "list_streams", &[]).await?;
        serde_json::from_value(result.clone()).map_err(|_| ServiceError::UnexpectedResult(result))
    }

    pub async fn reset_objects(&mut self) -> Result<(), ServiceError> {
        self.call(SIMULATION_COMPONENT, "reset_objects", &[])
            .await
            .map(|_| ())
    }

    /// Asks the simulator to exit. The simulator may close the socket before answering.
    pub async fn quit(mut self) -> Result<(), ServiceError> {
        match self.call(SIMULATION_COMPONENT, "quit", &[]).await {
            Ok(_) | Err(ServiceError::ResponseError(ReceiveError::ConnectionClosed)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
