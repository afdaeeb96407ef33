//! In-process stand-in for a Morse simulation exposing a pose sensor and a
//! teleport actuator on socket streams.

use morse_teleport::pose::Pose;
use serde_json::Value;
use std::{net::Ipv4Addr, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::watch,
    task::JoinHandle,
};

pub const POSE_PUBLISH_PERIOD: Duration = Duration::from_millis(10);

/// Offset the fake actuator adds to every teleport, to emulate a broken simulator.
#[derive(Clone, Copy, Default)]
pub struct Distortion {
    pub z_offset: f64,
}

pub struct FakeSimulator {
    pub service_port: u16,
    pub pose_port: u16,
    pub teleport_port: u16,
    pose: watch::Receiver<Pose>,
    tasks: Vec<JoinHandle<()>>,
}

async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("couldn't bind fake simulator listener");
    let port = listener.local_addr().expect("bound listener").port();
    (listener, port)
}

impl FakeSimulator {
    pub async fn start(initial_pose: Pose, distortion: Distortion) -> Self {
        let (pose_sender, pose) = watch::channel(initial_pose);
        let (service_listener, service_port) = bind().await;
        let (pose_listener, pose_port) = bind().await;
        let (teleport_listener, teleport_port) = bind().await;

        let streams = vec![
            ("Pose".to_owned(), pose_port),
            ("Motion_Controller".to_owned(), teleport_port),
        ];
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(async move {
            while let Ok((socket, _)) = service_listener.accept().await {
                tokio::spawn(serve_services(socket, streams.clone()));
            }
        }));

        let pose_receiver = pose.clone();
        tasks.push(tokio::spawn(async move {
            while let Ok((socket, _)) = pose_listener.accept().await {
                tokio::spawn(publish_poses(socket, pose_receiver.clone()));
            }
        }));

        tasks.push(tokio::spawn(async move {
            while let Ok((socket, _)) = teleport_listener.accept().await {
                let mut lines = BufReader::new(socket).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Ok(mut target) = serde_json::from_str::<Pose>(&line) {
                        target.z += distortion.z_offset;
                        pose_sender.send_replace(target);
                    }
                }
            }
        }));

        Self {
            service_port,
            pose_port,
            teleport_port,
            pose,
            tasks,
        }
    }

    pub fn current_pose(&self) -> Pose {
        *self.pose.borrow()
    }
}

impl Drop for FakeSimulator {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn serve_services(socket: TcpStream, streams: Vec<(String, u16)>) {
    let (read_half, mut write_half) = socket.into_split();
    let mut lines = BufReader::new(read_half).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.splitn(4, ' ');
        let id = parts.next().unwrap_or_default();
        let component = parts.next().unwrap_or_default();
        let service = parts.next().unwrap_or_default();
        let args: Vec<Value> = parts
            .next()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        let response = match (component, service) {
            ("simulation", "get_stream_port") => {
                let name = args.first().and_then(Value::as_str).unwrap_or_default();
                match streams.iter().find(|(stream, _)| stream == name) {
                    Some((_, port)) => format!("{} SUCCESS {}", id, port),
                    None => format!("{} FAILED unknown stream {}", id, name),
                }
            }
            ("simulation", "list_streams") => {
                let names: Vec<&str> = streams.iter().map(|(name, _)| name.as_str()).collect();
                format!("{} SUCCESS {}", id, Value::from(names))
            }
            ("simulation", "reset_objects") => format!("{} SUCCESS", id),
            // the simulation goes away without answering
            ("simulation", "quit") => break,
            _ => format!("{} FAILED unknown service {}.{}", id, component, service),
        };
        if write_half
            .write_all(format!("{}\n", response).as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }
}

async fn publish_poses(mut socket: TcpStream, pose: watch::Receiver<Pose>) {
    let mut interval = tokio::time::interval(POSE_PUBLISH_PERIOD);
    let mut timestamp = 0.;
    loop {
        interval.tick().await;
        timestamp += POSE_PUBLISH_PERIOD.as_secs_f64();
        let mut sample = serde_json::to_value(*pose.borrow()).expect("pose should serialize");
        sample["timestamp"] = Value::from(timestamp);
        let line = format!("{}\n", sample);
        if socket.write_all(line.as_bytes()).await.is_err() {
            break;
        }
    }
}
