#![deny(clippy::unwrap_used)]
pub mod math;
pub mod net;
pub mod pose;
pub mod services;
pub mod stream;
pub mod testing;

use std::{net::Ipv4Addr, time::Duration};
use tracing_subscriber::EnvFilter;

/// default simulator host
pub const DEFAULT_HOST: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// default port of the simulator's socket services
pub const DEFAULT_SERVICE_PORT: u16 = 4000;

/// stream published by the robot's pose sensor
pub const POSE_STREAM: &str = "Pose";

/// stream consumed by the robot's teleport actuator
pub const TELEPORT_STREAM: &str = "Motion_Controller";

/// time given to the simulator to apply a teleport before sampling the pose
pub const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// absolute tolerance used when comparing poses
pub const DEFAULT_PRECISION: f64 = 0.15;

/// number of yaw/pitch/roll rounds in the teleport scenario
pub const DEFAULT_ROUNDS: usize = 5;

/// how long a stream read may block before giving up
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// directives used when `RUST_LOG` isn't set
pub const DEFAULT_LOG_DIRECTIVES: &str = "morse_teleport=info";

fn log_filter(env_directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder().parse_lossy(env_directives.unwrap_or(DEFAULT_LOG_DIRECTIVES))
}

/// Installs the global `tracing` subscriber, `RUST_LOG` replaces the default directives.
pub fn init_logging() {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(env_directives.as_deref()))
        .init();
}
