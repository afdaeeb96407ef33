//! Teleport round trip check.
//!
//! Reads the robot's starting pose, then teleports it to random poses, each
//! rotating around a single axis, and checks that the pose sensor reports
//! every commanded pose within the configured precision.

use super::teleport::{TeleportController, TeleportError};
use crate::{
    pose::{Comparison, FieldMismatch, Pose},
    services::{ServiceClient, ServiceError},
    stream::{PoseStream, StreamError},
    DEFAULT_HOST, DEFAULT_PRECISION, DEFAULT_ROUNDS, DEFAULT_SERVICE_PORT, POSE_STREAM,
    READ_TIMEOUT, SETTLE_DELAY, TELEPORT_STREAM,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    f64::consts::PI,
    fmt,
    net::IpAddr,
    ops::RangeInclusive,
    str::FromStr,
    time::Duration,
};
use tracing::{debug, info, warn};

const XY_RANGE: RangeInclusive<f64> = -30.0..=30.0;
const Z_RANGE: RangeInclusive<f64> = 10.0..=50.0;
const ANGLE_RANGE: RangeInclusive<f64> = -PI..=PI;

/// Where the robot sits when the simulation starts.
pub const INITIAL_POSE: Pose = Pose {
    x: 10.,
    y: 8.,
    z: 20.,
    yaw: 0.,
    pitch: 0.,
    roll: 0.,
};

#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub host: IpAddr,
    pub service_port: u16,
    pub pose_stream: String,
    pub teleport_stream: String,
    pub precision: f64,
    pub settle_delay: Duration,
    pub rounds: usize,
    /// `None` waits forever for each pose sample
    pub read_timeout: Option<Duration>,
    pub initial_pose: Pose,
    pub comparison: Comparison,
    pub rng_seed: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            service_port: DEFAULT_SERVICE_PORT,
            pose_stream: POSE_STREAM.to_owned(),
            teleport_stream: TELEPORT_STREAM.to_owned(),
            precision: DEFAULT_PRECISION,
            settle_delay: SETTLE_DELAY,
            rounds: DEFAULT_ROUNDS,
            read_timeout: Some(READ_TIMEOUT),
            initial_pose: INITIAL_POSE,
            comparison: Comparison::Absolute,
            rng_seed: None,
        }
    }
}

impl ScenarioConfig {
    /// Defaults overridden by `MORSE_HOST`, `MORSE_SERVICE_PORT`, `TELEPORT_PRECISION`,
    /// `TELEPORT_ROUNDS` and `TELEPORT_SEED`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: parse_var(&var, "MORSE_HOST").unwrap_or(defaults.host),
            service_port: parse_var(&var, "MORSE_SERVICE_PORT").unwrap_or(defaults.service_port),
            precision: parse_var(&var, "TELEPORT_PRECISION").unwrap_or(defaults.precision),
            rounds: parse_var(&var, "TELEPORT_ROUNDS").unwrap_or(defaults.rounds),
            rng_seed: parse_var(&var, "TELEPORT_SEED").or(defaults.rng_seed),
            ..defaults
        }
    }
}

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}

/// The only non zero rotation of a generated pose.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RotationAxis {
    Yaw,
    Pitch,
    Roll,
}

impl RotationAxis {
    pub const ALL: [RotationAxis; 3] = [
        RotationAxis::Yaw,
        RotationAxis::Pitch,
        RotationAxis::Roll,
    ];
}

/// Random position with a rotation around `axis` only. Checking one rotation
/// at a time keeps the expected euler angles unambiguous.
pub fn random_pose<R: Rng>(rng: &mut R, axis: RotationAxis) -> Pose {
    let x = rng.gen_range(XY_RANGE);
    let y = rng.gen_range(XY_RANGE);
    let z = rng.gen_range(Z_RANGE);
    let angle = rng.gen_range(ANGLE_RANGE);
    match axis {
        RotationAxis::Yaw => Pose::new(x, y, z, angle, 0., 0.),
        RotationAxis::Pitch => Pose::new(x, y, z, 0., angle, 0.),
        RotationAxis::Roll => Pose::new(x, y, z, 0., 0., angle),
    }
}

/// `rounds` times yaw, pitch then roll.
pub fn planned_poses<R: Rng>(rng: &mut R, rounds: usize) -> Vec<Pose> {
    (0..rounds)
        .flat_map(|_| RotationAxis::ALL)
        .map(|axis| random_pose(rng, axis))
        .collect()
}

/// One compared pose.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PoseCheck {
    pub expected: Pose,
    pub observed: Pose,
}

#[derive(Clone, Debug, Default)]
pub struct ScenarioReport {
    pub checks: Vec<PoseCheck>,
}

impl ScenarioReport {
    /// Largest absolute error over every checked field.
    pub fn max_delta(&self, comparison: Comparison) -> f64 {
        self.checks
            .iter()
            .flat_map(|check| Pose::mismatches(&check.expected, &check.observed, 0., comparison))
            .map(|m| m.delta)
            .fold(0., f64::max)
    }
}

#[derive(Debug)]
pub enum ScenarioError {
    ServiceError(ServiceError),
    StreamError(StreamError),
    TeleportError(TeleportError),
    PoseMismatch {
        /// 0 is the initial pose, then one step per teleport
        step: usize,
        expected: Pose,
        observed: Pose,
        mismatches: Vec<FieldMismatch>,
    },
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::ServiceError(e) => write!(f, "service error: {}", e),
            ScenarioError::StreamError(e) => write!(f, "pose stream error: {:?}", e),
            ScenarioError::TeleportError(e) => write!(f, "teleport error: {:?}", e),
            ScenarioError::PoseMismatch {
                step,
                expected,
                observed,
                mismatches,
            } => {
                writeln!(f, "pose mismatch at step {}", step)?;
                writeln!(f, "  expected {}", expected)?;
                write!(f, "  observed {}", observed)?;
                for m in mismatches {
                    write!(f, "\n  {}", m)?;
                }
                Ok(())
            }
        }
    }
}

pub struct TeleportScenario {
    config: ScenarioConfig,
    rng: StdRng,
}

impl TeleportScenario {
    pub fn new(config: ScenarioConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub async fn run(&mut self) -> Result<ScenarioReport, ScenarioError> {
        let host = self.config.host;
        let mut services = ServiceClient::connect(host, self.config.service_port)
            .await
            .map_err(ScenarioError::ServiceError)?;
        let mut pose_stream = PoseStream::open(&mut services, host, &self.config.pose_stream)
            .await
            .map_err(ScenarioError::StreamError)?;
        let mut teleport =
            TeleportController::open(&mut services, host, &self.config.teleport_stream)
                .await
                .map_err(ScenarioError::TeleportError)?;

        let mut report = ScenarioReport::default();

        let observed = self.read_pose(&mut pose_stream).await?;
        report
            .checks
            .push(self.check(0, self.config.initial_pose, observed)?);
        info!("initial pose ok: {}", observed);

        let poses = planned_poses(&mut self.rng, self.config.rounds);
        for (i, pose) in poses.into_iter().enumerate() {
            let check = self
                .test_one_pose(&mut teleport, &mut pose_stream, i + 1, pose)
                .await?;
            report.checks.push(check);
        }

        info!(
            "{} poses checked, max error {:.4}",
            report.checks.len(),
            report.max_delta(self.config.comparison)
        );
        Ok(report)
    }

    /// Teleports to `pose`, lets the simulation settle and checks the reported pose.
    pub async fn test_one_pose(
        &self,
        teleport: &mut TeleportController,
        pose_stream: &mut PoseStream,
        step: usize,
        pose: Pose,
    ) -> Result<PoseCheck, ScenarioError> {
        teleport
            .send_pose(&pose)
            .await
            .map_err(ScenarioError::TeleportError)?;
        tokio::time::sleep(self.config.settle_delay).await;

        let observed = self.read_pose(pose_stream).await?;
        let check = self.check(step, pose, observed)?;
        debug!("step {} ok: {}", step, observed);
        Ok(check)
    }

    async fn read_pose(&self, pose_stream: &mut PoseStream) -> Result<Pose, ScenarioError> {
        let pose = match self.config.read_timeout {
            Some(timeout) => pose_stream.get_timeout(timeout).await,
            None => pose_stream.get().await,
        };
        pose.map_err(ScenarioError::StreamError)
    }

    fn check(
        &self,
        step: usize,
        expected: Pose,
        observed: Pose,
    ) -> Result<PoseCheck, ScenarioError> {
        let mismatches = Pose::mismatches(
            &expected,
            &observed,
            self.config.precision,
            self.config.comparison,
        );
        if mismatches.is_empty() {
            Ok(PoseCheck { expected, observed })
        } else {
            Err(ScenarioError::PoseMismatch {
                step,
                expected,
                observed,
                mismatches,
            })
        }
    }
}
