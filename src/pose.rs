use crate::math::angle_difference;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position (meters) and orientation (radians) of a robot in the simulation.
#[derive(Deserialize, Serialize, PartialEq, Clone, Copy, Debug, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PoseField {
    X,
    Y,
    Z,
    Yaw,
    Pitch,
    Roll,
}

impl PoseField {
    /// order in which fields are checked: orientation first, then position
    pub const CHECK_ORDER: [PoseField; 6] = [
        PoseField::Yaw,
        PoseField::Pitch,
        PoseField::Roll,
        PoseField::X,
        PoseField::Y,
        PoseField::Z,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PoseField::X => "x",
            PoseField::Y => "y",
            PoseField::Z => "z",
            PoseField::Yaw => "yaw",
            PoseField::Pitch => "pitch",
            PoseField::Roll => "roll",
        }
    }

    pub fn is_angle(&self) -> bool {
        matches!(self, PoseField::Yaw | PoseField::Pitch | PoseField::Roll)
    }
}

impl fmt::Display for PoseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How two values of the same field are compared.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Comparison {
    /// plain `|observed - expected|`
    #[default]
    Absolute,
    /// angles are folded into [-pi, pi] before taking the absolute value
    WrapAngles,
}

/// One field that's outside of the tolerance.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FieldMismatch {
    pub field: PoseField,
    pub expected: f64,
    pub observed: f64,
    pub delta: f64,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {:.4}, observed {:.4} (|delta| = {:.4})",
            self.field, self.expected, self.observed, self.delta
        )
    }
}

impl Pose {
    pub fn new(x: f64, y: f64, z: f64, yaw: f64, pitch: f64, roll: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw,
            pitch,
            roll,
        }
    }

    pub fn get(&self, field: PoseField) -> f64 {
        match field {
            PoseField::X => self.x,
            PoseField::Y => self.y,
            PoseField::Z => self.z,
            PoseField::Yaw => self.yaw,
            PoseField::Pitch => self.pitch,
            PoseField::Roll => self.roll,
        }
    }

    pub fn is_finite(&self) -> bool {
        PoseField::CHECK_ORDER
            .iter()
            .all(|field| self.get(*field).is_finite())
    }

    /// Returns every field of `observed` further than `precision` from `expected`.
    /// An empty vec means the poses match.
    pub fn mismatches(
        expected: &Pose,
        observed: &Pose,
        precision: f64,
        comparison: Comparison,
    ) -> Vec<FieldMismatch> {
        PoseField::CHECK_ORDER
            .iter()
            .filter_map(|&field| {
                let expected = expected.get(field);
                let observed = observed.get(field);
                let delta = match comparison {
                    Comparison::WrapAngles if field.is_angle() => {
                        angle_difference(observed, expected).abs()
                    }
                    _ => (observed - expected).abs(),
                };
                // NaN deltas fail the comparison too
                if delta <= precision {
                    None
                } else {
                    Some(FieldMismatch {
                        field,
                        expected,
                        observed,
                        delta,
                    })
                }
            })
            .collect()
    }

    pub fn approx_eq(&self, other: &Pose, precision: f64) -> bool {
        Pose::mismatches(self, other, precision, Comparison::Absolute).is_empty()
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(x: {:.3}, y: {:.3}, z: {:.3}, yaw: {:.3}, pitch: {:.3}, roll: {:.3})",
            self.x, self.y, self.z, self.yaw, self.pitch, self.roll
        )
    }
}
