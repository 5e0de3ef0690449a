//! Uniform pose sampling for the target marker.
use crate::{base::Position, error::ReacherError};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A closed interval `[lo, hi]` on one axis.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct AxisRange {
    /// Lower bound.
    pub lo: f32,

    /// Upper bound.
    pub hi: f32,
}

impl AxisRange {
    /// Constructs a range, rejecting `lo > hi` and non-finite bounds.
    pub fn new(lo: f32, hi: f32) -> Result<Self, ReacherError> {
        let range = Self { lo, hi };
        range.validate()?;
        Ok(range)
    }

    /// A degenerate range holding a single value.
    pub const fn fixed(v: f32) -> Self {
        Self { lo: v, hi: v }
    }

    /// Returns `true` if `v` lies in `[lo, hi]`.
    pub fn contains(&self, v: f32) -> bool {
        self.lo <= v && v <= self.hi
    }

    fn validate(&self) -> Result<(), ReacherError> {
        if self.lo.is_finite() && self.hi.is_finite() && self.lo <= self.hi {
            Ok(())
        } else {
            Err(ReacherError::InvalidRange {
                lo: self.lo,
                hi: self.hi,
            })
        }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        rng.gen_range(self.lo..=self.hi)
    }
}

/// Per-axis ranges of the sampled pose.
///
/// Positions are relative to the origin of each environment; rotations are
/// Euler angles in radians.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PoseRange {
    /// Range of x.
    pub x: AxisRange,

    /// Range of y.
    pub y: AxisRange,

    /// Range of z.
    pub z: AxisRange,

    /// Range of the rotation about x.
    pub roll: AxisRange,

    /// Range of the rotation about y.
    pub pitch: AxisRange,

    /// Range of the rotation about z.
    pub yaw: AxisRange,
}

impl Default for PoseRange {
    fn default() -> Self {
        Self {
            x: AxisRange { lo: -0.3, hi: 0.3 },
            y: AxisRange { lo: -0.3, hi: 0.3 },
            z: AxisRange { lo: 0.1, hi: 0.3 },
            roll: AxisRange::fixed(0.0),
            pitch: AxisRange::fixed(0.0),
            yaw: AxisRange::fixed(0.0),
        }
    }
}

impl PoseRange {
    fn axes(&self) -> [&AxisRange; 6] {
        [
            &self.x,
            &self.y,
            &self.z,
            &self.roll,
            &self.pitch,
            &self.yaw,
        ]
    }

    /// Checks every axis.
    pub fn validate(&self) -> Result<(), ReacherError> {
        self.axes().iter().try_for_each(|r| r.validate())
    }

    /// Returns `true` if the position lies inside the x, y and z ranges.
    pub fn contains(&self, p: &Position) -> bool {
        self.x.contains(p[0]) && self.y.contains(p[1]) && self.z.contains(p[2])
    }
}

/// Ranges of the linear and angular velocity given to a sampled pose.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct VelocityRange {
    /// Linear velocity ranges.
    pub linear: [AxisRange; 3],

    /// Angular velocity ranges.
    pub angular: [AxisRange; 3],
}

impl Default for VelocityRange {
    fn default() -> Self {
        Self {
            linear: [AxisRange::fixed(0.0); 3],
            angular: [AxisRange::fixed(0.0); 3],
        }
    }
}

impl VelocityRange {
    fn validate(&self) -> Result<(), ReacherError> {
        self.linear
            .iter()
            .chain(self.angular.iter())
            .try_for_each(|r| r.validate())
    }
}

/// Root state of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Position.
    pub position: Position,

    /// Orientation as a quaternion in `[w, x, y, z]` order.
    pub orientation: [f32; 4],

    /// Linear velocity.
    pub linear_velocity: [f32; 3],

    /// Angular velocity.
    pub angular_velocity: [f32; 3],
}

impl Pose {
    /// A pose at `position` with identity orientation and zero velocity.
    pub fn at(position: Position) -> Self {
        Self {
            position,
            orientation: crate::base::IDENTITY_QUAT,
            linear_velocity: [0.0; 3],
            angular_velocity: [0.0; 3],
        }
    }
}

/// Quaternion `[w, x, y, z]` of the intrinsic x-y-z Euler rotation.
pub fn quat_from_euler_xyz(roll: f32, pitch: f32, yaw: f32) -> [f32; 4] {
    let (sr, cr) = (roll * 0.5).sin_cos();
    let (sp, cp) = (pitch * 0.5).sin_cos();
    let (sy, cy) = (yaw * 0.5).sin_cos();
    [
        cr * cp * cy + sr * sp * sy,
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
    ]
}

/// Draws target poses uniformly from a [`PoseRange`].
pub struct PoseSampler {
    range: PoseRange,
    velocity: VelocityRange,
    rng: StdRng,
}

impl PoseSampler {
    /// Constructs a sampler with a seeded random number generator.
    pub fn new(range: PoseRange, velocity: VelocityRange, seed: u64) -> Result<Self, ReacherError> {
        range.validate()?;
        velocity.validate()?;
        Ok(Self {
            range,
            velocity,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// The configured pose range.
    pub fn range(&self) -> &PoseRange {
        &self.range
    }

    /// Samples one pose.
    pub fn sample_pose(&mut self) -> Pose {
        let rng = &mut self.rng;
        let position = [
            self.range.x.sample(rng),
            self.range.y.sample(rng),
            self.range.z.sample(rng),
        ];
        let orientation = quat_from_euler_xyz(
            self.range.roll.sample(rng),
            self.range.pitch.sample(rng),
            self.range.yaw.sample(rng),
        );
        let mut linear_velocity = [0.0; 3];
        let mut angular_velocity = [0.0; 3];
        for (v, r) in linear_velocity.iter_mut().zip(self.velocity.linear.iter()) {
            *v = r.sample(rng);
        }
        for (v, r) in angular_velocity.iter_mut().zip(self.velocity.angular.iter()) {
            *v = r.sample(rng);
        }
        Pose {
            position,
            orientation,
            linear_velocity,
            angular_velocity,
        }
    }

    /// Samples `n` independent poses.
    pub fn sample_poses(&mut self, n: usize) -> Vec<Pose> {
        (0..n).map(|_| self.sample_pose()).collect()
    }
}
