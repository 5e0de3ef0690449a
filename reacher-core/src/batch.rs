//! Quantities of one simulation step, gathered once for all reward terms.
use crate::{
    base::{Position, Scene},
    error::{check_len, ReacherError},
    geometry::{end_effector_distance, end_effector_positions, BodyFallback},
};

/// Per-environment quantities of one step.
///
/// All vectors have one entry per environment, ordered by index.
#[derive(Debug, Clone, PartialEq)]
pub struct StepBatch {
    /// End-effector world positions.
    pub end_effector: Vec<Position>,

    /// Target marker world positions.
    pub targets: Vec<Position>,

    /// Distance between end effector and target.
    pub distances: Vec<f32>,

    /// Joint positions, one row per environment.
    pub joint_pos: Vec<Vec<f32>>,

    /// Joint velocities, one row per environment.
    pub joint_vel: Vec<Vec<f32>>,

    /// Environments terminated by a failure predicate in this step.
    /// Time-outs are not included.
    pub terminated: Vec<bool>,
}

impl StepBatch {
    /// Builds a batch from raw quantities, checking that every part has the same length.
    pub fn from_parts(
        end_effector: Vec<Position>,
        targets: Vec<Position>,
        joint_pos: Vec<Vec<f32>>,
        joint_vel: Vec<Vec<f32>>,
    ) -> Result<Self, ReacherError> {
        let n = end_effector.len();
        let distances = end_effector_distance(&end_effector, &targets)?;
        check_len("joint positions", n, joint_pos.len())?;
        check_len("joint velocities", n, joint_vel.len())?;
        Ok(Self {
            end_effector,
            targets,
            distances,
            joint_pos,
            joint_vel,
            terminated: vec![false; n],
        })
    }

    /// Reads the batch of the current step from the scene.
    pub fn gather<S: Scene + ?Sized>(
        scene: &S,
        body_name: &str,
        fallback: BodyFallback,
    ) -> Result<Self, ReacherError> {
        let n = scene.num_envs();
        let end_effector = end_effector_positions(scene, body_name, fallback)?;
        let targets = scene.target_positions();
        check_len("target positions", n, targets.len())?;
        Self::from_parts(
            end_effector,
            targets,
            scene.joint_positions(),
            scene.joint_velocities(),
        )
    }

    /// A batch with only positions, joints empty.
    pub fn from_positions(
        end_effector: Vec<Position>,
        targets: Vec<Position>,
    ) -> Result<Self, ReacherError> {
        let n = end_effector.len();
        Self::from_parts(end_effector, targets, vec![vec![]; n], vec![vec![]; n])
    }

    /// The number of environments.
    pub fn num_envs(&self) -> usize {
        self.distances.len()
    }

    /// Sets the failure flags computed by the termination predicates.
    pub fn set_terminated(&mut self, terminated: Vec<bool>) -> Result<(), ReacherError> {
        check_len("termination flags", self.num_envs(), terminated.len())?;
        self.terminated = terminated;
        Ok(())
    }
}
