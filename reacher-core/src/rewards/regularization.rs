//! Constant and joint-space terms.
use super::RewardTerm;
use crate::{batch::StepBatch, curriculum::StepState};
use std::f32::consts::PI;

/// 1 for environments not terminated by a failure predicate, 0 otherwise.
pub fn is_alive(terminated: &[bool]) -> Vec<f32> {
    terminated.iter().map(|&t| if t { 0.0 } else { 1.0 }).collect()
}

/// 1 for environments terminated by a failure predicate, 0 otherwise.
pub fn is_terminated(terminated: &[bool]) -> Vec<f32> {
    terminated.iter().map(|&t| if t { 1.0 } else { 0.0 }).collect()
}

/// Wraps an angle to `(-pi, pi]`.
pub fn wrap_to_pi(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI);
    if wrapped == 0.0 && angle > 0.0 {
        PI
    } else {
        wrapped - PI
    }
}

fn selected<'a>(
    row: &'a [f32],
    joint_ids: Option<&'a [usize]>,
) -> Box<dyn Iterator<Item = f32> + 'a> {
    match joint_ids {
        None => Box::new(row.iter().copied()),
        Some(ids) => Box::new(ids.iter().filter_map(move |&j| row.get(j).copied())),
    }
}

/// Sum of absolute joint velocities over `joint_ids`, all joints if `None`.
pub fn joint_vel_l1(joint_vel: &[Vec<f32>], joint_ids: Option<&[usize]>) -> Vec<f32> {
    joint_vel
        .iter()
        .map(|qd| selected(qd, joint_ids).map(f32::abs).sum())
        .collect()
}

/// Sum of squared deviations of wrapped joint positions from `target`.
pub fn joint_pos_target_l2(
    joint_pos: &[Vec<f32>],
    target: f32,
    joint_ids: Option<&[usize]>,
) -> Vec<f32> {
    joint_pos
        .iter()
        .map(|q| {
            selected(q, joint_ids)
                .map(|x| (wrap_to_pi(x) - target).powi(2))
                .sum()
        })
        .collect()
}

/// See [`is_alive`].
#[derive(Debug, Default)]
pub struct Alive;

impl RewardTerm for Alive {
    fn name(&self) -> &str {
        "alive"
    }

    fn compute(&self, batch: &StepBatch, _state: &StepState) -> Vec<f32> {
        is_alive(&batch.terminated)
    }
}

/// See [`is_terminated`].
#[derive(Debug, Default)]
pub struct Terminating;

impl RewardTerm for Terminating {
    fn name(&self) -> &str {
        "terminating"
    }

    fn compute(&self, batch: &StepBatch, _state: &StepState) -> Vec<f32> {
        is_terminated(&batch.terminated)
    }
}

/// See [`joint_vel_l1`]. The name is given so that several instances can
/// be registered with different weights.
#[derive(Debug)]
pub struct JointVelL1 {
    name: String,
    joint_ids: Option<Vec<usize>>,
}

impl JointVelL1 {
    /// Constructs the term.
    pub fn new(name: impl Into<String>, joint_ids: Option<Vec<usize>>) -> Self {
        Self {
            name: name.into(),
            joint_ids,
        }
    }
}

impl RewardTerm for JointVelL1 {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, batch: &StepBatch, _state: &StepState) -> Vec<f32> {
        joint_vel_l1(&batch.joint_vel, self.joint_ids.as_deref())
    }
}

/// See [`joint_pos_target_l2`].
#[derive(Debug)]
pub struct JointPosTargetL2 {
    target: f32,
    joint_ids: Option<Vec<usize>>,
}

impl JointPosTargetL2 {
    /// Constructs the term.
    pub fn new(target: f32, joint_ids: Option<Vec<usize>>) -> Self {
        Self { target, joint_ids }
    }
}

impl RewardTerm for JointPosTargetL2 {
    fn name(&self) -> &str {
        "joint_pos_target"
    }

    fn compute(&self, batch: &StepBatch, _state: &StepState) -> Vec<f32> {
        joint_pos_target_l2(&batch.joint_pos, self.target, self.joint_ids.as_deref())
    }
}
