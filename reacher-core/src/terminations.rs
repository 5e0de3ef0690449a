//! Termination predicates.
use crate::error::{check_len, ReacherError};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// A set of joints sharing a position bound.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct JointGroup {
    /// Name used in logs and records.
    pub name: String,

    /// Column indices into the joint rows.
    pub joint_ids: Vec<usize>,

    /// Lower bound in radians.
    pub lo: f32,

    /// Upper bound in radians.
    pub hi: f32,
}

impl JointGroup {
    /// `joint_2` to `joint_7`, bounded by `±3π`.
    pub fn main_joints() -> Self {
        Self {
            name: "main_joints".to_string(),
            joint_ids: (1..=6).collect(),
            lo: -3.0 * PI,
            hi: 3.0 * PI,
        }
    }

    /// `joint_1` and `joint_8`, bounded by `[-π, 3π]`.
    pub fn end_joints() -> Self {
        Self {
            name: "end_joints".to_string(),
            joint_ids: vec![0, 7],
            lo: -PI,
            hi: 3.0 * PI,
        }
    }

    /// Returns `true` if `q` is strictly outside the bound.
    #[inline]
    pub fn violates(&self, q: f32) -> bool {
        q < self.lo || q > self.hi
    }

    /// See [`out_of_bounds`].
    pub fn out_of_bounds(&self, joint_pos: &[Vec<f32>]) -> Vec<bool> {
        out_of_bounds(joint_pos, &self.joint_ids, (self.lo, self.hi))
    }
}

/// `true` for environments where any listed joint is `< lo` or `> hi`.
///
/// Joint ids beyond the length of a row are skipped.
pub fn out_of_bounds(joint_pos: &[Vec<f32>], joint_ids: &[usize], bounds: (f32, f32)) -> Vec<bool> {
    let (lo, hi) = bounds;
    joint_pos
        .iter()
        .map(|q| {
            joint_ids
                .iter()
                .filter_map(|&j| q.get(j))
                .any(|&x| x < lo || x > hi)
        })
        .collect()
}

/// `true` for environments whose episode reached `max_episode_steps`.
pub fn time_out(episode_steps: &[u64], max_episode_steps: u64) -> Vec<bool> {
    episode_steps.iter().map(|&s| s >= max_episode_steps).collect()
}

/// Number of policy steps in an episode of `episode_length_s` seconds.
pub fn max_episode_steps(episode_length_s: f32, dt: f32, decimation: u32) -> u64 {
    let step_dt = dt as f64 * decimation as f64;
    (episode_length_s as f64 / step_dt).ceil() as u64
}

/// Flags of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminations {
    /// Failure terminations, the environment left its joint bounds.
    pub terminated: Vec<bool>,

    /// Truncations by the episode length.
    pub time_outs: Vec<bool>,

    /// `terminated | time_outs`.
    pub dones: Vec<bool>,
}

impl Terminations {
    /// Ids of done environments.
    pub fn done_env_ids(&self) -> Vec<usize> {
        self.dones
            .iter()
            .enumerate()
            .filter_map(|(i, &d)| if d { Some(i) } else { None })
            .collect()
    }
}

/// Joint bound groups and the episode time limit.
#[derive(Debug, Clone)]
pub struct TerminationManager {
    groups: Vec<JointGroup>,
    max_episode_steps: u64,
}

impl TerminationManager {
    /// Constructs the manager.
    pub fn new(groups: Vec<JointGroup>, max_episode_steps: u64) -> Self {
        Self {
            groups,
            max_episode_steps,
        }
    }

    /// The joint groups.
    pub fn groups(&self) -> &[JointGroup] {
        &self.groups
    }

    /// The episode length in steps.
    pub fn max_episode_steps(&self) -> u64 {
        self.max_episode_steps
    }

    /// Evaluates every predicate for the batch.
    pub fn compute(
        &self,
        joint_pos: &[Vec<f32>],
        episode_steps: &[u64],
    ) -> Result<Terminations, ReacherError> {
        let n = joint_pos.len();
        check_len("episode steps", n, episode_steps.len())?;

        let mut terminated = vec![false; n];
        for group in self.groups.iter() {
            for (t, o) in terminated.iter_mut().zip(group.out_of_bounds(joint_pos)) {
                *t |= o;
            }
        }
        let time_outs = time_out(episode_steps, self.max_episode_steps);
        let dones = terminated
            .iter()
            .zip(time_outs.iter())
            .map(|(&t, &o)| t || o)
            .collect();

        Ok(Terminations {
            terminated,
            time_outs,
            dones,
        })
    }
}
