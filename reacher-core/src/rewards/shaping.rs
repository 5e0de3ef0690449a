//! Terms against idle policies: movement, exploration and stagnation.
use super::RewardTerm;
use crate::{
    base::Position,
    batch::StepBatch,
    curriculum::StepState,
    geometry::{distance, norm},
};
use std::sync::Arc;

/// Joint speed, in rad/s, rewarded the most.
const OPTIMAL_VELOCITY: f32 = 2.0;
const MOVEMENT_SCALE: f32 = 0.5;
const MOVEMENT_MAX: f32 = 2.0;

const EXPLORATION_SCALE: f32 = 2.0;
const EXPLORATION_MAX: f32 = 5.0;

const STAGNATION_SCALE: f32 = 50.0;
const STAGNATION_MIN: f32 = -2.0;
const STAGNATION_MAX: f32 = 5.0;
/// Stagnant steps tolerated before the log penalty starts.
const STAGNATION_PATIENCE: u32 = 500;

/// Rewards a joint speed near 2 rad/s, plus any movement up to a cap.
///
/// With `v` the L2 norm of the joint velocities of an environment, the value
/// is `exp(-|v - 2| / 2) + clamp(0.5 v, 0, 2)`.
pub fn joint_velocity_reward(joint_vel: &[Vec<f32>]) -> Vec<f32> {
    joint_vel
        .iter()
        .map(|qd| {
            let v = norm(qd);
            (-(v - OPTIMAL_VELOCITY).abs() / OPTIMAL_VELOCITY).exp()
                + (v * MOVEMENT_SCALE).clamp(0.0, MOVEMENT_MAX)
        })
        .collect()
}

/// Mean clamped distance between the current end effector and past snapshots.
///
/// `recent` holds the newest snapshots. Returns zeros while the history
/// (`history_len` snapshots in total) holds at most one snapshot.
pub fn exploration_reward(
    end_effector: &[Position],
    recent: &[Arc<Vec<Position>>],
    history_len: usize,
) -> Vec<f32> {
    let mut reward = vec![0.0; end_effector.len()];
    if history_len <= 1 || recent.is_empty() {
        return reward;
    }
    for snapshot in recent.iter() {
        for ((r, p), h) in reward.iter_mut().zip(end_effector.iter()).zip(snapshot.iter()) {
            *r += (distance(p, h) * EXPLORATION_SCALE).clamp(0.0, EXPLORATION_MAX);
        }
    }
    let n = recent.len() as f32;
    reward.iter_mut().for_each(|r| *r /= n);
    reward
}

/// Clamped recent improvement minus a log penalty for long stagnation.
///
/// `last_distance` is the distance of the previous step and `counters` the
/// stagnation counters after this step's update. Without history the
/// reward is zero.
pub fn anti_stagnation_reward(
    distances: &[f32],
    last_distance: Option<&[f32]>,
    counters: Option<&[u32]>,
) -> Vec<f32> {
    let (last, counters) = match (last_distance, counters) {
        (Some(l), Some(c)) => (l, c),
        _ => return vec![0.0; distances.len()],
    };
    distances
        .iter()
        .zip(last.iter())
        .zip(counters.iter())
        .map(|((d, l), &c)| {
            let bonus = ((l - d) * STAGNATION_SCALE).clamp(STAGNATION_MIN, STAGNATION_MAX);
            let penalty = if c > STAGNATION_PATIENCE {
                -(c as f32 / STAGNATION_PATIENCE as f32).ln()
            } else {
                0.0
            };
            bonus + penalty
        })
        .collect()
}

/// See [`joint_velocity_reward`].
#[derive(Debug, Default)]
pub struct JointVelocityReward;

impl RewardTerm for JointVelocityReward {
    fn name(&self) -> &str {
        "joint_velocity_reward"
    }

    fn compute(&self, batch: &StepBatch, _state: &StepState) -> Vec<f32> {
        joint_velocity_reward(&batch.joint_vel)
    }
}

/// See [`exploration_reward`].
#[derive(Debug, Default)]
pub struct ExplorationReward;

impl RewardTerm for ExplorationReward {
    fn name(&self) -> &str {
        "exploration_bonus"
    }

    fn compute(&self, batch: &StepBatch, state: &StepState) -> Vec<f32> {
        exploration_reward(&batch.end_effector, &state.exploration, state.exploration_len)
    }
}

/// See [`anti_stagnation_reward`].
#[derive(Debug, Default)]
pub struct AntiStagnationReward;

impl RewardTerm for AntiStagnationReward {
    fn name(&self) -> &str {
        "anti_stagnation"
    }

    fn compute(&self, batch: &StepBatch, state: &StepState) -> Vec<f32> {
        anti_stagnation_reward(
            &batch.distances,
            state.prev_distance.as_deref(),
            state.stagnation.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_velocity_reward() {
        // |v| = 2 exactly: exp(0) + clamp(1, 0, 2)
        let r = joint_velocity_reward(&[vec![2.0, 0.0], vec![0.0, 0.0], vec![6.0, 8.0]]);
        assert!((r[0] - 2.0).abs() < 1e-6);
        assert!((r[1] - (-1.0f32).exp()).abs() < 1e-6);
        assert!((r[2] - ((-4.0f32).exp() + 2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_exploration_needs_two_snapshots() {
        let ee = vec![[1.0, 0.0, 0.0]];
        let one = vec![Arc::new(vec![[0.0, 0.0, 0.0]])];
        assert_eq!(exploration_reward(&ee, &one, 1), vec![0.0]);
        assert_eq!(exploration_reward(&ee, &[], 0), vec![0.0]);
    }

    #[test]
    fn test_exploration_average_and_clamp() {
        let ee = vec![[1.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let snaps = vec![
            Arc::new(vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]),
            Arc::new(vec![[1.0, 0.0, 0.0], [0.0, 0.0, 0.0]]),
        ];
        let r = exploration_reward(&ee, &snaps, 2);
        // env 0: (clamp(2) + clamp(0)) / 2, env 1: (clamp(20) + 0) / 2
        assert_eq!(r, vec![1.0, 2.5]);
    }

    #[test]
    fn test_anti_stagnation_first_step() {
        assert_eq!(anti_stagnation_reward(&[0.3, 0.2], None, None), vec![0.0, 0.0]);
    }

    #[test]
    fn test_anti_stagnation_penalty_after_patience() {
        let last = [0.3, 0.3];
        let r = anti_stagnation_reward(&[0.3, 0.3], Some(&last[..]), Some(&[500, 501][..]));
        assert_eq!(r[0], 0.0);
        assert!(r[1] < 0.0);
        assert!((r[1] + (501.0f32 / 500.0).ln()).abs() < 1e-6);
    }

    #[test]
    fn test_anti_stagnation_improvement_bonus() {
        let last = [0.3, 0.3, 0.3];
        let r = anti_stagnation_reward(&[0.29, 0.0, 0.5], Some(&last[..]), Some(&[0, 0, 1][..]));
        assert!((r[0] - 0.5).abs() < 1e-4);
        assert_eq!(r[1], 5.0);
        assert_eq!(r[2], -2.0);
    }
}
