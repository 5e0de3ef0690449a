//! Reward terms and their weighted sum.
//!
//! Every term maps the [`StepBatch`] of a step and the [`StepState`] of the
//! progress tracker to one value per environment. Terms never mutate shared
//! state; the tracker is advanced once per step before any term runs.
mod manager;
mod reach;
mod regularization;
mod shaping;
pub use manager::{RewardManager, RewardOutput};
pub use reach::{
    approach_progress_reward, distance_guidance_reward, reached_env_ids, target_reached_bonus,
    ApproachProgress, DistanceGuidance, EndEffectorPositionL2, EndEffectorPositionToMarker,
    TargetReachedBonus, TARGET_REACHED_BONUS,
};
pub use regularization::{
    is_alive, is_terminated, joint_pos_target_l2, joint_vel_l1, wrap_to_pi, Alive,
    JointPosTargetL2, JointVelL1, Terminating,
};
pub use shaping::{
    anti_stagnation_reward, exploration_reward, joint_velocity_reward, AntiStagnationReward,
    ExplorationReward, JointVelocityReward,
};

pub use crate::config::RewardWeights;

use crate::{batch::StepBatch, curriculum::StepState, record::Record};

/// A named reward term evaluated over the whole batch.
pub trait RewardTerm {
    /// Name of the term, used as its key in records and weight overrides.
    fn name(&self) -> &str;

    /// Returns one value per environment.
    fn compute(&self, batch: &StepBatch, state: &StepState) -> Vec<f32>;

    /// Diagnostic report of the step, if the term produces one.
    #[allow(unused_variables)]
    fn report(&self, batch: &StepBatch, state: &StepState) -> Option<Record> {
        None
    }
}
