//! Terms driven by the distance between end effector and target.
use super::RewardTerm;
use crate::{
    base::Position, batch::StepBatch, curriculum::StepState, geometry::end_effector_position_l2,
};

/// Bonus given to an environment whose end effector is within the success threshold.
pub const TARGET_REACHED_BONUS: f32 = 300.0;

/// Scale of the exponential distance guidance.
const GUIDANCE_SCALE: f32 = 3.0;

/// Scale and clamp range of the improvement bonus of distance guidance.
const IMPROVEMENT_SCALE: f32 = 100.0;
const IMPROVEMENT_MIN: f32 = -5.0;
const IMPROVEMENT_MAX: f32 = 10.0;

/// `(distance below which the bonus applies, bonus)`, bonuses are cumulative.
const APPROACH_BONUSES: [(f32, f32); 3] = [(0.10, 10.0), (0.05, 20.0), (0.02, 50.0)];

/// [`TARGET_REACHED_BONUS`] where `distance < threshold`, 0 elsewhere.
pub fn target_reached_bonus(distances: &[f32], threshold: f32) -> Vec<f32> {
    distances
        .iter()
        .map(|&d| if d < threshold { TARGET_REACHED_BONUS } else { 0.0 })
        .collect()
}

/// Ids of environments with `distance < threshold`, in increasing order.
pub fn reached_env_ids(distances: &[f32], threshold: f32) -> Vec<usize> {
    distances
        .iter()
        .enumerate()
        .filter(|(_, d)| **d < threshold)
        .map(|(i, _)| i)
        .collect()
}

/// `exp(-3 d)` plus the clamped improvement over the previous step.
///
/// Without a previous step only the exponential term is returned.
pub fn distance_guidance_reward(distances: &[f32], prev_distance: Option<&[f32]>) -> Vec<f32> {
    let guidance = distances.iter().map(|d| (-d * GUIDANCE_SCALE).exp());
    match prev_distance {
        None => guidance.collect(),
        Some(prev) => guidance
            .zip(distances.iter().zip(prev.iter()))
            .map(|(g, (d, p))| {
                g + ((p - d) * IMPROVEMENT_SCALE).clamp(IMPROVEMENT_MIN, IMPROVEMENT_MAX)
            })
            .collect(),
    }
}

/// Stacked flat bonuses for being within 10cm, 5cm and 2cm of the target.
pub fn approach_progress_reward(distances: &[f32]) -> Vec<f32> {
    distances
        .iter()
        .map(|&d| {
            APPROACH_BONUSES
                .iter()
                .filter(|(th, _)| d < *th)
                .map(|(_, b)| b)
                .sum::<f32>()
        })
        .collect()
}

/// Success bonus under the curriculum threshold.
///
/// This term only scores. Moving the reached targets is done by the caller
/// with [`relocate_targets`](crate::events::relocate_targets) on
/// [`reached_env_ids`].
#[derive(Debug, Default)]
pub struct TargetReachedBonus;

impl RewardTerm for TargetReachedBonus {
    fn name(&self) -> &str {
        "target_reached"
    }

    fn compute(&self, batch: &StepBatch, state: &StepState) -> Vec<f32> {
        target_reached_bonus(&batch.distances, state.threshold)
    }
}

/// Dense guidance toward the target with a bonus for moving closer.
#[derive(Debug, Default)]
pub struct DistanceGuidance;

impl RewardTerm for DistanceGuidance {
    fn name(&self) -> &str {
        "distance_guidance"
    }

    fn compute(&self, batch: &StepBatch, state: &StepState) -> Vec<f32> {
        distance_guidance_reward(&batch.distances, state.prev_distance.as_deref())
    }
}

/// See [`approach_progress_reward`].
#[derive(Debug, Default)]
pub struct ApproachProgress;

impl RewardTerm for ApproachProgress {
    fn name(&self) -> &str {
        "approach_progress"
    }

    fn compute(&self, batch: &StepBatch, _state: &StepState) -> Vec<f32> {
        approach_progress_reward(&batch.distances)
    }
}

/// Raw distance to the target marker. Give it a negative weight.
#[derive(Debug, Default)]
pub struct EndEffectorPositionToMarker;

impl RewardTerm for EndEffectorPositionToMarker {
    fn name(&self) -> &str {
        "end_effector_position"
    }

    fn compute(&self, batch: &StepBatch, _state: &StepState) -> Vec<f32> {
        batch.distances.clone()
    }
}

/// Distance to a fixed point instead of the marker.
#[derive(Debug)]
pub struct EndEffectorPositionL2 {
    target: Position,
}

impl EndEffectorPositionL2 {
    /// Constructs the term with a fixed target.
    pub fn new(target: Position) -> Self {
        Self { target }
    }
}

impl RewardTerm for EndEffectorPositionL2 {
    fn name(&self) -> &str {
        "end_effector_position_l2"
    }

    fn compute(&self, batch: &StepBatch, _state: &StepState) -> Vec<f32> {
        end_effector_position_l2(&batch.end_effector, &self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-4, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_target_reached_bonus_under_schedule() {
        let schedule = crate::curriculum::CurriculumSchedule::default();
        let d = [0.07, 0.045, 0.025, 0.015, 0.5];
        let cases: [(u64, [f32; 5]); 5] = [
            (0, [300.0, 300.0, 300.0, 300.0, 0.0]),
            (19_999, [300.0, 300.0, 300.0, 300.0, 0.0]),
            (20_000, [0.0, 300.0, 300.0, 300.0, 0.0]),
            (59_999, [0.0, 0.0, 300.0, 300.0, 0.0]),
            (60_000, [0.0, 0.0, 0.0, 300.0, 0.0]),
        ];
        for (step, expected) in cases {
            assert_eq!(target_reached_bonus(&d, schedule.threshold(step)), expected.to_vec());
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(target_reached_bonus(&[0.08], 0.08), vec![0.0]);
        assert!(reached_env_ids(&[0.08], 0.08).is_empty());
    }

    #[test]
    fn test_reached_env_ids() {
        assert_eq!(reached_env_ids(&[0.01, 0.5, 0.02, 0.09], 0.08), vec![0, 2]);
    }

    #[test]
    fn test_approach_progress() {
        assert_eq!(approach_progress_reward(&[0.01, 0.07, 0.15]), vec![80.0, 10.0, 0.0]);
        assert_eq!(approach_progress_reward(&[0.03]), vec![30.0]);
        assert_eq!(approach_progress_reward(&[0.10, 0.05, 0.02]), vec![0.0, 10.0, 30.0]);
    }

    #[test]
    fn test_distance_guidance_first_call() {
        let r = distance_guidance_reward(&[0.5, 0.0], None);
        assert_close(&r, &[(-1.5f32).exp(), 1.0]);
    }

    #[test]
    fn test_distance_guidance_improvement_bonus() {
        let prev = [0.5, 0.3];
        let r = distance_guidance_reward(&[0.4, 0.3], Some(&prev[..]));
        assert_close(&r, &[(-1.2f32).exp() + 10.0, (-0.9f32).exp()]);
    }

    #[test]
    fn test_distance_guidance_clamps() {
        let prev = [0.1, 1.0];
        let r = distance_guidance_reward(&[1.0, 0.0], Some(&prev[..]));
        assert_close(&r, &[(-3.0f32).exp() - 5.0, 1.0 + 10.0]);
    }
}
