//! Curriculum schedule and process-wide training progress.
//!
//! [`ProgressTracker`] owns every piece of state that survives across steps
//! of one training run. It is advanced exactly once per step by
//! [`ProgressTracker::advance`], which returns an immutable [`StepState`].
//! Reward terms only read the [`StepState`], so they all see the same
//! previous-step snapshot and can be evaluated any number of times.
use crate::{
    base::Position,
    batch::StepBatch,
    error::{check_len, ReacherError},
    ring_buffer::RingBuffer,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One stage of the success threshold schedule.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct CurriculumStage {
    /// The stage applies while the curriculum step is below this value.
    pub until_step: u64,

    /// Success distance in meters.
    pub threshold: f32,
}

/// Success threshold as a function of the curriculum step.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CurriculumSchedule {
    /// Stages ordered by `until_step`.
    pub stages: Vec<CurriculumStage>,

    /// Threshold after the last stage.
    pub final_threshold: f32,
}

impl Default for CurriculumSchedule {
    fn default() -> Self {
        Self {
            stages: vec![
                CurriculumStage {
                    until_step: 20_000,
                    threshold: 0.08,
                },
                CurriculumStage {
                    until_step: 40_000,
                    threshold: 0.05,
                },
                CurriculumStage {
                    until_step: 60_000,
                    threshold: 0.03,
                },
            ],
            final_threshold: 0.02,
        }
    }
}

impl CurriculumSchedule {
    /// The success threshold at `step`.
    pub fn threshold(&self, step: u64) -> f32 {
        self.stages
            .iter()
            .find(|s| step < s.until_step)
            .map_or(self.final_threshold, |s| s.threshold)
    }
}

/// Parameters of the rolling histories.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ProgressConfig {
    /// Steps between two end-effector snapshots.
    pub exploration_interval: u64,

    /// Maximum number of end-effector snapshots.
    pub exploration_capacity: usize,

    /// Number of the newest snapshots compared against.
    pub exploration_window: usize,

    /// Maximum number of distance batches.
    pub distance_history_capacity: usize,

    /// Improvement in meters below which a step counts as stagnant.
    pub min_improvement: f32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            exploration_interval: 100,
            exploration_capacity: 50,
            exploration_window: 10,
            distance_history_capacity: 100,
            min_improvement: 0.001,
        }
    }
}

impl ProgressConfig {
    /// Checks that the interval and the history capacities are positive.
    pub fn validate(&self) -> Result<(), ReacherError> {
        let positive = [
            ("exploration_interval", self.exploration_interval as usize),
            ("exploration_capacity", self.exploration_capacity),
            ("distance_history_capacity", self.distance_history_capacity),
        ];
        for (name, v) in positive {
            if v == 0 {
                return Err(ReacherError::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if !self.min_improvement.is_finite() {
            return Err(ReacherError::InvalidConfig(format!(
                "min_improvement must be finite, got {}",
                self.min_improvement
            )));
        }
        Ok(())
    }
}

/// Read-only view of the progress state for one step.
#[derive(Debug, Clone)]
pub struct StepState {
    /// Curriculum step, 0 on the first step of the run.
    pub step: u64,

    /// Success threshold at [`StepState::step`].
    pub threshold: f32,

    /// Distances of the previous step, `None` on the first step.
    pub prev_distance: Option<Vec<f32>>,

    /// Stagnation counters after this step's update, `None` while no
    /// distance history exists.
    pub stagnation: Option<Vec<u32>>,

    /// The newest end-effector snapshots, oldest first.
    pub exploration: Vec<Arc<Vec<Position>>>,

    /// The number of snapshots held by the tracker.
    pub exploration_len: usize,
}

impl StepState {
    /// State of the first step of a run, with no history.
    pub fn initial(threshold: f32) -> Self {
        Self {
            step: 0,
            threshold,
            prev_distance: None,
            stagnation: None,
            exploration: vec![],
            exploration_len: 0,
        }
    }
}

/// Advances a stagnation counter given the improvement of one step.
#[inline]
pub fn next_stagnation(counter: u32, improvement: f32, min_improvement: f32) -> u32 {
    if improvement < min_improvement {
        counter.saturating_add(1)
    } else {
        0
    }
}

/// Progress state of a training run.
#[derive(Debug)]
pub struct ProgressTracker {
    config: ProgressConfig,
    schedule: CurriculumSchedule,
    step: Option<u64>,
    prev_distance: Option<Vec<f32>>,
    stagnation: Vec<u32>,
    exploration_step: u64,
    exploration_history: RingBuffer<Arc<Vec<Position>>>,
    distance_history: RingBuffer<Vec<f32>>,
}

impl ProgressTracker {
    /// Constructs a tracker with empty histories.
    ///
    /// Fails if `config` does not pass [`ProgressConfig::validate`].
    pub fn new(
        config: ProgressConfig,
        schedule: CurriculumSchedule,
    ) -> Result<Self, ReacherError> {
        config.validate()?;
        let exploration_history = RingBuffer::new(config.exploration_capacity);
        let distance_history = RingBuffer::new(config.distance_history_capacity);
        Ok(Self {
            config,
            schedule,
            step: None,
            prev_distance: None,
            stagnation: vec![],
            exploration_step: 0,
            exploration_history,
            distance_history,
        })
    }

    /// The curriculum step of the last advance, `None` before the first one.
    pub fn step(&self) -> Option<u64> {
        self.step
    }

    /// The schedule.
    pub fn schedule(&self) -> &CurriculumSchedule {
        &self.schedule
    }

    /// Current stagnation counters.
    pub fn stagnation(&self) -> &[u32] {
        &self.stagnation
    }

    /// The end-effector snapshot history.
    pub fn exploration_history(&self) -> &RingBuffer<Arc<Vec<Position>>> {
        &self.exploration_history
    }

    /// The distance history.
    pub fn distance_history(&self) -> &RingBuffer<Vec<f32>> {
        &self.distance_history
    }

    /// Records the batch of a new step and returns the state reward terms read.
    ///
    /// The batch size must stay the same for the whole run.
    pub fn advance(&mut self, batch: &StepBatch) -> Result<StepState, ReacherError> {
        let n = batch.num_envs();
        if let Some(prev) = &self.prev_distance {
            check_len("distances", prev.len(), n)?;
        }

        let step = self.step.map_or(0, |s| s + 1);
        let prev_distance = self.prev_distance.take();

        let stagnation = match self.distance_history.last() {
            Some(last) => {
                if self.stagnation.len() != n {
                    self.stagnation = vec![0; n];
                }
                let min_improvement = self.config.min_improvement;
                for ((c, l), d) in self
                    .stagnation
                    .iter_mut()
                    .zip(last.iter())
                    .zip(batch.distances.iter())
                {
                    *c = next_stagnation(*c, l - d, min_improvement);
                }
                Some(self.stagnation.clone())
            }
            None => None,
        };

        self.exploration_step += 1;
        if self.exploration_step % self.config.exploration_interval == 0 {
            self.exploration_history
                .push(Arc::new(batch.end_effector.clone()));
        }
        let exploration = self
            .exploration_history
            .recent(self.config.exploration_window)
            .cloned()
            .collect();

        self.distance_history.push(batch.distances.clone());
        self.prev_distance = Some(batch.distances.clone());
        self.step = Some(step);

        Ok(StepState {
            step,
            threshold: self.schedule.threshold(step),
            prev_distance,
            stagnation,
            exploration,
            exploration_len: self.exploration_history.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(d: &[f32]) -> StepBatch {
        let ee = vec![[0.0; 3]; d.len()];
        let tg = d.iter().map(|&x| [x, 0.0, 0.0]).collect();
        StepBatch::from_positions(ee, tg).unwrap()
    }

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(ProgressConfig::default(), CurriculumSchedule::default()).unwrap()
    }

    #[test]
    fn test_threshold_schedule() {
        let s = CurriculumSchedule::default();
        assert_eq!(s.threshold(0), 0.08);
        assert_eq!(s.threshold(19_999), 0.08);
        assert_eq!(s.threshold(20_000), 0.05);
        assert_eq!(s.threshold(39_999), 0.05);
        assert_eq!(s.threshold(40_000), 0.03);
        assert_eq!(s.threshold(59_999), 0.03);
        assert_eq!(s.threshold(60_000), 0.02);
        assert_eq!(s.threshold(u64::MAX), 0.02);
    }

    #[test]
    fn test_step_counter_starts_at_zero() {
        let mut t = tracker();
        assert_eq!(t.step(), None);
        assert_eq!(t.advance(&batch(&[0.5])).unwrap().step, 0);
        assert_eq!(t.advance(&batch(&[0.5])).unwrap().step, 1);
        assert_eq!(t.step(), Some(1));
    }

    #[test]
    fn test_prev_distance_snapshot() {
        let mut t = tracker();
        let s0 = t.advance(&batch(&[0.5, 0.3])).unwrap();
        assert!(s0.prev_distance.is_none());
        assert!(s0.stagnation.is_none());
        let s1 = t.advance(&batch(&[0.4, 0.3])).unwrap();
        assert_eq!(s1.prev_distance, Some(vec![0.5, 0.3]));
        assert_eq!(s1.stagnation, Some(vec![0, 1]));
    }

    #[test]
    fn test_stagnation_counter_resets_on_improvement() {
        let mut t = tracker();
        t.advance(&batch(&[0.5])).unwrap();
        for k in 1..=10 {
            let s = t.advance(&batch(&[0.5])).unwrap();
            assert_eq!(s.stagnation, Some(vec![k]));
        }
        let s = t.advance(&batch(&[0.49])).unwrap();
        assert_eq!(s.stagnation, Some(vec![0]));
        assert_eq!(t.stagnation(), &[0]);
    }

    #[test]
    fn test_histories_are_bounded() {
        let mut t = tracker();
        for _ in 0..6000 {
            t.advance(&batch(&[0.5, 0.5])).unwrap();
        }
        assert_eq!(t.distance_history().len(), 100);
        assert_eq!(t.exploration_history().len(), 50);
    }

    #[test]
    fn test_exploration_snapshot_every_interval() {
        let mut t = tracker();
        for _ in 0..99 {
            let s = t.advance(&batch(&[0.5])).unwrap();
            assert_eq!(s.exploration_len, 0);
        }
        let s = t.advance(&batch(&[0.5])).unwrap();
        assert_eq!(s.exploration_len, 1);
        assert_eq!(s.exploration.len(), 1);
        for _ in 0..1100 {
            t.advance(&batch(&[0.5])).unwrap();
        }
        let s = t.advance(&batch(&[0.5])).unwrap();
        assert_eq!(s.exploration_len, 12);
        assert_eq!(s.exploration.len(), 10);
    }

    #[test]
    fn test_batch_size_change_is_an_error() {
        let mut t = tracker();
        t.advance(&batch(&[0.5, 0.5])).unwrap();
        assert!(matches!(
            t.advance(&batch(&[0.5])),
            Err(ReacherError::BatchSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let config = ProgressConfig {
            exploration_interval: 0,
            ..Default::default()
        };
        assert!(matches!(
            ProgressTracker::new(config, CurriculumSchedule::default()),
            Err(ReacherError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_capacities_are_rejected() {
        let config = ProgressConfig {
            exploration_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ProgressTracker::new(config, CurriculumSchedule::default()).is_err());

        let config = ProgressConfig {
            distance_history_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ProgressTracker::new(config, CurriculumSchedule::default()).is_err());
    }

    #[test]
    fn test_zero_window_is_allowed() {
        let config = ProgressConfig {
            exploration_window: 0,
            exploration_interval: 1,
            ..Default::default()
        };
        let mut t = ProgressTracker::new(config, CurriculumSchedule::default()).unwrap();
        let s = t.advance(&batch(&[0.5])).unwrap();
        assert_eq!(s.exploration_len, 1);
        assert!(s.exploration.is_empty());
    }

    #[test]
    fn test_non_finite_min_improvement_is_rejected() {
        let config = ProgressConfig {
            min_improvement: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ReacherError::InvalidConfig(_))));
    }

    #[test]
    fn test_saturating_counter() {
        assert_eq!(next_stagnation(u32::MAX, 0.0, 0.001), u32::MAX);
        assert_eq!(next_stagnation(3, 0.001, 0.001), 0);
        assert_eq!(next_stagnation(3, 0.000_999, 0.001), 4);
    }
}
