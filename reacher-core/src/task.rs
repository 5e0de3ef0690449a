//! One logical step of the reaching task.
use crate::{
    base::Scene,
    batch::StepBatch,
    config::ReacherConfig,
    curriculum::ProgressTracker,
    error::{check_len, ReacherError},
    events::{relocate_targets, TargetInitializer},
    pose::PoseSampler,
    record::{Record, RecordValue, Recorder},
    rewards::{reached_env_ids, RewardManager},
    terminations::TerminationManager,
};
use log::{info, warn};

/// Result of [`ReachTask::step`].
#[derive(Debug, Clone)]
pub struct TaskStep {
    /// Total reward of every environment.
    pub reward: Vec<f32>,

    /// Failure terminations.
    pub terminated: Vec<bool>,

    /// Time-outs.
    pub truncated: Vec<bool>,

    /// Environments that reached their target. Their targets have been
    /// relocated unless [`TaskStep::relocation_error`] is set.
    pub reached: Vec<usize>,

    /// Error of the scene while writing the relocated targets.
    pub relocation_error: Option<ReacherError>,

    /// Reward statistics and curriculum state of the step.
    pub record: Record,

    /// Monitor reports of the step.
    pub reports: Vec<Record>,
}

impl TaskStep {
    /// Writes the record and the reports to `recorder`.
    pub fn write_to(&self, recorder: &mut impl Recorder) {
        recorder.write(self.record.clone());
        for r in self.reports.iter() {
            recorder.write(r.clone());
        }
    }
}

/// Rewards, terminations and target events of the reaching task.
///
/// The task owns every piece of state that outlives a step: the pose
/// sampler, the one-shot initializer, the progress tracker and the episode
/// step counters. The scene is borrowed per call.
pub struct ReachTask {
    config: ReacherConfig,
    sampler: PoseSampler,
    initializer: TargetInitializer,
    tracker: ProgressTracker,
    rewards: RewardManager,
    terminations: TerminationManager,
    episode_steps: Vec<u64>,
}

impl ReachTask {
    /// Builds the task from a configuration.
    pub fn new(config: ReacherConfig) -> Result<Self, ReacherError> {
        let sampler = PoseSampler::new(
            config.target_range.clone(),
            config.target_velocity.clone(),
            config.seed,
        )?;
        let tracker = ProgressTracker::new(config.progress.clone(), config.curriculum.clone())?;
        let rewards = RewardManager::from_config(&config);
        let terminations =
            TerminationManager::new(config.terminations.groups(), config.max_episode_steps());
        let episode_steps = vec![0; config.num_envs];
        info!(
            "Reach task with {} environments, {} steps per episode",
            config.num_envs,
            terminations.max_episode_steps()
        );

        Ok(Self {
            config,
            sampler,
            initializer: TargetInitializer::new(),
            tracker,
            rewards,
            terminations,
            episode_steps,
        })
    }

    /// The configuration.
    pub fn config(&self) -> &ReacherConfig {
        &self.config
    }

    /// The progress tracker.
    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// The reward manager.
    pub fn rewards_mut(&mut self) -> &mut RewardManager {
        &mut self.rewards
    }

    /// Episode step counters.
    pub fn episode_steps(&self) -> &[u64] {
        &self.episode_steps
    }

    /// Resets the episodes of `env_ids`.
    ///
    /// Targets are placed on the first reset of the run only. Returns `true`
    /// if this call placed them.
    pub fn reset<S: Scene + ?Sized>(
        &mut self,
        scene: &mut S,
        env_ids: &[usize],
    ) -> Result<bool, ReacherError> {
        check_len("environments", self.episode_steps.len(), scene.num_envs())?;
        for &i in env_ids {
            if let Some(s) = self.episode_steps.get_mut(i) {
                *s = 0;
            }
        }
        self.initializer
            .initialize_once(scene, &mut self.sampler, env_ids)
    }

    /// Runs one step after the host has advanced the simulation.
    ///
    /// Nothing is mutated if the scene cannot be read. A failure to write the
    /// relocated targets does not fail the step; it is returned in
    /// [`TaskStep::relocation_error`].
    pub fn step<S: Scene + ?Sized>(&mut self, scene: &mut S) -> Result<TaskStep, ReacherError> {
        check_len("environments", self.episode_steps.len(), scene.num_envs())?;

        let mut batch =
            StepBatch::gather(&*scene, &self.config.body_name, self.config.body_fallback)?;
        let episode_steps: Vec<u64> = self.episode_steps.iter().map(|s| s + 1).collect();
        let terminations = self
            .terminations
            .compute(&batch.joint_pos, &episode_steps)?;
        batch.set_terminated(terminations.terminated.clone())?;

        let state = self.tracker.advance(&batch)?;
        let output = self.rewards.compute(&batch, &state)?;

        self.episode_steps = episode_steps;
        for i in terminations.done_env_ids() {
            self.episode_steps[i] = 0;
        }

        let reached = reached_env_ids(&batch.distances, state.threshold);
        let relocation_error = match relocate_targets(scene, &mut self.sampler, &reached) {
            Ok(relocation) => {
                if !relocation.rejected.is_empty() {
                    warn!("Targets not relocated for {:?}", relocation.rejected);
                }
                None
            }
            Err(e) => {
                warn!("Failed to relocate targets of {:?}: {}", reached, e);
                Some(e)
            }
        };

        let n = batch.num_envs() as f32;
        let count = |v: &[bool]| v.iter().filter(|&&b| b).count() as f32;
        let mut record = output.record;
        record.insert("curriculum/step", RecordValue::Scalar(state.step as f32));
        record.insert("curriculum/threshold", RecordValue::Scalar(state.threshold));
        record.insert("task/reached_rate", RecordValue::Scalar(reached.len() as f32 / n));
        record.insert(
            "task/terminated_rate",
            RecordValue::Scalar(count(&terminations.terminated) / n),
        );
        record.insert(
            "task/time_out_rate",
            RecordValue::Scalar(count(&terminations.time_outs) / n),
        );

        Ok(TaskStep {
            reward: output.total,
            terminated: terminations.terminated,
            truncated: terminations.time_outs,
            reached,
            relocation_error,
            record,
            reports: output.reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{base::Position, dummy::DummyScene, pose::Pose, record::BufferedRecorder};
    use std::f32::consts::PI;

    /// A scene whose target markers cannot be written.
    struct FixedTargets(DummyScene);

    impl Scene for FixedTargets {
        fn num_envs(&self) -> usize {
            self.0.num_envs()
        }

        fn body_positions(&self, name: &str) -> Option<Vec<Position>> {
            self.0.body_positions(name)
        }

        fn root_positions(&self) -> Vec<Position> {
            self.0.root_positions()
        }

        fn joint_positions(&self) -> Vec<Vec<f32>> {
            self.0.joint_positions()
        }

        fn joint_velocities(&self) -> Vec<Vec<f32>> {
            self.0.joint_velocities()
        }

        fn target_positions(&self) -> Vec<Position> {
            self.0.target_positions()
        }

        fn set_target_poses(
            &mut self,
            _env_ids: &[usize],
            _poses: &[Pose],
        ) -> Result<(), ReacherError> {
            Err(ReacherError::BodyNotFound("target".to_string()))
        }
    }

    fn task(n: usize) -> ReachTask {
        ReachTask::new(ReacherConfig::default().num_envs(n)).unwrap()
    }

    #[test]
    fn test_scene_size_must_match() {
        let mut t = task(4);
        let mut scene = DummyScene::new(3, 8);
        assert!(t.reset(&mut scene, &[0]).is_err());
        assert!(t.step(&mut scene).is_err());
    }

    #[test]
    fn test_reset_places_targets_once() {
        let mut t = task(2);
        let mut scene = DummyScene::new(2, 8);
        assert_eq!(t.reset(&mut scene, &[0, 1]), Ok(true));
        assert_eq!(t.reset(&mut scene, &[0, 1]), Ok(false));
        assert_eq!(scene.n_target_writes(), 1);
    }

    #[test]
    fn test_time_out_resets_counter() {
        let config = ReacherConfig::default().num_envs(1).episode_length_s(3.0 / 60.0);
        let mut t = ReachTask::new(config).unwrap();
        let mut scene = DummyScene::new(1, 8);
        scene.set_target(0, [1.0, 0.0, 0.0]);
        assert_eq!(t.terminations.max_episode_steps(), 3);

        for _ in 0..2 {
            assert_eq!(t.step(&mut scene).unwrap().truncated, vec![false]);
        }
        let s = t.step(&mut scene).unwrap();
        assert_eq!(s.truncated, vec![true]);
        assert_eq!(s.terminated, vec![false]);
        assert_eq!(t.episode_steps(), &[0]);
    }

    #[test]
    fn test_joint_violation_terminates() {
        let mut t = task(2);
        let mut scene = DummyScene::new(2, 8);
        scene.set_target(0, [1.0, 0.0, 0.0]);
        scene.set_target(1, [1.0, 0.0, 0.0]);
        let mut q = vec![0.0; 8];
        q[4] = 3.0 * PI + 0.1;
        scene.set_joint_positions(1, q);

        let s = t.step(&mut scene).unwrap();
        assert_eq!(s.terminated, vec![false, true]);
        // alive 1 vs terminating -5 plus the same distance terms
        assert!((s.reward[0] - s.reward[1] - 6.0).abs() < 1e-3);
        assert_eq!(t.episode_steps(), &[1, 0]);

        let mut recorder = BufferedRecorder::new();
        s.write_to(&mut recorder);
        assert_eq!(recorder.len(), 1 + s.reports.len());
        assert_eq!(s.record.get_scalar("task/terminated_rate"), Ok(0.5));
    }

    #[test]
    fn test_zero_exploration_interval_is_rejected() {
        let mut config = ReacherConfig::default().num_envs(2);
        config.progress.exploration_interval = 0;
        assert!(matches!(ReachTask::new(config), Err(ReacherError::InvalidConfig(_))));

        let mut config = ReacherConfig::default().num_envs(2);
        config.progress.distance_history_capacity = 0;
        assert!(ReachTask::new(config).is_err());
    }

    #[test]
    fn test_relocation_failure_keeps_rewards() {
        let mut t = task(2);
        let mut scene = FixedTargets(DummyScene::new(2, 8));
        scene.0.set_target(0, [0.01, 0.0, 0.0]);
        scene.0.set_target(1, [1.0, 0.0, 0.0]);

        let s = t.step(&mut scene).unwrap();
        assert_eq!(s.reached, vec![0]);
        assert!(matches!(s.relocation_error, Some(ReacherError::BodyNotFound(_))));
        assert!(s.reward[0] - s.reward[1] > 20.0 * 300.0);
        assert_eq!(t.tracker().step(), Some(0));
        assert_eq!(t.episode_steps(), &[1, 1]);
        assert_eq!(scene.0.target(0).position, [0.01, 0.0, 0.0]);

        // the target stays reached and the step is not counted twice
        let s = t.step(&mut scene).unwrap();
        assert_eq!(s.reached, vec![0]);
        assert_eq!(t.tracker().step(), Some(1));
        assert_eq!(t.episode_steps(), &[2, 2]);
    }

    #[test]
    fn test_failed_read_leaves_state_untouched() {
        let config = ReacherConfig::default().num_envs(2).body_name("gripper");
        let mut t = ReachTask::new(config).unwrap();
        let mut scene = DummyScene::new(2, 8);
        assert!(t.step(&mut scene).is_err());
        assert_eq!(t.tracker().step(), None);
        assert_eq!(t.episode_steps(), &[0, 0]);
    }

    #[test]
    fn test_successful_relocation_has_no_error() {
        let mut t = task(1);
        let mut scene = DummyScene::new(1, 8);
        scene.set_target(0, [0.01, 0.0, 0.0]);
        let s = t.step(&mut scene).unwrap();
        assert_eq!(s.reached, vec![0]);
        assert!(s.relocation_error.is_none());
        assert_eq!(scene.n_target_writes(), 1);
    }
}
