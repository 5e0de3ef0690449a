//! Configuration of [`ReachTask`](crate::task::ReachTask).
//!
//! [`ReacherConfig::default`] holds the built-in values. [`ReacherConfig::from_env`]
//! applies the overrides given by environment variables on top of them, and
//! [`ReacherConfig::load`] reads a YAML file written by [`ReacherConfig::save`].
use crate::{
    curriculum::{CurriculumSchedule, ProgressConfig},
    error::ReacherError,
    geometry::BodyFallback,
    pose::{PoseRange, VelocityRange},
    terminations::{max_episode_steps, JointGroup},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    env,
    fs::File,
    io::{BufReader, Write},
    path::Path,
    str::FromStr,
};

/// Reads and parses a variable, `Ok(None)` if it is not set.
fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ReacherError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(v) => Ok(Some(v)),
            Err(_) => Err(ReacherError::InvalidEnvVar {
                name: name.to_string(),
                value,
            }),
        },
    }
}

fn override_var<T, F>(lookup: &F, name: &str, field: &mut T) -> Result<(), ReacherError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = parse_var(lookup, name)? {
        *field = v;
    }
    Ok(())
}

/// Physics step and control decimation of the host simulation.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SimConfig {
    /// Physics step in seconds.
    pub dt: f32,

    /// Physics steps per policy step.
    pub decimation: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 120.0,
            decimation: 2,
        }
    }
}

/// Weights of the reward terms.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RewardWeights {
    /// `alive`, env `REWARD_ALIVE`.
    pub alive: f32,
    /// `terminating`, env `REWARD_TERMINATING`.
    pub terminating: f32,
    /// `end_effector_position`, env `REWARD_END_EFFECTOR_POSITION`.
    pub end_effector_position: f32,
    /// `target_reached`, env `REWARD_TARGET_REACHED`.
    pub target_reached: f32,
    /// `distance_guidance`, env `REWARD_DISTANCE_GUIDANCE`.
    pub distance_guidance: f32,
    /// `approach_progress`, env `REWARD_APPROACH_PROGRESS`.
    pub approach_progress: f32,
    /// `joint_velocity_reward`, env `REWARD_JOINT_VELOCITY`.
    pub joint_velocity: f32,
    /// `exploration_bonus`, env `REWARD_EXPLORATION`.
    pub exploration: f32,
    /// `anti_stagnation`, env `REWARD_ANTI_STAGNATION`.
    pub anti_stagnation: f32,
    /// `joint_vel`, env `REWARD_JOINT_VEL`.
    pub joint_vel: f32,
    /// `joint_vel_smooth`, env `REWARD_JOINT_VEL_SMOOTH`.
    pub joint_vel_smooth: f32,
    /// `joint_pos_target`.
    pub joint_pos_target: f32,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            alive: 1.0,
            terminating: -5.0,
            end_effector_position: -0.1,
            target_reached: 20.0,
            distance_guidance: 2.0,
            approach_progress: 1.0,
            joint_velocity: 0.1,
            exploration: 0.05,
            anti_stagnation: 0.2,
            joint_vel: -0.00005,
            joint_vel_smooth: -0.0001,
            joint_pos_target: 0.0,
        }
    }
}

impl RewardWeights {
    /// Default weights with the overrides of the process environment.
    pub fn from_env() -> Result<Self, ReacherError> {
        Self::from_env_with(|name| env::var(name).ok())
    }

    /// Default weights with the overrides given by `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ReacherError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut w = Self::default();
        w.apply_env(&lookup)?;
        Ok(w)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> Result<(), ReacherError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_var(lookup, "REWARD_ALIVE", &mut self.alive)?;
        override_var(lookup, "REWARD_TERMINATING", &mut self.terminating)?;
        override_var(lookup, "REWARD_END_EFFECTOR_POSITION", &mut self.end_effector_position)?;
        override_var(lookup, "REWARD_TARGET_REACHED", &mut self.target_reached)?;
        override_var(lookup, "REWARD_DISTANCE_GUIDANCE", &mut self.distance_guidance)?;
        override_var(lookup, "REWARD_APPROACH_PROGRESS", &mut self.approach_progress)?;
        override_var(lookup, "REWARD_JOINT_VELOCITY", &mut self.joint_velocity)?;
        override_var(lookup, "REWARD_EXPLORATION", &mut self.exploration)?;
        override_var(lookup, "REWARD_ANTI_STAGNATION", &mut self.anti_stagnation)?;
        override_var(lookup, "REWARD_JOINT_VEL", &mut self.joint_vel)?;
        override_var(lookup, "REWARD_JOINT_VEL_SMOOTH", &mut self.joint_vel_smooth)?;
        Ok(())
    }

    /// Weight of the term with the given name.
    ///
    /// Monitors and unknown names have weight 0.
    pub fn get(&self, term: &str) -> f32 {
        match term {
            "alive" => self.alive,
            "terminating" => self.terminating,
            "end_effector_position" => self.end_effector_position,
            "target_reached" => self.target_reached,
            "distance_guidance" => self.distance_guidance,
            "approach_progress" => self.approach_progress,
            "joint_velocity_reward" => self.joint_velocity,
            "exploration_bonus" => self.exploration,
            "anti_stagnation" => self.anti_stagnation,
            "joint_vel" => self.joint_vel,
            "joint_vel_smooth" => self.joint_vel_smooth,
            "joint_pos_target" => self.joint_pos_target,
            _ => 0.0,
        }
    }
}

/// Joint bound groups.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TerminationConfig {
    /// `joint_2` to `joint_7`.
    pub main_joints: JointGroup,

    /// `joint_1` and `joint_8`.
    pub end_joints: JointGroup,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            main_joints: JointGroup::main_joints(),
            end_joints: JointGroup::end_joints(),
        }
    }
}

impl TerminationConfig {
    /// Both groups.
    pub fn groups(&self) -> Vec<JointGroup> {
        vec![self.main_joints.clone(), self.end_joints.clone()]
    }
}

/// Configuration of the reaching task.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct ReacherConfig {
    /// Number of parallel environments, env `NUM_ENVS`.
    pub num_envs: usize,

    /// Episode length in seconds, env `EPISODE_LENGTH_S`.
    pub episode_length_s: f32,

    /// Simulation timing.
    pub sim: SimConfig,

    /// Name of the end-effector body.
    pub body_name: String,

    /// Policy when the end-effector body is missing.
    pub body_fallback: BodyFallback,

    /// Sampling ranges of the target pose.
    pub target_range: PoseRange,

    /// Sampling ranges of the target velocity.
    pub target_velocity: VelocityRange,

    /// Seed of the target pose sampler.
    pub seed: u64,

    /// Success threshold schedule.
    pub curriculum: CurriculumSchedule,

    /// Rolling histories.
    pub progress: ProgressConfig,

    /// Reward weights.
    pub reward_weights: RewardWeights,

    /// Joints penalized by `joint_vel` and `joint_vel_smooth`.
    pub joint_vel_ids: Vec<usize>,

    /// Joint bounds.
    pub terminations: TerminationConfig,

    /// Steps between two convergence reports.
    pub convergence_interval: u64,
}

impl Default for ReacherConfig {
    fn default() -> Self {
        Self {
            num_envs: 2048,
            episode_length_s: 20.0,
            sim: SimConfig::default(),
            body_name: "arm_end".to_string(),
            body_fallback: BodyFallback::default(),
            target_range: PoseRange::default(),
            target_velocity: VelocityRange::default(),
            seed: 42,
            curriculum: CurriculumSchedule::default(),
            progress: ProgressConfig::default(),
            reward_weights: RewardWeights::default(),
            joint_vel_ids: (0..8).collect(),
            terminations: TerminationConfig::default(),
            convergence_interval: 1000,
        }
    }
}

impl ReacherConfig {
    /// Default configuration with the overrides of the process environment.
    pub fn from_env() -> Result<Self, ReacherError> {
        Self::from_env_with(|name| env::var(name).ok())
    }

    /// Default configuration with the overrides given by `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ReacherError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        override_var(&lookup, "NUM_ENVS", &mut config.num_envs)?;
        override_var(&lookup, "EPISODE_LENGTH_S", &mut config.episode_length_s)?;
        config.reward_weights.apply_env(&lookup)?;
        Ok(config)
    }

    /// Sets the number of environments.
    pub fn num_envs(mut self, v: usize) -> Self {
        self.num_envs = v;
        self
    }

    /// Sets the episode length in seconds.
    pub fn episode_length_s(mut self, v: f32) -> Self {
        self.episode_length_s = v;
        self
    }

    /// Sets the end-effector body name.
    pub fn body_name(mut self, v: impl Into<String>) -> Self {
        self.body_name = v.into();
        self
    }

    /// Sets the policy for a missing end-effector body.
    pub fn body_fallback(mut self, v: BodyFallback) -> Self {
        self.body_fallback = v;
        self
    }

    /// Sets the target sampling range.
    pub fn target_range(mut self, v: PoseRange) -> Self {
        self.target_range = v;
        self
    }

    /// Sets the sampler seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the curriculum.
    pub fn curriculum(mut self, v: CurriculumSchedule) -> Self {
        self.curriculum = v;
        self
    }

    /// Sets the reward weights.
    pub fn reward_weights(mut self, v: RewardWeights) -> Self {
        self.reward_weights = v;
        self
    }

    /// Sets the interval of convergence reports.
    pub fn convergence_interval(mut self, v: u64) -> Self {
        self.convergence_interval = v;
        self
    }

    /// Episode length in policy steps.
    pub fn max_episode_steps(&self) -> u64 {
        max_episode_steps(self.episode_length_s, self.sim.dt, self.sim.decimation)
    }

    /// Constructs [`ReacherConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ReacherConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempdir::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = ReacherConfig::default();
        assert_eq!(c.num_envs, 2048);
        assert_eq!(c.max_episode_steps(), 1200);
        assert_eq!(c.body_fallback, BodyFallback::Fail);
        assert_eq!(c.reward_weights.get("target_reached"), 20.0);
        assert_eq!(c.reward_weights.get("convergence_monitor"), 0.0);
    }

    #[test]
    fn test_env_overrides() {
        let c = ReacherConfig::from_env_with(lookup(&[
            ("NUM_ENVS", "16"),
            ("EPISODE_LENGTH_S", "5"),
            ("REWARD_TARGET_REACHED", " 40.5 "),
            ("REWARD_JOINT_VEL", "-1e-3"),
        ]))
        .unwrap();
        assert_eq!(c.num_envs, 16);
        assert_eq!(c.max_episode_steps(), 300);
        assert_eq!(c.reward_weights.target_reached, 40.5);
        assert_eq!(c.reward_weights.joint_vel, -1e-3);
        assert_eq!(c.reward_weights.alive, 1.0);
    }

    #[test]
    fn test_invalid_env_var() {
        let r = RewardWeights::from_env_with(lookup(&[("REWARD_ALIVE", "one")]));
        assert_eq!(
            r,
            Err(ReacherError::InvalidEnvVar {
                name: "REWARD_ALIVE".to_string(),
                value: "one".to_string()
            })
        );
        assert!(ReacherConfig::from_env_with(lookup(&[("NUM_ENVS", "-1")])).is_err());
    }

    #[test]
    fn test_serde_reacher_config() -> Result<()> {
        let config = ReacherConfig::default()
            .num_envs(64)
            .seed(7)
            .body_fallback(BodyFallback::Root)
            .convergence_interval(10);

        let dir = TempDir::new("reacher_config")?;
        let path = dir.path().join("reacher_config.yaml");
        config.save(&path)?;
        let config_ = ReacherConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_partial_yaml() -> Result<()> {
        let config: ReacherConfig = serde_yaml::from_str("num_envs: 4\nseed: 1\n")?;
        assert_eq!(config.num_envs, 4);
        assert_eq!(config.seed, 1);
        assert_eq!(config.body_name, "arm_end");
        Ok(())
    }
}
