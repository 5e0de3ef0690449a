//! In-memory scene used for tests and demos.
use crate::{
    base::{Position, Scene},
    error::{check_len, ReacherError},
    pose::Pose,
};

/// A [`Scene`] whose state is plain vectors.
///
/// The end effector is exposed as the body [`DummyScene::END_EFFECTOR`].
/// There is no dynamics; callers move bodies and joints directly.
#[derive(Debug, Clone)]
pub struct DummyScene {
    end_effector: Vec<Position>,
    roots: Vec<Position>,
    joint_pos: Vec<Vec<f32>>,
    joint_vel: Vec<Vec<f32>>,
    targets: Vec<Pose>,
    n_target_writes: usize,
}

impl DummyScene {
    /// Name of the end-effector body.
    pub const END_EFFECTOR: &'static str = "arm_end";

    /// Constructs a scene with `num_envs` arms of `n_joints` joints, all at the origin.
    pub fn new(num_envs: usize, n_joints: usize) -> Self {
        Self {
            end_effector: vec![[0.0; 3]; num_envs],
            roots: vec![[0.0; 3]; num_envs],
            joint_pos: vec![vec![0.0; n_joints]; num_envs],
            joint_vel: vec![vec![0.0; n_joints]; num_envs],
            targets: vec![Pose::at([0.0; 3]); num_envs],
            n_target_writes: 0,
        }
    }

    /// Sets the end-effector position of one environment.
    pub fn set_end_effector(&mut self, env_id: usize, p: Position) {
        self.end_effector[env_id] = p;
    }

    /// Sets the target position of one environment.
    pub fn set_target(&mut self, env_id: usize, p: Position) {
        self.targets[env_id] = Pose::at(p);
    }

    /// Sets the joint positions of one environment.
    pub fn set_joint_positions(&mut self, env_id: usize, q: Vec<f32>) {
        self.joint_pos[env_id] = q;
    }

    /// Sets the joint velocities of one environment.
    pub fn set_joint_velocities(&mut self, env_id: usize, qd: Vec<f32>) {
        self.joint_vel[env_id] = qd;
    }

    /// The target pose of one environment.
    pub fn target(&self, env_id: usize) -> &Pose {
        &self.targets[env_id]
    }

    /// The number of [`Scene::set_target_poses`] calls that wrote at least one pose.
    pub fn n_target_writes(&self) -> usize {
        self.n_target_writes
    }

    /// Moves every end effector a fraction `gain` of the way to its target
    /// and sets the joint velocities to the size of that move.
    pub fn track_targets(&mut self, gain: f32) {
        for (i, (ee, tg)) in self
            .end_effector
            .iter_mut()
            .zip(self.targets.iter())
            .enumerate()
        {
            let mut step = 0f32;
            for k in 0..3 {
                let dx = gain * (tg.position[k] - ee[k]);
                ee[k] += dx;
                step += dx * dx;
            }
            let speed = step.sqrt();
            for v in self.joint_vel[i].iter_mut() {
                *v = speed;
            }
        }
    }
}

impl Scene for DummyScene {
    fn num_envs(&self) -> usize {
        self.end_effector.len()
    }

    fn body_positions(&self, name: &str) -> Option<Vec<Position>> {
        if name == Self::END_EFFECTOR {
            Some(self.end_effector.clone())
        } else {
            None
        }
    }

    fn root_positions(&self) -> Vec<Position> {
        self.roots.clone()
    }

    fn joint_positions(&self) -> Vec<Vec<f32>> {
        self.joint_pos.clone()
    }

    fn joint_velocities(&self) -> Vec<Vec<f32>> {
        self.joint_vel.clone()
    }

    fn target_positions(&self) -> Vec<Position> {
        self.targets.iter().map(|p| p.position).collect()
    }

    fn set_target_poses(&mut self, env_ids: &[usize], poses: &[Pose]) -> Result<(), ReacherError> {
        check_len("target poses", env_ids.len(), poses.len())?;
        let num_envs = self.num_envs();
        let invalid: Vec<usize> = env_ids.iter().copied().filter(|&i| i >= num_envs).collect();
        if !invalid.is_empty() {
            return Err(ReacherError::InvalidEnvIds {
                ids: invalid,
                num_envs,
            });
        }
        for (&i, pose) in env_ids.iter().zip(poses.iter()) {
            self.targets[i] = *pose;
        }
        if !env_ids.is_empty() {
            self.n_target_writes += 1;
        }
        Ok(())
    }
}
