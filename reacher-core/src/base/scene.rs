//! Scene.
use super::Position;
use crate::{error::ReacherError, pose::Pose};

/// A batch of `N` simulated environments running in lockstep.
///
/// Every method returning a batch must return exactly [`Scene::num_envs`]
/// entries ordered by environment index. Joint quantities are returned as one
/// row per environment.
pub trait Scene {
    /// The number of parallel environments.
    fn num_envs(&self) -> usize;

    /// World positions of the named body, or `None` if the articulation has
    /// no body with that name.
    fn body_positions(&self, name: &str) -> Option<Vec<Position>>;

    /// World positions of the articulation root.
    fn root_positions(&self) -> Vec<Position>;

    /// Joint positions in radians.
    fn joint_positions(&self) -> Vec<Vec<f32>>;

    /// Joint velocities in radians per second.
    fn joint_velocities(&self) -> Vec<Vec<f32>>;

    /// World positions of the target markers.
    fn target_positions(&self) -> Vec<Position>;

    /// Writes `poses[i]` to the target marker of environment `env_ids[i]`.
    ///
    /// Pose positions are relative to the origin of each environment. The
    /// host adds the environment origin and the default root position of the
    /// marker before writing it, so that [`Scene::target_positions`] returns
    /// world positions again.
    ///
    /// Callers in this crate only pass ids in `0..num_envs`. Other
    /// environments must be left untouched.
    fn set_target_poses(&mut self, env_ids: &[usize], poses: &[Pose]) -> Result<(), ReacherError>;
}
