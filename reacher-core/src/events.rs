//! Events writing target marker poses.
use crate::{base::Scene, error::ReacherError, pose::PoseSampler};
use log::{debug, info};

/// Outcome of a pose reset over a subset of environments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relocation {
    /// Ids whose target received a new pose.
    pub applied: Vec<usize>,

    /// Ids outside `0..num_envs`; nothing was written for them.
    pub rejected: Vec<usize>,
}

impl Relocation {
    /// Returns [`ReacherError::InvalidEnvIds`] if any id was rejected.
    pub fn check(&self, num_envs: usize) -> Result<(), ReacherError> {
        if self.rejected.is_empty() {
            Ok(())
        } else {
            Err(ReacherError::InvalidEnvIds {
                ids: self.rejected.clone(),
                num_envs,
            })
        }
    }
}

/// Samples and writes a fresh target pose for every id in `env_ids`.
///
/// Ids outside `0..num_envs` are reported in [`Relocation::rejected`] while
/// the valid ones are still written. Targets of other environments are not
/// touched.
pub fn relocate_targets<S: Scene + ?Sized>(
    scene: &mut S,
    sampler: &mut PoseSampler,
    env_ids: &[usize],
) -> Result<Relocation, ReacherError> {
    let num_envs = scene.num_envs();
    let (applied, rejected): (Vec<usize>, Vec<usize>) =
        env_ids.iter().partition(|&&i| i < num_envs);
    if !applied.is_empty() {
        let poses = sampler.sample_poses(applied.len());
        scene.set_target_poses(&applied, &poses)?;
        debug!("Relocated targets of {} environments", applied.len());
    }
    Ok(Relocation { applied, rejected })
}

/// Writes the initial target poses exactly once per training run.
///
/// The marker is placed when the first reset arrives. Later resets, whatever
/// their environment ids, leave the targets where they are; targets only move
/// again through [`relocate_targets`].
#[derive(Debug, Default)]
pub struct TargetInitializer {
    initialized: Option<usize>,
}

impl TargetInitializer {
    /// Constructs an initializer that has not fired yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once targets have been placed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.is_some()
    }

    /// Places targets for `env_ids` on the first successful call.
    ///
    /// Returns `Ok(true)` if poses were written by this call and `Ok(false)`
    /// if the initializer had already fired. The flag is set as soon as at
    /// least one pose has been written; rejected ids are then reported as
    /// [`ReacherError::InvalidEnvIds`].
    pub fn initialize_once<S: Scene + ?Sized>(
        &mut self,
        scene: &mut S,
        sampler: &mut PoseSampler,
        env_ids: &[usize],
    ) -> Result<bool, ReacherError> {
        if self.initialized.is_some() {
            return Ok(false);
        }

        let relocation = relocate_targets(scene, sampler, env_ids)?;
        if relocation.applied.is_empty() {
            relocation.check(scene.num_envs())?;
            return Ok(false);
        }
        self.initialized = Some(relocation.applied.len());

        let r = sampler.range();
        info!(
            "Initialized targets of {} environments in x={:?}, y={:?}, z={:?}",
            relocation.applied.len(),
            (r.x.lo, r.x.hi),
            (r.y.lo, r.y.hi),
            (r.z.lo, r.z.hi)
        );
        let targets = scene.target_positions();
        for &i in relocation.applied.iter().take(3) {
            let p = targets[i];
            info!("  env #{}: target=({:.3}, {:.3}, {:.3})", i, p[0], p[1], p[2]);
        }

        relocation.check(scene.num_envs())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dummy::DummyScene,
        pose::{PoseRange, VelocityRange},
    };

    fn sampler() -> PoseSampler {
        PoseSampler::new(PoseRange::default(), VelocityRange::default(), 42).unwrap()
    }

    #[test]
    fn test_initialize_once() {
        let mut scene = DummyScene::new(4, 8);
        let mut sampler = sampler();
        let mut init = TargetInitializer::new();
        assert!(!init.is_initialized());

        assert_eq!(init.initialize_once(&mut scene, &mut sampler, &[0, 1, 2, 3]), Ok(true));
        let first = scene.target_positions();
        assert!(first.iter().all(|p| PoseRange::default().contains(p)));

        assert_eq!(init.initialize_once(&mut scene, &mut sampler, &[0, 1, 2, 3]), Ok(false));
        assert_eq!(init.initialize_once(&mut scene, &mut sampler, &[2]), Ok(false));
        assert_eq!(scene.target_positions(), first);
        assert_eq!(scene.n_target_writes(), 1);
    }

    #[test]
    fn test_relocate_only_given_ids() {
        let mut scene = DummyScene::new(4, 8);
        let mut sampler = sampler();
        for i in 0..4 {
            scene.set_target(i, [9.0, 9.0, 9.0]);
        }
        let r = relocate_targets(&mut scene, &mut sampler, &[1, 3]).unwrap();
        assert_eq!(r.applied, vec![1, 3]);
        assert!(r.rejected.is_empty());

        let t = scene.target_positions();
        assert_eq!(t[0], [9.0, 9.0, 9.0]);
        assert_eq!(t[2], [9.0, 9.0, 9.0]);
        assert!(PoseRange::default().contains(&t[1]));
        assert!(PoseRange::default().contains(&t[3]));
    }

    #[test]
    fn test_invalid_ids_do_not_abort_valid_ones() {
        let mut scene = DummyScene::new(2, 8);
        let mut sampler = sampler();
        scene.set_target(0, [9.0, 9.0, 9.0]);
        let r = relocate_targets(&mut scene, &mut sampler, &[0, 5]).unwrap();
        assert_eq!(r.applied, vec![0]);
        assert_eq!(r.rejected, vec![5]);
        assert_ne!(scene.target_positions()[0], [9.0, 9.0, 9.0]);
        assert_eq!(
            r.check(2),
            Err(ReacherError::InvalidEnvIds {
                ids: vec![5],
                num_envs: 2
            })
        );
    }

    #[test]
    fn test_initialize_with_only_invalid_ids_does_not_fire() {
        let mut scene = DummyScene::new(2, 8);
        let mut sampler = sampler();
        let mut init = TargetInitializer::new();
        assert!(init.initialize_once(&mut scene, &mut sampler, &[7]).is_err());
        assert!(!init.is_initialized());
        assert_eq!(init.initialize_once(&mut scene, &mut sampler, &[0, 1]), Ok(true));
    }

    #[test]
    fn test_initialize_with_empty_ids_does_not_fire() {
        let mut scene = DummyScene::new(2, 8);
        let mut sampler = sampler();
        let mut init = TargetInitializer::new();
        assert_eq!(init.initialize_once(&mut scene, &mut sampler, &[]), Ok(false));
        assert!(!init.is_initialized());
    }
}
