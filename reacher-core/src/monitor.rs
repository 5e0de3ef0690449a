//! Diagnostics registered as zero-valued reward terms.
//!
//! Monitors contribute nothing to the reward. They are evaluated with the
//! other terms so that their reports are produced on the same batch.
use crate::{
    batch::StepBatch,
    curriculum::StepState,
    record::{Record, RecordValue},
    rewards::RewardTerm,
    terminations::JointGroup,
};
use chrono::Local;
use log::{info, warn};
use std::fmt;

/// Distance below which an environment counts as a success.
const SUCCESS_DISTANCE: f32 = 0.05;

/// Distance below which an environment counts as near the target.
const NEAR_DISTANCE: f32 = 0.1;

/// Coarse training status derived from the success and near rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceVerdict {
    /// At least 80% of the environments succeed.
    Converged,

    /// At least 50% succeed.
    NearlyConverged,

    /// At least 30% are near the target.
    Progressing,

    /// None of the above.
    Training,
}

impl ConvergenceVerdict {
    /// Classifies rates given in percent.
    pub fn from_rates(success_rate: f32, near_rate: f32) -> Self {
        if success_rate >= 80.0 {
            Self::Converged
        } else if success_rate >= 50.0 {
            Self::NearlyConverged
        } else if near_rate >= 30.0 {
            Self::Progressing
        } else {
            Self::Training
        }
    }
}

impl fmt::Display for ConvergenceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Converged => "converged",
            Self::NearlyConverged => "nearly converged",
            Self::Progressing => "progressing",
            Self::Training => "training",
        };
        write!(f, "{}", s)
    }
}

/// Convergence statistics of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceReport {
    /// Curriculum step of the batch.
    pub step: u64,
    /// Environments within 5cm.
    pub success_count: usize,
    /// Environments within 10cm.
    pub near_count: usize,
    /// Number of environments.
    pub num_envs: usize,
    /// Mean distance to the target.
    pub mean_distance: f32,
    /// Verdict from the rates.
    pub verdict: ConvergenceVerdict,
}

impl ConvergenceReport {
    /// Computes the statistics of `distances`.
    pub fn new(step: u64, distances: &[f32]) -> Self {
        let num_envs = distances.len();
        let success_count = distances.iter().filter(|d| **d < SUCCESS_DISTANCE).count();
        let near_count = distances.iter().filter(|d| **d < NEAR_DISTANCE).count();
        let mean_distance = if num_envs == 0 {
            0.0
        } else {
            distances.iter().sum::<f32>() / num_envs as f32
        };
        let mut report = Self {
            step,
            success_count,
            near_count,
            num_envs,
            mean_distance,
            verdict: ConvergenceVerdict::Training,
        };
        report.verdict = ConvergenceVerdict::from_rates(report.success_rate(), report.near_rate());
        report
    }

    fn rate(&self, count: usize) -> f32 {
        if self.num_envs == 0 {
            0.0
        } else {
            100.0 * count as f32 / self.num_envs as f32
        }
    }

    /// Success rate in percent.
    pub fn success_rate(&self) -> f32 {
        self.rate(self.success_count)
    }

    /// Near rate in percent.
    pub fn near_rate(&self) -> f32 {
        self.rate(self.near_count)
    }

    /// Converts into a record with keys under `convergence/`.
    pub fn to_record(&self) -> Record {
        Record::from_slice(&[
            ("convergence/step", RecordValue::Scalar(self.step as f32)),
            ("convergence/success_rate", RecordValue::Scalar(self.success_rate())),
            ("convergence/near_rate", RecordValue::Scalar(self.near_rate())),
            ("convergence/mean_distance", RecordValue::Scalar(self.mean_distance)),
            ("convergence/verdict", RecordValue::String(self.verdict.to_string())),
            ("convergence/datetime", RecordValue::DateTime(Local::now())),
        ])
    }
}

/// Reports convergence statistics every `interval` steps.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    interval: u64,
}

impl Default for ConvergenceMonitor {
    fn default() -> Self {
        Self { interval: 1000 }
    }
}

impl ConvergenceMonitor {
    /// Sets the report interval.
    pub fn interval(mut self, v: u64) -> Self {
        self.interval = v.max(1);
        self
    }
}

impl RewardTerm for ConvergenceMonitor {
    fn name(&self) -> &str {
        "convergence_monitor"
    }

    fn compute(&self, batch: &StepBatch, _state: &StepState) -> Vec<f32> {
        vec![0.0; batch.num_envs()]
    }

    fn report(&self, batch: &StepBatch, state: &StepState) -> Option<Record> {
        if state.step % self.interval != 0 {
            return None;
        }
        let r = ConvergenceReport::new(state.step, &batch.distances);
        info!(
            "Convergence at step {}: success {:.1}% ({}/{}), near {:.1}% ({}/{}), mean distance {:.4}m, {}",
            r.step,
            r.success_rate(),
            r.success_count,
            r.num_envs,
            r.near_rate(),
            r.near_count,
            r.num_envs,
            r.mean_distance,
            r.verdict
        );
        Some(r.to_record())
    }
}

/// Counts joint bound violations every step.
#[derive(Debug, Clone)]
pub struct TerminationMonitor {
    groups: Vec<JointGroup>,
}

impl TerminationMonitor {
    /// Constructs the monitor over the given joint groups.
    pub fn new(groups: Vec<JointGroup>) -> Self {
        Self { groups }
    }

    /// `(group, joint id, violating environments)` for every joint with a violation.
    pub fn violations(&self, joint_pos: &[Vec<f32>]) -> Vec<(&str, usize, usize)> {
        let mut out = vec![];
        for g in self.groups.iter() {
            for &j in g.joint_ids.iter() {
                let n = joint_pos
                    .iter()
                    .filter(|q| q.get(j).is_some_and(|&x| g.violates(x)))
                    .count();
                if n > 0 {
                    out.push((g.name.as_str(), j, n));
                }
            }
        }
        out
    }
}

impl RewardTerm for TerminationMonitor {
    fn name(&self) -> &str {
        "termination_monitor"
    }

    fn compute(&self, batch: &StepBatch, _state: &StepState) -> Vec<f32> {
        vec![0.0; batch.num_envs()]
    }

    fn report(&self, batch: &StepBatch, _state: &StepState) -> Option<Record> {
        let violations = self.violations(&batch.joint_pos);
        let mut record = Record::empty();
        let mut total = 0;
        for (group, j, n) in violations {
            warn!("Joint {} ({}) out of bounds in {} environments", j + 1, group, n);
            record.insert(
                format!("termination/{}/joint_{}", group, j + 1),
                RecordValue::Scalar(n as f32),
            );
            total += n;
        }
        if total > 0 {
            warn!("Joint bound violations in total: {}", total);
        }
        record.insert("termination/violations", RecordValue::Scalar(total as f32));
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn batch(d: &[f32]) -> StepBatch {
        let ee = vec![[0.0; 3]; d.len()];
        let tg = d.iter().map(|&x| [x, 0.0, 0.0]).collect();
        StepBatch::from_positions(ee, tg).unwrap()
    }

    fn state(step: u64) -> StepState {
        let mut s = StepState::initial(0.08);
        s.step = step;
        s
    }

    #[test]
    fn test_verdict() {
        assert_eq!(ConvergenceVerdict::from_rates(80.0, 80.0), ConvergenceVerdict::Converged);
        assert_eq!(ConvergenceVerdict::from_rates(50.0, 50.0), ConvergenceVerdict::NearlyConverged);
        assert_eq!(ConvergenceVerdict::from_rates(10.0, 30.0), ConvergenceVerdict::Progressing);
        assert_eq!(ConvergenceVerdict::from_rates(10.0, 20.0), ConvergenceVerdict::Training);
    }

    #[test]
    fn test_convergence_report() {
        let r = ConvergenceReport::new(0, &[0.01, 0.07, 0.2, 0.3]);
        assert_eq!(r.success_count, 1);
        assert_eq!(r.near_count, 2);
        assert_eq!(r.success_rate(), 25.0);
        assert_eq!(r.near_rate(), 50.0);
        assert!((r.mean_distance - 0.145).abs() < 1e-6);
        assert_eq!(r.verdict, ConvergenceVerdict::Progressing);
    }

    #[test]
    fn test_convergence_monitor_interval() {
        let m = ConvergenceMonitor::default();
        let b = batch(&[0.01, 0.02]);
        assert_eq!(m.compute(&b, &state(0)), vec![0.0, 0.0]);

        let record = m.report(&b, &state(0)).unwrap();
        assert_eq!(record.get_scalar("convergence/success_rate"), Ok(100.0));
        assert_eq!(record.get_string("convergence/verdict"), Ok("converged".to_string()));
        assert!(m.report(&b, &state(999)).is_none());
        assert!(m.report(&b, &state(2000)).is_some());
    }

    #[test]
    fn test_termination_monitor() {
        let m = TerminationMonitor::new(vec![JointGroup::main_joints(), JointGroup::end_joints()]);
        let mut b = batch(&[0.5, 0.5, 0.5]);
        let mut q = vec![vec![0.0; 8]; 3];
        q[0][2] = 10.0;
        q[1][2] = -10.0;
        q[2][7] = -4.0;
        b.joint_pos = q;
        let s = state(5);

        assert_eq!(m.compute(&b, &s), vec![0.0; 3]);
        assert_eq!(m.violations(&b.joint_pos), vec![("main_joints", 2, 2), ("end_joints", 7, 1)]);
        let record = m.report(&b, &s).unwrap();
        assert_eq!(record.get_scalar("termination/violations"), Ok(3.0));
        assert_eq!(record.get_scalar("termination/main_joints/joint_3"), Ok(2.0));
        assert_eq!(record.get_scalar("termination/end_joints/joint_8"), Ok(1.0));

        b.joint_pos = vec![vec![3.0 * PI - 1e-3; 8]; 3];
        let record = m.report(&b, &s).unwrap();
        assert_eq!(record.get_scalar("termination/violations"), Ok(0.0));
    }
}
