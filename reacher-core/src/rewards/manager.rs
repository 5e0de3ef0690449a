//! Weighted sum of reward terms.
use super::{
    Alive, AntiStagnationReward, ApproachProgress, DistanceGuidance, EndEffectorPositionToMarker,
    ExplorationReward, JointPosTargetL2, JointVelL1, JointVelocityReward, RewardTerm,
    TargetReachedBonus, Terminating,
};
use crate::{
    batch::StepBatch,
    config::ReacherConfig,
    curriculum::StepState,
    error::{check_len, ReacherError},
    monitor::{ConvergenceMonitor, TerminationMonitor},
    record::{Record, RecordValue},
};

/// Output of [`RewardManager::compute`].
#[derive(Debug, Clone)]
pub struct RewardOutput {
    /// Weighted sum over all terms, one value per environment.
    pub total: Vec<f32>,

    /// Mean of every weighted term under `reward/<name>`, and of the total
    /// under `reward/total`.
    pub record: Record,

    /// Reports produced by the terms in this step.
    pub reports: Vec<Record>,
}

/// Reward terms with their weights.
///
/// Every term is evaluated, including those with weight 0, so that monitors
/// produce their reports.
#[derive(Default)]
pub struct RewardManager {
    terms: Vec<(Box<dyn RewardTerm>, f32)>,
}

impl RewardManager {
    /// Constructs a manager without terms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a term.
    pub fn add_term(mut self, term: impl RewardTerm + 'static, weight: f32) -> Self {
        self.terms.push((Box::new(term), weight));
        self
    }

    /// The terms of the reaching task, each weighted by
    /// `config.reward_weights.get(name)`.
    pub fn from_config(config: &ReacherConfig) -> Self {
        let joint_ids = Some(config.joint_vel_ids.clone());
        let terms: Vec<Box<dyn RewardTerm>> = vec![
            Box::new(Alive),
            Box::new(Terminating),
            Box::new(EndEffectorPositionToMarker),
            Box::new(TargetReachedBonus),
            Box::new(DistanceGuidance),
            Box::new(ApproachProgress),
            Box::new(ConvergenceMonitor::default().interval(config.convergence_interval)),
            Box::new(TerminationMonitor::new(config.terminations.groups())),
            Box::new(JointVelocityReward),
            Box::new(ExplorationReward),
            Box::new(AntiStagnationReward),
            Box::new(JointVelL1::new("joint_vel", joint_ids.clone())),
            Box::new(JointVelL1::new("joint_vel_smooth", joint_ids)),
            Box::new(JointPosTargetL2::new(0.0, None)),
        ];
        let w = &config.reward_weights;
        Self {
            terms: terms
                .into_iter()
                .map(|t| {
                    let weight = w.get(t.name());
                    (t, weight)
                })
                .collect(),
        }
    }

    /// Sets the weight of the named term. Returns `false` if there is no such term.
    pub fn set_weight(&mut self, name: &str, weight: f32) -> bool {
        match self.terms.iter_mut().find(|(t, _)| t.name() == name) {
            Some((_, w)) => {
                *w = weight;
                true
            }
            None => false,
        }
    }

    /// The weight of the named term.
    pub fn weight(&self, name: &str) -> Option<f32> {
        self.terms
            .iter()
            .find(|(t, _)| t.name() == name)
            .map(|(_, w)| *w)
    }

    /// Names of the terms in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.terms.iter().map(|(t, _)| t.name()).collect()
    }

    /// Evaluates every term and sums them with their weights.
    pub fn compute(
        &self,
        batch: &StepBatch,
        state: &StepState,
    ) -> Result<RewardOutput, ReacherError> {
        let n = batch.num_envs();
        let mut total = vec![0.0; n];
        let mut record = Record::empty();
        let mut reports = vec![];

        for (term, weight) in self.terms.iter() {
            let values = term.compute(batch, state);
            check_len(term.name(), n, values.len())?;
            if *weight != 0.0 {
                for (t, v) in total.iter_mut().zip(values.iter()) {
                    *t += weight * v;
                }
                record.insert(
                    format!("reward/{}", term.name()),
                    RecordValue::Scalar(weight * mean(&values)),
                );
            }
            if let Some(report) = term.report(batch, state) {
                reports.push(report);
            }
        }
        record.insert("reward/total", RecordValue::Scalar(mean(&total)));

        Ok(RewardOutput {
            total,
            record,
            reports,
        })
    }
}

fn mean(v: &[f32]) -> f32 {
    if v.is_empty() {
        0.0
    } else {
        v.iter().sum::<f32>() / v.len() as f32
    }
}
