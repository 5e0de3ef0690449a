#![warn(missing_docs)]
//! Reward shaping, curriculum and termination logic for a batched
//! arm-reaching task.
//!
//! The host simulation is seen through the [`Scene`] trait. [`ReachTask`]
//! ties the parts together for one step: it gathers a [`StepBatch`], checks
//! the termination predicates, advances the [`ProgressTracker`] once,
//! evaluates the weighted reward terms and relocates the targets that were
//! reached.
pub mod batch;
pub mod config;
pub mod curriculum;
pub mod dummy;
pub mod error;
pub mod events;
pub mod geometry;
pub mod monitor;
pub mod pose;
pub mod record;
pub mod rewards;
pub mod ring_buffer;
pub mod task;
pub mod terminations;

mod base;
pub use base::{Position, Scene, IDENTITY_QUAT};

pub use batch::StepBatch;
pub use config::ReacherConfig;
pub use curriculum::{CurriculumSchedule, ProgressTracker, StepState};
pub use error::ReacherError;
pub use pose::{Pose, PoseRange, PoseSampler};
pub use task::{ReachTask, TaskStep};
