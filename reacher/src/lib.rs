//! Reward shaping and curriculum for batched arm-reaching tasks.
//!
//! This crate consists of the following parts:
//!
//! * [reacher-core](reacher_core) provides the reward terms, the curriculum,
//!   the target pose sampler and the termination predicates, seen from the
//!   host simulation through the `Scene` trait.
//! * The `reacher` binary prints the effective configuration and the
//!   curriculum, and runs a demo against an in-memory scene.
pub use reacher_core;
pub use reacher_core::{ReachTask, ReacherConfig, Scene};
