//! Host seam.
//!
//! The physics engine, the articulation data and the training loop live in the
//! host. This crate only consumes the batched quantities listed in [`Scene`].
mod scene;
pub use scene::Scene;

/// World position of a body.
pub type Position = [f32; 3];

/// Identity quaternion in `[w, x, y, z]` order.
pub const IDENTITY_QUAT: [f32; 4] = [1.0, 0.0, 0.0, 0.0];
