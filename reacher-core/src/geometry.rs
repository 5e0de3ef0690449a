//! End-effector positions and distances.
use crate::{
    base::{Position, Scene},
    error::{check_len, ReacherError},
};
use log::warn;
use serde::{Deserialize, Serialize};

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: &Position, b: &Position) -> f32 {
    norm(&[a[0] - b[0], a[1] - b[1], a[2] - b[2]])
}

/// L2 norm of a vector.
#[inline]
pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Result of looking up a named body on the articulation.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyLookup {
    /// World positions of the body, one per environment.
    Found(Vec<Position>),

    /// No body with the given name.
    NotFound(String),
}

impl BodyLookup {
    /// Converts into a `Result`, mapping [`BodyLookup::NotFound`] to
    /// [`ReacherError::BodyNotFound`].
    pub fn into_result(self) -> Result<Vec<Position>, ReacherError> {
        match self {
            Self::Found(p) => Ok(p),
            Self::NotFound(name) => Err(ReacherError::BodyNotFound(name)),
        }
    }
}

/// What to do when the end-effector body cannot be found.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy, Default)]
pub enum BodyFallback {
    /// Report [`ReacherError::BodyNotFound`].
    #[default]
    Fail,

    /// Use the root position of the articulation.
    Root,
}

/// Looks up the world positions of a named body.
pub fn lookup_body<S: Scene + ?Sized>(scene: &S, name: &str) -> BodyLookup {
    match scene.body_positions(name) {
        Some(p) => BodyLookup::Found(p),
        None => BodyLookup::NotFound(name.to_string()),
    }
}

/// Returns the end-effector positions, applying `fallback` if the body is missing.
pub fn end_effector_positions<S: Scene + ?Sized>(
    scene: &S,
    body_name: &str,
    fallback: BodyFallback,
) -> Result<Vec<Position>, ReacherError> {
    let positions = match (lookup_body(scene, body_name), fallback) {
        (BodyLookup::NotFound(name), BodyFallback::Root) => {
            warn!("Body '{}' not found, using root position", name);
            scene.root_positions()
        }
        (lookup, _) => lookup.into_result()?,
    };
    check_len("end-effector positions", scene.num_envs(), positions.len())?;
    Ok(positions)
}

/// Distance between end effector and target for every environment.
pub fn end_effector_distance(
    end_effector_positions: &[Position],
    target_positions: &[Position],
) -> Result<Vec<f32>, ReacherError> {
    check_len(
        "target positions",
        end_effector_positions.len(),
        target_positions.len(),
    )?;
    Ok(end_effector_positions
        .iter()
        .zip(target_positions.iter())
        .map(|(e, t)| distance(e, t))
        .collect())
}

/// Distance between end effector and a fixed point, for every environment.
pub fn end_effector_position_l2(
    end_effector_positions: &[Position],
    target: &Position,
) -> Vec<f32> {
    end_effector_positions
        .iter()
        .map(|e| distance(e, target))
        .collect()
}
