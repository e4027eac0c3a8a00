//! Pose (morph target) offsets
//!
//! A pose is the per-vertex difference between the mesh positions at a target
//! frame and the reference positions at frame 0. Offsets are indexed in the
//! mesh's current (possibly reindexed) vertex space.

use glam::Vec3;

use crate::builder::geometry::{self, POSITION};
use crate::error::PoseError;
use crate::intermediate::IntermediateMesh;
use crate::scene::SceneSource;

/// Offsets shorter than this are dropped from optimized poses
pub const POSE_EPSILON: f32 = 1e-6;

/// Reference frame every pose is measured against
pub const REFERENCE_FRAME: f32 = 0.0;

/// Offsets of `mesh` at `frame` relative to its reference positions
pub fn build_pose(
    scene: &dyn SceneSource,
    mesh: &IntermediateMesh,
    frame: f32,
    optimize: bool,
) -> Result<Vec<(u32, Vec3)>, PoseError> {
    if mesh.is_collapsed() {
        return Err(PoseError::Collapsed(mesh.name().to_string()));
    }
    if frame == REFERENCE_FRAME {
        return Ok(Vec::new());
    }

    let base = mesh
        .cached_array(POSITION)
        .and_then(|a| a.as_vec3())
        .ok_or(PoseError::MissingReference)?;

    let time = scene.frame_to_time(frame);
    let mut target = geometry::build_attribute_array(scene, mesh.node(), POSITION, time)
        .ok_or(PoseError::MissingGeometry(frame))?;

    let expected = mesh
        .reindex_table()
        .map(|t| t.old_vertex_count())
        .unwrap_or_else(|| mesh.corner_count());
    if target.len() != expected {
        return Err(PoseError::VertexCountMismatch {
            expected,
            found: target.len(),
        });
    }
    if let Some(table) = mesh.reindex_table() {
        table.apply(&mut target);
    }
    let target = target.as_vec3().ok_or(PoseError::MissingGeometry(frame))?;

    if target.len() != base.len() {
        return Err(PoseError::VertexCountMismatch {
            expected: base.len(),
            found: target.len(),
        });
    }

    Ok(target
        .iter()
        .zip(base)
        .enumerate()
        .map(|(i, (t, b))| (i as u32, *t - *b))
        .filter(|(_, offset)| !optimize || !offset.abs_diff_eq(Vec3::ZERO, POSE_EPSILON))
        .collect())
}
