//! Skeleton assembly and vertex weight collection
//!
//! Runs the bone pool through its states in order: pooled from the skin's
//! bone list, bridged with connecting bones, assembled into a tree, indexed
//! depth-first, and finally given a bind pose.

use glam::Mat4;

use crate::builder::geometry;
use crate::config::ExportConfig;
use crate::context::ExportContext;
use crate::intermediate::{BoneId, BoneTRS, IntermediateSkeleton};
use crate::math::{decompose_to_engine, relative_transform};
use crate::scene::{HostMesh, HostSkin, NodeHandle, NodeKind, SceneSource, TimeValue};

/// Build the skeleton of `mesh_node` from its skin binding
pub fn build_skeleton(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    mesh_node: NodeHandle,
    skin: &HostSkin,
    host_mesh: &HostMesh,
    config: &ExportConfig,
) -> IntermediateSkeleton {
    let mut skeleton = IntermediateSkeleton::new();

    for &handle in &skin.bones {
        let Some(name) = scene.node_name(handle) else {
            ctx.log
                .warn(format!("Skin references unknown bone node {}", handle));
            continue;
        };
        skeleton.add_bone(name, handle, scene.parent(handle));
    }

    connect_linked_bones(ctx, scene, &mut skeleton);
    skeleton.assemble();
    skeleton.assign_indices();

    let bind_time = scene.frame_to_time(config.binding_pose_frame);
    let order: Vec<BoneId> = skeleton.index_order().to_vec();
    for id in order {
        let bind = bone_local_transform(scene, &skeleton, mesh_node, id, bind_time);
        skeleton.bone_mut(id).bind_pose = bind;
    }

    collect_vertex_weights(ctx, scene, mesh_node, skin, host_mesh, &mut skeleton);
    skeleton.trim_vertex_assignments(config.max_bone_influences.max(1));
    skeleton.normalize_vertex_assignments();
    skeleton.set_frame_rate(scene.frame_rate() as f32);

    ctx.log.debug(format!(
        "Skeleton with {} bones:\n{}",
        skeleton.bone_count(),
        skeleton.describe()
    ));
    skeleton
}

/// Bridge skeleton roots hanging off helper nodes to the bone above them
fn connect_linked_bones(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    skeleton: &mut IntermediateSkeleton,
) {
    let parents: Vec<NodeHandle> = skeleton
        .bone_ids()
        .filter_map(|id| skeleton.bone(id).parent_handle)
        .collect();

    for parent in parents {
        if skeleton.find_bone_by_handle(parent).is_some() || scene.is_scene_root(parent) {
            continue;
        }
        if scene.node_kind(parent) != Some(NodeKind::Helper) {
            continue;
        }

        let mut ancestor = scene.parent(parent);
        while let Some(handle) = ancestor {
            if skeleton.find_bone_by_handle(handle).is_some() || scene.is_scene_root(handle) {
                break;
            }
            ancestor = scene.parent(handle);
        }
        let Some(bone_above) = ancestor.filter(|&h| skeleton.find_bone_by_handle(h).is_some())
        else {
            continue;
        };

        let id = skeleton.add_connecting_bone(parent, Some(bone_above));
        ctx.log.info(format!(
            "Added '{}' for helper '{}'",
            skeleton.bone(id).name,
            scene.node_name(parent).unwrap_or_default()
        ));
    }
}

/// Local transform of a bone at `time`, engine axes
///
/// Relative to the parent bone's node, or to the mesh object for roots.
pub fn bone_local_transform(
    scene: &dyn SceneSource,
    skeleton: &IntermediateSkeleton,
    mesh_node: NodeHandle,
    id: BoneId,
    time: TimeValue,
) -> BoneTRS {
    let bone = skeleton.bone(id);
    let node_tm = scene
        .node_transform(bone.handle, time)
        .unwrap_or(Mat4::IDENTITY);
    let parent_tm = match bone.parent() {
        Some(parent) => scene.node_transform(skeleton.bone(parent).handle, time),
        None => scene.object_transform(mesh_node, time),
    }
    .unwrap_or(Mat4::IDENTITY);
    decompose_to_engine(relative_transform(node_tm, parent_tm))
}

/// Copy the skin's per-vertex influences onto the emitted corners
fn collect_vertex_weights(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    mesh_node: NodeHandle,
    skin: &HostSkin,
    host_mesh: &HostMesh,
    skeleton: &mut IntermediateSkeleton,
) {
    let slot_index: Vec<Option<u32>> = skin
        .bones
        .iter()
        .map(|&h| {
            skeleton
                .find_bone_by_handle(h)
                .map(|id| skeleton.bone(id).index() as u32)
        })
        .collect();

    let winding = geometry::winding(scene, mesh_node, 0);
    let mut dropped = 0usize;
    let mut bad_slots = 0usize;
    for (corner, &vertex) in geometry::corner_vertices(host_mesh, winding)
        .iter()
        .enumerate()
    {
        let Some(influences) = skin.weights.get(vertex as usize) else {
            continue;
        };
        for &(slot, weight) in influences {
            match slot_index.get(slot as usize).copied().flatten() {
                Some(bone_index) => {
                    if !skeleton.add_vertex_data(corner as u32, bone_index, weight) {
                        dropped += 1;
                    }
                }
                None => bad_slots += 1,
            }
        }
    }

    if bad_slots > 0 {
        ctx.log.warn(format!(
            "{} influences reference bones missing from the skeleton",
            bad_slots
        ));
    }
    if dropped > 0 {
        tracing::debug!("Dropped {} negligible bone influences", dropped);
    }
}
