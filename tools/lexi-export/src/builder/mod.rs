//! Host scene → intermediate mesh
//!
//! [`create_mesh`] converts one node; [`collapse_hierarchy`] merges a node and
//! its geometry descendants into a single static mesh.

pub mod geometry;
pub mod material;
pub mod skeleton;

use std::collections::BTreeMap;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::animation;
use crate::config::ExportConfig;
use crate::context::ExportContext;
use crate::error::ExportError;
use crate::intermediate::{IntermediateMesh, PoseAnimData, Triangle};
use crate::math::{host_to_engine_matrix, normal_matrix, relative_transform};
use crate::mesh_array::MeshArray;
use crate::scene::{Capability, HostMesh, NodeHandle, SceneSource};

use geometry::{DIFFUSE, NORMAL, POSITION};

fn node_name(scene: &dyn SceneSource, node: NodeHandle) -> Result<String, ExportError> {
    scene
        .node_name(node)
        .map(str::to_string)
        .ok_or(ExportError::NodeNotFound(node))
}

fn evaluate_geometry(
    scene: &dyn SceneSource,
    node: NodeHandle,
    name: &str,
) -> Result<HostMesh, ExportError> {
    match scene.can_triangulate(node) {
        Capability::Supported => {}
        Capability::Unsupported => return Err(ExportError::NotTriangulable(name.to_string())),
        Capability::NotApplicable => return Err(ExportError::NoGeometry(name.to_string())),
    }
    scene
        .evaluate_mesh(node, 0)
        .filter(|m| !m.faces.is_empty() && !m.vertices.is_empty())
        .ok_or_else(|| ExportError::NoGeometry(name.to_string()))
}

/// Build the intermediate mesh of a single node
///
/// Triangles reference the per-corner vertex space (`3 × face + corner`).
/// With skinning enabled the skeleton is assembled from the node's skin; a
/// node without one is exported static.
pub fn create_mesh(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    node: NodeHandle,
    config: &ExportConfig,
) -> Result<IntermediateMesh, ExportError> {
    let name = node_name(scene, node)?;
    let host_mesh = evaluate_geometry(scene, node, &name)?;

    let face_materials = material::resolve_face_materials(ctx, scene, node, &host_mesh);
    let triangles: Vec<Triangle> = face_materials
        .iter()
        .enumerate()
        .map(|(i, &material)| {
            let base = 3 * i as u32;
            Triangle {
                indices: [base, base + 1, base + 2],
                material,
            }
        })
        .collect();

    let mut mesh = IntermediateMesh::new(name.as_str(), node, triangles);

    if config.skeleton {
        match scene.skin(node) {
            Some(skin) => {
                let skeleton =
                    skeleton::build_skeleton(ctx, scene, node, skin, &host_mesh, config);
                mesh.set_skeleton(skeleton);
            }
            None => ctx
                .log
                .warn(format!("'{}' has no skin; exported as a static mesh", name)),
        }
    }

    ctx.log.debug(format!(
        "Built '{}': {} triangles, {} materials",
        name,
        mesh.triangles().len(),
        mesh.materials().len()
    ));
    Ok(mesh)
}

/// Attach the clips, poses and pose animations requested by `config`
///
/// A clip that fails to sample is logged and skipped.
pub fn add_animation_data(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    mesh: &mut IntermediateMesh,
    config: &ExportConfig,
) {
    let node = mesh.node();
    let mesh_name = mesh.name().to_string();
    let clips = config.animation_specs();
    match mesh.skeleton_mut() {
        Some(skeleton) => {
            for clip in &clips {
                if let Err(err) =
                    animation::sample_animation(scene, node, skeleton, clip, config.scale_mode)
                {
                    ctx.log.error(err.to_string());
                }
            }
        }
        None if !clips.is_empty() && config.skeleton => ctx.log.warn(format!(
            "'{}' has no skeleton; {} animation(s) ignored",
            mesh_name,
            clips.len()
        )),
        None => {}
    }

    for pose in &config.poses {
        mesh.add_pose(&pose.name, pose.frame, pose.optimize);
    }
    for anim in &config.pose_animations {
        mesh.add_pose_animation(
            &anim.name,
            PoseAnimData {
                start: anim.start,
                end: anim.end,
                sample_rate: anim.sample_rate,
                optimize: anim.optimize,
            },
        );
    }
}

/// Attribute names `config` asks for that `mesh` can provide
fn requested_attributes(mesh: &HostMesh, config: &ExportConfig) -> Vec<String> {
    let mut names = vec![POSITION.to_string()];
    if config.normals {
        names.push(NORMAL.to_string());
    }
    if config.vertex_colors && mesh.colors.as_ref().is_some_and(|c| c.used) {
        names.push(DIFFUSE.to_string());
    }
    if config.uv {
        names.extend(
            mesh.maps
                .iter()
                .filter(|(_, m)| m.used)
                .map(|(&ch, _)| geometry::uv_attribute(ch)),
        );
    }
    names
}

fn default_array(name: &str, len: usize) -> MeshArray {
    match name {
        NORMAL => MeshArray::Vec3(vec![Vec3::Y; len]),
        DIFFUSE => MeshArray::Vec4(vec![Vec4::ONE; len]),
        POSITION => MeshArray::Vec3(vec![Vec3::ZERO; len]),
        _ => MeshArray::Vec2(vec![Vec2::ZERO; len]),
    }
}

struct CollapsedPart {
    node: NodeHandle,
    triangles: Vec<Triangle>,
    arrays: BTreeMap<String, MeshArray>,
}

/// Merge `root` and every geometry node below it into one static mesh
///
/// Geometry is expressed in the root's object space. Attributes present on
/// only some parts are filled with defaults (up normal, white, zero UV).
pub fn collapse_hierarchy(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    root: NodeHandle,
    config: &ExportConfig,
) -> Result<IntermediateMesh, ExportError> {
    let name = node_name(scene, root)?;
    let root_tm = scene
        .object_transform(root, 0)
        .unwrap_or(Mat4::IDENTITY);

    let mut nodes = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if scene.can_triangulate(node) == Capability::Supported {
            nodes.push(node);
        }
        stack.extend(scene.children(node).into_iter().rev());
    }

    let mut parts = Vec::new();
    for node in nodes {
        let Some(host_mesh) = scene
            .evaluate_mesh(node, 0)
            .filter(|m| !m.faces.is_empty())
        else {
            continue;
        };
        let part_name = scene.node_name(node).unwrap_or_default().to_string();
        let winding = geometry::winding(scene, node, 0);
        let node_tm = scene.object_transform(node, 0).unwrap_or(Mat4::IDENTITY);
        let to_root = host_to_engine_matrix(relative_transform(node_tm, root_tm));
        let normal_tm = normal_matrix(to_root);

        let mut arrays = BTreeMap::new();
        for attribute in requested_attributes(&host_mesh, config) {
            let Some(mut array) = geometry::attribute_from_mesh(&host_mesh, &attribute, winding)
            else {
                continue;
            };
            match (&mut array, attribute.as_str()) {
                (MeshArray::Vec3(points), POSITION) => {
                    for p in points.iter_mut() {
                        *p = to_root.transform_point3(*p);
                    }
                }
                (MeshArray::Vec3(normals), NORMAL) => {
                    for n in normals.iter_mut() {
                        *n = (normal_tm * *n).normalize_or(Vec3::Y);
                    }
                }
                _ => {}
            }
            arrays.insert(attribute, array);
        }

        let triangles = material::resolve_face_materials(ctx, scene, node, &host_mesh)
            .into_iter()
            .enumerate()
            .map(|(i, material)| {
                let base = 3 * i as u32;
                Triangle {
                    indices: [base, base + 1, base + 2],
                    material,
                }
            })
            .collect();
        ctx.log.debug(format!("Collapsing '{}' into '{}'", part_name, name));
        parts.push(CollapsedPart {
            node,
            triangles,
            arrays,
        });
    }

    if parts.is_empty() {
        return Err(ExportError::NoGeometry(name));
    }

    let mut names: Vec<String> = parts
        .iter()
        .flat_map(|p| p.arrays.keys().cloned())
        .collect();
    names.sort();
    names.dedup();

    let mut merged: BTreeMap<String, MeshArray> = BTreeMap::new();
    let mut triangles = Vec::new();
    let mut offset = 0u32;
    for part in &parts {
        let corners = part.triangles.len() * 3;
        for attribute in &names {
            let fallback;
            let array = match part.arrays.get(attribute) {
                Some(array) => array,
                None => {
                    fallback = default_array(attribute, corners);
                    &fallback
                }
            };
            match merged.get_mut(attribute) {
                Some(target) => {
                    if !target.extend_from(array) {
                        tracing::warn!(
                            "Attribute '{}' of node {} has a mismatched layout",
                            attribute,
                            part.node
                        );
                    }
                }
                None => {
                    merged.insert(attribute.clone(), array.clone());
                }
            }
        }
        triangles.extend(part.triangles.iter().map(|t| Triangle {
            indices: t.indices.map(|i| i + offset),
            material: t.material,
        }));
        offset += corners as u32;
    }

    let mut mesh = IntermediateMesh::new(name.as_str(), root, triangles);
    for (attribute, array) in merged {
        mesh.set_array(&attribute, 0, array);
    }
    mesh.mark_collapsed();

    if config.skeleton {
        ctx.log.warn(format!(
            "'{}' is collapsed; skinning is not exported",
            name
        ));
    }
    ctx.log.info(format!(
        "Collapsed {} nodes into '{}' ({} triangles)",
        parts.len(),
        name,
        mesh.triangles().len()
    ));
    Ok(mesh)
}
