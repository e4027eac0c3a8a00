//! Intermediate mesh → engine mesh resource
//!
//! Gathers the requested attribute arrays, deduplicates them, partitions the
//! triangles by material and lays the vertices out either in one shared
//! buffer or in a dedicated buffer per submesh. Each attribute is its own
//! vertex stream, bound in the order position, normal, diffuse, texcoords.

use glam::{Vec3, Vec4};
use hashbrown::HashMap;

use lexi_common::{
    Aabb, IndexBuffer, IndexType, Mesh, PoseRef, PoseTarget, Skeleton, VertexData,
    VertexElementSemantic, VertexElementType, pack_color_argb,
};

use crate::animation::{MAX_SAMPLED_FRAMES, sample_frames};
use crate::builder::geometry::{self, DIFFUSE, NORMAL, POSITION};
use crate::compiler::skeleton::compile_skeleton;
use crate::config::ExportConfig;
use crate::context::ExportContext;
use crate::error::ExportError;
use crate::intermediate::IntermediateMesh;
use crate::material::MaterialId;
use crate::mesh_array::MeshArray;
use crate::pose::build_pose;
use crate::scene::SceneSource;

/// Submesh material name for triangles without a material
pub const NO_MATERIAL: &str = "NoMaterial";

/// Engine resources produced from one intermediate mesh
#[derive(Debug)]
pub struct CompiledMesh {
    pub mesh: Mesh,
    pub skeleton: Option<Skeleton>,
    /// Materials referenced by the submeshes
    pub materials: Vec<MaterialId>,
}

/// Vertex placement: one shared buffer, or per submesh the global vertices it uses
enum Layout {
    Shared,
    Dedicated(Vec<Vec<u32>>),
}

type PoseOffsets = Vec<(u32, Vec3)>;

pub fn compile_mesh(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    source: &mut IntermediateMesh,
    config: &ExportConfig,
    skeleton_name: Option<&str>,
) -> Result<CompiledMesh, ExportError> {
    let attributes = gather_attributes(ctx, scene, source, config)?;

    if config.reindex {
        let names: Vec<&str> = attributes.iter().map(String::as_str).collect();
        let before = source.vertex_count();
        if source.reindex(&names).is_some() {
            ctx.log.debug(format!(
                "Reindexed '{}': {} → {} vertices",
                source.name(),
                before,
                source.vertex_count()
            ));
        }
    }

    let vertex_count = source.vertex_count();
    let mut mesh = Mesh::new(source.name());

    // Material groups in first-use order, unassigned triangles last
    let mut groups: Vec<Option<MaterialId>> =
        source.materials().iter().copied().map(Some).collect();
    if source.has_unassigned_triangles() {
        groups.push(None);
    }

    let mut layout = if config.use_shared_geometry {
        Layout::Shared
    } else {
        Layout::Dedicated(Vec::with_capacity(groups.len()))
    };

    let mut bounds = Bounds::default();
    if matches!(layout, Layout::Shared) {
        mesh.shared_vertex_data = Some(build_vertex_data(source, &attributes, None, &mut bounds));
    }

    for &group in &groups {
        let material_name = match group {
            Some(id) => ctx
                .materials
                .get(id)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| NO_MATERIAL.to_string()),
            None => NO_MATERIAL.to_string(),
        };
        let indices: Vec<u32> = source
            .triangles_with_material(group)
            .flat_map(|t| t.indices)
            .collect();

        match &mut layout {
            Layout::Shared => {
                let index_type = IndexType::for_vertex_count(vertex_count);
                mesh.create_submesh(
                    material_name,
                    true,
                    IndexBuffer::from_indices(index_type, &indices),
                );
            }
            Layout::Dedicated(picks_per_submesh) => {
                let (local_indices, picks) = localize(&indices);
                let index_type = IndexType::for_vertex_count(picks.len());
                let submesh = mesh.create_submesh(
                    material_name,
                    false,
                    IndexBuffer::from_indices(index_type, &local_indices),
                );
                mesh.submeshes[submesh].vertex_data =
                    Some(build_vertex_data(source, &attributes, Some(&picks), &mut bounds));
                picks_per_submesh.push(picks);
            }
        }
    }

    mesh.bounds = bounds.aabb;
    mesh.bounding_radius = bounds.radius_sq.sqrt();

    let mut skeleton = None;
    if let Some(intermediate) = source.skeleton() {
        add_bone_assignments(&mut mesh, source, &layout);
        skeleton = Some(compile_skeleton(intermediate).map_err(ExportError::Resource)?);
        mesh.skeleton_name = skeleton_name.map(str::to_string);
    }

    if source.has_pose_data() {
        compile_poses(ctx, scene, source, &mut mesh, &layout)?;
        compile_pose_animations(ctx, scene, source, &mut mesh, &layout)?;
    }

    ctx.log.info(format!(
        "Compiled '{}': {} vertices, {} submeshes, {} poses",
        mesh.name,
        mesh.vertex_count(),
        mesh.submeshes.len(),
        mesh.poses.len()
    ));

    Ok(CompiledMesh {
        mesh,
        skeleton,
        materials: source.materials().to_vec(),
    })
}

/// Sample every requested attribute at the reference time
fn gather_attributes(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    source: &mut IntermediateMesh,
    config: &ExportConfig,
) -> Result<Vec<String>, ExportError> {
    if source.array(scene, POSITION, 0).is_none() {
        return Err(ExportError::NoGeometry(source.name().to_string()));
    }
    let mut attributes = vec![POSITION.to_string()];

    if config.normals {
        if source.array(scene, NORMAL, 0).is_some() {
            attributes.push(NORMAL.to_string());
        } else {
            ctx.log
                .warn(format!("'{}' has no normals", source.name()));
        }
    }

    if config.vertex_colors {
        if source.array(scene, DIFFUSE, 0).is_none() {
            ctx.log.warn(format!(
                "'{}' has no vertex colours; using white",
                source.name()
            ));
            let white = MeshArray::Vec4(vec![Vec4::ONE; source.vertex_count()]);
            source.set_array(DIFFUSE, 0, white);
        }
        attributes.push(DIFFUSE.to_string());
    }

    if config.uv {
        let mut channels: Vec<u32> = if source.is_collapsed() {
            source
                .array_names()
                .filter_map(geometry::parse_uv_attribute)
                .collect()
        } else {
            scene
                .evaluate_mesh(source.node(), 0)
                .map(|m| {
                    m.maps
                        .iter()
                        .filter(|(_, c)| c.used)
                        .map(|(&ch, _)| ch)
                        .filter(|&ch| (1..=geometry::MAX_UV_CHANNEL).contains(&ch))
                        .collect()
                })
                .unwrap_or_default()
        };
        channels.sort_unstable();
        for channel in channels {
            let name = geometry::uv_attribute(channel);
            if source.array(scene, &name, 0).is_some() {
                attributes.push(name);
            }
        }
    }

    Ok(attributes)
}

/// Rebase global indices onto the vertices they use, in first-use order
fn localize(indices: &[u32]) -> (Vec<u32>, Vec<u32>) {
    let mut local_of: HashMap<u32, u32> = HashMap::new();
    let mut picks = Vec::new();
    let local = indices
        .iter()
        .map(|&global| {
            *local_of.entry(global).or_insert_with(|| {
                picks.push(global);
                (picks.len() - 1) as u32
            })
        })
        .collect();
    (local, picks)
}

fn attribute_stream(name: &str) -> Option<(VertexElementSemantic, VertexElementType, u16)> {
    match name {
        POSITION => Some((VertexElementSemantic::Position, VertexElementType::Float3, 0)),
        NORMAL => Some((VertexElementSemantic::Normal, VertexElementType::Float3, 0)),
        DIFFUSE => Some((VertexElementSemantic::Diffuse, VertexElementType::ColourArgb, 0)),
        _ => geometry::parse_uv_attribute(name).map(|n| {
            (
                VertexElementSemantic::TexCoord,
                VertexElementType::Float2,
                (n - 1) as u16,
            )
        }),
    }
}

fn write_floats(dst: &mut [u8], values: &[f32]) {
    for (chunk, v) in dst.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&v.to_le_bytes());
    }
}

fn write_element(dst: &mut [u8], array: &MeshArray, i: usize) {
    match array {
        MeshArray::Vec2(v) => write_floats(dst, &v[i].to_array()),
        MeshArray::Vec3(v) => write_floats(dst, &v[i].to_array()),
        MeshArray::Vec4(v) => dst.copy_from_slice(&pack_color_argb(v[i].to_array()).to_le_bytes()),
        MeshArray::BoneData(_) => {}
    }
}

/// Box and squared radius merged while positions are written
struct Bounds {
    aabb: Aabb,
    radius_sq: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            aabb: Aabb::EMPTY,
            radius_sq: 0.0,
        }
    }
}

impl Bounds {
    fn merge(&mut self, p: Vec3) {
        self.aabb.merge_point(p);
        self.radius_sq = self.radius_sq.max(p.length_squared());
    }
}

/// One stream per attribute, holding either every vertex or only `picks`
fn build_vertex_data(
    source: &IntermediateMesh,
    attributes: &[String],
    picks: Option<&[u32]>,
    bounds: &mut Bounds,
) -> VertexData {
    let count = picks.map_or(source.vertex_count(), |p| p.len());
    let mut data = VertexData::new(count as u32);

    for name in attributes {
        let (Some(array), Some((semantic, element_type, index))) =
            (source.cached_array(name), attribute_stream(name))
        else {
            continue;
        };
        if array.len() != source.vertex_count() {
            tracing::warn!(
                "Attribute '{}' has {} elements for {} vertices; skipped",
                name,
                array.len(),
                source.vertex_count()
            );
            continue;
        }
        let binding = data.add_stream(semantic, element_type, index);
        let Some(buffer) = data.buffer_mut(binding) else {
            continue;
        };
        let positions = if name == POSITION { array.as_vec3() } else { None };
        for v in 0..count {
            let src = picks.map_or(v, |p| p[v] as usize);
            write_element(buffer.vertex_mut(v), array, src);
            if let Some(positions) = positions {
                bounds.merge(positions[src]);
            }
        }
    }
    data
}

fn add_bone_assignments(mesh: &mut Mesh, source: &IntermediateMesh, layout: &Layout) {
    let Some(skeleton) = source.skeleton() else {
        return;
    };
    match layout {
        Layout::Shared => {
            for (vertex, influences) in skeleton.vertex_assignments() {
                for d in influences {
                    mesh.add_bone_assignment(vertex, d.bone_index as u16, d.weight);
                }
            }
        }
        Layout::Dedicated(picks_per_submesh) => {
            for (submesh, picks) in mesh.submeshes.iter_mut().zip(picks_per_submesh) {
                for (local, &global) in picks.iter().enumerate() {
                    for d in skeleton.vertex_data(global) {
                        submesh.add_bone_assignment(local as u32, d.bone_index as u16, d.weight);
                    }
                }
            }
        }
    }
}

/// Split global-index offsets into per-target offset lists
fn split_offsets(layout: &Layout, offsets: &PoseOffsets) -> Vec<(PoseTarget, PoseOffsets)> {
    match layout {
        Layout::Shared => vec![(PoseTarget::Shared, offsets.clone())],
        Layout::Dedicated(picks_per_submesh) => picks_per_submesh
            .iter()
            .enumerate()
            .map(|(submesh, picks)| {
                let local_of: HashMap<u32, u32> = picks
                    .iter()
                    .enumerate()
                    .map(|(local, &global)| (global, local as u32))
                    .collect();
                let local_offsets = offsets
                    .iter()
                    .filter_map(|&(global, offset)| {
                        local_of.get(&global).map(|&local| (local, offset))
                    })
                    .collect();
                (PoseTarget::SubMesh(submesh as u16), local_offsets)
            })
            .collect(),
    }
}

/// Create one pose per target; returns `(target, pose index)` pairs
fn emit_pose(
    mesh: &mut Mesh,
    layout: &Layout,
    name: &str,
    offsets: &PoseOffsets,
) -> Result<Vec<(PoseTarget, u16)>, ExportError> {
    let mut created = Vec::new();
    for (target, target_offsets) in split_offsets(layout, offsets) {
        let index = mesh
            .create_pose(target, name)
            .map_err(ExportError::Resource)?;
        if let Some(pose) = mesh.pose_mut(index) {
            for (vertex, offset) in target_offsets {
                pose.add_vertex(vertex, offset);
            }
        }
        created.push((target, index));
    }
    Ok(created)
}

fn compile_poses(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    source: &IntermediateMesh,
    mesh: &mut Mesh,
    layout: &Layout,
) -> Result<(), ExportError> {
    for (name, pose) in source.poses() {
        match build_pose(scene, source, pose.frame, pose.optimize) {
            Ok(offsets) => {
                emit_pose(mesh, layout, name, &offsets)?;
            }
            Err(err) => ctx
                .log
                .error(format!("Pose '{}' skipped: {}", name, err)),
        }
    }
    Ok(())
}

fn compile_pose_animations(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    source: &IntermediateMesh,
    mesh: &mut Mesh,
    layout: &Layout,
) -> Result<(), ExportError> {
    let fps = scene.frame_rate().max(1) as f32;

    for (name, anim) in source.pose_animations() {
        let frames = sample_frames(anim.start, anim.end, anim.sample_rate);
        if frames.is_empty() {
            ctx.log.error(format!(
                "Pose animation '{}' skipped: no frames in {}..{} step {} (limit {})",
                name, anim.start, anim.end, anim.sample_rate, MAX_SAMPLED_FRAMES
            ));
            continue;
        }

        let sampled: Result<Vec<PoseOffsets>, _> = frames
            .iter()
            .map(|&frame| build_pose(scene, source, frame, anim.optimize))
            .collect();
        let sampled = match sampled {
            Ok(sampled) => sampled,
            Err(err) => {
                ctx.log
                    .error(format!("Pose animation '{}' skipped: {}", name, err));
                continue;
            }
        };

        // Per frame, the pose index used on each target
        let mut keys: Vec<(f32, Vec<(PoseTarget, u16)>)> = Vec::with_capacity(frames.len());
        for (i, (&frame, offsets)) in frames.iter().zip(&sampled).enumerate() {
            let reuse = anim.optimize && i > 0 && sampled[i - 1] == *offsets;
            let poses = match (reuse, keys.last()) {
                (true, Some((_, previous))) => previous.clone(),
                _ => emit_pose(mesh, layout, &format!("{}_{}", name, i), offsets)?,
            };
            keys.push(((frame - anim.start) / fps, poses));
        }

        let targets: Vec<PoseTarget> = keys
            .first()
            .map(|(_, poses)| poses.iter().map(|&(t, _)| t).collect())
            .unwrap_or_default();
        let animation = mesh.create_animation(name, (anim.end - anim.start) / fps);
        for target in targets {
            let track = animation.create_track(target);
            for (time, poses) in &keys {
                let keyframe = track.create_keyframe(*time);
                keyframe.refs.extend(
                    poses
                        .iter()
                        .filter(|(t, _)| *t == target)
                        .map(|&(_, pose_index)| PoseRef {
                            pose_index,
                            influence: 1.0,
                        }),
                );
            }
        }
        ctx.log.debug(format!(
            "Pose animation '{}': {} keyframes",
            name,
            keys.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use crate::config::{PoseAnimationSpec, PoseSpec};
    use crate::scene::{
        HostChannel, HostFace, HostMaterial, HostMesh, HostSkin, MemoryScene, NodeDesc,
        NodeHandle, NodeKind, SceneDesc, StandardMaterial, VertexKey,
    };
    use std::collections::BTreeMap;

    fn standard(name: &str) -> Option<StandardMaterial> {
        Some(StandardMaterial {
            name: name.to_string(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::ONE,
            specular: Vec3::ZERO,
            emissive: Vec3::ZERO,
            glossiness: 0.0,
            specular_level: 0.0,
            opacity: 1.0,
            two_sided: false,
            wire: false,
            faceted: false,
            maps: Vec::new(),
        })
    }

    /// Flat quad split into two triangles with different materials
    fn quad_scene() -> MemoryScene {
        let mut maps = BTreeMap::new();
        maps.insert(
            1,
            HostChannel {
                used: true,
                values: vec![
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(1.0, 0.0, 0.0),
                    Vec3::new(1.0, 1.0, 0.0),
                    Vec3::new(0.0, 1.0, 0.0),
                ],
                faces: vec![[0, 1, 2], [0, 2, 3]],
            },
        );
        let mut node = NodeDesc::new(1, "Quad", NodeKind::Geometry);
        node.mesh = Some(HostMesh {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![
                HostFace {
                    vertices: [0, 1, 2],
                    material: 0,
                    smoothing: 1,
                },
                HostFace {
                    vertices: [0, 2, 3],
                    material: 1,
                    smoothing: 1,
                },
            ],
            maps,
            ..Default::default()
        });
        node.material = Some(HostMaterial::Multi {
            materials: vec![standard("Front"), standard("Back")],
        });
        let mut lifted = node.mesh.as_ref().unwrap().vertices.clone();
        lifted[2].z = 1.0;
        node.vertex_keys.push(VertexKey {
            frame: 10.0,
            vertices: lifted,
            faces: None,
        });
        MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes: vec![node],
        })
        .unwrap()
    }

    fn compile(config: &ExportConfig) -> (ExportContext, CompiledMesh) {
        let scene = quad_scene();
        let mut ctx = ExportContext::new();
        let mut mesh = builder::create_mesh(&mut ctx, &scene, NodeHandle(1), config).unwrap();
        builder::add_animation_data(&mut ctx, &scene, &mut mesh, config);
        let compiled = compile_mesh(&mut ctx, &scene, &mut mesh, config, None).unwrap();
        (ctx, compiled)
    }

    #[test]
    fn test_shared_layout() {
        let (_, compiled) = compile(&ExportConfig::default());
        let mesh = &compiled.mesh;
        let shared = mesh.shared_vertex_data.as_ref().unwrap();
        // Corners 0 and 2 repeat across the two triangles
        assert_eq!(shared.vertex_count, 4);
        assert_eq!(shared.elements.len(), 3);
        assert_eq!(shared.elements[0].semantic, VertexElementSemantic::Position);
        assert_eq!(shared.elements[2].semantic, VertexElementSemantic::TexCoord);
        assert_eq!(shared.elements[2].index, 0);
        assert_eq!(shared.bindings[2].vertex_size, 8);

        assert_eq!(mesh.submeshes.len(), 2);
        assert_eq!(mesh.submeshes[0].material_name, "Front");
        assert_eq!(mesh.submeshes[1].material_name, "Back");
        assert!(mesh.submeshes.iter().all(|s| s.use_shared_vertices));
        assert_eq!(mesh.submeshes[0].indices.index_type(), IndexType::U16);
        assert_eq!(compiled.materials.len(), 2);

        assert!((mesh.bounds.max - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
        assert!((mesh.bounds.min - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
        assert!((mesh.bounding_radius - 2f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_dedicated_layout() {
        let config = ExportConfig {
            use_shared_geometry: false,
            ..Default::default()
        };
        let (_, compiled) = compile(&config);
        let mesh = &compiled.mesh;
        assert!(mesh.shared_vertex_data.is_none());
        for submesh in &mesh.submeshes {
            assert!(!submesh.use_shared_vertices);
            let data = submesh.vertex_data.as_ref().unwrap();
            assert_eq!(data.vertex_count, 3);
            let indices: Vec<u32> = (0..submesh.indices.len())
                .map(|i| submesh.indices.get(i).unwrap())
                .collect();
            assert_eq!(indices, vec![0, 1, 2]);
        }
        assert_eq!(mesh.vertex_count(), 6);
    }

    #[test]
    fn test_no_reindex_keeps_corners() {
        let config = ExportConfig {
            reindex: false,
            ..Default::default()
        };
        let (_, compiled) = compile(&config);
        assert_eq!(compiled.mesh.vertex_count(), 6);
    }

    #[test]
    fn test_missing_vertex_colours_default_white() {
        let config = ExportConfig {
            vertex_colors: true,
            ..Default::default()
        };
        let (ctx, compiled) = compile(&config);
        let shared = compiled.mesh.shared_vertex_data.as_ref().unwrap();
        let diffuse = shared
            .find_element(VertexElementSemantic::Diffuse, 0)
            .unwrap();
        let buffer = shared.buffer(diffuse.binding).unwrap();
        assert_eq!(&buffer.data[0..4], &0xFFFF_FFFFu32.to_le_bytes());
        assert_eq!(ctx.log.problems().count(), 1);
    }

    #[test]
    fn test_poses_and_pose_animation() {
        let config = ExportConfig {
            poses: vec![PoseSpec {
                name: "Lift".to_string(),
                frame: 10.0,
                optimize: true,
            }],
            pose_animations: vec![PoseAnimationSpec {
                name: "Rise".to_string(),
                start: 0.0,
                end: 10.0,
                sample_rate: 5.0,
                optimize: true,
            }],
            ..Default::default()
        };
        let (_, compiled) = compile(&config);
        let mesh = &compiled.mesh;

        let lift = &mesh.poses[0];
        assert_eq!(lift.name, "Lift");
        assert_eq!(lift.target, PoseTarget::Shared);
        assert_eq!(lift.offsets.len(), 1);
        assert_eq!(lift.offsets[0].1, [0.0, 1.0, 0.0]);

        // Frames 0, 5 and 10: three distinct poses after the named one
        assert_eq!(mesh.poses.len(), 4);
        assert_eq!(mesh.poses[1].name, "Rise_0");
        assert!(mesh.poses[1].offsets.is_empty());

        let anim = &mesh.animations[0];
        assert_eq!(anim.name, "Rise");
        assert!((anim.length - 10.0 / 30.0).abs() < 1e-6);
        assert_eq!(anim.tracks.len(), 1);
        let keys = &anim.tracks[0].keyframes;
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[2].refs[0].pose_index, 3);
        assert_eq!(keys[2].refs[0].influence, 1.0);
    }

    #[test]
    fn test_oversampled_pose_animation_skipped() {
        let config = ExportConfig {
            pose_animations: vec![PoseAnimationSpec {
                name: "Rise".to_string(),
                start: 0.0,
                end: 10.0,
                sample_rate: 1e-20,
                optimize: true,
            }],
            ..Default::default()
        };
        let (ctx, compiled) = compile(&config);
        assert!(compiled.mesh.poses.is_empty());
        assert!(compiled.mesh.animations.is_empty());
        assert!(
            ctx.log
                .problems()
                .any(|e| e.message.starts_with("Pose animation 'Rise' skipped"))
        );
    }

    #[test]
    fn test_dedicated_poses_per_submesh() {
        let config = ExportConfig {
            use_shared_geometry: false,
            poses: vec![PoseSpec {
                name: "Lift".to_string(),
                frame: 10.0,
                optimize: true,
            }],
            ..Default::default()
        };
        let (_, compiled) = compile(&config);
        let poses = &compiled.mesh.poses;
        assert_eq!(poses.len(), 2);
        assert_eq!(poses[0].target, PoseTarget::SubMesh(0));
        assert_eq!(poses[1].target, PoseTarget::SubMesh(1));
        // The lifted host vertex is the third corner of the first triangle
        // and the second corner of the other
        assert_eq!(poses[0].offsets, vec![(2, [0.0, 1.0, 0.0])]);
        assert_eq!(poses[1].offsets, vec![(1, [0.0, 1.0, 0.0])]);
    }

    #[test]
    fn test_collapsed_mesh_skips_poses() {
        let scene = quad_scene();
        let config = ExportConfig {
            poses: vec![PoseSpec {
                name: "Lift".to_string(),
                frame: 10.0,
                optimize: true,
            }],
            ..Default::default()
        };
        let mut ctx = ExportContext::new();
        let mut mesh =
            builder::collapse_hierarchy(&mut ctx, &scene, NodeHandle(1), &config).unwrap();
        builder::add_animation_data(&mut ctx, &scene, &mut mesh, &config);
        let compiled = compile_mesh(&mut ctx, &scene, &mut mesh, &config, None).unwrap();
        assert!(compiled.mesh.poses.is_empty());
        assert!(ctx.log.problems().any(|e| e.message.contains("Lift")));
    }

    /// Triangle skinned to three strong bones and one just above the collection epsilon
    fn weak_influence_scene() -> MemoryScene {
        let mut nodes: Vec<NodeDesc> = (0..4)
            .map(|i| NodeDesc::new(10 + i, format!("Bone{}", i), NodeKind::Bone))
            .collect();
        let mut body = NodeDesc::new(1, "Body", NodeKind::Geometry);
        body.mesh = Some(HostMesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            faces: vec![HostFace {
                vertices: [0, 1, 2],
                material: 0,
                smoothing: 1,
            }],
            ..Default::default()
        });
        body.skin = Some(HostSkin {
            bones: (10..14).map(NodeHandle).collect(),
            weights: vec![vec![(0, 1.0), (1, 1.0), (2, 1.0), (3, 0.002)]; 3],
        });
        nodes.push(body);
        MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes,
        })
        .unwrap()
    }

    /// Per vertex: summed weight and number of assignments
    fn emitted_weight_sums(
        assignments: &[lexi_common::BoneAssignment],
    ) -> BTreeMap<u32, (f32, usize)> {
        let mut sums = BTreeMap::new();
        for a in assignments {
            let entry = sums.entry(a.vertex).or_insert((0.0, 0));
            entry.0 += a.weight;
            entry.1 += 1;
        }
        sums
    }

    #[test]
    fn test_bone_assignments_keep_normalized_weights() {
        let scene = weak_influence_scene();
        for shared in [true, false] {
            let config = ExportConfig {
                skeleton: true,
                use_shared_geometry: shared,
                ..Default::default()
            };
            let mut ctx = ExportContext::new();
            let mut mesh =
                builder::create_mesh(&mut ctx, &scene, NodeHandle(1), &config).unwrap();
            let compiled = compile_mesh(&mut ctx, &scene, &mut mesh, &config, None).unwrap();

            let assignments = if shared {
                compiled.mesh.shared_bone_assignments.clone()
            } else {
                compiled.mesh.submeshes[0].bone_assignments.clone()
            };
            let sums = emitted_weight_sums(&assignments);
            assert_eq!(sums.len(), 3);
            for (vertex, (sum, count)) in sums {
                assert_eq!(count, 4, "vertex {} lost an influence", vertex);
                assert!((sum - 1.0).abs() < 1e-5, "vertex {} sums to {}", vertex, sum);
            }
        }
    }

    #[test]
    fn test_bounds_match_between_layouts() {
        let (_, shared) = compile(&ExportConfig::default());
        let (_, dedicated) = compile(&ExportConfig {
            use_shared_geometry: false,
            ..Default::default()
        });
        assert_eq!(shared.mesh.bounds, dedicated.mesh.bounds);
        assert_eq!(shared.mesh.bounding_radius, dedicated.mesh.bounding_radius);
        assert!(!dedicated.mesh.bounds.is_empty());
    }

    #[test]
    fn test_localize() {
        let (local, picks) = localize(&[5, 7, 9, 9, 7, 2]);
        assert_eq!(local, vec![0, 1, 2, 2, 1, 3]);
        assert_eq!(picks, vec![5, 7, 9, 2]);
    }
}
