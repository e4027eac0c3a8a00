//! Geometry extraction
//!
//! Turns an evaluated host mesh into flat per-corner attribute arrays in
//! engine axes. Output is never deduplicated: an array always holds
//! `3 × triangle_count` elements, corner order following the triangle winding.

use glam::{Vec2, Vec3, Vec4};

use crate::math::{has_negative_parity, host_to_engine};
use crate::mesh_array::MeshArray;
use crate::scene::{HostFace, HostMesh, NodeHandle, SceneSource, TimeValue};

pub const POSITION: &str = "position";
pub const NORMAL: &str = "normal";
pub const DIFFUSE: &str = "diffuse";

/// Highest texture coordinate channel
pub const MAX_UV_CHANNEL: u32 = 99;

/// Attribute name of texture channel `n`
pub fn uv_attribute(n: u32) -> String {
    format!("uv{}", n)
}

/// Channel number of a `uv<N>` attribute name
pub fn parse_uv_attribute(name: &str) -> Option<u32> {
    let n: u32 = name.strip_prefix("uv")?.parse().ok()?;
    (1..=MAX_UV_CHANNEL).contains(&n).then_some(n)
}

/// Corner emission order for a node: reversed for mirrored transforms
pub fn winding(scene: &dyn SceneSource, node: NodeHandle, time: TimeValue) -> [usize; 3] {
    match scene.object_transform(node, time) {
        Some(tm) if has_negative_parity(tm) => [2, 1, 0],
        _ => [0, 1, 2],
    }
}

/// Host vertex index behind every emitted corner
pub fn corner_vertices(mesh: &HostMesh, winding: [usize; 3]) -> Vec<u32> {
    mesh.faces
        .iter()
        .flat_map(|f| winding.map(|c| f.vertices[c]))
        .collect()
}

fn per_corner<T>(
    faces: &[HostFace],
    winding: [usize; 3],
    mut value: impl FnMut(usize, usize) -> T,
) -> Vec<T> {
    let mut out = Vec::with_capacity(faces.len() * 3);
    for face in 0..faces.len() {
        for c in winding {
            out.push(value(face, c));
        }
    }
    out
}

/// Build one attribute array for `node` evaluated at `time`
///
/// Returns `None` when the node has no mesh, the mesh is empty, or the
/// attribute's source channel does not exist.
pub fn build_attribute_array(
    scene: &dyn SceneSource,
    node: NodeHandle,
    attribute: &str,
    time: TimeValue,
) -> Option<MeshArray> {
    let mesh = scene.evaluate_mesh(node, time)?;
    if mesh.faces.is_empty() || mesh.vertices.is_empty() {
        return None;
    }
    let winding = winding(scene, node, time);
    attribute_from_mesh(&mesh, attribute, winding)
}

/// Same as [`build_attribute_array`] for an already evaluated mesh
pub fn attribute_from_mesh(
    mesh: &HostMesh,
    attribute: &str,
    winding: [usize; 3],
) -> Option<MeshArray> {
    match attribute {
        POSITION => Some(MeshArray::Vec3(per_corner(&mesh.faces, winding, |f, c| {
            host_to_engine(mesh.vertices[mesh.faces[f].vertices[c] as usize])
        }))),
        NORMAL => {
            let normals = mesh.corner_normals();
            Some(MeshArray::Vec3(per_corner(&mesh.faces, winding, |f, c| {
                host_to_engine(normals[f][c]).normalize_or(Vec3::Y)
            })))
        }
        DIFFUSE => {
            let colors = mesh.colors.as_ref().filter(|c| c.used)?;
            // Host colours are stored blue, green, red
            Some(MeshArray::Vec4(per_corner(&mesh.faces, winding, |f, c| {
                let bgr = colors.values[colors.faces[f][c] as usize];
                Vec4::new(bgr.z, bgr.y, bgr.x, 1.0)
            })))
        }
        _ => {
            let channel = parse_uv_attribute(attribute)?;
            let map = mesh.maps.get(&channel).filter(|m| m.used)?;
            Some(MeshArray::Vec2(per_corner(&mesh.faces, winding, |f, c| {
                let uvw = map.values[map.faces[f][c] as usize];
                Vec2::new(uvw.x, 1.0 - uvw.y)
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{HostChannel, MemoryScene, NodeDesc, NodeKind, SceneDesc, TransformKey};
    use std::collections::BTreeMap;

    fn triangle_mesh() -> HostMesh {
        let mut maps = BTreeMap::new();
        maps.insert(
            1,
            HostChannel {
                used: true,
                values: vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.25, 0.0)],
                faces: vec![[0, 1, 2]],
            },
        );
        maps.insert(
            2,
            HostChannel {
                used: false,
                values: vec![Vec3::ZERO],
                faces: vec![[0, 0, 0]],
            },
        );
        HostMesh {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![HostFace {
                vertices: [0, 1, 2],
                material: 0,
                smoothing: 1,
            }],
            normals: None,
            colors: Some(HostChannel {
                used: true,
                values: vec![Vec3::new(0.0, 0.5, 1.0)],
                faces: vec![[0, 0, 0]],
            }),
            maps,
        }
    }

    fn scene_with(mesh: HostMesh, scale: Vec3) -> MemoryScene {
        let mut node = NodeDesc::new(1, "Tri", NodeKind::Geometry);
        node.mesh = Some(mesh);
        node.keys.push(TransformKey {
            scale,
            ..Default::default()
        });
        MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes: vec![node],
        })
        .unwrap()
    }

    #[test]
    fn test_positions_in_engine_axes() {
        let scene = scene_with(triangle_mesh(), Vec3::ONE);
        let array = build_attribute_array(&scene, NodeHandle(1), POSITION, 0).unwrap();
        let p = array.as_vec3().unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p[1], Vec3::new(1.0, 0.0, 0.0));
        // Host +Y becomes engine -Z
        assert_eq!(p[2], Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_mirrored_node_flips_winding() {
        let scene = scene_with(triangle_mesh(), Vec3::new(-1.0, 1.0, 1.0));
        let array = build_attribute_array(&scene, NodeHandle(1), POSITION, 0).unwrap();
        let p = array.as_vec3().unwrap();
        assert_eq!(p[0], Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(p[2], Vec3::ZERO);
    }

    #[test]
    fn test_normals_point_engine_up() {
        let scene = scene_with(triangle_mesh(), Vec3::ONE);
        let array = build_attribute_array(&scene, NodeHandle(1), NORMAL, 0).unwrap();
        for n in array.as_vec3().unwrap() {
            assert!((*n - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn test_diffuse_reorders_channels() {
        let scene = scene_with(triangle_mesh(), Vec3::ONE);
        let array = build_attribute_array(&scene, NodeHandle(1), DIFFUSE, 0).unwrap();
        assert_eq!(array.as_vec4().unwrap()[0], Vec4::new(1.0, 0.5, 0.0, 1.0));
    }

    #[test]
    fn test_uv_flips_v() {
        let scene = scene_with(triangle_mesh(), Vec3::ONE);
        let array = build_attribute_array(&scene, NodeHandle(1), "uv1", 0).unwrap();
        let uv = array.as_vec2().unwrap();
        assert_eq!(uv[0], Vec2::new(0.0, 1.0));
        assert_eq!(uv[2], Vec2::new(0.0, 0.75));
    }

    #[test]
    fn test_absent_attributes_are_none() {
        let mut mesh = triangle_mesh();
        mesh.colors = None;
        let scene = scene_with(mesh, Vec3::ONE);
        assert!(build_attribute_array(&scene, NodeHandle(1), DIFFUSE, 0).is_none());
        assert!(build_attribute_array(&scene, NodeHandle(1), "uv2", 0).is_none());
        assert!(build_attribute_array(&scene, NodeHandle(1), "uv3", 0).is_none());
        assert!(build_attribute_array(&scene, NodeHandle(1), "tangent", 0).is_none());
        assert!(build_attribute_array(&scene, NodeHandle(9), POSITION, 0).is_none());
    }

    #[test]
    fn test_uv_attribute_names() {
        assert_eq!(parse_uv_attribute("uv1"), Some(1));
        assert_eq!(parse_uv_attribute("uv99"), Some(99));
        assert_eq!(parse_uv_attribute("uv0"), None);
        assert_eq!(parse_uv_attribute("uv100"), None);
        assert_eq!(parse_uv_attribute("uvx"), None);
        assert_eq!(uv_attribute(3), "uv3");
    }

    #[test]
    fn test_corner_vertices_follow_winding() {
        let mesh = triangle_mesh();
        assert_eq!(corner_vertices(&mesh, [0, 1, 2]), vec![0, 1, 2]);
        assert_eq!(corner_vertices(&mesh, [2, 1, 0]), vec![2, 1, 0]);
    }
}
