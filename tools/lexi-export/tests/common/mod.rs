//! Shared scene fixtures for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use glam::{Quat, Vec3};
use lexi_export::scene::{
    HostFace, HostMaterial, HostMesh, HostSkin, MemoryScene, NodeDesc, NodeHandle, NodeKind,
    SceneDesc, StandardMaterial, TransformKey, VertexKey,
};

pub fn key(frame: f32, position: Vec3, rotation: Quat) -> TransformKey {
    TransformKey {
        frame,
        position,
        rotation,
        ..Default::default()
    }
}

fn face(vertices: [u32; 3], material: u32) -> HostFace {
    HostFace {
        vertices,
        material,
        smoothing: 1,
    }
}

/// Unit quad in the host XY plane, two faces
pub fn quad_mesh() -> HostMesh {
    HostMesh {
        vertices: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        faces: vec![face([0, 1, 2], 0), face([0, 2, 3], 1)],
        ..Default::default()
    }
}

fn standard(name: &str) -> StandardMaterial {
    StandardMaterial {
        name: name.to_string(),
        ambient: Vec3::splat(0.1),
        diffuse: Vec3::new(0.8, 0.2, 0.2),
        specular: Vec3::ONE,
        emissive: Vec3::ZERO,
        glossiness: 20.0,
        specular_level: 0.5,
        opacity: 1.0,
        two_sided: false,
        wire: false,
        faceted: false,
        maps: Vec::new(),
    }
}

/// Two-bone chain (Scenario C): `Upper` at the origin, `Lower` 10 units along
/// host +Y. `Upper` turns 90° about host Z between frames 0 and 10.
pub fn chain_scene() -> SceneDesc {
    let mut upper = NodeDesc::new(1, "Upper", NodeKind::Bone);
    upper.keys = vec![
        key(0.0, Vec3::ZERO, Quat::IDENTITY),
        key(10.0, Vec3::ZERO, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
    ];

    let mut lower = NodeDesc::new(2, "Lower", NodeKind::Bone);
    lower.parent = Some(NodeHandle(1));
    lower.keys = vec![key(0.0, Vec3::new(0.0, 10.0, 0.0), Quat::IDENTITY)];

    let mut body = NodeDesc::new(3, "Body", NodeKind::Geometry);
    body.keys = vec![key(0.0, Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY)];
    body.mesh = Some(quad_mesh());
    body.material = Some(HostMaterial::Multi {
        materials: vec![Some(standard("Skin")), Some(standard("Cloth"))],
    });
    body.skin = Some(HostSkin {
        bones: vec![NodeHandle(1), NodeHandle(2)],
        weights: vec![
            vec![(0, 1.0)],
            vec![(0, 0.5), (1, 0.5)],
            vec![(1, 1.0)],
            vec![(1, 0.75), (0, 0.25)],
        ],
    });

    SceneDesc {
        frame_rate: 30,
        nodes: vec![upper, lower, body],
    }
}

/// Static quad with a vertex key lifting one corner at frame 10
pub fn morph_scene() -> SceneDesc {
    let mut face_node = NodeDesc::new(1, "Face", NodeKind::Geometry);
    let mesh = quad_mesh();
    let mut lifted = mesh.vertices.clone();
    lifted[2].z = 1.0;
    face_node.vertex_keys = vec![VertexKey {
        frame: 10.0,
        vertices: lifted,
        faces: None,
    }];
    face_node.mesh = Some(mesh);

    let mut prop = NodeDesc::new(2, "Prop", NodeKind::Geometry);
    prop.mesh = Some(quad_mesh());
    prop.material = Some(HostMaterial::Standard(standard("Wood")));

    let mut spline = NodeDesc::new(3, "Spline", NodeKind::Geometry);
    spline.parent = Some(NodeHandle(2));

    SceneDesc {
        frame_rate: 30,
        nodes: vec![face_node, prop, spline],
    }
}

pub fn build_scene(desc: SceneDesc) -> MemoryScene {
    MemoryScene::new(desc).expect("valid scene")
}

/// Write a scene description as JSON and return its path
pub fn write_scene(dir: &Path, name: &str, desc: &SceneDesc) -> PathBuf {
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(desc).expect("serialize scene");
    std::fs::write(&path, json).expect("write scene");
    path
}
