//! In-memory host scene loaded from a JSON description
//!
//! Node transforms are keyframed local TRS values relative to the parent node.
//! Position and scale are interpolated linearly, rotation with slerp, and
//! sampling is clamped to the first/last key. Vertex keys give absolute vertex
//! positions at a frame; the mesh itself acts as the key at frame 0.

use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::{
    Capability, HostFace, HostMaterial, HostMesh, HostSkin, NodeHandle, NodeKind, SceneSource,
    TimeValue,
};
use crate::config::DEFAULT_FRAME_RATE;
use crate::error::SceneError;

/// Local transform sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformKey {
    #[serde(default)]
    pub frame: f32,
    #[serde(default)]
    pub position: Vec3,
    /// Quaternion [x, y, z, w]
    #[serde(default = "identity_rotation")]
    pub rotation: Quat,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

fn identity_rotation() -> Quat {
    Quat::IDENTITY
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

impl Default for TransformKey {
    fn default() -> Self {
        Self {
            frame: 0.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl TransformKey {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation.normalize(), self.position)
    }
}

/// Absolute vertex positions at a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexKey {
    pub frame: f32,
    pub vertices: Vec<Vec3>,
    /// Replacement topology from this key on
    #[serde(default)]
    pub faces: Option<Vec<HostFace>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDesc {
    pub handle: NodeHandle,
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: NodeKind,
    /// Parent handle; absent means the scene root
    #[serde(default)]
    pub parent: Option<NodeHandle>,
    #[serde(default)]
    pub keys: Vec<TransformKey>,
    #[serde(default)]
    pub object_offset: Option<TransformKey>,
    #[serde(default)]
    pub mesh: Option<HostMesh>,
    #[serde(default)]
    pub vertex_keys: Vec<VertexKey>,
    #[serde(default)]
    pub material: Option<HostMaterial>,
    #[serde(default)]
    pub skin: Option<HostSkin>,
}

fn default_kind() -> NodeKind {
    NodeKind::Other
}

impl NodeDesc {
    pub fn new(handle: u32, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            handle: NodeHandle(handle),
            name: name.into(),
            kind,
            parent: None,
            keys: Vec::new(),
            object_offset: None,
            mesh: None,
            vertex_keys: Vec::new(),
            material: None,
            skin: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDesc {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    pub nodes: Vec<NodeDesc>,
}

fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}

impl Default for SceneDesc {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            nodes: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct MemoryScene {
    frame_rate: u32,
    nodes: Vec<NodeDesc>,
    index: HashMap<NodeHandle, usize>,
    children: HashMap<NodeHandle, Vec<NodeHandle>>,
}

impl MemoryScene {
    /// Validate a description and build the scene
    pub fn new(desc: SceneDesc) -> Result<Self, SceneError> {
        let mut index = HashMap::new();
        for (i, node) in desc.nodes.iter().enumerate() {
            if node.handle == NodeHandle::ROOT || index.insert(node.handle, i).is_some() {
                return Err(SceneError::DuplicateHandle(node.handle));
            }
        }

        let mut children: HashMap<NodeHandle, Vec<NodeHandle>> = HashMap::new();
        for node in &desc.nodes {
            let parent = node.parent.unwrap_or(NodeHandle::ROOT);
            if parent != NodeHandle::ROOT && !index.contains_key(&parent) {
                return Err(SceneError::UnknownParent {
                    node: node.name.clone(),
                    parent,
                });
            }
            children.entry(parent).or_default().push(node.handle);
        }

        let scene = Self {
            frame_rate: desc.frame_rate.max(1),
            nodes: desc.nodes,
            index,
            children,
        };
        for node in &scene.nodes {
            scene.check_acyclic(node)?;
            validate_node(node, &scene)?;
        }
        Ok(scene)
    }

    pub fn from_json_str(s: &str) -> Result<Self, SceneError> {
        let desc: SceneDesc = serde_json::from_str(s)?;
        Self::new(desc)
    }

    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn nodes(&self) -> &[NodeDesc] {
        &self.nodes
    }

    fn node(&self, handle: NodeHandle) -> Option<&NodeDesc> {
        self.index.get(&handle).map(|&i| &self.nodes[i])
    }

    fn check_acyclic(&self, node: &NodeDesc) -> Result<(), SceneError> {
        let mut current = node.parent;
        let mut steps = 0;
        while let Some(handle) = current {
            if handle == NodeHandle::ROOT {
                return Ok(());
            }
            steps += 1;
            if handle == node.handle || steps > self.nodes.len() {
                return Err(SceneError::Cycle(node.name.clone()));
            }
            current = self.node(handle).and_then(|n| n.parent);
        }
        Ok(())
    }

    fn time_to_frame(&self, time: TimeValue) -> f32 {
        time as f32 / self.ticks_per_frame() as f32
    }
}

fn validate_node(node: &NodeDesc, scene: &MemoryScene) -> Result<(), SceneError> {
    let invalid_mesh = |reason: String| SceneError::InvalidMesh {
        node: node.name.clone(),
        reason,
    };

    if let Some(mesh) = &node.mesh {
        validate_topology(mesh.vertices.len(), &mesh.faces).map_err(invalid_mesh)?;
        if let Some(normals) = &mesh.normals {
            if normals.len() != mesh.faces.len() {
                return Err(invalid_mesh(format!(
                    "{} normal triples for {} faces",
                    normals.len(),
                    mesh.faces.len()
                )));
            }
        }
        let channels = mesh
            .colors
            .iter()
            .map(|c| ("colour".to_string(), c))
            .chain(mesh.maps.iter().map(|(k, c)| (format!("map {}", k), c)));
        for (label, channel) in channels {
            if channel.faces.len() != mesh.faces.len() {
                return Err(invalid_mesh(format!(
                    "{} channel has {} faces, mesh has {}",
                    label,
                    channel.faces.len(),
                    mesh.faces.len()
                )));
            }
            if channel
                .faces
                .iter()
                .flatten()
                .any(|&i| i as usize >= channel.values.len())
            {
                return Err(invalid_mesh(format!("{} channel index out of range", label)));
            }
        }
        for key in &node.vertex_keys {
            match &key.faces {
                Some(faces) => validate_topology(key.vertices.len(), faces).map_err(invalid_mesh)?,
                None if key.vertices.len() != mesh.vertices.len() => {
                    return Err(invalid_mesh(format!(
                        "vertex key at frame {} has {} vertices, mesh has {}",
                        key.frame,
                        key.vertices.len(),
                        mesh.vertices.len()
                    )));
                }
                None => {}
            }
        }
    }

    if let Some(skin) = &node.skin {
        let invalid_skin = |reason: String| SceneError::InvalidSkin {
            node: node.name.clone(),
            reason,
        };
        if let Some(missing) = skin.bones.iter().find(|b| !scene.index.contains_key(*b)) {
            return Err(invalid_skin(format!("unknown bone node {}", missing)));
        }
        if skin
            .weights
            .iter()
            .flatten()
            .any(|&(slot, _)| slot as usize >= skin.bones.len())
        {
            return Err(invalid_skin("bone slot out of range".to_string()));
        }
    }
    Ok(())
}

fn validate_topology(vertex_count: usize, faces: &[HostFace]) -> Result<(), String> {
    match faces
        .iter()
        .flat_map(|f| f.vertices)
        .find(|&v| v as usize >= vertex_count)
    {
        Some(v) => Err(format!(
            "face references vertex {} of {}",
            v, vertex_count
        )),
        None => Ok(()),
    }
}

// ============================================================================
// Interpolation
// ============================================================================

fn find_segment(frames: &[f32], frame: f32) -> (usize, usize, f32) {
    let mut i = 0;
    while i < frames.len() - 1 && frames[i + 1] < frame {
        i += 1;
    }
    if i >= frames.len() - 1 {
        return (i, i, 0.0);
    }
    let f0 = frames[i];
    let f1 = frames[i + 1];
    let factor = if f1 > f0 { (frame - f0) / (f1 - f0) } else { 0.0 };
    (i, i + 1, factor.clamp(0.0, 1.0))
}

fn sample_keys(keys: &[TransformKey], frame: f32) -> Mat4 {
    if keys.is_empty() {
        return Mat4::IDENTITY;
    }
    let frames: Vec<f32> = keys.iter().map(|k| k.frame).collect();
    let (i, j, t) = find_segment(&frames, frame);
    let (k0, k1) = (&keys[i], &keys[j]);
    let position = k0.position.lerp(k1.position, t);
    let scale = k0.scale.lerp(k1.scale, t);
    let rotation = k0.rotation.normalize().slerp(k1.rotation.normalize(), t);
    Mat4::from_scale_rotation_translation(scale, rotation, position)
}

impl SceneSource for MemoryScene {
    fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    fn contains(&self, node: NodeHandle) -> bool {
        node == NodeHandle::ROOT || self.index.contains_key(&node)
    }

    fn find_node(&self, name: &str) -> Option<NodeHandle> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.handle)
    }

    fn node_name(&self, node: NodeHandle) -> Option<&str> {
        if node == NodeHandle::ROOT {
            return Some("Scene Root");
        }
        self.node(node).map(|n| n.name.as_str())
    }

    fn node_kind(&self, node: NodeHandle) -> Option<NodeKind> {
        if node == NodeHandle::ROOT {
            return Some(NodeKind::Root);
        }
        self.node(node).map(|n| n.kind)
    }

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.node(node)
            .map(|n| n.parent.unwrap_or(NodeHandle::ROOT))
    }

    fn children(&self, node: NodeHandle) -> Vec<NodeHandle> {
        self.children.get(&node).cloned().unwrap_or_default()
    }

    fn node_transform(&self, node: NodeHandle, time: TimeValue) -> Option<Mat4> {
        if node == NodeHandle::ROOT {
            return Some(Mat4::IDENTITY);
        }
        let desc = self.node(node)?;
        let parent = self.node_transform(desc.parent.unwrap_or(NodeHandle::ROOT), time)?;
        Some(parent * sample_keys(&desc.keys, self.time_to_frame(time)))
    }

    fn object_transform(&self, node: NodeHandle, time: TimeValue) -> Option<Mat4> {
        let node_tm = self.node_transform(node, time)?;
        let offset = self
            .node(node)
            .and_then(|n| n.object_offset)
            .map(|o| o.matrix())
            .unwrap_or(Mat4::IDENTITY);
        Some(node_tm * offset)
    }

    fn can_triangulate(&self, node: NodeHandle) -> Capability {
        match self.node(node) {
            Some(n) if n.mesh.is_some() => Capability::Supported,
            Some(n) if n.kind == NodeKind::Geometry => Capability::Unsupported,
            _ => Capability::NotApplicable,
        }
    }

    fn evaluate_mesh(&self, node: NodeHandle, time: TimeValue) -> Option<HostMesh> {
        let desc = self.node(node)?;
        let base = desc.mesh.as_ref()?;
        if desc.vertex_keys.is_empty() {
            return Some(base.clone());
        }

        let mut keys: Vec<(f32, &Vec<glam::Vec3>, Option<&Vec<HostFace>>)> = Vec::new();
        if !desc.vertex_keys.iter().any(|k| k.frame <= 0.0) {
            keys.push((0.0, &base.vertices, None));
        }
        keys.extend(
            desc.vertex_keys
                .iter()
                .map(|k| (k.frame, &k.vertices, k.faces.as_ref())),
        );
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));

        let frames: Vec<f32> = keys.iter().map(|k| k.0).collect();
        let (i, j, t) = find_segment(&frames, self.time_to_frame(time));
        let (_, v0, faces0) = keys[i];
        let (_, v1, faces1) = keys[j];

        let mut mesh = base.clone();
        if faces0.is_none() && faces1.is_none() && v0.len() == v1.len() {
            mesh.vertices = v0.iter().zip(v1).map(|(a, b)| a.lerp(*b, t)).collect();
            return Some(mesh);
        }

        let (vertices, faces) = if t >= 1.0 { (v1, faces1) } else { (v0, faces0) };
        mesh.vertices = vertices.clone();
        if let Some(faces) = faces {
            mesh.faces = faces.clone();
            if mesh.faces.len() != base.faces.len() {
                mesh.normals = None;
                mesh.colors = None;
                mesh.maps.clear();
            }
        }
        Some(mesh)
    }

    fn material(&self, node: NodeHandle) -> Option<&HostMaterial> {
        self.node(node)?.material.as_ref()
    }

    fn skin(&self, node: NodeHandle) -> Option<&HostSkin> {
        self.node(node)?.skin.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(frame: f32, position: Vec3) -> TransformKey {
        TransformKey {
            frame,
            position,
            ..Default::default()
        }
    }

    #[test]
    fn test_world_transform_chains_parents() {
        let mut parent = NodeDesc::new(1, "Parent", NodeKind::Helper);
        parent.keys.push(key(0.0, Vec3::new(1.0, 0.0, 0.0)));
        let mut child = NodeDesc::new(2, "Child", NodeKind::Bone);
        child.parent = Some(NodeHandle(1));
        child.keys.push(key(0.0, Vec3::new(0.0, 2.0, 0.0)));

        let scene = MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes: vec![parent, child],
        })
        .unwrap();

        let tm = scene.node_transform(NodeHandle(2), 0).unwrap();
        assert_eq!(tm.w_axis.truncate(), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(scene.parent(NodeHandle(2)), Some(NodeHandle(1)));
        assert_eq!(scene.parent(NodeHandle(1)), Some(NodeHandle::ROOT));
        assert_eq!(scene.children(NodeHandle::ROOT), vec![NodeHandle(1)]);
    }

    #[test]
    fn test_keys_interpolate_and_clamp() {
        let mut node = NodeDesc::new(1, "Mover", NodeKind::Helper);
        node.keys.push(key(0.0, Vec3::ZERO));
        node.keys.push(key(10.0, Vec3::new(10.0, 0.0, 0.0)));
        let scene = MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes: vec![node],
        })
        .unwrap();

        let at = |frame: f32| {
            let t = scene.frame_to_time(frame);
            scene.node_transform(NodeHandle(1), t).unwrap().w_axis.x
        };
        assert!((at(5.0) - 5.0).abs() < 1e-5);
        assert!((at(20.0) - 10.0).abs() < 1e-5);
        assert!((at(-3.0)).abs() < 1e-5);
    }

    #[test]
    fn test_ticks_per_frame() {
        let scene = MemoryScene::new(SceneDesc::default()).unwrap();
        assert_eq!(scene.ticks_per_frame(), 160);
        assert_eq!(scene.frame_to_time(2.5), 400);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut node = NodeDesc::new(1, "Orphan", NodeKind::Helper);
        node.parent = Some(NodeHandle(9));
        let err = MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes: vec![node],
        })
        .unwrap_err();
        assert!(matches!(err, SceneError::UnknownParent { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut a = NodeDesc::new(1, "A", NodeKind::Helper);
        a.parent = Some(NodeHandle(2));
        let mut b = NodeDesc::new(2, "B", NodeKind::Helper);
        b.parent = Some(NodeHandle(1));
        let err = MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes: vec![a, b],
        })
        .unwrap_err();
        assert!(matches!(err, SceneError::Cycle(_)));
    }

    #[test]
    fn test_face_out_of_range_rejected() {
        let mut node = NodeDesc::new(1, "Broken", NodeKind::Geometry);
        node.mesh = Some(HostMesh {
            vertices: vec![Vec3::ZERO; 2],
            faces: vec![HostFace {
                vertices: [0, 1, 2],
                material: 0,
                smoothing: 0,
            }],
            ..Default::default()
        });
        let err = MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes: vec![node],
        })
        .unwrap_err();
        assert!(matches!(err, SceneError::InvalidMesh { .. }));
    }

    #[test]
    fn test_vertex_keys_morph() {
        let mut node = NodeDesc::new(1, "Blob", NodeKind::Geometry);
        node.mesh = Some(HostMesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            faces: vec![HostFace {
                vertices: [0, 1, 2],
                material: 0,
                smoothing: 0,
            }],
            ..Default::default()
        });
        node.vertex_keys.push(VertexKey {
            frame: 10.0,
            vertices: vec![Vec3::Z, Vec3::X, Vec3::Y],
            faces: None,
        });
        let scene = MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes: vec![node],
        })
        .unwrap();

        let half = scene
            .evaluate_mesh(NodeHandle(1), scene.frame_to_time(5.0))
            .unwrap();
        assert!((half.vertices[0] - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-5);
        let rest = scene.evaluate_mesh(NodeHandle(1), 0).unwrap();
        assert_eq!(rest.vertices[0], Vec3::ZERO);
    }

    #[test]
    fn test_capability() {
        let mut geo = NodeDesc::new(1, "Nurbs", NodeKind::Geometry);
        geo.mesh = None;
        let helper = NodeDesc::new(2, "Dummy", NodeKind::Helper);
        let scene = MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes: vec![geo, helper],
        })
        .unwrap();
        assert_eq!(scene.can_triangulate(NodeHandle(1)), Capability::Unsupported);
        assert_eq!(scene.can_triangulate(NodeHandle(2)), Capability::NotApplicable);
    }

    #[test]
    fn test_from_json() {
        let scene = MemoryScene::from_json_str(
            r#"{
                "frame_rate": 25,
                "nodes": [
                    { "handle": 1, "name": "Tri", "kind": "geometry",
                      "mesh": { "vertices": [[0,0,0],[1,0,0],[0,1,0]],
                                "faces": [{ "vertices": [0,1,2], "smoothing": 1 }],
                                "maps": { "1": { "values": [[0,0,0],[1,0,0],[0,1,0]],
                                                 "faces": [[0,1,2]] } } },
                      "material": { "type": "standard", "name": "Red", "diffuse": [1,0,0] } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(scene.frame_rate(), 25);
        assert_eq!(scene.find_node("Tri"), Some(NodeHandle(1)));
        let mesh = scene.evaluate_mesh(NodeHandle(1), 0).unwrap();
        assert_eq!(mesh.faces[0].smoothing, 1);
        assert!(mesh.maps.contains_key(&1));
        assert!(matches!(
            scene.material(NodeHandle(1)),
            Some(HostMaterial::Standard(m)) if m.name == "Red"
        ));
    }
}
