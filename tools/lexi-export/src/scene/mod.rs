//! Host scene interface
//!
//! The exporter only ever talks to the authoring tool through [`SceneSource`].
//! Transforms are column-vector `Mat4`s in host axes (Z up); the builders do
//! all conversion to engine axes.

mod memory;

pub use memory::{MemoryScene, NodeDesc, SceneDesc, TransformKey, VertexKey};

use std::collections::BTreeMap;
use std::fmt;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Host time unit
pub type TimeValue = i32;

/// Host ticks per second
pub const TICKS_PER_SECOND: TimeValue = 4800;

/// Opaque identifier of a host node, stable for one export pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(pub u32);

impl NodeHandle {
    /// Handle of the implicit scene root
    pub const ROOT: NodeHandle = NodeHandle(0);
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Geometry,
    Helper,
    Bone,
    Other,
}

/// Tri-state answer to "can this node be converted?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Supported,
    /// The node has an object of the right family that cannot be converted
    Unsupported,
    /// The question does not apply (no object of that family)
    NotApplicable,
}

/// Triangle of a host mesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostFace {
    pub vertices: [u32; 3],
    /// Material slot (sub-material index for multi materials)
    #[serde(default)]
    pub material: u32,
    /// Smoothing group bitmask; 0 = faceted
    #[serde(default)]
    pub smoothing: u32,
}

/// Auxiliary per-corner channel (vertex colours or texture coordinates)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostChannel {
    #[serde(default = "default_used")]
    pub used: bool,
    pub values: Vec<Vec3>,
    /// Per face, indices into `values` for each corner
    pub faces: Vec<[u32; 3]>,
}

fn default_used() -> bool {
    true
}

/// Evaluated triangle mesh, object space, host axes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HostMesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<HostFace>,
    /// Explicit per-corner normals
    #[serde(default)]
    pub normals: Option<Vec<[Vec3; 3]>>,
    /// Vertex colours, stored in host channel order (blue, green, red)
    #[serde(default)]
    pub colors: Option<HostChannel>,
    /// Texture coordinate channels keyed by map channel (1..=99)
    #[serde(default)]
    pub maps: BTreeMap<u32, HostChannel>,
}

impl HostMesh {
    pub fn face_normal(&self, face: &HostFace) -> Vec3 {
        let [a, b, c] = face.vertices.map(|v| self.vertices[v as usize]);
        (b - a).cross(c - a).normalize_or_zero()
    }

    /// Per-corner normals honouring explicit normals and smoothing groups
    ///
    /// A corner takes its explicit normal when one is given, otherwise the
    /// average of the face normals around its vertex that share a smoothing
    /// group with the face. Faces without a group use their face normal.
    pub fn corner_normals(&self) -> Vec<[Vec3; 3]> {
        if let Some(normals) = &self.normals {
            if normals.len() == self.faces.len() {
                return normals.clone();
            }
        }

        let face_normals: Vec<Vec3> = self.faces.iter().map(|f| self.face_normal(f)).collect();
        let mut faces_at_vertex: Vec<Vec<usize>> = vec![Vec::new(); self.vertices.len()];
        for (fi, face) in self.faces.iter().enumerate() {
            for &v in &face.vertices {
                faces_at_vertex[v as usize].push(fi);
            }
        }

        self.faces
            .iter()
            .enumerate()
            .map(|(fi, face)| {
                face.vertices.map(|v| {
                    if face.smoothing == 0 {
                        return face_normals[fi];
                    }
                    let sum: Vec3 = faces_at_vertex[v as usize]
                        .iter()
                        .filter(|&&g| self.faces[g].smoothing & face.smoothing != 0)
                        .map(|&g| face_normals[g])
                        .sum();
                    let n = sum.normalize_or_zero();
                    if n == Vec3::ZERO { face_normals[fi] } else { n }
                })
            })
            .collect()
    }
}

/// Texture map attached to a standard material slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostTextureMap {
    /// Slot identifier, e.g. `"diffuse"` or `"bump"`
    pub slot: String,
    #[serde(default = "default_used")]
    pub enabled: bool,
    /// Bitmap source; other map kinds are not exported
    #[serde(default)]
    pub bitmap: Option<HostBitmap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostBitmap {
    pub filename: String,
    /// Explicit map channel, when the map uses one
    #[serde(default)]
    pub channel: Option<u32>,
    #[serde(default = "default_used")]
    pub u_wrap: bool,
    #[serde(default = "default_used")]
    pub v_wrap: bool,
    #[serde(default)]
    pub u_mirror: bool,
    #[serde(default)]
    pub v_mirror: bool,
    #[serde(default)]
    pub offset: [f32; 2],
    #[serde(default = "default_tiling")]
    pub scale: [f32; 2],
    /// Rotation in degrees
    #[serde(default)]
    pub angle: f32,
    #[serde(default = "default_amount")]
    pub amount: f32,
    #[serde(default)]
    pub alpha_from_file: bool,
}

fn default_tiling() -> [f32; 2] {
    [1.0, 1.0]
}

fn default_amount() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardMaterial {
    pub name: String,
    #[serde(default)]
    pub ambient: Vec3,
    #[serde(default = "default_white")]
    pub diffuse: Vec3,
    #[serde(default)]
    pub specular: Vec3,
    #[serde(default)]
    pub emissive: Vec3,
    #[serde(default)]
    pub glossiness: f32,
    #[serde(default)]
    pub specular_level: f32,
    #[serde(default = "default_amount")]
    pub opacity: f32,
    #[serde(default)]
    pub two_sided: bool,
    #[serde(default)]
    pub wire: bool,
    #[serde(default)]
    pub faceted: bool,
    #[serde(default)]
    pub maps: Vec<HostTextureMap>,
}

fn default_white() -> Vec3 {
    Vec3::ONE
}

/// Material assigned to a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMaterial {
    Standard(StandardMaterial),
    Multi { materials: Vec<Option<StandardMaterial>> },
    /// A material class the exporter does not understand
    Other { name: String },
}

/// Skin binding: bone nodes plus per-vertex influences
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HostSkin {
    pub bones: Vec<NodeHandle>,
    /// Per host vertex, `(bone slot, weight)` pairs; slots index `bones`
    pub weights: Vec<Vec<(u32, f32)>>,
}

/// Query surface the exporter needs from a host scene graph
pub trait SceneSource {
    fn frame_rate(&self) -> u32;

    fn ticks_per_frame(&self) -> TimeValue {
        TICKS_PER_SECOND / self.frame_rate().max(1) as TimeValue
    }

    /// Convert a (possibly fractional) frame number to host ticks
    fn frame_to_time(&self, frame: f32) -> TimeValue {
        (frame * self.ticks_per_frame() as f32).round() as TimeValue
    }

    fn contains(&self, node: NodeHandle) -> bool;

    fn find_node(&self, name: &str) -> Option<NodeHandle>;

    fn node_name(&self, node: NodeHandle) -> Option<&str>;

    fn node_kind(&self, node: NodeHandle) -> Option<NodeKind>;

    /// Parent node; `None` only for the scene root and unknown nodes
    fn parent(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn children(&self, node: NodeHandle) -> Vec<NodeHandle>;

    fn is_scene_root(&self, node: NodeHandle) -> bool {
        node == NodeHandle::ROOT
    }

    /// World transform of the node pivot at `time`
    fn node_transform(&self, node: NodeHandle, time: TimeValue) -> Option<Mat4>;

    /// World transform of the node's object (pivot plus object offset) at `time`
    fn object_transform(&self, node: NodeHandle, time: TimeValue) -> Option<Mat4>;

    fn can_triangulate(&self, node: NodeHandle) -> Capability;

    /// Triangulated object-space mesh evaluated at `time`
    fn evaluate_mesh(&self, node: NodeHandle, time: TimeValue) -> Option<HostMesh>;

    fn material(&self, node: NodeHandle) -> Option<&HostMaterial>;

    fn skin(&self, node: NodeHandle) -> Option<&HostSkin>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(smoothing: u32) -> HostMesh {
        HostMesh {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 1.0),
            ],
            faces: vec![
                HostFace {
                    vertices: [0, 1, 2],
                    material: 0,
                    smoothing,
                },
                HostFace {
                    vertices: [0, 2, 3],
                    material: 0,
                    smoothing,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_faceted_normals_use_face_normal() {
        let mesh = quad(0);
        let normals = mesh.corner_normals();
        assert_eq!(normals[0][0], Vec3::Z);
        assert_eq!(normals[0][1], Vec3::Z);
        assert_ne!(normals[1][0], Vec3::Z);
    }

    #[test]
    fn test_smoothed_normals_shared_across_group() {
        let mesh = quad(1);
        let normals = mesh.corner_normals();
        // Vertex 0 appears in both faces; both corners see the same averaged normal
        assert!((normals[0][0] - normals[1][0]).length() < 1e-6);
        assert!((normals[0][0].length() - 1.0).abs() < 1e-5);
        // Vertex 1 only touches the first face
        assert!((normals[0][1] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_explicit_normals_win() {
        let mut mesh = quad(1);
        mesh.normals = Some(vec![[Vec3::X; 3], [Vec3::Y; 3]]);
        let normals = mesh.corner_normals();
        assert_eq!(normals[0], [Vec3::X; 3]);
        assert_eq!(normals[1], [Vec3::Y; 3]);
    }
}
