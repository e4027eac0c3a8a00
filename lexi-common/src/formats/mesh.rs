//! LexiMesh binary format (.mesh)
//!
//! Engine mesh format with shared or dedicated vertex data, bone assignments,
//! poses and vertex (pose) animations.
//! POD format - no magic bytes.
//!
//! # Layout
//! ```text
//! 0x00: LexiMeshHeader (36 bytes)
//!       submesh_count u16, flags u16, pose_count u16, animation_count u16,
//!       bounds_min f32×3, bounds_max f32×3, bounding_radius f32
//! 0x24: skeleton name (string, empty when unskinned)
//!       [FLAG_SHARED_GEOMETRY] shared vertex data block
//!       shared bone assignments: count u32, records (BONE_ASSIGNMENT_SIZE each)
//!       submeshes × submesh_count:
//!         material name (string), use_shared u8, index_type u8, index_count u32,
//!         indices (index_count × 2 or 4 bytes),
//!         [!use_shared] vertex data block,
//!         bone assignments: count u32, records
//!       poses × pose_count:
//!         name (string), target u16, offset_count u32, records (POSE_OFFSET_SIZE each)
//!       animations × animation_count:
//!         name (string), length f32, track_count u16, tracks:
//!           target u16, keyframe_count u32, keyframes:
//!             time f32, ref_count u16, refs (POSE_REF_SIZE each)
//! ```
//!
//! Vertex data block:
//! ```text
//! vertex_count u32, element_count u16, elements (VERTEX_ELEMENT_SIZE each),
//! binding_count u16, per binding: vertex_size u16, data (vertex_count × vertex_size)
//! ```

use super::{read_u16, read_u32};

/// Mesh carries a shared vertex data block
pub const FLAG_SHARED_GEOMETRY: u16 = 1;
/// Mesh references a skeleton file
pub const FLAG_SKELETON: u16 = 2;

/// Bone assignment record: vertex u32, bone u16, weight f32
pub const BONE_ASSIGNMENT_SIZE: usize = 10;
/// Pose offset record: vertex u32, offset f32×3
pub const POSE_OFFSET_SIZE: usize = 16;
/// Pose reference record: pose index u16, influence f32
pub const POSE_REF_SIZE: usize = 6;
/// Vertex element record: binding u16, semantic u8, type u8, index u16
pub const VERTEX_ELEMENT_SIZE: usize = 6;

/// Pose target code for the shared vertex data
pub const POSE_TARGET_SHARED: u16 = 0;

/// LexiMesh header (36 bytes)
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct LexiMeshHeader {
    pub submesh_count: u16,
    pub flags: u16,
    pub pose_count: u16,
    pub animation_count: u16,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
    pub bounding_radius: f32,
}

impl LexiMeshHeader {
    pub const SIZE: usize = 36;

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.submesh_count.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.flags.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.pose_count.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.animation_count.to_le_bytes());
        for (i, v) in self
            .bounds_min
            .iter()
            .chain(self.bounds_max.iter())
            .chain(std::iter::once(&self.bounding_radius))
            .enumerate()
        {
            let at = 8 + i * 4;
            bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let f = |i: usize| super::read_f32(bytes, 8 + i * 4);
        Some(Self {
            submesh_count: read_u16(bytes, 0),
            flags: read_u16(bytes, 2),
            pose_count: read_u16(bytes, 4),
            animation_count: read_u16(bytes, 6),
            bounds_min: [f(0), f(1), f(2)],
            bounds_max: [f(3), f(4), f(5)],
            bounding_radius: f(6),
        })
    }

    pub fn has_shared_geometry(&self) -> bool {
        self.flags & FLAG_SHARED_GEOMETRY != 0
    }

    pub fn has_skeleton(&self) -> bool {
        self.flags & FLAG_SKELETON != 0
    }
}

/// Meaning of a vertex element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VertexElementSemantic {
    Position = 1,
    Normal = 4,
    Diffuse = 5,
    TexCoord = 7,
}

impl VertexElementSemantic {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Position),
            4 => Some(Self::Normal),
            5 => Some(Self::Diffuse),
            7 => Some(Self::TexCoord),
            _ => None,
        }
    }
}

/// Storage type of a vertex element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VertexElementType {
    Float2 = 1,
    Float3 = 2,
    ColourArgb = 3,
}

impl VertexElementType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Float2),
            2 => Some(Self::Float3),
            3 => Some(Self::ColourArgb),
            _ => None,
        }
    }

    /// Size of one element in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::ColourArgb => 4,
        }
    }
}

/// Encode a vertex element record
pub fn encode_vertex_element(
    binding: u16,
    semantic: VertexElementSemantic,
    element_type: VertexElementType,
    index: u16,
) -> [u8; VERTEX_ELEMENT_SIZE] {
    let mut bytes = [0u8; VERTEX_ELEMENT_SIZE];
    bytes[0..2].copy_from_slice(&binding.to_le_bytes());
    bytes[2] = semantic as u8;
    bytes[3] = element_type as u8;
    bytes[4..6].copy_from_slice(&index.to_le_bytes());
    bytes
}

/// Decode a vertex element record
pub fn decode_vertex_element(
    bytes: &[u8],
) -> Option<(u16, VertexElementSemantic, VertexElementType, u16)> {
    if bytes.len() < VERTEX_ELEMENT_SIZE {
        return None;
    }
    Some((
        read_u16(bytes, 0),
        VertexElementSemantic::from_u8(bytes[2])?,
        VertexElementType::from_u8(bytes[3])?,
        read_u16(bytes, 4),
    ))
}

/// Encode a bone assignment record
pub fn encode_bone_assignment(vertex: u32, bone: u16, weight: f32) -> [u8; BONE_ASSIGNMENT_SIZE] {
    let mut bytes = [0u8; BONE_ASSIGNMENT_SIZE];
    bytes[0..4].copy_from_slice(&vertex.to_le_bytes());
    bytes[4..6].copy_from_slice(&bone.to_le_bytes());
    bytes[6..10].copy_from_slice(&weight.to_le_bytes());
    bytes
}

/// Decode a bone assignment record
pub fn decode_bone_assignment(bytes: &[u8]) -> Option<(u32, u16, f32)> {
    if bytes.len() < BONE_ASSIGNMENT_SIZE {
        return None;
    }
    Some((
        read_u32(bytes, 0),
        read_u16(bytes, 4),
        super::read_f32(bytes, 6),
    ))
}
