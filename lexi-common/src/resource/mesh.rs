//! Engine mesh resource

use anyhow::{Result, bail};
use bytemuck::cast_slice;
use glam::Vec3;

use crate::formats::{POSE_TARGET_SHARED, VertexElementSemantic, VertexElementType};
use crate::packing::IndexType;

/// Buffer usage hint for vertex/index buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferUsage {
    #[default]
    StaticWriteOnly,
    Dynamic,
}

/// One element of a vertex declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexElement {
    /// Vertex buffer binding slot this element is read from
    pub binding: u16,
    pub semantic: VertexElementSemantic,
    pub element_type: VertexElementType,
    /// Semantic index (texture coordinate set for `TexCoord`)
    pub index: u16,
}

/// A single bound vertex stream
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffer {
    pub vertex_size: usize,
    pub vertex_count: u32,
    pub usage: BufferUsage,
    pub data: Vec<u8>,
}

impl VertexBuffer {
    /// Create a zeroed buffer for `vertex_count` vertices of `vertex_size` bytes
    pub fn new(vertex_size: usize, vertex_count: u32, usage: BufferUsage) -> Self {
        Self {
            vertex_size,
            vertex_count,
            usage,
            data: vec![0u8; vertex_size * vertex_count as usize],
        }
    }

    /// Mutable bytes of one vertex
    pub fn vertex_mut(&mut self, vertex: usize) -> &mut [u8] {
        let start = vertex * self.vertex_size;
        &mut self.data[start..start + self.vertex_size]
    }
}

/// Vertex declaration plus the buffers bound to it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexData {
    pub vertex_count: u32,
    pub elements: Vec<VertexElement>,
    /// Buffers indexed by binding slot
    pub bindings: Vec<VertexBuffer>,
}

impl VertexData {
    pub fn new(vertex_count: u32) -> Self {
        Self {
            vertex_count,
            ..Default::default()
        }
    }

    /// Create a buffer bound at the next free slot carrying a single element
    ///
    /// Returns the binding slot.
    pub fn add_stream(
        &mut self,
        semantic: VertexElementSemantic,
        element_type: VertexElementType,
        index: u16,
    ) -> u16 {
        let binding = self.bindings.len() as u16;
        self.elements.push(VertexElement {
            binding,
            semantic,
            element_type,
            index,
        });
        self.bindings.push(VertexBuffer::new(
            element_type.size(),
            self.vertex_count,
            BufferUsage::StaticWriteOnly,
        ));
        binding
    }

    pub fn buffer(&self, binding: u16) -> Option<&VertexBuffer> {
        self.bindings.get(binding as usize)
    }

    pub fn buffer_mut(&mut self, binding: u16) -> Option<&mut VertexBuffer> {
        self.bindings.get_mut(binding as usize)
    }

    /// Find the element carrying `semantic` with semantic index `index`
    pub fn find_element(&self, semantic: VertexElementSemantic, index: u16) -> Option<&VertexElement> {
        self.elements
            .iter()
            .find(|e| e.semantic == semantic && e.index == index)
    }
}

/// Index buffer, 16 or 32 bits wide
#[derive(Debug, Clone, PartialEq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Create an index buffer of the given width from 32-bit indices
    pub fn from_indices(index_type: IndexType, indices: &[u32]) -> Self {
        match index_type {
            IndexType::U16 => IndexBuffer::U16(indices.iter().map(|&i| i as u16).collect()),
            IndexType::U32 => IndexBuffer::U32(indices.to_vec()),
        }
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            IndexBuffer::U16(_) => IndexType::U16,
            IndexBuffer::U32(_) => IndexType::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            IndexBuffer::U16(v) => v.get(i).map(|&x| x as u32),
            IndexBuffer::U32(v) => v.get(i).copied(),
        }
    }

    /// Raw index bytes (native endian, little-endian on every supported target)
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexBuffer::U16(v) => cast_slice(v),
            IndexBuffer::U32(v) => cast_slice(v),
        }
    }
}

/// Weighted vertex → bone influence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneAssignment {
    pub vertex: u32,
    pub bone: u16,
    pub weight: f32,
}

/// Material-partitioned index range (and optionally its own vertices)
#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    pub material_name: String,
    pub use_shared_vertices: bool,
    /// Dedicated vertex data, `None` when reading the shared buffer
    pub vertex_data: Option<VertexData>,
    pub indices: IndexBuffer,
    pub bone_assignments: Vec<BoneAssignment>,
}

impl SubMesh {
    pub fn add_bone_assignment(&mut self, vertex: u32, bone: u16, weight: f32) {
        self.bone_assignments.push(BoneAssignment {
            vertex,
            bone,
            weight,
        });
    }
}

/// What a pose deforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseTarget {
    Shared,
    SubMesh(u16),
}

impl PoseTarget {
    /// On-disk target code: 0 = shared, n + 1 = submesh n
    pub fn code(self) -> u16 {
        match self {
            PoseTarget::Shared => POSE_TARGET_SHARED,
            PoseTarget::SubMesh(i) => i + 1,
        }
    }
}

/// Named sparse set of per-vertex position offsets
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub name: String,
    pub target: PoseTarget,
    pub offsets: Vec<(u32, [f32; 3])>,
}

impl Pose {
    pub fn add_vertex(&mut self, vertex: u32, offset: Vec3) {
        self.offsets.push((vertex, offset.to_array()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseRef {
    pub pose_index: u16,
    pub influence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoseKeyFrame {
    pub time: f32,
    pub refs: Vec<PoseRef>,
}

/// Pose keyframes driving one vertex data target
#[derive(Debug, Clone, PartialEq)]
pub struct VertexTrack {
    pub target: PoseTarget,
    pub keyframes: Vec<PoseKeyFrame>,
}

impl VertexTrack {
    pub fn create_keyframe(&mut self, time: f32) -> &mut PoseKeyFrame {
        self.keyframes.push(PoseKeyFrame {
            time,
            refs: Vec::new(),
        });
        let last = self.keyframes.len() - 1;
        &mut self.keyframes[last]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexAnimation {
    pub name: String,
    pub length: f32,
    pub tracks: Vec<VertexTrack>,
}

impl VertexAnimation {
    pub fn create_track(&mut self, target: PoseTarget) -> &mut VertexTrack {
        self.tracks.push(VertexTrack {
            target,
            keyframes: Vec::new(),
        });
        let last = self.tracks.len() - 1;
        &mut self.tracks[last]
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Inverted box that any merged point replaces
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    pub fn merge_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Engine mesh resource
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub shared_vertex_data: Option<VertexData>,
    pub shared_bone_assignments: Vec<BoneAssignment>,
    pub submeshes: Vec<SubMesh>,
    pub poses: Vec<Pose>,
    pub animations: Vec<VertexAnimation>,
    pub bounds: Aabb,
    pub bounding_radius: f32,
    /// Skeleton file this mesh is linked to
    pub skeleton_name: Option<String>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared_vertex_data: None,
            shared_bone_assignments: Vec::new(),
            submeshes: Vec::new(),
            poses: Vec::new(),
            animations: Vec::new(),
            bounds: Aabb::EMPTY,
            bounding_radius: 0.0,
            skeleton_name: None,
        }
    }

    /// Append a submesh and return its index
    pub fn create_submesh(
        &mut self,
        material_name: impl Into<String>,
        use_shared_vertices: bool,
        indices: IndexBuffer,
    ) -> usize {
        self.submeshes.push(SubMesh {
            material_name: material_name.into(),
            use_shared_vertices,
            vertex_data: None,
            indices,
            bone_assignments: Vec::new(),
        });
        self.submeshes.len() - 1
    }

    /// Assign a shared vertex to a bone
    pub fn add_bone_assignment(&mut self, vertex: u32, bone: u16, weight: f32) {
        self.shared_bone_assignments.push(BoneAssignment {
            vertex,
            bone,
            weight,
        });
    }

    /// Create an empty pose; returns its index
    pub fn create_pose(&mut self, target: PoseTarget, name: impl Into<String>) -> Result<u16> {
        if let PoseTarget::SubMesh(i) = target
            && i as usize >= self.submeshes.len()
        {
            bail!("Pose target submesh {} does not exist", i);
        }
        if self.poses.len() >= u16::MAX as usize {
            bail!("Too many poses");
        }
        self.poses.push(Pose {
            name: name.into(),
            target,
            offsets: Vec::new(),
        });
        Ok((self.poses.len() - 1) as u16)
    }

    pub fn pose_mut(&mut self, index: u16) -> Option<&mut Pose> {
        self.poses.get_mut(index as usize)
    }

    pub fn create_animation(&mut self, name: impl Into<String>, length: f32) -> &mut VertexAnimation {
        self.animations.push(VertexAnimation {
            name: name.into(),
            length,
            tracks: Vec::new(),
        });
        let last = self.animations.len() - 1;
        &mut self.animations[last]
    }

    /// Total vertex count across shared and dedicated buffers
    pub fn vertex_count(&self) -> usize {
        let shared = self
            .shared_vertex_data
            .as_ref()
            .map(|v| v.vertex_count as usize)
            .unwrap_or(0);
        let dedicated: usize = self
            .submeshes
            .iter()
            .filter_map(|s| s.vertex_data.as_ref())
            .map(|v| v.vertex_count as usize)
            .sum();
        shared + dedicated
    }
}
