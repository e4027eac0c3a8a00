//! Typed per-vertex attribute buffers
//!
//! A [`MeshArray`] is both attribute storage and the unit the reindexer
//! compares, so every variant exposes its elements as raw bytes.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

/// One bone influence on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct VertexBoneData {
    pub bone_index: u32,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeshArray {
    Vec2(Vec<Vec2>),
    Vec3(Vec<Vec3>),
    Vec4(Vec<Vec4>),
    BoneData(Vec<VertexBoneData>),
}

impl MeshArray {
    pub fn len(&self) -> usize {
        match self {
            MeshArray::Vec2(v) => v.len(),
            MeshArray::Vec3(v) => v.len(),
            MeshArray::Vec4(v) => v.len(),
            MeshArray::BoneData(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of one element in bytes
    pub fn element_size(&self) -> usize {
        match self {
            MeshArray::Vec2(_) => std::mem::size_of::<Vec2>(),
            MeshArray::Vec3(_) => std::mem::size_of::<Vec3>(),
            MeshArray::Vec4(_) => std::mem::size_of::<Vec4>(),
            MeshArray::BoneData(_) => std::mem::size_of::<VertexBoneData>(),
        }
    }

    /// Whole buffer as bytes
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MeshArray::Vec2(v) => bytemuck::cast_slice(v),
            MeshArray::Vec3(v) => bytemuck::cast_slice(v),
            MeshArray::Vec4(v) => bytemuck::cast_slice(v),
            MeshArray::BoneData(v) => bytemuck::cast_slice(v),
        }
    }

    /// Raw bytes of element `index`
    #[inline]
    pub fn element_bytes(&self, index: usize) -> &[u8] {
        let size = self.element_size();
        &self.as_bytes()[index * size..(index + 1) * size]
    }

    /// Rebuild the array so element `i` is the old element `picks[i]`
    pub fn select(&mut self, picks: &[u32]) {
        fn pick<T: Copy>(v: &[T], picks: &[u32]) -> Vec<T> {
            picks.iter().map(|&p| v[p as usize]).collect()
        }
        match self {
            MeshArray::Vec2(v) => *v = pick(v, picks),
            MeshArray::Vec3(v) => *v = pick(v, picks),
            MeshArray::Vec4(v) => *v = pick(v, picks),
            MeshArray::BoneData(v) => *v = pick(v, picks),
        }
    }

    /// Append another array of the same variant
    ///
    /// Returns false (and leaves `self` untouched) on a variant mismatch.
    pub fn extend_from(&mut self, other: &MeshArray) -> bool {
        match (self, other) {
            (MeshArray::Vec2(a), MeshArray::Vec2(b)) => a.extend_from_slice(b),
            (MeshArray::Vec3(a), MeshArray::Vec3(b)) => a.extend_from_slice(b),
            (MeshArray::Vec4(a), MeshArray::Vec4(b)) => a.extend_from_slice(b),
            (MeshArray::BoneData(a), MeshArray::BoneData(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }

    pub fn as_vec2(&self) -> Option<&[Vec2]> {
        match self {
            MeshArray::Vec2(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<&[Vec3]> {
        match self {
            MeshArray::Vec3(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec4(&self) -> Option<&[Vec4]> {
        match self {
            MeshArray::Vec4(v) => Some(v),
            _ => None,
        }
    }
}
