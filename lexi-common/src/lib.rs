//! Shared types and utilities for LEXI engine assets
//!
//! This crate provides the engine-side view of exported assets, shared between:
//! - `lexi-export` (asset pipeline)
//! - any runtime loader reading `.mesh` / `.skeleton` files
//!
//! # Modules
//!
//! - [`packing`] - Vertex data packing utilities (colour packing, index width)
//! - [`formats`] - Binary section headers and element descriptors
//! - [`resource`] - In-memory mesh and skeleton resources

pub mod formats;
pub mod packing;
pub mod resource;

// Re-export commonly used packing items
pub use packing::{IndexType, pack_color_argb, unpack_color_argb};

// Re-export commonly used format items
pub use formats::{
    LEXI_MATERIAL_EXT, LEXI_MESH_EXT, LEXI_SKELETON_EXT, LexiMeshHeader, LexiSkeletonHeader,
    VertexElementSemantic, VertexElementType,
};

// Re-export resource types
pub use resource::mesh::{
    Aabb, BoneAssignment, IndexBuffer, Mesh, Pose, PoseKeyFrame, PoseRef, PoseTarget, SubMesh,
    VertexAnimation, VertexBuffer, VertexData, VertexElement, VertexTrack,
};
pub use resource::skeleton::{Bone, NodeTrack, Skeleton, SkeletonAnimation, TransformKeyFrame};
