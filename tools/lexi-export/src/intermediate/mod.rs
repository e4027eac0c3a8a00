//! Intermediate model between the host scene and engine resources
//!
//! An [`IntermediateMesh`] is built once per exported node, owns its attribute
//! arrays, skeleton and pose definitions, and is consumed by the compilers.

mod mesh;
mod skeleton;

pub use mesh::{IntermediateMesh, PoseAnimData, PoseData, SampledArray};
pub use skeleton::{
    BoneId, BoneKeyframe, BoneTRS, IntermediateBone, IntermediateSkeleton, MIN_BONE_WEIGHT,
    SampledAnimation,
};

use crate::material::MaterialId;

/// Mesh triangle: three vertex indices and the material it is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub indices: [u32; 3],
    pub material: Option<MaterialId>,
}
