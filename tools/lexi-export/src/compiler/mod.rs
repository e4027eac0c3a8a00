//! Intermediate model → engine resources

pub mod material;
pub mod mesh;
pub mod skeleton;

pub use material::{copy_texture_maps, write_material_script};
pub use mesh::{CompiledMesh, NO_MATERIAL, compile_mesh};
pub use skeleton::compile_skeleton;
