//! lexi-export library
//!
//! Converts host scene graphs into LEXI engine assets: triangle meshes with
//! deduplicated vertices, skeletons with sampled animations, morph poses and
//! material scripts. The `lexi-export` binary is a thin CLI over [`manifest`]
//! and [`export`].

pub mod animation;
pub mod builder;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod formats;
pub mod intermediate;
pub mod manifest;
pub mod material;
pub mod math;
pub mod mesh_array;
pub mod pose;
pub mod reindex;
pub mod report;
pub mod scene;

// Re-export engine resource types from lexi-common
pub use lexi_common::{
    IndexType, LEXI_MATERIAL_EXT, LEXI_MESH_EXT, LEXI_SKELETON_EXT, Mesh, Skeleton,
    pack_color_argb,
};

// Re-export the pipeline entry points
pub use builder::{add_animation_data, collapse_hierarchy, create_mesh};
pub use compiler::{CompiledMesh, compile_mesh, compile_skeleton};
pub use config::{ExportConfig, ScaleMode};
pub use context::ExportContext;
pub use error::{ExportError, PoseError, SceneError};
pub use export::{CancelFlag, ExportObject, ExportPass, ExportSummary};
pub use intermediate::{IntermediateMesh, IntermediateSkeleton};
pub use report::{ExportLog, LogEntry, Severity};
pub use scene::{MemoryScene, NodeHandle, SceneSource};
