//! Error types for the export pipeline
//!
//! Absence conditions (no skin, missing attribute map, empty mesh) are not
//! errors; they come back as `None` from the builders.

use std::path::PathBuf;

use thiserror::Error;

use crate::scene::NodeHandle;

/// Errors raised while loading a host scene description
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid scene description: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate node handle {0}")]
    DuplicateHandle(NodeHandle),

    #[error("Node '{node}' references unknown parent {parent}")]
    UnknownParent { node: String, parent: NodeHandle },

    #[error("Node '{node}' has an invalid mesh: {reason}")]
    InvalidMesh { node: String, reason: String },

    #[error("Node '{node}' has an invalid skin: {reason}")]
    InvalidSkin { node: String, reason: String },

    #[error("Node hierarchy contains a cycle through '{0}'")]
    Cycle(String),
}

/// Errors that abort the export of one object
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create output directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("Node {0} not found in scene")]
    NodeNotFound(NodeHandle),

    #[error("Node '{0}' not found in scene")]
    NodeNameNotFound(String),

    #[error("Node '{0}' cannot be converted to a triangle mesh")]
    NotTriangulable(String),

    #[error("Node '{0}' has no renderable geometry")]
    NoGeometry(String),

    #[error("Invalid animation '{name}': {reason}")]
    InvalidAnimation { name: String, reason: String },

    #[error("Engine resource error: {0}")]
    Resource(anyhow::Error),

    #[error("Export cancelled")]
    Cancelled,
}

/// Reasons a single pose is skipped; the mesh export continues
#[derive(Error, Debug, PartialEq)]
pub enum PoseError {
    #[error("cannot pose collapsed mesh '{0}'")]
    Collapsed(String),

    #[error("vertex count mismatch (reference {expected}, pose frame {found})")]
    VertexCountMismatch { expected: usize, found: usize },

    #[error("no position data at frame {0}")]
    MissingGeometry(f32),

    #[error("mesh has no reference position data")]
    MissingReference,
}
