//! Export manifest parsing and build orchestration
//!
//! Parses export.toml and runs one export pass over its objects.
//!
//! ```toml
//! scene = "scene.json"
//!
//! [output]
//! dir = "assets/"
//!
//! [defaults]
//! SkeletonID = true
//!
//! [[objects]]
//! node = "Body"
//! file = "body"
//! [objects.config]
//! AnimationEndID = 40
//! ```

use anyhow::{Context, Result};
use hashbrown::HashSet;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::export::{CancelFlag, ExportObject, ExportPass, ExportSummary};
use crate::scene::{MemoryScene, SceneSource};

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    /// Scene description (JSON)
    pub scene: PathBuf,
    #[serde(default)]
    pub output: OutputConfig,
    /// Config keys applied to every object
    #[serde(default)]
    pub defaults: toml::Table,
    #[serde(default)]
    pub objects: Vec<ObjectEntry>,
    /// Directory relative paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("assets/")
}

#[derive(Debug, Deserialize)]
pub struct ObjectEntry {
    /// Host node name
    pub node: String,
    /// Output file stem; defaults to the node name
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides merged key by key over `[defaults]`
    #[serde(default)]
    pub config: toml::Table,
}

fn default_enabled() -> bool {
    true
}

impl ObjectEntry {
    pub fn base_name(&self) -> &str {
        self.file.as_deref().unwrap_or(&self.node)
    }
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn scene_path(&self) -> PathBuf {
        self.resolve(&self.scene)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.output.dir)
    }

    /// Effective config for one object
    pub fn object_config(&self, entry: &ObjectEntry) -> Result<ExportConfig> {
        let mut merged = self.defaults.clone();
        for (key, value) in &entry.config {
            merged.insert(key.clone(), value.clone());
        }
        toml::Value::Table(merged)
            .try_into()
            .with_context(|| format!("Invalid config for object '{}'", entry.node))
    }

    pub fn export_objects(&self) -> Result<Vec<ExportObject>> {
        self.objects
            .iter()
            .map(|entry| {
                Ok(ExportObject {
                    node: entry.node.clone(),
                    base_name: entry.base_name().to_string(),
                    config: self.object_config(entry)?,
                    enabled: entry.enabled,
                })
            })
            .collect()
    }

    pub fn load_scene(&self) -> Result<MemoryScene> {
        let path = self.scene_path();
        MemoryScene::load(&path).with_context(|| format!("Failed to load scene: {:?}", path))
    }
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let mut manifest =
        Manifest::parse(&content).with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    manifest.base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(manifest)
}

/// Validate a manifest without building
pub fn validate(manifest: &Manifest) -> Result<()> {
    let scene = manifest.load_scene()?;
    let mut files = HashSet::new();
    for entry in &manifest.objects {
        if scene.find_node(&entry.node).is_none() {
            anyhow::bail!("Object node '{}' not found in scene", entry.node);
        }
        if !files.insert(entry.base_name()) {
            anyhow::bail!("Output file '{}' is used by more than one object", entry.base_name());
        }
        manifest.object_config(entry)?;
    }
    Ok(())
}

/// Export every object in a manifest
pub fn build_all(manifest: &Manifest, output_override: Option<&Path>) -> Result<ExportSummary> {
    build_all_with_cancel(manifest, output_override, CancelFlag::new())
}

pub fn build_all_with_cancel(
    manifest: &Manifest,
    output_override: Option<&Path>,
    cancel: CancelFlag,
) -> Result<ExportSummary> {
    let output_dir = output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest.output_dir());
    let scene = manifest.load_scene()?;
    let objects = manifest.export_objects()?;

    tracing::info!(
        "Exporting {} object(s) from {:?} -> {:?}",
        objects.len(),
        manifest.scene_path(),
        output_dir
    );

    let source_dir = manifest
        .scene_path()
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut pass = ExportPass::new(&scene, output_dir)
        .with_source_dir(source_dir)
        .with_cancel_flag(cancel);
    Ok(pass.run(&objects))
}
