//! Export pass driver
//!
//! Runs the build → compile → write pipeline for a list of export objects.
//! A failing object is logged and skipped; the rest of the pass continues.

use anyhow::Context;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lexi_common::{LEXI_MATERIAL_EXT, LEXI_MESH_EXT, LEXI_SKELETON_EXT};

use crate::builder;
use crate::compiler::{self, CompiledMesh};
use crate::config::ExportConfig;
use crate::context::ExportContext;
use crate::error::ExportError;
use crate::formats::{write_lexi_mesh, write_lexi_skeleton};
use crate::material::IntermediateMaterial;
use crate::report::LogEntry;
use crate::scene::SceneSource;

/// Cooperative cancellation, checked between export objects
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One node to export and the files it produces
#[derive(Debug, Clone, PartialEq)]
pub struct ExportObject {
    /// Host node name
    pub node: String,
    /// Output file stem; `<base>.mesh`, `<base>.skeleton`, `<base>.material`
    pub base_name: String,
    pub config: ExportConfig,
    pub enabled: bool,
}

impl ExportObject {
    pub fn new(node: impl Into<String>, base_name: impl Into<String>, config: ExportConfig) -> Self {
        Self {
            node: node.into(),
            base_name: base_name.into(),
            config,
            enabled: true,
        }
    }
}

/// Outcome of an export pass
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub succeeded: Vec<String>,
    /// Object name and the error that stopped it
    pub failed: Vec<(String, String)>,
    /// Disabled or cancelled objects
    pub skipped: Vec<String>,
    /// Warnings and errors raised during the pass
    pub problems: Vec<LogEntry>,
}

impl ExportSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Files written for one object
#[derive(Debug, Default)]
pub struct WrittenFiles {
    pub mesh: PathBuf,
    pub skeleton: Option<PathBuf>,
    pub material: Option<PathBuf>,
    pub textures: usize,
}

pub struct ExportPass<'a> {
    scene: &'a dyn SceneSource,
    output_dir: PathBuf,
    /// Directory relative texture paths resolve against
    source_dir: PathBuf,
    cancel: CancelFlag,
    ctx: ExportContext,
}

impl<'a> ExportPass<'a> {
    pub fn new(scene: &'a dyn SceneSource, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            scene,
            output_dir: output_dir.into(),
            source_dir: PathBuf::from("."),
            cancel: CancelFlag::new(),
            ctx: ExportContext::new(),
        }
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn context(&self) -> &ExportContext {
        &self.ctx
    }

    /// Export every enabled object in order
    pub fn run(&mut self, objects: &[ExportObject]) -> ExportSummary {
        self.ctx.begin_pass();
        let mut summary = ExportSummary::default();

        for object in objects {
            if !object.enabled {
                summary.skipped.push(object.base_name.clone());
                continue;
            }
            if self.cancel.is_cancelled() {
                summary.skipped.push(object.base_name.clone());
                continue;
            }

            self.ctx.log.begin_object(object.base_name.as_str());
            match self.export_object(object) {
                Ok(files) => {
                    tracing::info!("Exported '{}' -> {:?}", object.node, files.mesh);
                    summary.succeeded.push(object.base_name.clone());
                }
                Err(err) => {
                    self.ctx.log.error(err.to_string());
                    summary
                        .failed
                        .push((object.base_name.clone(), err.to_string()));
                }
            }
            self.ctx.log.end_object();
        }

        if self.cancel.is_cancelled() {
            self.ctx.log.warn("Export cancelled");
        }
        summary.problems = self.ctx.log.problems().cloned().collect();
        summary
    }

    /// Build, compile and write a single object
    pub fn export_object(&mut self, object: &ExportObject) -> Result<WrittenFiles, ExportError> {
        if self.cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        let scene = self.scene;
        let config = &object.config;

        let node = scene
            .find_node(&object.node)
            .ok_or_else(|| ExportError::NodeNameNotFound(object.node.clone()))?;

        let mut mesh = if config.collapse_hierarchy {
            builder::collapse_hierarchy(&mut self.ctx, scene, node, config)?
        } else {
            builder::create_mesh(&mut self.ctx, scene, node, config)?
        };
        builder::add_animation_data(&mut self.ctx, scene, &mut mesh, config);

        let skeleton_name = format!("{}.{}", object.base_name, LEXI_SKELETON_EXT);
        let compiled = compiler::compile_mesh(
            &mut self.ctx,
            scene,
            &mut mesh,
            config,
            Some(skeleton_name.as_str()),
        )?;

        std::fs::create_dir_all(&self.output_dir).map_err(|source| ExportError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        self.write_files(object, &compiled)
    }

    fn write_files(
        &mut self,
        object: &ExportObject,
        compiled: &CompiledMesh,
    ) -> Result<WrittenFiles, ExportError> {
        let config = &object.config;
        let mut files = WrittenFiles {
            mesh: self.output_path(&object.base_name, LEXI_MESH_EXT),
            ..Default::default()
        };

        write_file(&files.mesh, |w| write_lexi_mesh(w, &compiled.mesh))?;

        if let Some(skeleton) = &compiled.skeleton {
            let path = self.output_path(&object.base_name, LEXI_SKELETON_EXT);
            write_file(&path, |w| write_lexi_skeleton(w, skeleton))?;
            files.skeleton = Some(path);
        }

        let materials: Vec<&IntermediateMaterial> = compiled
            .materials
            .iter()
            .filter_map(|&id| self.ctx.materials.get(id))
            .collect();

        if config.export_materials && !materials.is_empty() {
            let path = self.output_path(&object.base_name, LEXI_MATERIAL_EXT);
            write_file(&path, |w| {
                compiler::write_material_script(w, &materials).map_err(anyhow::Error::from)
            })?;
            files.material = Some(path);
        }

        if config.copy_texture_maps {
            files.textures = compiler::copy_texture_maps(
                &mut self.ctx.log,
                &materials,
                &self.source_dir,
                &self.output_dir,
            );
        }
        if config.copy_shaders {
            self.ctx
                .log
                .debug("copyShaders set; materials reference no shader programs");
        }

        Ok(files)
    }

    fn output_path(&self, base_name: &str, ext: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", base_name, ext))
    }
}

/// Write through a sibling temp file and rename it over `path`, so a failed
/// write leaves any previous file untouched
fn write_file<F>(path: &Path, write: F) -> Result<(), ExportError>
where
    F: FnOnce(&mut BufWriter<File>) -> anyhow::Result<()>,
{
    let serialize = |source: anyhow::Error| ExportError::Serialize {
        path: path.to_path_buf(),
        source,
    };
    let temp = temp_path(path);
    let result = write_temp(&temp, write).and_then(|()| {
        std::fs::rename(&temp, path)
            .with_context(|| format!("Failed to replace {:?}", path))
    });
    if let Err(err) = result {
        let _ = std::fs::remove_file(&temp);
        return Err(serialize(err));
    }
    tracing::debug!("Wrote {:?}", path);
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_temp<F>(temp: &Path, write: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> anyhow::Result<()>,
{
    let file = File::create(temp).with_context(|| format!("Failed to create {:?}", temp))?;
    let mut w = BufWriter::new(file);
    write(&mut w)?;
    let file = w.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}
