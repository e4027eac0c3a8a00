//! lexi-export - LEXI asset export tool
//!
//! Converts host scene descriptions to engine mesh, skeleton and material
//! files (.mesh, .skeleton, .material)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use lexi_export::scene::{MemoryScene, NodeHandle, SceneSource};
use lexi_export::{ExportConfig, ExportObject, ExportPass, ExportSummary, manifest};

#[derive(Parser)]
#[command(name = "lexi-export")]
#[command(about = "LEXI asset export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every object listed in a manifest
    Build {
        /// Path to export.toml manifest
        #[arg(default_value = "export.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest and scene without exporting
    Check {
        /// Path to export.toml manifest
        #[arg(default_value = "export.toml")]
        manifest: PathBuf,
    },

    /// Print the node tree of a scene description
    Nodes {
        /// Scene description (JSON)
        scene: PathBuf,
    },

    /// Export a single node
    Mesh {
        /// Scene description (JSON)
        scene: PathBuf,

        /// Name of the node to export
        node: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Output file stem (default: node name)
        #[arg(short, long)]
        name: Option<String>,

        /// Export config as TOML (default: built-in defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Exporting from {:?}", manifest);
            }
            let config = manifest::load_manifest(&manifest)?;
            let summary = manifest::build_all(&config, output.as_deref())?;
            report(&summary)?;
            tracing::info!("Build complete!");
        }
        Commands::Check { manifest } => {
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid ({} objects)", config.objects.len());
        }
        Commands::Nodes { scene } => {
            let scene = load_scene(&scene)?;
            print_tree(&scene, NodeHandle::ROOT, 0);
        }
        Commands::Mesh {
            scene: scene_path,
            node,
            output,
            name,
            config,
        } => {
            let scene = load_scene(&scene_path)?;
            let config = match config {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read config: {:?}", path))?;
                    ExportConfig::from_toml_str(&content)
                        .with_context(|| format!("Failed to parse config: {:?}", path))?
                }
                None => ExportConfig::default(),
            };
            let base_name = name.unwrap_or_else(|| node.clone());
            tracing::info!("Exporting node '{}' -> {:?}", node, output);

            let source_dir = scene_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let mut pass = ExportPass::new(&scene, output).with_source_dir(source_dir);
            let summary = pass.run(&[ExportObject::new(node, base_name, config)]);
            report(&summary)?;
        }
    }

    Ok(())
}

fn load_scene(path: &Path) -> Result<MemoryScene> {
    MemoryScene::load(path).with_context(|| format!("Failed to load scene: {:?}", path))
}

fn print_tree(scene: &MemoryScene, node: NodeHandle, depth: usize) {
    for child in scene.children(node) {
        let name = scene.node_name(child).unwrap_or("?");
        match scene.node_kind(child) {
            Some(kind) => println!("{}{} {} ({:?})", "  ".repeat(depth), child, name, kind),
            None => println!("{}{} {}", "  ".repeat(depth), child, name),
        }
        print_tree(scene, child, depth + 1);
    }
}

/// Print the problems of a pass and fail if any object failed
fn report(summary: &ExportSummary) -> Result<()> {
    for problem in &summary.problems {
        eprintln!("{}", problem);
    }
    tracing::info!(
        "{} exported, {} failed, {} skipped",
        summary.succeeded.len(),
        summary.failed.len(),
        summary.skipped.len()
    );
    if !summary.is_success() {
        let names: Vec<&str> = summary.failed.iter().map(|(n, _)| n.as_str()).collect();
        anyhow::bail!("Export failed for: {}", names.join(", "));
    }
    Ok(())
}
