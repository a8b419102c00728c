//! spm-export - SPM mesh export tool
//!
//! Encodes OBJ meshes into .spm files, inspects existing .spm files and
//! converts them back to OBJ.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use spm_export::spm_common::{NameOnly, SearchPaths, TextureRef, decode_spm};
use spm_export::{ExportOptions, NoPoses, encode_to_path, load_options, mesh};

#[derive(Parser)]
#[command(name = "spm-export")]
#[command(about = "SPM mesh export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an OBJ mesh into an SPM file
    Encode {
        /// Input OBJ file
        input: PathBuf,

        /// Output .spm file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Options file with an [export] table
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not write normals
        #[arg(long)]
        no_normals: bool,

        /// Do not write vertex colors
        #[arg(long)]
        no_vertex_color: bool,

        /// Do not write tangents
        #[arg(long)]
        no_tangents: bool,

        /// Sample root bones in object space
        #[arg(long)]
        local_space: bool,

        /// Vertex limit per mesh buffer (3-65535)
        #[arg(long)]
        max_vertices: Option<usize>,
    },

    /// Print the structure of an SPM file
    Inspect {
        /// Input .spm file
        input: PathBuf,

        /// Extra directories searched for referenced textures, after the
        /// file's own directory
        #[arg(long = "texture-path")]
        texture_paths: Vec<PathBuf>,
    },

    /// Convert an SPM file's geometry to OBJ
    Obj {
        /// Input .spm file
        input: PathBuf,

        /// Output .obj file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn read_spm(input: &Path) -> Result<Vec<u8>> {
    std::fs::read(input).with_context(|| format!("Failed to read SPM: {:?}", input))
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
        Commands::Encode {
            input,
            output,
            config,
            no_normals,
            no_vertex_color,
            no_tangents,
            local_space,
            max_vertices,
        } => {
            let mut options = match config {
                Some(path) => load_options(&path)?,
                None => ExportOptions::default(),
            };
            options.normals &= !no_normals;
            options.vertex_color &= !no_vertex_color;
            options.tangents &= !no_tangents;
            options.local_space |= local_space;
            if let Some(max) = max_vertices {
                options.max_buffer_vertices = max;
            }

            let output = output.unwrap_or_else(|| input.with_extension("spm"));
            tracing::info!("Encoding {:?} -> {:?}", input, output);

            let scene = mesh::read_obj(&input)?;
            let summary = encode_to_path(&scene, &options, &NoPoses, &output)
                .with_context(|| format!("Failed to encode {:?}", input))?;
            for warning in &summary.warnings {
                println!("warning: {}", warning);
            }
            println!(
                "{:?}: {} buffers, {} vertices, {} indices, {} materials",
                summary.kind, summary.buffers, summary.vertices, summary.indices, summary.materials
            );
        }

        Commands::Inspect {
            input,
            texture_paths,
        } => {
            let bytes = read_spm(&input)?;
            let mut resolver = SearchPaths::beside(&input);
            for dir in texture_paths {
                resolver.push(dir);
            }
            let decoded = decode_spm(&bytes, &resolver)
                .with_context(|| format!("Invalid SPM: {:?}", input))?;

            let header = &decoded.header;
            println!("kind: {:?}", header.kind);
            println!("flags: {:#04x}", header.flags);
            println!(
                "bounds: {:?} - {:?}",
                header.bounding_box.min, header.bounding_box.max
            );
            println!("materials: {}", decoded.materials.len());
            for (i, material) in decoded.materials.iter().enumerate() {
                let describe = |t: &Option<TextureRef>| match t {
                    Some(t) => match &t.path {
                        Some(path) => format!("{} ({})", t.name, path.display()),
                        None => t.name.clone(),
                    },
                    None => "-".to_string(),
                };
                println!(
                    "  [{}] {} / {}",
                    i,
                    describe(&material.texture_one),
                    describe(&material.texture_two)
                );
            }
            println!("sectors: {}", decoded.sector_count);
            println!("buffers: {}", decoded.buffers.len());
            for (i, buffer) in decoded.buffers.iter().enumerate() {
                println!(
                    "  [{}] material {}, {} vertices, {} indices ({:?})",
                    i,
                    buffer.material_id,
                    buffer.vertices.len(),
                    buffer.indices.len(),
                    buffer.index_width
                );
            }
        }

        Commands::Obj { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension("obj"));
            tracing::info!("Converting {:?} -> {:?}", input, output);
            let bytes = read_spm(&input)?;
            let decoded =
                decode_spm(&bytes, &NameOnly).with_context(|| format!("Invalid SPM: {:?}", input))?;
            mesh::write_obj_file(&output, &decoded)?;
        }
    }

    Ok(())
}
