//! Export options (TOML `[export]` table)
//!
//! Every option is independent; none implies another. Missing keys take the
//! documented defaults, so an empty file is a valid configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use spm_common::MAX_BUFFER_VERTICES;

use crate::error::EncodeError;

/// Options controlling one encode call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportOptions {
    /// Write packed normals (default: true)
    #[serde(default = "default_true")]
    pub normals: bool,
    /// Write vertex colors when any object has them (default: true)
    #[serde(default = "default_true")]
    pub vertex_color: bool,
    /// Write packed tangents for textured buffers (default: true)
    #[serde(default = "default_true")]
    pub tangents: bool,
    /// Sample root bones in object space instead of world space (default: false)
    #[serde(default)]
    pub local_space: bool,
    /// Evaluate modifiers before export; honoured by ingestion front-ends (default: true)
    #[serde(default = "default_true")]
    pub apply_modifiers: bool,
    /// Sample only keyed frames instead of every frame (default: true)
    #[serde(default = "default_true")]
    pub keyframes_only: bool,
    /// Frame the static mesh is evaluated at; 0 means the scene start (default: 0)
    #[serde(default)]
    pub static_mesh_frame: i32,
    /// Export only selected objects (default: false)
    #[serde(default)]
    pub selected_only: bool,
    /// Vertex limit per mesh buffer (default: 65535, range: 3-65535)
    #[serde(default = "default_max_buffer_vertices")]
    pub max_buffer_vertices: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_buffer_vertices() -> usize {
    MAX_BUFFER_VERTICES
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            normals: true,
            vertex_color: true,
            tangents: true,
            local_space: false,
            apply_modifiers: true,
            keyframes_only: true,
            static_mesh_frame: 0,
            selected_only: false,
            max_buffer_vertices: MAX_BUFFER_VERTICES,
        }
    }
}

/// On-disk layout: options live under `[export]`
#[derive(Debug, Default, Deserialize)]
struct OptionsFile {
    #[serde(default)]
    export: ExportOptions,
}

impl ExportOptions {
    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid options file: {:?}", path))
    }

    /// Parse options from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let file: OptionsFile = toml::from_str(content).context("Failed to parse options TOML")?;
        file.export.validate()?;
        Ok(file.export)
    }

    pub fn validate(&self) -> Result<(), EncodeError> {
        if !(3..=MAX_BUFFER_VERTICES).contains(&self.max_buffer_vertices) {
            return Err(EncodeError::InvalidOption {
                name: "max_buffer_vertices",
                reason: format!(
                    "{} is outside 3..={}",
                    self.max_buffer_vertices, MAX_BUFFER_VERTICES
                ),
            });
        }
        Ok(())
    }
}

/// Load options from a TOML file
pub fn load_options(path: &Path) -> Result<ExportOptions> {
    ExportOptions::load(path)
}
