//! Encoder entry points
//!
//! `encode` runs the whole pipeline in memory: ingest, group by material,
//! allocate bones, weld into buffers, then assemble the file. Nothing is
//! written to a target unless every stage succeeded.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use spm_common::{BoundingBox, FLAG_NORMAL, FLAG_TANGENT, FLAG_VERTEX_COLOR, SpmHeader, SpmKind};

use crate::animation::PoseSampler;
use crate::config::ExportOptions;
use crate::error::{EncodeError, EncodeWarning};
use crate::formats::SpmFile;
use crate::ingest::{SceneInput, ingest};
use crate::mesh::{MeshBufferWriter, material_runs, material_table, sort_by_material};
use crate::skeleton::{MAX_FRAME, encode_skeleton};

/// What one encode call produced
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSummary {
    pub kind: SpmKind,
    pub flags: u8,
    pub buffers: usize,
    pub vertices: usize,
    pub indices: usize,
    pub materials: usize,
    pub armatures: usize,
    pub keyframes: usize,
    pub warnings: Vec<EncodeWarning>,
}

#[derive(Debug, Clone)]
pub struct EncodedSpm {
    pub bytes: Vec<u8>,
    pub summary: EncodeSummary,
}

/// Reference frame of the static mesh, always >= 1
fn static_frame(
    options: &ExportOptions,
    scene_start: i32,
    warnings: &mut Vec<EncodeWarning>,
) -> Result<u32, EncodeError> {
    let requested = if options.static_mesh_frame > 0 {
        options.static_mesh_frame
    } else {
        scene_start
    };
    if requested < 1 {
        warnings.push(EncodeWarning::StaticFrameClamped(requested).raise());
        return Ok(1);
    }
    let frame = requested as u32;
    if frame > MAX_FRAME {
        return Err(EncodeError::FrameOutOfRange(frame));
    }
    Ok(frame)
}

/// Encode a scene into SPM bytes
pub fn encode(
    scene: &SceneInput,
    options: &ExportOptions,
    sampler: &dyn PoseSampler,
) -> Result<EncodedSpm, EncodeError> {
    options.validate()?;
    let mut warnings = Vec::new();

    let ingested = ingest(scene, options, &mut warnings)?;
    let mut triangles = ingested.triangles;
    if triangles.is_empty() {
        return Err(EncodeError::NoTriangles);
    }

    let vertex_colors = options.vertex_color && ingested.vertex_colors;
    if !vertex_colors {
        for vertex in triangles.iter_mut().flat_map(|t| t.vertices.iter_mut()) {
            vertex.color = [255; 3];
        }
    }

    sort_by_material(&mut triangles);
    let runs = material_runs(&triangles)?;

    let skeleton = if triangles.iter().any(|t| t.armature.is_some()) {
        let frame = static_frame(options, scene.frame_start, &mut warnings)?;
        encode_skeleton(
            &scene.armatures,
            &mut triangles,
            options,
            scene.frame_start,
            frame,
            sampler,
            &mut warnings,
        )?
    } else {
        None
    };
    let skinned = skeleton.is_some();

    let materials = material_table(&runs, &mut warnings);
    let buffers = MeshBufferWriter::new(options.max_buffer_vertices, skinned).write(&triangles, &runs)?;
    if buffers.len() > u16::MAX as usize {
        return Err(EncodeError::TooMany {
            what: "mesh buffers",
            count: buffers.len(),
            limit: u16::MAX as usize,
        });
    }

    let mut flags = 0;
    if options.normals {
        flags |= FLAG_NORMAL;
    }
    if vertex_colors {
        flags |= FLAG_VERTEX_COLOR;
    }
    if ingested.tangents {
        flags |= FLAG_TANGENT;
    }
    let kind = if skinned { SpmKind::Skinned } else { SpmKind::Static };
    let header = SpmHeader::new(kind, flags, ingested.bounding_box.unwrap_or_default());

    let bytes = SpmFile {
        header,
        materials: &materials,
        buffers: &buffers,
        skeleton: skeleton.as_ref(),
    }
    .to_bytes();

    let summary = EncodeSummary {
        kind,
        flags,
        buffers: buffers.len(),
        vertices: buffers.iter().map(|b| b.vertices.len()).sum(),
        indices: buffers.iter().map(|b| b.indices.len()).sum(),
        materials: materials.len(),
        armatures: skeleton.as_ref().map_or(0, |s| s.armatures.len()),
        keyframes: skeleton.as_ref().map_or(0, |s| s.keyframe_count()),
        warnings,
    };

    info!(
        "Encoded {:?} SPM: {} buffers, {} vertices, {} indices, {} materials, {} armatures ({} bytes)",
        summary.kind,
        summary.buffers,
        summary.vertices,
        summary.indices,
        summary.materials,
        summary.armatures,
        bytes.len()
    );

    Ok(EncodedSpm { bytes, summary })
}

/// Encode and write to `w`; nothing is written if encoding fails
pub fn encode_to_writer<W: Write>(
    scene: &SceneInput,
    options: &ExportOptions,
    sampler: &dyn PoseSampler,
    w: &mut W,
) -> Result<EncodeSummary, EncodeError> {
    write_encoded(encode(scene, options, sampler)?, w)
}

/// Encode and write to a file; the file is only created after a successful encode
pub fn encode_to_path(
    scene: &SceneInput,
    options: &ExportOptions,
    sampler: &dyn PoseSampler,
    path: &Path,
) -> Result<EncodeSummary, EncodeError> {
    let encoded = encode(scene, options, sampler)?;
    let mut w = BufWriter::new(File::create(path)?);
    write_encoded(encoded, &mut w)
}

fn write_encoded<W: Write>(encoded: EncodedSpm, w: &mut W) -> Result<EncodeSummary, EncodeError> {
    w.write_all(&encoded.bytes)?;
    w.flush()?;
    Ok(encoded.summary)
}
