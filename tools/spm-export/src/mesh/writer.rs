//! Mesh buffer writer
//!
//! Walks material runs once, welding corners into per-buffer vertex lists.
//! A buffer is flushed when the run ends, or before a triangle whose new
//! vertices would push it past the vertex limit. Overflow buffers of one run
//! keep that run's material slot.

use tracing::debug;

use spm_common::MAX_BUFFER_VERTICES;

use super::grouping::MaterialRun;
use super::types::{MeshBuffer, Triangle};
use super::vertex::VertexWelder;
use crate::error::EncodeError;

pub struct MeshBufferWriter {
    max_vertices: usize,
    skinned: bool,
}

impl MeshBufferWriter {
    pub fn new(max_vertices: usize, skinned: bool) -> Self {
        Self {
            max_vertices,
            skinned,
        }
    }

    pub fn write(
        &self,
        triangles: &[Triangle],
        runs: &[MaterialRun],
    ) -> Result<Vec<MeshBuffer>, EncodeError> {
        let mut buffers = Vec::new();
        let mut welder = VertexWelder::new(self.skinned);
        let mut indices = Vec::new();

        for (slot, run) in runs.iter().enumerate() {
            let material_id = slot as u16;
            for triangle in &triangles[run.range.clone()] {
                if welder.len() + welder.count_new(&triangle.vertices) > self.max_vertices {
                    self.flush(material_id, &mut welder, &mut indices, &mut buffers)?;
                }
                for vertex in &triangle.vertices {
                    indices.push(welder.weld(vertex));
                }
            }
            self.flush(material_id, &mut welder, &mut indices, &mut buffers)?;
        }

        Ok(buffers)
    }

    fn flush(
        &self,
        material_id: u16,
        welder: &mut VertexWelder,
        indices: &mut Vec<u32>,
        buffers: &mut Vec<MeshBuffer>,
    ) -> Result<(), EncodeError> {
        if indices.is_empty() {
            return Ok(());
        }

        let vertices = welder.take();
        if vertices.len() > MAX_BUFFER_VERTICES.min(self.max_vertices) {
            return Err(EncodeError::BufferOverflow {
                count: vertices.len(),
                max: self.max_vertices,
            });
        }

        debug!(
            "Flushed mesh buffer {}: material {}, {} vertices, {} indices",
            buffers.len(),
            material_id,
            vertices.len(),
            indices.len()
        );

        buffers.push(MeshBuffer {
            material_id,
            vertices,
            indices: std::mem::take(indices),
        });
        Ok(())
    }
}
