//! SPM file assembly
//!
//! Re-exports the wire records from spm-common and writes complete files.
//! Attributes are quantized here, at write time; the mesh buffers themselves
//! stay in full precision.

pub use spm_common::formats::*;

use spm_common::{
    VertexLayout, pack_color, pack_half, pack_normal, pack_tangent,
};

use crate::mesh::types::{MeshBuffer, Vertex};
use crate::skeleton::SkeletonBlock;

/// Everything that goes into one file, in write order
#[derive(Debug, Clone, Copy)]
pub struct SpmFile<'a> {
    pub header: SpmHeader,
    pub materials: &'a [MaterialEntry],
    pub buffers: &'a [MeshBuffer],
    pub skeleton: Option<&'a SkeletonBlock>,
}

impl SpmFile<'_> {
    /// Record layout of a buffer, from the header flags and its material
    pub fn layout(&self, buffer: &MeshBuffer) -> VertexLayout {
        let material = self.materials.get(buffer.material_id as usize);
        VertexLayout::new(
            self.header.flags,
            material.is_some_and(|m| m.texture_one.is_some()),
            material.is_some_and(|m| m.texture_two.is_some()),
            self.header.kind == SpmKind::Skinned,
        )
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.header.write_to(&mut out);
        write_material_table(self.materials, &mut out);

        // One sector; spatial partitioning is never produced
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&(self.buffers.len() as u16).to_le_bytes());
        for buffer in self.buffers {
            write_mesh_buffer(buffer, self.layout(buffer), &mut out);
        }

        if let Some(skeleton) = self.skeleton {
            skeleton.write(&mut out);
        }
        out
    }
}

/// Append one quantized vertex record
pub fn write_vertex(vertex: &Vertex, layout: VertexLayout, out: &mut Vec<u8>) {
    for c in vertex.position {
        out.extend_from_slice(&c.to_le_bytes());
    }
    if layout.normal {
        out.extend_from_slice(&pack_normal(vertex.normal).to_le_bytes());
    }
    if layout.color {
        pack_color(vertex.color, out);
    }
    if layout.uv_one {
        let [u, v, u2, v2] = vertex.uvs;
        out.extend_from_slice(&pack_half(u).to_le_bytes());
        out.extend_from_slice(&pack_half(v).to_le_bytes());
        if layout.uv_two {
            out.extend_from_slice(&pack_half(u2).to_le_bytes());
            out.extend_from_slice(&pack_half(v2).to_le_bytes());
        }
        if layout.tangent {
            out.extend_from_slice(&pack_tangent(vertex.tangent).to_le_bytes());
        }
    }
    if layout.skinned {
        for joint in vertex.joints {
            out.extend_from_slice(&joint.to_le_bytes());
        }
        for weight in vertex.weights {
            out.extend_from_slice(&pack_half(weight).to_le_bytes());
        }
    }
}

/// Append buffer header, vertex records and indices
pub fn write_mesh_buffer(buffer: &MeshBuffer, layout: VertexLayout, out: &mut Vec<u8>) {
    let header = BufferHeader::new(
        buffer.vertices.len() as u32,
        buffer.indices.len() as u32,
        buffer.material_id,
    );
    header.write_to(out);

    out.reserve(buffer.vertices.len() * layout.max_stride());
    for vertex in &buffer.vertices {
        write_vertex(vertex, layout, out);
    }

    let width = IndexWidth::for_vertex_count(buffer.vertices.len());
    out.reserve(buffer.indices.len() * width.size());
    for &index in &buffer.indices {
        width.write(index, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spm_common::{FLAG_NORMAL, FLAG_TANGENT, FLAG_VERTEX_COLOR};

    fn header(kind: SpmKind, flags: u8) -> SpmHeader {
        SpmHeader::new(kind, flags, BoundingBox::from_point([0.0; 3]))
    }

    fn single(vertex: Vertex, material_id: u16) -> MeshBuffer {
        MeshBuffer {
            material_id,
            vertices: vec![vertex.clone(), vertex.clone(), vertex],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_vertex_record_sizes() {
        let vertex = Vertex::default();
        let layout = VertexLayout::new(FLAG_NORMAL | FLAG_VERTEX_COLOR, false, false, false);
        let mut out = Vec::new();
        write_vertex(&vertex, layout, &mut out);
        assert_eq!(out.len(), layout.min_stride());
        assert_eq!(out[16], 128);

        let tinted = Vertex {
            color: [10, 20, 30],
            ..Vertex::default()
        };
        out.clear();
        write_vertex(&tinted, layout, &mut out);
        assert_eq!(out.len(), layout.max_stride());
        assert_eq!(&out[16..], &[255, 10, 20, 30]);
    }

    #[test]
    fn test_tangent_only_inside_uv_block() {
        let vertex = Vertex::default();
        let untextured = VertexLayout::new(FLAG_TANGENT, false, false, false);
        let mut out = Vec::new();
        write_vertex(&vertex, untextured, &mut out);
        assert_eq!(out.len(), 12);

        let textured = VertexLayout::new(FLAG_TANGENT, true, true, false);
        out.clear();
        write_vertex(&vertex, textured, &mut out);
        assert_eq!(out.len(), 12 + 4 + 4 + 4);
    }

    #[test]
    fn test_untextured_file_layout() {
        let buffers = [single(Vertex::default(), 0)];
        let file = SpmFile {
            header: header(SpmKind::Static, FLAG_NORMAL),
            materials: &[],
            buffers: &buffers,
            skeleton: None,
        };
        let bytes = file.to_bytes();

        // header + material count + sector + buffer count + buffer header
        let prefix = 28 + 2 + 2 + 2 + 10;
        assert_eq!(bytes.len(), prefix + 3 * 16 + 3);
        assert_eq!(&bytes[28..34], &[0, 0, 1, 0, 1, 0]);
        assert_eq!(&bytes[bytes.len() - 3..], &[0, 1, 2]);
    }

    #[test]
    fn test_material_drives_uv_presence() {
        let materials = [
            MaterialEntry::default(),
            MaterialEntry::new(Some("a.png".into()), Some("b.png".into())),
        ];
        let buffers = [single(Vertex::default(), 0), single(Vertex::default(), 1)];
        let file = SpmFile {
            header: header(SpmKind::Static, 0),
            materials: &materials,
            buffers: &buffers,
            skeleton: None,
        };
        assert!(!file.layout(&buffers[0]).uv_one);
        let layout = file.layout(&buffers[1]);
        assert!(layout.uv_one && layout.uv_two);
        assert_eq!(layout.min_stride(), 20);
    }
}
