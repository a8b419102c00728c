//! SPM geometry decoder
//!
//! Reads the header, material table and every mesh buffer of every sector.
//! Normals, tangents and skinning data are skipped: consumers rebuild normals
//! after welding (see [`crate::assemble`]). The trailing skeleton block of
//! skinned files is left unread.
//!
//! Any structural problem aborts the whole decode with a [`FormatError`].

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::FormatError;
use crate::formats::{
    BinarySerializable, BufferHeader, IndexWidth, MaterialEntry, SECTOR_TRAILER_SIZE, SpmHeader,
    SpmKind,
};
use crate::packing::{COLOR_WHITE, VertexLayout};
use crate::reader::ByteReader;
use crate::texture::TextureResolver;

/// A texture name plus whatever the resolver found for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    pub name: String,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMaterial {
    pub texture_one: Option<TextureRef>,
    pub texture_two: Option<TextureRef>,
}

impl DecodedMaterial {
    fn resolve(entry: MaterialEntry, textures: &dyn TextureResolver) -> Self {
        let resolve = |name: Option<String>| {
            name.map(|name| TextureRef {
                path: textures.resolve(&name),
                name,
            })
        };
        Self {
            texture_one: resolve(entry.texture_one),
            texture_two: resolve(entry.texture_two),
        }
    }
}

/// One vertex as read back. Position is in the Z-up basis; UVs are exactly
/// as stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedVertex {
    pub position: [f32; 3],
    /// RGB in [0, 1]; `None` when the file has no vertex colors
    pub color: Option<[f32; 3]>,
    pub uv_one: Option<[f32; 2]>,
    pub uv_two: Option<[f32; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    pub sector: u16,
    pub material_id: u16,
    pub index_width: IndexWidth,
    pub vertices: Vec<DecodedVertex>,
    pub indices: Vec<u32>,
}

impl DecodedBuffer {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSpm {
    pub header: SpmHeader,
    pub materials: Vec<DecodedMaterial>,
    pub sector_count: u16,
    pub buffers: Vec<DecodedBuffer>,
}

impl DecodedSpm {
    pub fn is_skinned(&self) -> bool {
        self.header.kind == SpmKind::Skinned
    }

    pub fn vertex_count(&self) -> usize {
        self.buffers.iter().map(|b| b.vertices.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.buffers.iter().map(|b| b.indices.len()).sum()
    }

    /// Material a buffer refers to; `None` for the implicit untextured slot
    pub fn material(&self, buffer: &DecodedBuffer) -> Option<&DecodedMaterial> {
        self.materials.get(buffer.material_id as usize)
    }
}

/// Decode a complete SPM byte stream.
pub fn decode_spm(bytes: &[u8], textures: &dyn TextureResolver) -> Result<DecodedSpm, FormatError> {
    let mut reader = ByteReader::new(bytes);

    let header = parse_header(&mut reader)?;
    let materials = parse_material_table(&mut reader, textures)?;

    let sector_count = reader.read_u16()?;
    let mut buffers = Vec::new();
    for sector in 0..sector_count {
        let buffer_count = reader.read_u16()?;
        for _ in 0..buffer_count {
            buffers.push(read_mesh_buffer(&mut reader, &header, &materials, sector)?);
        }
        if header.kind == SpmKind::SpacePartitioned {
            reader.skip(SECTOR_TRAILER_SIZE)?;
        }
    }

    let decoded = DecodedSpm {
        header,
        materials,
        sector_count,
        buffers,
    };
    info!(
        "Decoded SPM: {} buffers, {} vertices, {} indices, {} trailing bytes",
        decoded.buffers.len(),
        decoded.vertex_count(),
        decoded.index_count(),
        reader.remaining()
    );
    Ok(decoded)
}

fn parse_header(reader: &mut ByteReader) -> Result<SpmHeader, FormatError> {
    let available = reader.remaining().min(SpmHeader::SIZE);
    // Short input still gets its magic checked before the length
    let header = SpmHeader::deserialize(reader.take(available)?)?;
    debug!(
        "SPM header: kind {:?}, flags {:#04x}, bounds {:?}",
        header.kind, header.flags, header.bounding_box
    );
    Ok(header)
}

fn parse_material_table(
    reader: &mut ByteReader,
    textures: &dyn TextureResolver,
) -> Result<Vec<DecodedMaterial>, FormatError> {
    let count = reader.read_u16()?;
    (0..count)
        .map(|_| MaterialEntry::read(reader).map(|entry| DecodedMaterial::resolve(entry, textures)))
        .collect()
}

fn read_mesh_buffer(
    reader: &mut ByteReader,
    header: &SpmHeader,
    materials: &[DecodedMaterial],
    sector: u16,
) -> Result<DecodedBuffer, FormatError> {
    let buffer: BufferHeader = reader.read_record()?;

    // An empty table means every buffer uses the implicit untextured slot 0
    let material = if materials.is_empty() && buffer.material_id == 0 {
        None
    } else {
        Some(
            materials
                .get(buffer.material_id as usize)
                .ok_or(FormatError::MaterialOutOfRange {
                    id: buffer.material_id,
                    count: materials.len() as u16,
                })?,
        )
    };
    if buffer.index_count % 3 != 0 {
        return Err(FormatError::PartialTriangle(buffer.index_count));
    }

    let layout = VertexLayout::new(
        header.flags,
        material.is_some_and(|m| m.texture_one.is_some()),
        material.is_some_and(|m| m.texture_two.is_some()),
        header.kind == SpmKind::Skinned,
    );

    let vertex_count = buffer.vertex_count as usize;
    let mut vertices = Vec::with_capacity(vertex_count.min(reader.remaining() / layout.min_stride()));
    for _ in 0..vertex_count {
        vertices.push(read_vertex(reader, &layout)?);
    }

    let index_width = IndexWidth::for_vertex_count(vertex_count);
    let index_count = buffer.index_count as usize;
    let mut indices = Vec::with_capacity(index_count.min(reader.remaining() / index_width.size()));
    for _ in 0..index_count {
        let index = match index_width {
            IndexWidth::U8 => u32::from(reader.read_u8()?),
            IndexWidth::U16 => u32::from(reader.read_u16()?),
            IndexWidth::U32 => reader.read_u32()?,
        };
        if index >= buffer.vertex_count {
            return Err(FormatError::IndexOutOfRange {
                index,
                vertex_count: buffer.vertex_count,
            });
        }
        indices.push(index);
    }

    debug!(
        "Read buffer: sector {}, material {}, {} vertices, {} indices ({:?})",
        sector, buffer.material_id, vertex_count, index_count, index_width
    );

    Ok(DecodedBuffer {
        sector,
        material_id: buffer.material_id,
        index_width,
        vertices,
        indices,
    })
}

fn read_vertex(reader: &mut ByteReader, layout: &VertexLayout) -> Result<DecodedVertex, FormatError> {
    let [x, y, z] = reader.read_vec3()?;

    if layout.normal {
        reader.skip(4)?;
    }

    let color = if layout.color {
        if reader.read_u8()? == COLOR_WHITE {
            Some([1.0; 3])
        } else {
            let rgb = reader.take(3)?;
            Some([0, 1, 2].map(|i| f32::from(rgb[i]) / 255.0))
        }
    } else {
        None
    };

    let mut uv_one = None;
    let mut uv_two = None;
    if layout.uv_one {
        uv_one = Some([reader.read_half()?, reader.read_half()?]);
        if layout.uv_two {
            uv_two = Some([reader.read_half()?, reader.read_half()?]);
        }
        if layout.tangent {
            reader.skip(4)?;
        }
    }

    if layout.skinned {
        reader.skip(16)?;
    }

    Ok(DecodedVertex {
        position: [x, z, y],
        color,
        uv_one,
        uv_two,
    })
}
