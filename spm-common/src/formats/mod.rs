//! SPM binary format records
//!
//! An SPM file is a little-endian stream:
//! ```text
//! header           (magic, version/type, flags, bounding box)
//! material table   (count u16, texture name pairs)
//! sector count u16 (always 1 when written)
//! per sector:
//!   buffer count u16
//!   per buffer: header, vertex records, indices
//! skeleton block   (skinned files only)
//! ```
//!
//! Fixed-size records implement the [`BinarySerializable`] trait for
//! consistent serialization/deserialization.

pub mod header;
pub mod material;
mod serialization;
pub mod skeleton;

pub use header::*;
pub use material::*;
pub use serialization::BinarySerializable;
pub use skeleton::*;

/// File magic, "SP" when read as bytes
pub const SPM_MAGIC: u16 = 0x5053;

/// Format version stored in the upper five bits of the version/type byte
pub const SPM_VERSION: u8 = 1;

/// Largest vertex count one mesh buffer may hold
pub const MAX_BUFFER_VERTICES: usize = 65535;

/// Padding that follows every sector of a space-partitioned file
pub const SECTOR_TRAILER_SIZE: usize = 24;

/// File type stored in the lower three bits of the version/type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpmKind {
    /// "SPMS": multi-sector static geometry
    SpacePartitioned,
    /// "SPMA": geometry with joints, weights and a skeleton block
    Skinned,
    /// "SPMN": single-sector static geometry
    Static,
}

impl SpmKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::SpacePartitioned),
            1 => Some(Self::Skinned),
            2 => Some(Self::Static),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::SpacePartitioned => 0,
            Self::Skinned => 1,
            Self::Static => 2,
        }
    }
}

/// Width of one index in a mesh buffer, chosen from its vertex count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count > 65535 {
            Self::U32
        } else if vertex_count > 255 {
            Self::U16
        } else {
            Self::U8
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Append one index at this width
    pub fn write(self, index: u32, out: &mut Vec<u8>) {
        match self {
            Self::U8 => out.push(index as u8),
            Self::U16 => out.extend_from_slice(&(index as u16).to_le_bytes()),
            Self::U32 => out.extend_from_slice(&index.to_le_bytes()),
        }
    }
}
