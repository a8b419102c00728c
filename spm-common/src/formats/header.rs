//! SPM file header and mesh buffer header
//!
//! # Layout
//! ```text
//! 0x00: magic u16 (0x5053, "SP")
//! 0x02: version/type u8 (version << 3 | type)
//! 0x03: flags u8 (normal | color | tangent)
//! 0x04: bounding box min xyz f32
//! 0x10: bounding box max xyz f32
//! ```
//!
//! Each mesh buffer starts with:
//! ```text
//! 0x00: vertex_count u32
//! 0x04: index_count u32
//! 0x08: material_id u16
//! ```

use crate::error::FormatError;

use super::{SPM_MAGIC, SPM_VERSION, SpmKind};

/// Axis-aligned bounds over every exported position (Y-up)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub fn from_point(p: [f32; 3]) -> Self {
        Self { min: p, max: p }
    }

    pub fn extend(&mut self, p: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::from_point([0.0; 3])
    }
}

/// SPM header (28 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpmHeader {
    pub version: u8,
    pub kind: SpmKind,
    pub flags: u8,
    pub bounding_box: BoundingBox,
}

impl SpmHeader {
    pub const SIZE: usize = 28;

    pub fn new(kind: SpmKind, flags: u8, bounding_box: BoundingBox) -> Self {
        Self {
            version: SPM_VERSION,
            kind,
            flags,
            bounding_box,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&SPM_MAGIC.to_le_bytes());
        bytes[2] = (self.version << 3) | self.kind.tag();
        bytes[3] = self.flags;
        let bounds = self.bounding_box.min.iter().chain(&self.bounding_box.max);
        for (i, value) in bounds.enumerate() {
            let at = 4 + i * 4;
            bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Read and validate header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        // Reject foreign files before complaining about their length
        if let [lo, hi, ..] = *bytes {
            let magic = u16::from_le_bytes([lo, hi]);
            if magic != SPM_MAGIC {
                return Err(FormatError::BadMagic(magic));
            }
        }
        if bytes.len() < Self::SIZE {
            return Err(FormatError::Truncated {
                offset: 0,
                needed: Self::SIZE,
                available: bytes.len(),
            });
        }

        let version = bytes[2] >> 3;
        if version != SPM_VERSION {
            return Err(FormatError::unsupported_version(version));
        }
        let tag = bytes[2] & 0x07;
        let kind = SpmKind::from_tag(tag).ok_or(FormatError::UnknownKind(tag))?;

        let f = |i: usize| {
            let at = 4 + i * 4;
            f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };

        Ok(Self {
            version,
            kind,
            flags: bytes[3],
            bounding_box: BoundingBox {
                min: [f(0), f(1), f(2)],
                max: [f(3), f(4), f(5)],
            },
        })
    }
}

/// Per-buffer header (10 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHeader {
    pub vertex_count: u32,
    pub index_count: u32,
    pub material_id: u16,
}

impl BufferHeader {
    pub const SIZE: usize = 10;

    pub fn new(vertex_count: u32, index_count: u32, material_id: u16) -> Self {
        Self {
            vertex_count,
            index_count,
            material_id,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.vertex_count.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.index_count.to_le_bytes());
        bytes[8..10].copy_from_slice(&self.material_id.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < Self::SIZE {
            return Err(FormatError::Truncated {
                offset: 0,
                needed: Self::SIZE,
                available: bytes.len(),
            });
        }
        Ok(Self {
            vertex_count: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            index_count: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            material_id: u16::from_le_bytes([bytes[8], bytes[9]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = SpmHeader::new(
            SpmKind::Static,
            0x01,
            BoundingBox {
                min: [0.0, 0.0, 0.0],
                max: [1.0, 0.0, 1.0],
            },
        );
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[0x53, 0x50, 0x0A, 0x01]);
        assert_eq!(&bytes[16..20], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[24..28], &1.0f32.to_le_bytes());

        let skinned = SpmHeader::new(SpmKind::Skinned, 0x07, BoundingBox::default());
        assert_eq!(skinned.to_bytes()[2], 0x09);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = SpmHeader::new(
            SpmKind::Skinned,
            0x05,
            BoundingBox {
                min: [-1.0, -2.0, -3.0],
                max: [4.0, 5.0, 6.0],
            },
        );
        let parsed = SpmHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut bytes = SpmHeader::new(SpmKind::Static, 0, BoundingBox::default()).to_bytes();
        bytes[0] = 0x00;
        assert_eq!(
            SpmHeader::from_bytes(&bytes).unwrap_err(),
            FormatError::BadMagic(0x5000)
        );
    }

    #[test]
    fn test_header_rejects_version_and_kind() {
        let mut bytes = SpmHeader::new(SpmKind::Static, 0, BoundingBox::default()).to_bytes();
        bytes[2] = (2 << 3) | 2;
        assert!(matches!(
            SpmHeader::from_bytes(&bytes),
            Err(FormatError::UnsupportedVersion { found: 2, .. })
        ));

        bytes[2] = (SPM_VERSION << 3) | 5;
        assert_eq!(
            SpmHeader::from_bytes(&bytes).unwrap_err(),
            FormatError::UnknownKind(5)
        );
    }

    #[test]
    fn test_bounding_box_extend() {
        let mut bounds = BoundingBox::from_point([1.0, 1.0, 1.0]);
        bounds.extend([-1.0, 2.0, 0.5]);
        assert_eq!(bounds.min, [-1.0, 1.0, 0.5]);
        assert_eq!(bounds.max, [1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_buffer_header_roundtrip() {
        let header = BufferHeader::new(3, 6, 2);
        let bytes = header.to_bytes();
        assert_eq!(bytes, [3, 0, 0, 0, 6, 0, 0, 0, 2, 0]);
        assert_eq!(BufferHeader::from_bytes(&bytes).unwrap(), header);
        assert!(BufferHeader::from_bytes(&bytes[..9]).is_err());
    }
}
