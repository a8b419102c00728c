//! Errors raised while reading an SPM stream

use crate::formats::SPM_VERSION;

/// Any way a byte stream can fail to be a well-formed SPM asset.
///
/// All variants are fatal; the decoder never returns partial results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("not an SPM stream: magic {0:#06x}")]
    BadMagic(u16),

    #[error("unsupported SPM version {found} (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },

    #[error("unknown SPM type tag {0}")]
    UnknownKind(u8),

    #[error("buffer references material {id} but the table has {count} entries")]
    MaterialOutOfRange { id: u16, count: u16 },

    #[error("index {index} out of range for a buffer of {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: u32 },

    #[error("unexpected end of stream at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("index count {0} is not a multiple of 3")]
    PartialTriangle(u32),

    #[error("texture name at offset {0} is not valid UTF-8")]
    InvalidTextureName(usize),
}

impl FormatError {
    pub(crate) fn unsupported_version(found: u8) -> Self {
        Self::UnsupportedVersion {
            found,
            expected: SPM_VERSION,
        }
    }
}
