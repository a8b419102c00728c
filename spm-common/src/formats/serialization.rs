//! Binary serialization trait for fixed-size SPM records.
//!
//! The file header, mesh buffer header and bone transform records implement
//! `BinarySerializable` so writers can append any of them uniformly, while
//! each type keeps its own `to_bytes()` returning a fixed-size array.

use crate::error::FormatError;

/// Trait for fixed-size binary records.
///
/// The trait uses `Vec<u8>` for the return type because associated const
/// generics in return types (`[u8; Self::SIZE]`) are not yet stable in Rust.
///
/// # Example
///
/// ```
/// use spm_common::formats::{BinarySerializable, BufferHeader};
///
/// let header = BufferHeader::new(3, 3, 0);
///
/// let mut out = Vec::new();
/// header.write_to(&mut out);
/// let parsed = BufferHeader::deserialize(&out).unwrap();
/// assert_eq!(parsed, header);
/// ```
pub trait BinarySerializable: Sized {
    /// Size of the serialized record in bytes.
    const SIZE: usize;

    /// Serialize to bytes.
    fn serialize(&self) -> Vec<u8>;

    /// Deserialize from bytes, validating whatever the record can validate.
    fn deserialize(bytes: &[u8]) -> Result<Self, FormatError>;

    /// Append the serialized record to a growing stream
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.serialize());
    }
}

impl BinarySerializable for super::SpmHeader {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Result<Self, FormatError> {
        Self::from_bytes(bytes)
    }
}

impl BinarySerializable for super::BufferHeader {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Result<Self, FormatError> {
        Self::from_bytes(bytes)
    }
}

impl BinarySerializable for super::BoneTransform {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Result<Self, FormatError> {
        Self::from_bytes(bytes)
    }
}
