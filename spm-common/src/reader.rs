//! Bounds-checked little-endian cursor over an SPM byte stream

use crate::error::FormatError;
use crate::formats::BinarySerializable;
use crate::packing::unpack_half;

/// Forward-only reader. Every read reports [`FormatError::Truncated`] with the
/// offending offset instead of panicking on short input.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        if self.remaining() < len {
            return Err(FormatError::Truncated {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), FormatError> {
        self.take(len).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32, FormatError> {
        self.array().map(f32::from_le_bytes)
    }

    pub fn read_half(&mut self) -> Result<f32, FormatError> {
        self.read_u16().map(unpack_half)
    }

    /// Read one fixed-size record
    pub fn read_record<T: BinarySerializable>(&mut self) -> Result<T, FormatError> {
        T::deserialize(self.take(T::SIZE)?)
    }

    pub fn read_vec3(&mut self) -> Result<[f32; 3], FormatError> {
        Ok([self.read_f32()?, self.read_f32()?, self.read_f32()?])
    }

    /// Read a u8-length-prefixed name. Length 0 means "absent".
    pub fn read_name(&mut self) -> Result<Option<String>, FormatError> {
        let len = self.read_u8()? as usize;
        if len == 0 {
            return Ok(None);
        }
        let start = self.offset;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|_| FormatError::InvalidTextureName(start))
    }
}
