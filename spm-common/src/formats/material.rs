//! SPM material table
//!
//! ```text
//! count u16
//! count × { texture_one name, texture_two name }
//! ```
//!
//! Each name is a u8 length followed by that many bytes; length 0 means
//! the slot is unused.

use crate::error::FormatError;
use crate::reader::ByteReader;

/// Longest texture name the one-byte length prefix can describe
pub const MAX_NAME_LEN: usize = 255;

/// One material slot: up to two texture file names (basenames only)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MaterialEntry {
    pub texture_one: Option<String>,
    pub texture_two: Option<String>,
}

impl MaterialEntry {
    pub fn new(texture_one: Option<String>, texture_two: Option<String>) -> Self {
        Self {
            texture_one,
            texture_two,
        }
    }

    /// True when neither slot names a texture
    pub fn is_untextured(&self) -> bool {
        self.texture_one.is_none() && self.texture_two.is_none()
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_name(self.texture_one.as_deref(), out);
        write_name(self.texture_two.as_deref(), out);
    }

    pub fn read(reader: &mut ByteReader) -> Result<Self, FormatError> {
        Ok(Self {
            texture_one: reader.read_name()?,
            texture_two: reader.read_name()?,
        })
    }
}

/// Cut a name to at most [`MAX_NAME_LEN`] bytes on a char boundary
pub fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Append a length-prefixed name (empty for `None`)
pub fn write_name(name: Option<&str>, out: &mut Vec<u8>) {
    let name = truncate_name(name.unwrap_or(""));
    out.push(name.len() as u8);
    out.extend_from_slice(name.as_bytes());
}

/// Append the whole material table
pub fn write_material_table(materials: &[MaterialEntry], out: &mut Vec<u8>) {
    out.extend_from_slice(&(materials.len() as u16).to_le_bytes());
    for material in materials {
        material.write(out);
    }
}
