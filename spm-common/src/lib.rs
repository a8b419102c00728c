//! Shared types and utilities for the SPM mesh format
//!
//! This crate is shared between:
//! - `spm-export` (encoder and asset pipeline)
//! - anything that needs to read SPM geometry back
//!
//! # Modules
//!
//! - [`packing`] - Attribute quantization (f32 → f16, 10/10/10/2, compact colors)
//! - [`formats`] - Wire records: header, material table, bone transforms
//! - [`weld`] - Tolerance-based vertex welding
//! - [`decoder`] - Header/material/buffer parsing
//! - [`assemble`] - Position welding and normal rebuild for decoded buffers
//! - [`texture`] - Texture name resolution policies

pub mod assemble;
pub mod decoder;
pub mod error;
pub mod formats;
pub mod packing;
pub mod reader;
pub mod texture;
pub mod weld;

pub use error::FormatError;

// Re-export commonly used packing items
pub use packing::{
    FLAG_NORMAL, FLAG_TANGENT, FLAG_VERTEX_COLOR, VertexLayout, pack_2101010_rev, pack_color,
    pack_half, pack_normal, pack_tangent, quantize_channel, unpack_2101010_rev, unpack_half,
};

// Re-export commonly used format items
pub use formats::{
    BONE_TRANSFORM_SIZE, BinarySerializable, BoneTransform, BoundingBox, BufferHeader,
    IndexWidth, MAX_BUFFER_VERTICES, MaterialEntry, SPM_MAGIC, SPM_VERSION, SpmHeader, SpmKind,
};

// Re-export the decoding pipeline
pub use assemble::{AssembledFace, AssembledMesh, assemble, assemble_buffer};
pub use decoder::{DecodedBuffer, DecodedMaterial, DecodedSpm, DecodedVertex, TextureRef, decode_spm};
pub use texture::{NameOnly, SearchPaths, TextureResolver};
