//! Types and constants for mesh encoding

use smallvec::SmallVec;

/// Joint slot marker for "no influence"
pub const NO_JOINT: i16 = -1;

/// Bone influences of one source corner: (bone index within its armature, weight),
/// heaviest first, at most four, zero weights removed.
pub type Influences = SmallVec<[(u16, f32); 4]>;

/// One triangle corner with every attribute the format can carry.
///
/// Joint indices start as [`NO_JOINT`] and are filled in by the skeleton
/// encoder once bone ids are allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [u8; 3],
    /// uv_one.xy, uv_two.xy (V already flipped)
    pub uvs: [f32; 4],
    /// xyz + bitangent sign
    pub tangent: [f32; 4],
    pub joints: [i16; 4],
    pub weights: [f32; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
            color: [255; 3],
            uvs: [0.0; 4],
            tangent: [0.0, 0.0, 0.0, 1.0],
            joints: [NO_JOINT; 4],
            weights: [0.0; 4],
        }
    }
}

/// Texture pair a triangle is drawn with
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureKey {
    pub texture_one: Option<String>,
    pub texture_two: Option<String>,
}

impl TextureKey {
    /// Concatenated basenames; triangles are grouped by this string
    pub fn sort_key(&self) -> String {
        let mut key = self.texture_one.clone().unwrap_or_default();
        key.push_str(self.texture_two.as_deref().unwrap_or(""));
        key
    }
}

/// An ingested triangle, ready for grouping and welding
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    /// Raw bone influences per corner, resolved against `armature`
    pub influences: [Influences; 3],
    pub textures: TextureKey,
    /// Index into the scene's armature list
    pub armature: Option<usize>,
}

/// One flushed mesh buffer in canonical (unquantized) form
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffer {
    pub material_id: u16,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshBuffer {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
