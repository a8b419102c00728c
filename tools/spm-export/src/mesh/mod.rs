//! Mesh encoding (triangles -> welded, material-grouped buffers)

mod grouping;
pub mod obj;
pub mod types;
mod vertex;
mod writer;

// Re-export public API
pub use grouping::{MaterialRun, material_runs, material_table, sort_by_material};
pub use obj::{parse_obj, read_obj, write_obj, write_obj_file};
pub use types::{MeshBuffer, TextureKey, Triangle, Vertex};
pub use vertex::{VertexWelder, same_vertex};
pub use writer::MeshBufferWriter;
