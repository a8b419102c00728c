//! Rebuilds shared-vertex topology from decoded buffers
//!
//! Decoded vertices are unique per attribute combination, so a seam in UVs
//! or colors splits positions apart. The assembler welds positions only,
//! keeps UVs and colors per face corner, and recomputes smooth normals.

use glam::Vec3;
use tracing::debug;

use crate::decoder::{DecodedBuffer, DecodedSpm, DecodedVertex};
use crate::weld::PositionWelder;

/// A rebuilt triangle: welded position indices and its original corners
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledFace {
    pub vertices: [u32; 3],
    pub corners: [DecodedVertex; 3],
}

/// One decoded buffer as an indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledMesh {
    pub material_id: u16,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub faces: Vec<AssembledFace>,
    /// Triangles dropped because welding collapsed them
    pub collapsed: usize,
}

/// Assemble every buffer of a decoded file
pub fn assemble(decoded: &DecodedSpm) -> Vec<AssembledMesh> {
    decoded.buffers.iter().map(assemble_buffer).collect()
}

/// Weld one buffer's positions and rebuild its faces with reversed winding
pub fn assemble_buffer(buffer: &DecodedBuffer) -> AssembledMesh {
    let mut welder = PositionWelder::new();
    let mut faces = Vec::with_capacity(buffer.triangle_count());
    let mut collapsed = 0;

    for triangle in buffer.indices.chunks_exact(3) {
        let corners = [triangle[2], triangle[1], triangle[0]].map(|i| buffer.vertices[i as usize]);
        let vertices = corners.map(|corner| welder.weld(corner.position));

        if vertices[0] == vertices[1] || vertices[1] == vertices[2] || vertices[0] == vertices[2] {
            collapsed += 1;
            continue;
        }
        faces.push(AssembledFace { vertices, corners });
    }

    let positions = welder.into_positions();
    let triangles: Vec<[u32; 3]> = faces.iter().map(|f| f.vertices).collect();
    let normals = smooth_normals(&positions, &triangles);

    debug!(
        "Assembled buffer (material {}): {} -> {} positions, {} faces, {} collapsed",
        buffer.material_id,
        buffer.vertices.len(),
        positions.len(),
        faces.len(),
        collapsed
    );

    AssembledMesh {
        material_id: buffer.material_id,
        positions,
        normals,
        faces,
        collapsed,
    }
}

/// Area-weighted vertex normals; unreferenced vertices get a zero normal
pub fn smooth_normals(positions: &[[f32; 3]], triangles: &[[u32; 3]]) -> Vec<[f32; 3]> {
    let mut sums = vec![Vec3::ZERO; positions.len()];
    for tri in triangles {
        let [a, b, c] = tri.map(|i| Vec3::from(positions[i as usize]));
        // Cross product length is twice the triangle area
        let face_normal = (b - a).cross(c - a);
        for &i in tri {
            sums[i as usize] += face_normal;
        }
    }
    sums.into_iter()
        .map(|n| n.normalize_or_zero().to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::IndexWidth;

    fn vertex(position: [f32; 3], u: f32) -> DecodedVertex {
        DecodedVertex {
            position,
            color: None,
            uv_one: Some([u, 0.0]),
            uv_two: None,
        }
    }

    fn buffer(vertices: Vec<DecodedVertex>, indices: Vec<u32>) -> DecodedBuffer {
        DecodedBuffer {
            sector: 0,
            material_id: 0,
            index_width: IndexWidth::U8,
            vertices,
            indices,
        }
    }

    #[test]
    fn test_welds_uv_seam() {
        // Two triangles sharing an edge, but the shared corners differ in UV
        let vertices = vec![
            vertex([0.0, 0.0, 0.0], 0.0),
            vertex([1.0, 0.0, 0.0], 0.0),
            vertex([0.0, 1.0, 0.0], 0.0),
            vertex([1.0, 0.0, 0.0], 1.0),
            vertex([0.0, 1.0, 0.0], 1.0),
            vertex([1.0, 1.0, 0.0], 1.0),
        ];
        let mesh = assemble_buffer(&buffer(vertices, vec![0, 1, 2, 3, 5, 4]));

        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.faces.len(), 2);
        // Per-corner UVs survive welding
        assert_eq!(mesh.faces[1].corners[0].uv_one, Some([1.0, 0.0]));
    }

    #[test]
    fn test_reverses_winding() {
        let vertices = vec![
            vertex([0.0, 0.0, 0.0], 0.0),
            vertex([1.0, 0.0, 0.0], 0.0),
            vertex([0.0, 1.0, 0.0], 0.0),
        ];
        let mesh = assemble_buffer(&buffer(vertices, vec![0, 1, 2]));
        assert_eq!(mesh.faces[0].corners[0].position, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.faces[0].corners[2].position, [0.0, 0.0, 0.0]);
        // (0,1,0) -> (1,0,0) -> (0,0,0) winds clockwise seen from +Z
        assert_eq!(mesh.normals[0], [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_drops_collapsed_triangles() {
        let vertices = vec![
            vertex([0.0, 0.0, 0.0], 0.0),
            vertex([0.00001, 0.0, 0.0], 0.0),
            vertex([0.0, 1.0, 0.0], 0.0),
        ];
        let mesh = assemble_buffer(&buffer(vertices, vec![0, 1, 2]));
        assert!(mesh.faces.is_empty());
        assert_eq!(mesh.collapsed, 1);
    }

    #[test]
    fn test_smooth_normals_area_weighted() {
        let positions = [
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [0.0, 0.0, 0.1],
            [9.0, 9.0, 9.0],
        ];
        // Large triangle faces +Z, sliver faces -Y; both touch vertex 0
        let normals = smooth_normals(&positions, &[[0, 1, 2], [0, 1, 3]]);
        let n0 = Vec3::from(normals[0]);
        assert!(n0.z > 0.9);
        assert!(n0.y < 0.0);
        assert_eq!(normals[4], [0.0, 0.0, 0.0]);
    }
}
