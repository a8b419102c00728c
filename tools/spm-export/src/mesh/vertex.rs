//! Vertex canonicalization and welding
//!
//! Corners that are equal under tolerance become one indexed vertex. The
//! bucket key holds the exact-match fields (color, tangent handedness and,
//! for skinned meshes, the two leading joints); the full predicate is applied
//! to every candidate in the neighbouring position cells.

use glam::Vec3;

use spm_common::weld::{WeldMap, nearly_equal, nearly_equal_n};

use super::types::{NO_JOINT, Vertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct WeldKey {
    color: [u8; 3],
    handedness: u32,
    joints: [i16; 2],
}

/// True when two corners must share one vertex
pub fn same_vertex(a: &Vertex, b: &Vertex, skinned: bool) -> bool {
    let base = nearly_equal_n(a.position, b.position)
        && nearly_equal_n(a.normal, b.normal)
        && a.color == b.color
        && nearly_equal_n(a.uvs, b.uvs)
        && a.tangent[3] == b.tangent[3];
    if !base || !skinned {
        return base;
    }
    a.joints == b.joints && a.weights.iter().zip(&b.weights).all(|(&x, &y)| nearly_equal(x, y))
}

/// Welds corners of one mesh buffer into a vertex list.
#[derive(Debug, Clone)]
pub struct VertexWelder {
    skinned: bool,
    map: WeldMap<WeldKey>,
    vertices: Vec<Vertex>,
    tangent_sums: Vec<Vec3>,
}

impl VertexWelder {
    pub fn new(skinned: bool) -> Self {
        Self {
            skinned,
            map: WeldMap::new(),
            vertices: Vec::new(),
            tangent_sums: Vec::new(),
        }
    }

    fn key(&self, vertex: &Vertex) -> WeldKey {
        WeldKey {
            color: vertex.color,
            // +0.0 folds -0.0 into 0.0 so equal signs always share a bucket
            handedness: (vertex.tangent[3] + 0.0).to_bits(),
            joints: if self.skinned {
                [vertex.joints[0], vertex.joints[1]]
            } else {
                [NO_JOINT; 2]
            },
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Index of the first-seen vertex equal to `vertex`
    pub fn find(&self, vertex: &Vertex) -> Option<u32> {
        let vertices = &self.vertices;
        let skinned = self.skinned;
        self.map.find(vertex.position, self.key(vertex), |i| {
            same_vertex(&vertices[i as usize], vertex, skinned)
        })
    }

    /// How many new vertices welding these corners would add
    pub fn count_new(&self, corners: &[Vertex; 3]) -> usize {
        let mut fresh: Vec<&Vertex> = Vec::with_capacity(3);
        for corner in corners {
            if self.find(corner).is_some() {
                continue;
            }
            if fresh.iter().any(|seen| same_vertex(seen, corner, self.skinned)) {
                continue;
            }
            fresh.push(corner);
        }
        fresh.len()
    }

    /// Reuse or append a vertex; returns its index.
    ///
    /// A reused vertex accumulates this corner's tangent.
    pub fn weld(&mut self, vertex: &Vertex) -> u32 {
        let tangent = Vec3::new(vertex.tangent[0], vertex.tangent[1], vertex.tangent[2]);
        if let Some(index) = self.find(vertex) {
            self.tangent_sums[index as usize] += tangent;
            return index;
        }

        let index = self.vertices.len() as u32;
        let key = self.key(vertex);
        self.map.insert(vertex.position, key, index);
        self.vertices.push(vertex.clone());
        self.tangent_sums.push(tangent);
        index
    }

    /// Hand out the welded vertices with resolved tangents and reset
    pub fn take(&mut self) -> Vec<Vertex> {
        self.map.clear();
        let sums = std::mem::take(&mut self.tangent_sums);
        let mut vertices = std::mem::take(&mut self.vertices);
        for (vertex, sum) in vertices.iter_mut().zip(sums) {
            let t = sum.normalize_or_zero();
            // Handedness stays with the first contributor
            vertex.tangent = [t.x, t.y, t.z, vertex.tangent[3]];
        }
        vertices
    }
}
