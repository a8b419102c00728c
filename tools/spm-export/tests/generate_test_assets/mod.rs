//! Test asset generators for spm-export integration tests

use std::path::Path;

use spm_export::{MeshObject, SceneInput, SourceFace, SourceVertex};

/// Single triangle, no normals or UVs
pub fn generate_triangle_obj(path: &Path) -> std::io::Result<()> {
    std::fs::write(path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")
}

/// Two triangles sharing an edge
pub fn generate_quad_obj(path: &Path) -> std::io::Result<()> {
    std::fs::write(
        path,
        "# quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\nf 1//1 3//1 4//1\n",
    )
}

/// Unit cube with per-face normals, UVs and one texture
pub fn generate_cube_obj(path: &Path) -> std::io::Result<()> {
    let mut obj = String::from("o cube\n");
    for z in [0.0, 1.0] {
        for y in [0.0, 1.0] {
            for x in [0.0, 1.0] {
                obj.push_str(&format!("v {} {} {}\n", x, y, z));
            }
        }
    }
    obj.push_str("vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n");
    for n in ["0 0 -1", "0 0 1", "0 -1 0", "0 1 0", "-1 0 0", "1 0 0"] {
        obj.push_str(&format!("vn {}\n", n));
    }
    obj.push_str("usemtl crate.png\n");
    let faces = [
        [1, 3, 4, 2],
        [5, 6, 8, 7],
        [1, 2, 6, 5],
        [3, 7, 8, 4],
        [1, 5, 7, 3],
        [2, 4, 8, 6],
    ];
    for (n, face) in faces.iter().enumerate() {
        let corners: Vec<String> = face
            .iter()
            .enumerate()
            .map(|(t, v)| format!("{}/{}/{}", v, t + 1, n + 1))
            .collect();
        obj.push_str(&format!("f {}\n", corners.join(" ")));
    }
    std::fs::write(path, obj)
}

/// Write an options file with the given `[export]` body
pub fn generate_options(path: &Path, body: &str) -> std::io::Result<()> {
    std::fs::write(path, format!("[export]\n{}\n", body))
}

/// `count` triangles whose corners are all distinct positions
pub fn distinct_triangles(count: usize) -> MeshObject {
    let mut object = MeshObject::new("strip");
    for i in 0..count {
        let x = i as f32;
        for y in [0.0, 1.0, 2.0] {
            object.vertices.push(SourceVertex {
                position: [x, y, 0.0],
                normal: [0.0, 0.0, 1.0],
                groups: Vec::new(),
            });
        }
        let base = (i * 3) as u32;
        object.faces.push(SourceFace {
            corners: [base, base + 1, base + 2],
            ..Default::default()
        });
    }
    object
}

/// Scene holding the given objects, starting at frame 1
pub fn scene(objects: Vec<MeshObject>) -> SceneInput {
    SceneInput {
        frame_start: 1,
        objects,
        armatures: Vec::new(),
    }
}
