//! OBJ interchange
//!
//! Reads Wavefront OBJ into a [`SceneInput`] for the encoder, and writes
//! decoded SPM geometry back out as OBJ. OBJ coordinates are taken as the
//! file basis (Y up); decoded geometry is Z up and gets swapped back.

use anyhow::{Context, Result, bail};
use glam::Vec3;
use hashbrown::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use spm_common::{DecodedSpm, assemble};

use crate::ingest::{MeshObject, SceneInput, SourceFace, SourceVertex};

/// Raw attribute pools shared by every object in the file
#[derive(Default)]
struct ObjPools {
    positions: Vec<[f32; 3]>,
    colors: Vec<Option<[f32; 3]>>,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

/// One corner reference: position, texture coordinate and normal indices
type FaceRef = (usize, Option<usize>, Option<usize>);

struct ObjectBuilder {
    object: MeshObject,
    vertex_map: HashMap<(usize, Option<usize>), u32>,
    /// Vertices that had no `vn` and get a computed normal
    unnormaled: Vec<u32>,
}

impl ObjectBuilder {
    fn new(name: &str) -> Self {
        Self {
            object: MeshObject::new(name),
            vertex_map: HashMap::new(),
            unnormaled: Vec::new(),
        }
    }

    fn vertex(&mut self, pools: &ObjPools, (vi, _, vni): FaceRef) -> u32 {
        if let Some(&index) = self.vertex_map.get(&(vi, vni)) {
            return index;
        }
        let index = self.object.vertices.len() as u32;
        let normal = vni.map(|n| pools.normals[n]);
        if normal.is_none() {
            self.unnormaled.push(index);
        }
        self.object.vertices.push(SourceVertex {
            position: pools.positions[vi],
            normal: normal.unwrap_or([0.0; 3]),
            groups: Vec::new(),
        });
        self.vertex_map.insert((vi, vni), index);
        index
    }

    fn push_triangle(&mut self, pools: &ObjPools, refs: [FaceRef; 3], material: Option<&str>) {
        let corners = refs.map(|r| self.vertex(pools, r));

        let uv_one = match refs.map(|(_, vti, _)| vti) {
            [Some(a), Some(b), Some(c)] => Some([a, b, c].map(|t| pools.tex_coords[t])),
            _ => None,
        };
        let colors = if refs.iter().any(|&(vi, _, _)| pools.colors[vi].is_some()) {
            Some(refs.map(|(vi, _, _)| pools.colors[vi].unwrap_or([1.0; 3])))
        } else {
            None
        };

        self.object.faces.push(SourceFace {
            corners,
            uv_one,
            colors,
            texture_one: material.map(String::from),
            ..Default::default()
        });
    }

    /// Area-weighted normals for vertices the file gave none
    fn finish(mut self) -> MeshObject {
        if !self.unnormaled.is_empty() {
            let mut sums = vec![Vec3::ZERO; self.object.vertices.len()];
            for face in &self.object.faces {
                let [a, b, c] = face
                    .corners
                    .map(|i| Vec3::from(self.object.vertices[i as usize].position));
                let normal = (b - a).cross(c - a);
                for &i in &face.corners {
                    sums[i as usize] += normal;
                }
            }
            for &i in &self.unnormaled {
                self.object.vertices[i as usize].normal = sums[i as usize].normalize_or_zero().to_array();
            }
        }
        self.object
    }
}

/// Read an OBJ file into a scene with one object per `o` block
pub fn read_obj(input: &Path) -> Result<SceneInput> {
    let file = File::open(input).with_context(|| format!("Failed to open OBJ: {:?}", input))?;
    let name = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());
    parse_obj(BufReader::new(file), &name).with_context(|| format!("Failed to parse OBJ: {:?}", input))
}

/// Parse OBJ text; objects before the first `o` line are named `default_name`
pub fn parse_obj<R: BufRead>(reader: R, default_name: &str) -> Result<SceneInput> {
    let mut pools = ObjPools::default();
    let mut objects = Vec::new();
    let mut current = ObjectBuilder::new(default_name);
    let mut material: Option<String> = None;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let float = |i: usize| parts.get(i).and_then(|s| s.parse::<f32>().ok()).unwrap_or(0.0);

        match parts[0] {
            "v" if parts.len() >= 4 => {
                pools.positions.push([float(1), float(2), float(3)]);
                pools
                    .colors
                    .push((parts.len() >= 7).then(|| [float(4), float(5), float(6)]));
            }
            "vt" if parts.len() >= 3 => pools.tex_coords.push([float(1), float(2)]),
            "vn" if parts.len() >= 4 => pools.normals.push([float(1), float(2), float(3)]),
            "o" => {
                let name = parts.get(1..).map(|p| p.join(" ")).unwrap_or_default();
                if current.object.faces.is_empty() {
                    current.object.name = name;
                } else {
                    objects.push(std::mem::replace(&mut current, ObjectBuilder::new(&name)).finish());
                }
            }
            "usemtl" => material = parts.get(1).map(|s| s.to_string()),
            "f" if parts.len() >= 4 => {
                let refs = parts[1..]
                    .iter()
                    .map(|v| parse_obj_vertex(v, &pools))
                    .collect::<Option<Vec<_>>>()
                    .with_context(|| format!("line {}: invalid face '{}'", line_number + 1, line))?;

                // Fan triangulation for convex polygons
                for i in 1..refs.len() - 1 {
                    current.push_triangle(&pools, [refs[0], refs[i], refs[i + 1]], material.as_deref());
                }
            }
            _ => {}
        }
    }

    objects.push(current.finish());
    objects.retain(|o| !o.faces.is_empty() || !o.vertices.is_empty());
    if objects.iter().all(|o| o.faces.is_empty()) {
        bail!("No faces found in OBJ file");
    }

    Ok(SceneInput {
        frame_start: 1,
        objects,
        armatures: Vec::new(),
    })
}

/// Resolve a 1-based or negative (relative) OBJ index against a pool length
fn resolve_index(s: &str, len: usize) -> Option<usize> {
    let index: i64 = s.parse().ok()?;
    let resolved = if index < 0 { len as i64 + index } else { index - 1 };
    (0..len as i64).contains(&resolved).then_some(resolved as usize)
}

/// Parse OBJ vertex reference: "v", "v/vt", "v/vt/vn", or "v//vn"
fn parse_obj_vertex(s: &str, pools: &ObjPools) -> Option<FaceRef> {
    let parts: Vec<&str> = s.split('/').collect();

    let vi = resolve_index(parts.first()?, pools.positions.len())?;

    let optional = |slot: usize, len: usize| match parts.get(slot).filter(|s| !s.is_empty()) {
        Some(s) => resolve_index(s, len).map(Some),
        None => Some(None),
    };
    let vti = optional(1, pools.tex_coords.len())?;
    let vni = optional(2, pools.normals.len())?;

    Some((vi, vti, vni))
}

/// Write decoded geometry as OBJ, one `o` block per mesh buffer
pub fn write_obj<W: Write>(w: &mut W, decoded: &DecodedSpm) -> Result<()> {
    writeln!(
        w,
        "# {} mesh buffers, {} vertices, {} indices",
        decoded.buffers.len(),
        decoded.vertex_count(),
        decoded.index_count()
    )?;

    let mut position_base = 1;
    let mut uv_base = 1;
    for (i, mesh) in assemble(decoded).iter().enumerate() {
        writeln!(w, "o buffer_{}", i)?;
        let texture = decoded
            .materials
            .get(mesh.material_id as usize)
            .and_then(|m| m.texture_one.as_ref());
        if let Some(texture) = texture {
            writeln!(w, "usemtl {}", texture.name)?;
        }

        let mut colors: Vec<Option<[f32; 3]>> = vec![None; mesh.positions.len()];
        for face in &mesh.faces {
            for (&v, corner) in face.vertices.iter().zip(&face.corners) {
                let slot = &mut colors[v as usize];
                if slot.is_none() {
                    *slot = corner.color;
                }
            }
        }

        // Back to Y up
        for ([x, y, z], color) in mesh.positions.iter().zip(&colors) {
            match color {
                Some([r, g, b]) => writeln!(w, "v {} {} {} {} {} {}", x, z, y, r, g, b)?,
                None => writeln!(w, "v {} {} {}", x, z, y)?,
            }
        }
        for [x, y, z] in &mesh.normals {
            writeln!(w, "vn {} {} {}", x, z, y)?;
        }

        let mut uv_count = 0;
        for face in &mesh.faces {
            // The axis swap mirrors, so winding flips with it
            let order = [2, 1, 0];
            let uvs = order.map(|c| face.corners[c].uv_one);
            if uvs.iter().all(Option::is_some) {
                for [u, v] in uvs.into_iter().flatten() {
                    writeln!(w, "vt {} {}", u, 1.0 - v)?;
                }
                let p = order.map(|c| face.vertices[c] as usize + position_base);
                let t = [0, 1, 2].map(|k| uv_base + uv_count + k);
                writeln!(
                    w,
                    "f {}/{}/{} {}/{}/{} {}/{}/{}",
                    p[0], t[0], p[0], p[1], t[1], p[1], p[2], t[2], p[2]
                )?;
                uv_count += 3;
            } else {
                let p = order.map(|c| face.vertices[c] as usize + position_base);
                writeln!(w, "f {}//{} {}//{} {}//{}", p[0], p[0], p[1], p[1], p[2], p[2])?;
            }
        }

        position_base += mesh.positions.len();
        uv_base += uv_count;
    }

    Ok(())
}

/// Write decoded geometry to an OBJ file
pub fn write_obj_file(output: &Path, decoded: &DecodedSpm) -> Result<()> {
    let file = File::create(output).with_context(|| format!("Failed to create output: {:?}", output))?;
    let mut writer = BufWriter::new(file);
    write_obj(&mut writer, decoded)?;
    writer.flush()?;
    tracing::info!(
        "Wrote OBJ: {} buffers, {} vertices",
        decoded.buffers.len(),
        decoded.vertex_count()
    );
    Ok(())
}
