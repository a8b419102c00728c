//! Ingestion contract
//!
//! Front-ends (the OBJ reader, or a host tool plugin) describe a scene with
//! these types: already triangulated, already transformed into the export
//! basis. [`ingest`] turns them into [`Triangle`]s for the encoder.

use glam::{Mat4, Vec3};
use hashbrown::HashMap;
use tracing::debug;

use spm_common::{BoundingBox, quantize_channel};

use crate::animation::AnimationSources;
use crate::config::ExportOptions;
use crate::error::{EncodeError, EncodeWarning};
use crate::mesh::types::{Influences, TextureKey, Triangle, Vertex};

/// Everything one encode call consumes
#[derive(Debug, Clone, Default)]
pub struct SceneInput {
    /// Scene start frame; used for the static pose and dense sampling
    pub frame_start: i32,
    pub objects: Vec<MeshObject>,
    pub armatures: Vec<ArmatureInput>,
}

#[derive(Debug, Clone, Default)]
pub struct MeshObject {
    pub name: String,
    pub selected: bool,
    /// Name of the armature deforming this object
    pub armature: Option<String>,
    pub vertices: Vec<SourceVertex>,
    pub faces: Vec<SourceFace>,
    /// Per-corner tangents from the host, matched to faces by position
    pub tangent_polygons: Vec<TangentPolygon>,
}

impl MeshObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selected: true,
            ..Default::default()
        }
    }

    pub fn has_vertex_colors(&self) -> bool {
        self.faces.iter().any(|f| f.colors.is_some())
    }

    pub fn has_uv_one(&self) -> bool {
        self.faces.iter().any(|f| f.uv_one.is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Vertex group memberships; only groups naming a bone matter
    pub groups: Vec<JointWeight>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JointWeight {
    pub group: String,
    pub weight: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFace {
    pub corners: [u32; 3],
    /// UVs as authored (V up); flipped on ingestion
    pub uv_one: Option<[[f32; 2]; 3]>,
    pub uv_two: Option<[[f32; 2]; 3]>,
    /// Linear RGB in [0, 1]
    pub colors: Option<[[f32; 3]; 3]>,
    /// Texture paths or names; only the basename is kept
    pub texture_one: Option<String>,
    pub texture_two: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TangentPolygon {
    pub positions: [[f32; 3]; 3],
    /// xyz + bitangent sign per corner
    pub tangents: [[f32; 4]; 3],
}

#[derive(Debug, Clone)]
pub struct ArmatureInput {
    pub name: String,
    pub world_matrix: Mat4,
    pub bones: Vec<BoneInput>,
    pub animation: AnimationSources,
}

#[derive(Debug, Clone)]
pub struct BoneInput {
    pub name: String,
    pub parent: Option<String>,
    /// Bind pose in armature space
    pub bind_matrix: Mat4,
}

/// Triangles plus the file-wide facts ingestion discovered
#[derive(Debug, Clone)]
pub struct IngestedScene {
    pub triangles: Vec<Triangle>,
    pub bounding_box: Option<BoundingBox>,
    pub vertex_colors: bool,
    pub tangents: bool,
}

/// Exact-position key used to match host tangent polygons to faces
type TriangleHash = [u32; 9];

fn triangle_hash(positions: [[f32; 3]; 3]) -> TriangleHash {
    let mut key = [0u32; 9];
    for (i, c) in positions.iter().flatten().enumerate() {
        // +0.0 folds -0.0 into 0.0, matching float equality
        key[i] = (c + 0.0).to_bits();
    }
    key
}

fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

fn texture_name(name: Option<&String>) -> Option<String> {
    name.map(|n| basename(n))
        .filter(|n| !n.is_empty())
        .map(String::from)
}

fn flip_v(uvs: [[f32; 2]; 3], corner: usize) -> [f32; 2] {
    let [u, v] = uvs[corner];
    [u, 1.0 - v]
}

/// Convert the scene's objects into triangles
pub fn ingest(
    scene: &SceneInput,
    options: &ExportOptions,
    warnings: &mut Vec<EncodeWarning>,
) -> Result<IngestedScene, EncodeError> {
    let armature_index: HashMap<&str, usize> = scene
        .armatures
        .iter()
        .enumerate()
        .map(|(i, a)| (a.name.as_str(), i))
        .collect();

    let mut objects = Vec::new();
    for object in &scene.objects {
        if options.selected_only && !object.selected {
            continue;
        }
        if object.vertices.is_empty() {
            warnings.push(EncodeWarning::NoVertices(object.name.clone()).raise());
            continue;
        }
        if object.faces.is_empty() {
            warnings.push(EncodeWarning::NoFaces(object.name.clone()).raise());
            continue;
        }
        objects.push(object);
    }

    let mut tangents = options.tangents;
    if tangents && !objects.iter().any(|o| o.has_uv_one()) {
        warnings.push(EncodeWarning::TangentsDisabled.raise());
        tangents = false;
    }

    let mut triangles = Vec::new();
    let mut bounding_box: Option<BoundingBox> = None;
    let mut vertex_colors = false;

    for object in objects {
        let armature = match &object.armature {
            Some(name) => Some(*armature_index.get(name.as_str()).ok_or_else(|| {
                EncodeError::UnknownArmature {
                    object: object.name.clone(),
                    armature: name.clone(),
                }
            })?),
            None => None,
        };
        let bones: HashMap<&str, u16> = armature
            .map(|a| {
                scene.armatures[a]
                    .bones
                    .iter()
                    .enumerate()
                    .map(|(i, b)| (b.name.as_str(), i as u16))
                    .collect()
            })
            .unwrap_or_default();

        let tangent_map: HashMap<TriangleHash, [[f32; 4]; 3]> = if tangents {
            object
                .tangent_polygons
                .iter()
                .map(|p| (triangle_hash(p.positions), p.tangents))
                .collect()
        } else {
            HashMap::new()
        };

        vertex_colors |= object.has_vertex_colors();
        let mut missing_tangents = 0;

        for (face_index, face) in object.faces.iter().enumerate() {
            let mut sources = [&object.vertices[0]; 3];
            for (slot, &corner) in face.corners.iter().enumerate() {
                sources[slot] = object.vertices.get(corner as usize).ok_or_else(|| {
                    EncodeError::InvalidCorner {
                        object: object.name.clone(),
                        face: face_index,
                        corner,
                        vertex_count: object.vertices.len(),
                    }
                })?;
            }

            let face_tangents = match face.uv_one {
                Some(_) if tangents => {
                    let found = tangent_map.get(&triangle_hash(sources.map(|s| s.position)));
                    if found.is_none() {
                        missing_tangents += 1;
                    }
                    found.copied()
                }
                _ => None,
            };

            let uv_two = face.uv_one.and(face.uv_two);
            let mut vertices: [Vertex; 3] = Default::default();
            let mut influences: [Influences; 3] = Default::default();
            for corner in 0..3 {
                let source = sources[corner];
                let mut uvs = [0.0; 4];
                if let Some(uv) = face.uv_one {
                    uvs[..2].copy_from_slice(&flip_v(uv, corner));
                }
                if let Some(uv) = uv_two {
                    uvs[2..].copy_from_slice(&flip_v(uv, corner));
                }

                let tangent = face_tangents
                    .map(|t| {
                        let xyz = Vec3::new(t[corner][0], t[corner][1], t[corner][2]).normalize_or_zero();
                        [xyz.x, xyz.y, xyz.z, t[corner][3]]
                    })
                    .unwrap_or([0.0, 0.0, 0.0, 1.0]);

                vertices[corner] = Vertex {
                    position: source.position,
                    normal: Vec3::from(source.normal).normalize_or_zero().to_array(),
                    color: face
                        .colors
                        .map(|c| c[corner].map(quantize_channel))
                        .unwrap_or([255; 3]),
                    uvs,
                    tangent,
                    ..Default::default()
                };

                if armature.is_some() {
                    influences[corner] = collect_influences(&source.groups, &bones);
                }

                match bounding_box.as_mut() {
                    Some(bounds) => bounds.extend(source.position),
                    None => bounding_box = Some(BoundingBox::from_point(source.position)),
                }
            }

            triangles.push(Triangle {
                vertices,
                influences,
                textures: TextureKey {
                    texture_one: face
                        .uv_one
                        .and_then(|_| texture_name(face.texture_one.as_ref())),
                    texture_two: uv_two.and_then(|_| texture_name(face.texture_two.as_ref())),
                },
                armature,
            });
        }

        if missing_tangents > 0 {
            warnings.push(
                EncodeWarning::MissingTangents {
                    object: object.name.clone(),
                    faces: missing_tangents,
                }
                .raise(),
            );
        }
        debug!(
            "Ingested object '{}': {} faces, armature {:?}",
            object.name,
            object.faces.len(),
            object.armature
        );
    }

    Ok(IngestedScene {
        triangles,
        bounding_box,
        vertex_colors,
        tangents,
    })
}

/// Heaviest four nonzero bone influences, in descending weight order
fn collect_influences(groups: &[JointWeight], bones: &HashMap<&str, u16>) -> Influences {
    let mut weighted: Vec<(u16, f32)> = groups
        .iter()
        .filter(|g| g.weight > 0.0)
        .filter_map(|g| bones.get(g.group.as_str()).map(|&bone| (bone, g.weight)))
        .collect();
    weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
    weighted.into_iter().take(4).collect()
}
