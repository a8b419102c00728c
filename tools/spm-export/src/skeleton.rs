//! Skeleton block encoding
//!
//! Bone ids are handed out in the order vertices first reference them, one
//! allocator per encode call. Each armature then lists its used bones first
//! (in allocation order) followed by the unused ones, with inverse bind
//! transforms, parent links and one transform per bone per sampled frame.

use glam::Mat4;
use hashbrown::HashMap;
use tracing::debug;

use spm_common::formats::{BinarySerializable, BoneTransform, MAX_NAME_LEN, write_name};

use crate::animation::{PoseSampler, discover_frames};
use crate::config::ExportOptions;
use crate::error::{EncodeError, EncodeWarning};
use crate::ingest::{ArmatureInput, BoneInput};
use crate::mesh::types::Triangle;

/// Joint ids are signed 16-bit on the wire
pub const MAX_JOINTS: usize = i16::MAX as usize;
pub const MAX_ARMATURES: usize = u8::MAX as usize;
pub const MAX_KEYFRAMES: usize = u16::MAX as usize;
/// Frames are stored as `frame - 1` in 16 bits
pub const MAX_FRAME: u32 = u16::MAX as u32 + 1;

/// Inverse, or identity when the matrix cannot be inverted
pub fn inverted_safe(matrix: Mat4) -> Mat4 {
    let det = matrix.determinant();
    if det == 0.0 || !det.is_finite() {
        return Mat4::IDENTITY;
    }
    matrix.inverse()
}

/// Hands out file-wide joint ids across all armatures of one encode call
#[derive(Debug, Default)]
pub struct BoneIdAllocator {
    next: usize,
}

impl BoneIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids allocated so far
    pub fn total(&self) -> usize {
        self.next
    }

    fn allocate(&mut self) -> Result<i16, EncodeError> {
        if self.next >= MAX_JOINTS {
            return Err(EncodeError::TooMany {
                what: "joints",
                count: self.next + 1,
                limit: MAX_JOINTS,
            });
        }
        let id = self.next as i16;
        self.next += 1;
        Ok(id)
    }
}

/// One sampled frame: a transform per bone, in block order
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub frame: u32,
    pub transforms: Vec<BoneTransform>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedArmature {
    pub name: String,
    pub bones_in_use: u16,
    /// Used bones first, then unused ones
    pub names: Vec<String>,
    pub inverse_binds: Vec<BoneTransform>,
    /// Block-local parent index, -1 for roots
    pub parents: Vec<i16>,
    pub keyframes: Vec<Keyframe>,
}

impl EncodedArmature {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.bones_in_use.to_le_bytes());
        out.extend_from_slice(&(self.names.len() as u16).to_le_bytes());
        for name in &self.names {
            write_name(Some(name), out);
        }
        for transform in &self.inverse_binds {
            transform.write_to(out);
        }
        for parent in &self.parents {
            out.extend_from_slice(&parent.to_le_bytes());
        }
        out.extend_from_slice(&(self.keyframes.len() as u16).to_le_bytes());
        for keyframe in &self.keyframes {
            out.extend_from_slice(&((keyframe.frame - 1) as u16).to_le_bytes());
            for transform in &keyframe.transforms {
                transform.write_to(out);
            }
        }
    }
}

/// Trailing skeleton block of a skinned file
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonBlock {
    /// Frame the static mesh was evaluated at (>= 1)
    pub static_frame: u32,
    pub armatures: Vec<EncodedArmature>,
}

impl SkeletonBlock {
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.armatures.len() as u8);
        out.extend_from_slice(&((self.static_frame - 1) as u16).to_le_bytes());
        for armature in &self.armatures {
            armature.write(out);
        }
    }

    pub fn keyframe_count(&self) -> usize {
        self.armatures.iter().map(|a| a.keyframes.len()).sum()
    }
}

/// Encodes one armature against the triangles it deforms
pub struct ArmatureEncoder<'a> {
    index: usize,
    armature: &'a ArmatureInput,
    /// Local bone index to joint id
    ids: HashMap<u16, i16>,
    /// Local bone indices in allocation order
    used: Vec<u16>,
}

impl<'a> ArmatureEncoder<'a> {
    pub fn new(index: usize, armature: &'a ArmatureInput) -> Result<Self, EncodeError> {
        if armature.bones.len() > MAX_JOINTS {
            return Err(EncodeError::TooMany {
                what: "bones",
                count: armature.bones.len(),
                limit: MAX_JOINTS,
            });
        }
        Ok(Self {
            index,
            armature,
            ids: HashMap::new(),
            used: Vec::new(),
        })
    }

    /// Give every influencing bone an id and fill in joints and normalized
    /// weights of the triangles this armature deforms
    pub fn assign_joints(
        &mut self,
        triangles: &mut [Triangle],
        allocator: &mut BoneIdAllocator,
    ) -> Result<(), EncodeError> {
        for triangle in triangles.iter_mut().filter(|t| t.armature == Some(self.index)) {
            for corner in 0..3 {
                let vertex = &mut triangle.vertices[corner];
                for (slot, &(bone, weight)) in triangle.influences[corner].iter().take(4).enumerate() {
                    let id = match self.ids.get(&bone) {
                        Some(&id) => id,
                        None => {
                            let id = allocator.allocate()?;
                            self.ids.insert(bone, id);
                            self.used.push(bone);
                            id
                        }
                    };
                    vertex.joints[slot] = id;
                    vertex.weights[slot] = weight;
                }

                let total: f32 = vertex.weights.iter().sum();
                if total > 0.0 {
                    for weight in &mut vertex.weights {
                        *weight /= total;
                    }
                }
            }
        }

        debug!(
            "Armature '{}': {} of {} bones in use, ids from {}",
            self.armature.name,
            self.used.len(),
            self.armature.bones.len(),
            allocator.total() - self.used.len()
        );
        Ok(())
    }

    pub fn bones_in_use(&self) -> usize {
        self.used.len()
    }

    /// Block order: used bones as allocated, then unused bones by name
    fn bone_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = self.used.iter().map(|&b| b as usize).collect();
        let mut unused: Vec<usize> = (0..self.armature.bones.len())
            .filter(|b| !self.ids.contains_key(&(*b as u16)))
            .collect();
        unused.sort_by(|&a, &b| self.armature.bones[a].name.cmp(&self.armature.bones[b].name));
        order.extend(unused);
        order
    }

    pub fn finish(
        self,
        options: &ExportOptions,
        scene_start: i32,
        sampler: &dyn PoseSampler,
        warnings: &mut Vec<EncodeWarning>,
    ) -> Result<EncodedArmature, EncodeError> {
        let armature = self.armature;
        let order = self.bone_order();
        let bones: Vec<_> = order.iter().map(|&b| &armature.bones[b]).collect();

        let block_index: HashMap<&str, i16> = bones
            .iter()
            .enumerate()
            .map(|(i, bone)| (bone.name.as_str(), i as i16))
            .collect();

        let mut names = Vec::with_capacity(bones.len());
        for bone in &bones {
            if bone.name.len() > MAX_NAME_LEN {
                warnings.push(EncodeWarning::NameTruncated(bone.name.clone()).raise());
            }
            names.push(bone.name.clone());
        }

        let inverse_binds = bones
            .iter()
            .map(|bone| BoneTransform::from_matrix(inverted_safe(bone.bind_matrix)))
            .collect();

        let parents = bones
            .iter()
            .map(|bone| {
                bone.parent
                    .as_deref()
                    .and_then(|p| block_index.get(p).copied())
                    .unwrap_or(-1)
            })
            .collect();

        let frames = discover_frames(&armature.animation, options.keyframes_only, scene_start)?;
        if frames.is_empty() {
            return Err(EncodeError::NoKeyframes(armature.name.clone()));
        }

        let mut keyframes = Vec::with_capacity(frames.len());
        for frame in frames {
            keyframes.push(Keyframe {
                frame,
                transforms: sample_frame(armature, &bones, frame, options.local_space, sampler)?,
            });
        }

        Ok(EncodedArmature {
            name: armature.name.clone(),
            bones_in_use: self.used.len() as u16,
            names,
            inverse_binds,
            parents,
            keyframes,
        })
    }
}

/// Parent-relative transforms of every bone at `frame`
fn sample_frame(
    armature: &ArmatureInput,
    bones: &[&BoneInput],
    frame: u32,
    local_space: bool,
    sampler: &dyn PoseSampler,
) -> Result<Vec<BoneTransform>, EncodeError> {
    let missing = |bone: &str| EncodeError::MissingPose {
        armature: armature.name.clone(),
        bone: bone.to_string(),
        frame,
    };

    let first = bones.first().map(|b| b.name.as_str()).unwrap_or("");
    let pose = sampler
        .sample(&armature.name, frame)
        .ok_or_else(|| missing(first))?;

    let pose_of = |name: &str| pose.bones.get(name).copied().ok_or_else(|| missing(name));

    bones
        .iter()
        .map(|bone| {
            let matrix = pose_of(&bone.name)?;
            let relative = match bone.parent.as_deref() {
                Some(parent) => inverted_safe(pose_of(parent)?) * matrix,
                _ if local_space => matrix,
                _ => pose.world * matrix,
            };
            Ok(BoneTransform::from_matrix(relative))
        })
        .collect()
}

/// Encode every armature that deforms at least one triangle.
///
/// Returns `None` when no armature ends up influencing any vertex.
pub fn encode_skeleton(
    armatures: &[ArmatureInput],
    triangles: &mut [Triangle],
    options: &ExportOptions,
    scene_start: i32,
    static_frame: u32,
    sampler: &dyn PoseSampler,
    warnings: &mut Vec<EncodeWarning>,
) -> Result<Option<SkeletonBlock>, EncodeError> {
    let mut referenced: Vec<usize> = triangles.iter().filter_map(|t| t.armature).collect();
    referenced.sort_unstable();
    referenced.dedup();
    if referenced.is_empty() {
        return Ok(None);
    }
    referenced.sort_by(|&a, &b| armatures[a].name.cmp(&armatures[b].name));

    let mut allocator = BoneIdAllocator::new();
    let mut encoders = Vec::new();
    for index in referenced {
        let mut encoder = ArmatureEncoder::new(index, &armatures[index])?;
        encoder.assign_joints(triangles, &mut allocator)?;
        if encoder.bones_in_use() == 0 {
            warnings.push(EncodeWarning::UnusedArmature(armatures[index].name.clone()).raise());
            continue;
        }
        encoders.push(encoder);
    }

    if encoders.is_empty() {
        return Ok(None);
    }
    if encoders.len() > MAX_ARMATURES {
        return Err(EncodeError::TooMany {
            what: "armatures",
            count: encoders.len(),
            limit: MAX_ARMATURES,
        });
    }

    let armatures = encoders
        .into_iter()
        .map(|encoder| encoder.finish(options, scene_start, sampler, warnings))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(SkeletonBlock {
        static_frame,
        armatures,
    }))
}
