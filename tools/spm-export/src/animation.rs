//! Keyframe discovery and pose sampling
//!
//! An armature's animation is described by the key times found on its
//! curves; [`discover_frames`] turns them into the sorted list of frames
//! that get a pose sample. Poses themselves come from a [`PoseSampler`].

use std::collections::BTreeSet;

use glam::Mat4;
use hashbrown::HashMap;

use crate::error::EncodeError;
use crate::skeleton::{MAX_FRAME, MAX_KEYFRAMES};

/// Keys of one curve on the armature's active action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionCurve {
    /// Animated property path; only paths touching the pose contribute
    pub data_path: String,
    pub keys: Vec<f32>,
}

/// A clip placed on a layering track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NlaStrip {
    pub frame_start: f32,
    pub frame_end: f32,
    /// Key times local to the strip's action
    pub keys: Vec<f32>,
}

/// A curve driving the target of a bone constraint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintCurve {
    pub keys: Vec<f32>,
    /// (start, end) of each curve modifier's frame range
    pub modifier_ranges: Vec<(f32, f32)>,
}

/// Every source of candidate keyframes for one armature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationSources {
    pub action_curves: Vec<ActionCurve>,
    pub nla_strips: Vec<NlaStrip>,
    pub constraint_curves: Vec<ConstraintCurve>,
}

impl AnimationSources {
    /// Keys only on the action, each on a pose channel
    pub fn from_pose_keys(keys: impl IntoIterator<Item = f32>) -> Self {
        Self {
            action_curves: vec![ActionCurve {
                data_path: "pose.bones".to_string(),
                keys: keys.into_iter().collect(),
            }],
            ..Default::default()
        }
    }
}

/// Frame 0 is reserved for "not sampled"
fn remap_zero(frame: i64) -> i64 {
    if frame == 0 { 1 } else { frame }
}

fn out_of_range(frame: i64) -> EncodeError {
    EncodeError::FrameOutOfRange(u32::try_from(frame).unwrap_or(u32::MAX))
}

/// Sorted, deduplicated frames to sample.
///
/// Negative keys are dropped and frame 0 becomes 1. In dense mode the
/// result is every frame from `max(1, scene_start)` through the last key.
/// An empty result means the armature has no animation. Frames past
/// [`MAX_FRAME`] and more than [`MAX_KEYFRAMES`] frames are rejected before
/// any range is expanded.
pub fn discover_frames(
    sources: &AnimationSources,
    keyframes_only: bool,
    scene_start: i32,
) -> Result<Vec<u32>, EncodeError> {
    let mut frames = BTreeSet::new();

    for curve in sources.action_curves.iter().filter(|c| c.data_path.contains("pose")) {
        for &key in curve.keys.iter().filter(|&&k| k >= 0.0) {
            frames.insert(remap_zero(key as i64));
        }
    }

    for strip in &sources.nla_strips {
        let end = strip.frame_end as i64;
        for &key in strip.keys.iter().filter(|&&k| k >= 0.0) {
            let global = ((strip.frame_start + key) as i64).min(end);
            frames.insert(remap_zero(global));
        }
    }

    for curve in &sources.constraint_curves {
        for &(start, end) in &curve.modifier_ranges {
            if start > 0.0 && end > 0.0 {
                let (start, end) = (start as i64, end as i64);
                if end > MAX_FRAME as i64 {
                    return Err(out_of_range(end));
                }
                frames.extend(start..=end);
            }
        }
        for &key in curve.keys.iter().filter(|&&k| k >= 0.0) {
            frames.insert(remap_zero(key as i64));
        }
    }

    // Strips ending before zero can still produce negative frames
    let frames: BTreeSet<i64> = frames
        .into_iter()
        .filter(|&f| f >= 0)
        .map(remap_zero)
        .collect();

    let Some(&last) = frames.last() else {
        return Ok(Vec::new());
    };
    if last > MAX_FRAME as i64 {
        return Err(out_of_range(last));
    }

    let count = if keyframes_only {
        frames.len()
    } else {
        (last + 1 - i64::from(scene_start.max(1))).max(0) as usize
    };
    if count > MAX_KEYFRAMES {
        return Err(EncodeError::TooMany {
            what: "keyframes",
            count,
            limit: MAX_KEYFRAMES,
        });
    }

    // Every frame is now within 1..=MAX_FRAME
    let frames: Vec<u32> = if keyframes_only {
        frames.into_iter().map(|f| f as u32).collect()
    } else {
        (scene_start.max(1) as u32..=last as u32).collect()
    };
    Ok(frames)
}

/// Pose of one armature at one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseFrame {
    /// Armature object to world
    pub world: Mat4,
    /// Bone name to armature-space pose matrix
    pub bones: HashMap<String, Mat4>,
}

/// Evaluates armature poses; implemented by whatever hosts the scene.
pub trait PoseSampler {
    fn sample(&self, armature: &str, frame: u32) -> Option<PoseFrame>;
}

/// Pre-baked poses keyed by (armature, frame)
#[derive(Debug, Clone, Default)]
pub struct BakedPoses {
    frames: HashMap<(String, u32), PoseFrame>,
}

impl BakedPoses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, armature: impl Into<String>, frame: u32, pose: PoseFrame) {
        self.frames.insert((armature.into(), frame), pose);
    }
}

impl PoseSampler for BakedPoses {
    fn sample(&self, armature: &str, frame: u32) -> Option<PoseFrame> {
        self.frames.get(&(armature.to_string(), frame)).cloned()
    }
}

/// Sampler for scenes without armatures
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPoses;

impl PoseSampler for NoPoses {
    fn sample(&self, _armature: &str, _frame: u32) -> Option<PoseFrame> {
        None
    }
}
