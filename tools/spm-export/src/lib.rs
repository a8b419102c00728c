//! spm-export library
//!
//! Encodes ingested triangle meshes and armatures into SPM files. Front-ends
//! describe a scene with the [`ingest`] types and call [`encode`]; the OBJ
//! reader in [`mesh::obj`] is one such front-end.

pub mod animation;
pub mod config;
pub mod encoder;
pub mod error;
pub mod formats;
pub mod ingest;
pub mod mesh;
pub mod skeleton;

// Re-export the format crate for callers that decode what they encode
pub use spm_common;

pub use animation::{
    ActionCurve, AnimationSources, BakedPoses, ConstraintCurve, NlaStrip, NoPoses, PoseFrame,
    PoseSampler, discover_frames,
};
pub use config::{ExportOptions, load_options};
pub use encoder::{EncodeSummary, EncodedSpm, encode, encode_to_path, encode_to_writer};
pub use error::{EncodeError, EncodeWarning};
pub use ingest::{
    ArmatureInput, BoneInput, JointWeight, MeshObject, SceneInput, SourceFace, SourceVertex,
    TangentPolygon,
};
pub use skeleton::{BoneIdAllocator, SkeletonBlock};
