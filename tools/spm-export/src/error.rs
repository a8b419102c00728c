//! Encoder errors and degraded-feature warnings

/// Fatal encode failures. Nothing is written when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("no triangles to encode")]
    NoTriangles,

    #[error("armature '{0}' has no keyframes; remove it from the asset if it is not animated")]
    NoKeyframes(String),

    #[error("mesh buffer holds {count} vertices, more than the limit of {max}")]
    BufferOverflow { count: usize, max: usize },

    #[error("object '{object}': face {face} references vertex {corner}, but the object has {vertex_count} vertices")]
    InvalidCorner {
        object: String,
        face: usize,
        corner: u32,
        vertex_count: usize,
    },

    #[error("object '{object}' references unknown armature '{armature}'")]
    UnknownArmature { object: String, armature: String },

    #[error("no pose for bone '{bone}' of armature '{armature}' at frame {frame}")]
    MissingPose {
        armature: String,
        bone: String,
        frame: u32,
    },

    #[error("too many {what}: {count} (limit {limit})")]
    TooMany {
        what: &'static str,
        count: usize,
        limit: usize,
    },

    #[error("frame {0} does not fit the 16-bit frame field")]
    FrameOutOfRange(u32),

    #[error("invalid option {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Conditions that disable a feature but let the encode continue.
///
/// Each one is logged with `tracing::warn!` when raised and kept in the
/// encode summary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeWarning {
    #[error("object '{0}' has no vertices, skipped")]
    NoVertices(String),

    #[error("object '{0}' has no faces, skipped")]
    NoFaces(String),

    #[error("no exported object has a UV map, tangent export disabled")]
    TangentsDisabled,

    #[error("object '{object}': {faces} faces had no tangent data, using (0, 0, 0, 1)")]
    MissingTangents { object: String, faces: usize },

    #[error("static mesh frame {0} is less than 1, using 1")]
    StaticFrameClamped(i32),

    #[error("name '{0}' is longer than 255 bytes and was truncated")]
    NameTruncated(String),

    #[error("armature '{0}' influences no vertices, dropped")]
    UnusedArmature(String),
}

impl EncodeWarning {
    /// Log the warning and hand it back for collection
    pub(crate) fn raise(self) -> Self {
        tracing::warn!("{}", self);
        self
    }
}
