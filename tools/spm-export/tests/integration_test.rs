//! Integration tests for spm-export
//!
//! Tests the full pipeline: generate test assets -> encode -> decode and verify

mod generate_test_assets;

use std::path::Path;
use std::process::Output;

use glam::Mat4;
use tempfile::tempdir;

use spm_export::spm_common::{IndexWidth, NameOnly, SpmKind, decode_spm, unpack_half};
use spm_export::{
    ActionCurve, AnimationSources, ArmatureInput, BakedPoses, BoneInput, ConstraintCurve,
    EncodeError, EncodeWarning, ExportOptions, JointWeight, NlaStrip, NoPoses, PoseFrame,
    PoseSampler, SceneInput, SourceFace, SourceVertex, encode, encode_to_path,
};

use generate_test_assets::{distinct_triangles, scene};

/// Single unskinned triangle encodes to the minimal 95-byte file
#[test]
fn test_single_triangle_end_to_end() {
    let encoded = encode(&scene(vec![distinct_triangles(1)]), &ExportOptions::default(), &NoPoses)
        .expect("Failed to encode");
    let bytes = &encoded.bytes;

    assert_eq!(bytes.len(), 95);
    assert_eq!(&bytes[..4], &[0x53, 0x50, 0x0A, 0x01]);

    let decoded = decode_spm(bytes, &NameOnly).expect("Failed to decode");
    assert_eq!(decoded.header.kind, SpmKind::Static);
    assert!(decoded.materials.is_empty());
    assert_eq!(decoded.sector_count, 1);
    assert_eq!(decoded.buffers.len(), 1);

    let buffer = &decoded.buffers[0];
    assert_eq!(buffer.material_id, 0);
    assert_eq!(buffer.vertices.len(), 3);
    assert_eq!(buffer.index_width, IndexWidth::U8);
    assert_eq!(buffer.indices, [0, 1, 2]);
    // Decoded positions come back with Y and Z swapped
    assert_eq!(buffer.vertices[1].position, [0.0, 0.0, 1.0]);
}

/// Exactly the vertex ceiling fits one buffer; one more vertex splits
#[test]
fn test_split_boundary_at_ceiling() {
    let options = ExportOptions::default();

    let full = distinct_triangles(21845);
    let encoded = encode(&scene(vec![full.clone()]), &options, &NoPoses).expect("Failed to encode");
    assert_eq!(encoded.summary.buffers, 1);
    assert_eq!(encoded.summary.vertices, 65535);

    // One extra triangle reusing two existing corners adds a single vertex
    let mut over = full;
    over.vertices.push(SourceVertex {
        position: [0.5, 0.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        groups: Vec::new(),
    });
    let extra = (over.vertices.len() - 1) as u32;
    over.faces.push(SourceFace {
        corners: [0, 1, extra],
        ..Default::default()
    });

    let encoded = encode(&scene(vec![over]), &options, &NoPoses).expect("Failed to encode");
    assert_eq!(encoded.summary.buffers, 2);

    let decoded = decode_spm(&encoded.bytes, &NameOnly).expect("Failed to decode");
    assert_eq!(decoded.buffers[0].vertices.len(), 65535);
    assert_eq!(decoded.buffers[0].index_width, IndexWidth::U16);
    assert_eq!(decoded.buffers[1].vertices.len(), 3);
    assert_eq!(decoded.buffers[1].index_width, IndexWidth::U8);
    assert!(decoded.buffers.iter().all(|b| b.material_id == 0));
    assert_eq!(decoded.index_count(), (21845 + 1) * 3);
}

/// Lower configured ceilings split the same way
#[test]
fn test_configured_ceiling_bounds_every_buffer() {
    let options = ExportOptions {
        max_buffer_vertices: 7,
        ..Default::default()
    };
    let encoded = encode(&scene(vec![distinct_triangles(5)]), &options, &NoPoses).expect("Failed to encode");
    let decoded = decode_spm(&encoded.bytes, &NameOnly).expect("Failed to decode");
    assert_eq!(decoded.buffers.len(), 3);
    assert!(decoded.buffers.iter().all(|b| b.vertices.len() <= 7));
    assert_eq!(decoded.index_count(), 15);
}

fn rigged_scene(animation: AnimationSources) -> SceneInput {
    let mut object = distinct_triangles(1);
    object.armature = Some("rig".into());
    for (i, vertex) in object.vertices.iter_mut().enumerate() {
        vertex.groups = vec![
            JointWeight {
                group: "root".into(),
                weight: 0.3,
            },
            JointWeight {
                group: "tip".into(),
                weight: 0.1 * (i + 1) as f32,
            },
            JointWeight {
                group: "not_a_bone".into(),
                weight: 0.9,
            },
        ];
    }

    let mut input = scene(vec![object]);
    input.armatures.push(ArmatureInput {
        name: "rig".into(),
        world_matrix: Mat4::IDENTITY,
        bones: vec![
            BoneInput {
                name: "root".into(),
                parent: None,
                bind_matrix: Mat4::IDENTITY,
            },
            BoneInput {
                name: "tip".into(),
                parent: Some("root".into()),
                bind_matrix: Mat4::from_translation(glam::Vec3::Z),
            },
        ],
        animation,
    });
    input
}

fn rest_poses(frames: impl IntoIterator<Item = u32>) -> BakedPoses {
    let mut poses = BakedPoses::new();
    for frame in frames {
        let mut pose = PoseFrame::default();
        pose.bones.insert("root".into(), Mat4::IDENTITY);
        pose.bones.insert("tip".into(), Mat4::from_translation(glam::Vec3::Z));
        poses.insert("rig", frame, pose);
    }
    poses
}

/// Skinned vertices carry joints and weights that sum to one
#[test]
fn test_skinned_weights_normalized() {
    let input = rigged_scene(AnimationSources::from_pose_keys([1.0, 10.0]));
    let encoded = encode(&input, &ExportOptions::default(), &rest_poses([1, 10])).expect("Failed to encode");
    assert_eq!(encoded.summary.kind, SpmKind::Skinned);
    assert_eq!(encoded.summary.armatures, 1);
    assert_eq!(encoded.summary.keyframes, 2);

    let bytes = &encoded.bytes;
    assert_eq!(bytes[2], 0x09);

    // header, material count, sector count, buffer count, buffer header
    let first_vertex = 28 + 2 + 2 + 2 + 10;
    let record = 12 + 4 + 16;
    for v in 0..3 {
        let joints_at = first_vertex + v * record + 16;
        let joint = |k: usize| i16::from_le_bytes([bytes[joints_at + 2 * k], bytes[joints_at + 2 * k + 1]]);
        let weight = |k: usize| {
            let at = joints_at + 8 + 2 * k;
            unpack_half(u16::from_le_bytes([bytes[at], bytes[at + 1]]))
        };
        assert_eq!(joint(2), -1);
        assert_eq!(joint(3), -1);
        let total: f32 = (0..4).map(weight).sum();
        assert!((total - 1.0).abs() < 2e-3, "weights sum to {}", total);
    }

    let decoded = decode_spm(bytes, &NameOnly).expect("Failed to decode");
    assert!(decoded.is_skinned());
    assert_eq!(decoded.vertex_count(), 3);
}

/// Repeated encodes of the same animation sources are byte-identical
#[test]
fn test_keyframe_sampling_deterministic() {
    let animation = AnimationSources {
        action_curves: vec![ActionCurve {
            data_path: "pose.bones[\"tip\"].location".into(),
            keys: vec![0.0, 4.0, 4.0],
        }],
        nla_strips: vec![NlaStrip {
            frame_start: 2.0,
            frame_end: 6.0,
            keys: vec![0.0, 9.0],
        }],
        constraint_curves: vec![ConstraintCurve {
            keys: vec![3.0],
            modifier_ranges: Vec::new(),
        }],
    };
    let input = rigged_scene(animation);
    let poses = rest_poses(1..=6);

    let first = encode(&input, &ExportOptions::default(), &poses).expect("Failed to encode");
    let second = encode(&input, &ExportOptions::default(), &poses).expect("Failed to encode");
    assert_eq!(first.bytes, second.bytes);
    // Frames 1 (from 0), 2, 3, 4, 6
    assert_eq!(first.summary.keyframes, 5);

    let encoded = encode(&input, &dense(), &poses).expect("Failed to encode");
    assert_eq!(encoded.summary.keyframes, 6);
}

/// Rest pose at every frame, for long dense ranges
struct RestPose;

impl PoseSampler for RestPose {
    fn sample(&self, armature: &str, _frame: u32) -> Option<PoseFrame> {
        (armature == "rig").then(|| {
            let mut pose = PoseFrame::default();
            pose.bones.insert("root".into(), Mat4::IDENTITY);
            pose.bones.insert("tip".into(), Mat4::from_translation(glam::Vec3::Z));
            pose
        })
    }
}

fn dense() -> ExportOptions {
    ExportOptions {
        keyframes_only: false,
        ..Default::default()
    }
}

/// A key far past the 16-bit frame field fails before any dense expansion
#[test]
fn test_dense_sampling_rejects_huge_last_key() {
    let dir = tempdir().expect("Failed to create temp dir");
    let out = dir.path().join("rig.spm");

    let input = rigged_scene(AnimationSources::from_pose_keys([1.0, 4_000_000_000.0]));
    let result = encode_to_path(&input, &dense(), &RestPose, &out);
    assert!(
        matches!(result, Err(EncodeError::FrameOutOfRange(4_000_000_000))),
        "unexpected result: {:?}",
        result
    );
    assert!(!out.exists(), "No file should be written on failure");
}

/// A dense range of exactly the keyframe limit encodes; one more frame fails
#[test]
fn test_dense_sampling_keyframe_limit() {
    let last = u16::MAX as f32 + 1.0;
    let mut input = rigged_scene(AnimationSources::from_pose_keys([2.0, last]));
    input.frame_start = 2;
    let encoded = encode(&input, &dense(), &RestPose).expect("Failed to encode");
    assert_eq!(encoded.summary.keyframes, u16::MAX as usize);

    input.frame_start = 1;
    let result = encode(&input, &dense(), &RestPose);
    assert!(
        matches!(
            result,
            Err(EncodeError::TooMany { what: "keyframes", count: 65536, limit: 65535 })
        ),
        "unexpected result: {:?}",
        result.map(|e| e.summary)
    );
}

/// Dense sampling from a negative scene start begins at frame 1
#[test]
fn test_dense_sampling_negative_scene_start() {
    let mut input = rigged_scene(AnimationSources::from_pose_keys([3.0]));
    input.frame_start = -5;
    let encoded = encode(&input, &dense(), &rest_poses(1..=3)).expect("Failed to encode");
    assert_eq!(encoded.summary.keyframes, 3);
    assert!(encoded.summary.warnings.contains(&EncodeWarning::StaticFrameClamped(-5)));
}

/// An armature with no keys aborts the encode and writes nothing
#[test]
fn test_armature_without_keyframes_writes_nothing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let out = dir.path().join("rig.spm");

    let input = rigged_scene(AnimationSources::default());
    let result = encode_to_path(&input, &ExportOptions::default(), &rest_poses([1]), &out);
    assert!(matches!(result, Err(EncodeError::NoKeyframes(ref name)) if name == "rig"));
    assert!(!out.exists(), "No file should be written on failure");
}

// Helper to run spm-export with arguments
fn spm_export(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_spm-export"))
        .args(args)
        .output()
        .expect("Failed to run spm-export")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is UTF-8")
}

/// Two triangles sharing an edge reuse the shared vertices
#[test]
fn test_cli_encode_shared_edge() {
    let dir = tempdir().expect("Failed to create temp dir");
    let obj_path = dir.path().join("quad.obj");
    let spm_path = dir.path().join("quad.spm");

    generate_test_assets::generate_quad_obj(&obj_path).expect("Failed to generate OBJ");
    let output = spm_export(&["encode", path_str(&obj_path), "-o", path_str(&spm_path)]);
    assert!(output.status.success(), "spm-export encode failed");

    let data = std::fs::read(&spm_path).expect("Failed to read SPM file");
    let decoded = decode_spm(&data, &NameOnly).expect("Failed to decode");
    assert_eq!(decoded.buffers.len(), 1);
    assert_eq!(decoded.buffers[0].vertices.len(), 4);
    assert_eq!(decoded.buffers[0].indices.len(), 6);

    let mut shared = decoded.buffers[0].indices.clone();
    shared.sort_unstable();
    shared.dedup();
    assert_eq!(shared, [0, 1, 2, 3]);
}

/// Encode, inspect and convert back to OBJ through the binary
#[test]
fn test_cli_cube_round_trip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let obj_path = dir.path().join("cube.obj");
    let spm_path = dir.path().join("cube.spm");
    let back_path = dir.path().join("cube_back.obj");

    generate_test_assets::generate_cube_obj(&obj_path).expect("Failed to generate OBJ");
    let output = spm_export(&["encode", path_str(&obj_path), "-o", path_str(&spm_path)]);
    assert!(output.status.success(), "spm-export encode failed");

    let data = std::fs::read(&spm_path).expect("Failed to read SPM file");
    let decoded = decode_spm(&data, &NameOnly).expect("Failed to decode");
    assert_eq!(decoded.materials.len(), 1);
    assert_eq!(
        decoded.materials[0].texture_one.as_ref().map(|t| t.name.as_str()),
        Some("crate.png")
    );
    // Per-face normals and UVs keep the 6 faces' corners apart
    assert_eq!(decoded.vertex_count(), 24);
    assert_eq!(decoded.index_count(), 36);

    let texture_dir = dir.path().join("textures");
    std::fs::create_dir(&texture_dir).expect("Failed to create texture dir");
    std::fs::write(texture_dir.join("crate.png"), b"png").expect("Failed to write texture");
    let output = spm_export(&["inspect", path_str(&spm_path), "--texture-path", path_str(&texture_dir)]);
    assert!(output.status.success(), "spm-export inspect failed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("buffers: 1"), "unexpected inspect output: {}", stdout);
    assert!(stdout.contains("crate.png ("), "texture should resolve: {}", stdout);

    // Textures next to the file resolve without any search path
    std::fs::write(dir.path().join("crate.png"), b"png").expect("Failed to write texture");
    let output = spm_export(&["inspect", path_str(&spm_path)]);
    assert!(output.status.success(), "spm-export inspect failed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let beside = dir.path().join("crate.png");
    assert!(
        stdout.contains(&format!("crate.png ({})", beside.display())),
        "texture should resolve beside the file: {}",
        stdout
    );

    let output = spm_export(&["obj", path_str(&spm_path), "-o", path_str(&back_path)]);
    assert!(output.status.success(), "spm-export obj failed");
    let obj = std::fs::read_to_string(&back_path).expect("Failed to read OBJ");
    assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 8);
    assert_eq!(obj.lines().filter(|l| l.starts_with("f ")).count(), 12);
    assert!(obj.contains("usemtl crate.png"));
}

/// Options file and flag overrides reach the encoder
#[test]
fn test_cli_config_and_flags() {
    let dir = tempdir().expect("Failed to create temp dir");
    let obj_path = dir.path().join("triangle.obj");
    let spm_path = dir.path().join("triangle.spm");
    let config_path = dir.path().join("options.toml");

    generate_test_assets::generate_triangle_obj(&obj_path).expect("Failed to generate OBJ");
    generate_test_assets::generate_options(&config_path, "tangents = false\nmax_buffer_vertices = 3")
        .expect("Failed to write options");

    let output = spm_export(&[
        "encode",
        path_str(&obj_path),
        "-o",
        path_str(&spm_path),
        "--config",
        path_str(&config_path),
        "--no-normals",
    ]);
    assert!(output.status.success(), "spm-export encode failed");

    let data = std::fs::read(&spm_path).expect("Failed to read SPM file");
    // No flags: 28 + 6 + 10 + 3 * 12 + 3
    assert_eq!(data.len(), 83);
    assert_eq!(data[3], 0);
}

/// Invalid inputs fail without producing output
#[test]
fn test_cli_rejects_bad_input() {
    let dir = tempdir().expect("Failed to create temp dir");
    let obj_path = dir.path().join("empty.obj");
    let spm_path = dir.path().join("empty.spm");
    std::fs::write(&obj_path, "# nothing here\n").expect("Failed to write OBJ");

    let output = spm_export(&["encode", path_str(&obj_path), "-o", path_str(&spm_path)]);
    assert!(!output.status.success());
    assert!(!spm_path.exists());

    let config_path = dir.path().join("bad.toml");
    generate_test_assets::generate_triangle_obj(&obj_path).expect("Failed to generate OBJ");
    generate_test_assets::generate_options(&config_path, "max_buffer_vertices = 2")
        .expect("Failed to write options");
    let output = spm_export(&[
        "encode",
        path_str(&obj_path),
        "-o",
        path_str(&spm_path),
        "--config",
        path_str(&config_path),
    ]);
    assert!(!output.status.success());

    let garbage = dir.path().join("garbage.spm");
    std::fs::write(&garbage, b"not an spm file at all").expect("Failed to write file");
    let output = spm_export(&["inspect", path_str(&garbage)]);
    assert!(!output.status.success());
}
