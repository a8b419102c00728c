//! SPM bone transform records
//!
//! Inverse bind matrices and animation poses are both stored decomposed,
//! as ten little-endian floats per bone:
//! ```text
//! translation x, z, y
//! rotation   -x, -z, -y, w
//! scale       x, z, y
//! ```
//! The swizzle converts Blender's Z-up basis into the Y-up file basis.

use glam::Mat4;

use crate::error::FormatError;

/// Size of one decomposed bone transform in bytes (10 floats × 4 bytes)
pub const BONE_TRANSFORM_SIZE: usize = 40;

/// Translation, rotation and scale of one bone, already in file axis order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl BoneTransform {
    pub const SIZE: usize = BONE_TRANSFORM_SIZE;

    pub const IDENTITY: Self = Self {
        translation: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0; 3],
    };

    /// Decompose a Z-up affine matrix and swizzle it into file order
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        let rotation = rotation.normalize();
        Self {
            translation: [translation.x, translation.z, translation.y],
            rotation: [-rotation.x, -rotation.z, -rotation.y, rotation.w],
            scale: [scale.x, scale.z, scale.y],
        }
    }

    /// Write transform to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let floats = self
            .translation
            .iter()
            .chain(&self.rotation)
            .chain(&self.scale);
        for (i, value) in floats.enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Read transform from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < Self::SIZE {
            return Err(FormatError::Truncated {
                offset: 0,
                needed: Self::SIZE,
                available: bytes.len(),
            });
        }
        let f = |i: usize| {
            f32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };
        Ok(Self {
            translation: [f(0), f(1), f(2)],
            rotation: [f(3), f(4), f(5), f(6)],
            scale: [f(7), f(8), f(9)],
        })
    }
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn assert_close(a: &[f32], b: &[f32]) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-5, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_identity_matrix() {
        let transform = BoneTransform::from_matrix(Mat4::IDENTITY);
        assert_close(&transform.translation, &[0.0, 0.0, 0.0]);
        assert_close(&transform.rotation, &[0.0, 0.0, 0.0, 1.0]);
        assert_close(&transform.scale, &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_axis_swizzle() {
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(4.0, 5.0, 6.0),
        );
        let transform = BoneTransform::from_matrix(matrix);
        assert_close(&transform.translation, &[4.0, 6.0, 5.0]);
        assert_close(&transform.scale, &[1.0, 3.0, 2.0]);

        // Rotation about Z becomes a negated rotation about the file's Y
        let half = std::f32::consts::FRAC_PI_4;
        assert_close(&transform.rotation, &[0.0, -half.sin(), 0.0, half.cos()]);
    }

    #[test]
    fn test_rotation_normalized() {
        let rotation = Quat::from_euler(glam::EulerRot::XYZ, 0.3, -0.7, 1.1);
        let matrix = Mat4::from_rotation_translation(rotation, Vec3::new(-2.0, 0.25, 9.0));
        let transform = BoneTransform::from_matrix(matrix);
        assert_close(&transform.translation, &[-2.0, 9.0, 0.25]);
        assert!((Vec3::from(transform.scale) - Vec3::ONE).length() < 1e-5);
        let length: f32 = transform.rotation.iter().map(|c| c * c).sum();
        assert!((length - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_bytes_order() {
        let transform = BoneTransform::from_matrix(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let bytes = transform.to_bytes();
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &3.0f32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2.0f32.to_le_bytes());
        assert_eq!(&bytes[24..28], &1.0f32.to_le_bytes());

        let parsed = BoneTransform::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, transform);
    }

    #[test]
    fn test_from_short_bytes() {
        assert!(BoneTransform::from_bytes(&[0u8; 39]).is_err());
    }
}
