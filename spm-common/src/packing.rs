//! Vertex attribute quantization
//!
//! Converts canonical f32 vertex attributes to the fixed-width SPM wire
//! encodings and back:
//! - f32 → binary16 half float (UVs, bone weights)
//! - f32x3 (+ handedness) → packed signed-normalized 10/10/10/2 word (normals, tangents)
//! - RGB u8 → one-byte white sentinel or a four-byte color record
//!
//! Used by both `spm-export` (encoder) and the decoder in this crate.

use half::f16;

// ============================================================================
// Vertex Format Flags
// ============================================================================

/// Header flag: vertex records carry a packed normal
pub const FLAG_NORMAL: u8 = 1;
/// Header flag: vertex records carry a color record
pub const FLAG_VERTEX_COLOR: u8 = 2;
/// Header flag: textured vertex records carry a packed tangent
pub const FLAG_TANGENT: u8 = 4;

/// Color record lead byte meaning "pure white, nothing follows"
pub const COLOR_WHITE: u8 = 128;
/// Color record lead byte meaning "three RGB bytes follow"
pub const COLOR_RGB: u8 = 255;

/// Which fields a single vertex record carries.
///
/// Normal, color and tangent presence come from the header flags; UV presence
/// comes from the material the buffer references (one or two textures).
/// Tangents are only ever stored inside the first UV block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub normal: bool,
    pub color: bool,
    pub uv_one: bool,
    pub uv_two: bool,
    pub tangent: bool,
    pub skinned: bool,
}

impl VertexLayout {
    pub fn new(flags: u8, texture_one: bool, texture_two: bool, skinned: bool) -> Self {
        Self {
            normal: flags & FLAG_NORMAL != 0,
            color: flags & FLAG_VERTEX_COLOR != 0,
            uv_one: texture_one,
            uv_two: texture_one && texture_two,
            tangent: texture_one && flags & FLAG_TANGENT != 0,
            skinned,
        }
    }

    /// Smallest possible record size in bytes (white vertices)
    pub const fn min_stride(&self) -> usize {
        let mut stride = 12; // Position: Float32x3

        if self.normal {
            stride += 4; // 10/10/10/2
        }
        if self.color {
            stride += 1; // White sentinel
        }
        if self.uv_one {
            stride += 4; // Float16x2
        }
        if self.uv_two {
            stride += 4; // Float16x2
        }
        if self.tangent {
            stride += 4; // 10/10/10/2
        }
        if self.skinned {
            stride += 16; // Joints (i16x4) + weights (f16x4)
        }

        stride
    }

    /// Largest possible record size in bytes (non-white vertices)
    pub const fn max_stride(&self) -> usize {
        if self.color {
            self.min_stride() + 3
        } else {
            self.min_stride()
        }
    }
}

// ============================================================================
// Half Float
// ============================================================================

/// Bits of the largest finite half float (65504.0), without sign
const F16_MAX_FINITE_BITS: u16 = 0x7BFF;

/// Convert f32 to binary16 bits.
///
/// In-range values round to nearest. Values too large for binary16 saturate
/// to ±65504; values below the smallest normal (2^-14) become signed zero.
#[inline]
pub fn pack_half(value: f32) -> u16 {
    if value.is_nan() {
        return f16::from_f32(value).to_bits();
    }

    let sign = if value.is_sign_negative() { 0x8000 } else { 0 };
    if value.abs() < f16::MIN_POSITIVE.to_f32() {
        return sign;
    }

    let half = f16::from_f32(value);
    if half.is_infinite() {
        return sign | F16_MAX_FINITE_BITS;
    }
    half.to_bits()
}

/// Convert binary16 bits back to f32
#[inline]
pub fn unpack_half(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

// ============================================================================
// 10/10/10/2 Packed Vectors
// ============================================================================

/// Quantize one clamped component with the asymmetric SPM rounding rule.
///
/// Computed in f64 to match the reference exporter bit for bit.
#[inline]
fn quantize_component(value: f32, positive_scale: f64, negative_scale: f64) -> i32 {
    let v = f64::from(value.clamp(-1.0, 1.0));
    if v > 0.0 {
        (v * positive_scale + 0.5) as i32
    } else {
        (v * negative_scale - 0.5) as i32
    }
}

/// Pack xyz + handedness into a 2_10_10_10_REV word.
///
/// x/y/z land at bits 0, 10 and 20 (511 positive / 512 negative scale);
/// w lands at bit 30 (1 positive / 2 negative scale).
#[inline]
pub fn pack_2101010_rev(v: [f32; 4]) -> u32 {
    let x = quantize_component(v[0], 511.0, 512.0) as u32 & 0x3FF;
    let y = quantize_component(v[1], 511.0, 512.0) as u32 & 0x3FF;
    let z = quantize_component(v[2], 511.0, 512.0) as u32 & 0x3FF;
    let w = quantize_component(v[3], 1.0, 2.0) as u32 & 0x3;
    x | (y << 10) | (z << 20) | (w << 30)
}

/// Pack a normal; the two top bits stay zero.
#[inline]
pub fn pack_normal(n: [f32; 3]) -> u32 {
    pack_2101010_rev([n[0], n[1], n[2], 0.0]) & 0x3FFF_FFFF
}

/// Pack a tangent with its bitangent sign in w
#[inline]
pub fn pack_tangent(t: [f32; 4]) -> u32 {
    pack_2101010_rev(t)
}

#[inline]
fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Inverse of [`pack_2101010_rev`], up to quantization error
pub fn unpack_2101010_rev(word: u32) -> [f32; 4] {
    let component = |value: i32| {
        if value > 0 {
            value as f32 / 511.0
        } else {
            value as f32 / 512.0
        }
    };
    let w = sign_extend(word >> 30, 2);
    [
        component(sign_extend(word & 0x3FF, 10)),
        component(sign_extend((word >> 10) & 0x3FF, 10)),
        component(sign_extend((word >> 20) & 0x3FF, 10)),
        if w > 0 { w as f32 } else { w as f32 / 2.0 },
    ]
}

// ============================================================================
// Color
// ============================================================================

/// Convert a [0, 1] color channel to u8 by truncation (not rounding)
#[inline]
pub fn quantize_channel(value: f32) -> u8 {
    ((value * 255.0) as i32).clamp(0, 255) as u8
}

/// Append a color record: the white sentinel, or 255 followed by RGB
#[inline]
pub fn pack_color(rgb: [u8; 3], out: &mut Vec<u8>) {
    if rgb == [255, 255, 255] {
        out.push(COLOR_WHITE);
    } else {
        out.push(COLOR_RGB);
        out.extend_from_slice(&rgb);
    }
}
