//! Q16.16 fixed-point codec for the display-list debugger's matrix loader.
//!
//! Matrices arrive on disk as 4x4 grids of signed 16.16 fixed-point values,
//! split into a big-endian integer half and a big-endian fractional half
//! (the two halves are stored as separate 4x4 blocks, not interleaved per
//! element). `Q1616` converts a single element between that on-disk split
//! representation and `f32` for the matrix-multiply math the debugger does
//! in floating point.

#![no_std]

/// One element of a fixed-point matrix: the high 16 bits (signed integer
/// part) and low 16 bits (unsigned fractional part) of a Q16.16 value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Q1616 {
    pub int_part: i16,
    pub frac_part: u16,
}

impl Q1616 {
    /// Combine the split halves into the raw 32-bit Q16.16 value.
    #[must_use]
    pub const fn to_raw(self) -> i32 {
        ((self.int_part as i32) << 16) | (self.frac_part as i32)
    }

    /// Split a raw 32-bit Q16.16 value into its int/frac halves.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self {
            int_part: (raw >> 16) as i16,
            frac_part: (raw & 0xFFFF) as u16,
        }
    }

    /// Convert to floating point.
    #[must_use]
    pub fn to_f32(self) -> f32 {
        self.to_raw() as f32 / 65536.0
    }

    /// Convert from floating point, saturating at the Q16.16 range.
    #[must_use]
    pub fn from_f32(val: f32) -> Self {
        let clamped = val.clamp(-32768.0, 32767.999_985);
        let raw = (clamped * 65536.0) as i32;
        Self::from_raw(raw)
    }
}

/// A 4x4 matrix of `Q1616` elements, in the on-disk split-half layout: the
/// first 32 bytes (big-endian `i16`s, row-major) hold the integer parts, the
/// next 32 bytes (big-endian `u16`s, row-major) hold the fractional parts.
pub const MATRIX_BYTES: usize = 64;

/// Decode a 64-byte on-disk matrix buffer into a 4x4 array of `f32`.
///
/// # Panics
/// Panics if `buf` is shorter than [`MATRIX_BYTES`]; callers validate the
/// RDRAM range before calling this.
#[must_use]
pub fn decode_matrix(buf: &[u8]) -> [[f32; 4]; 4] {
    assert!(buf.len() >= MATRIX_BYTES);
    let mut out = [[0.0f32; 4]; 4];
    for row in 0..4 {
        for col in 0..4 {
            let elem_idx = row * 4 + col;
            let int_off = elem_idx * 2;
            let frac_off = 32 + elem_idx * 2;
            let int_part = i16::from_be_bytes([buf[int_off], buf[int_off + 1]]);
            let frac_part = u16::from_be_bytes([buf[frac_off], buf[frac_off + 1]]);
            out[row][col] = Q1616 { int_part, frac_part }.to_f32();
        }
    }
    out
}

/// Encode a 4x4 `f32` matrix into the on-disk split-half layout.
#[must_use]
pub fn encode_matrix(m: &[[f32; 4]; 4]) -> [u8; MATRIX_BYTES] {
    let mut out = [0u8; MATRIX_BYTES];
    for row in 0..4 {
        for col in 0..4 {
            let elem_idx = row * 4 + col;
            let q = Q1616::from_f32(m[row][col]);
            let int_off = elem_idx * 2;
            let frac_off = 32 + elem_idx * 2;
            out[int_off..int_off + 2].copy_from_slice(&q.int_part.to_be_bytes());
            out[frac_off..frac_off + 2].copy_from_slice(&q.frac_part.to_be_bytes());
        }
    }
    out
}

/// Multiply two 4x4 row-major matrices: `a * b`.
#[must_use]
pub fn mat4_mul(a: &[[f32; 4]; 4], b: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut out = [[0.0f32; 4]; 4];
    for row in 0..4 {
        for col in 0..4 {
            let mut acc = 0.0f32;
            for k in 0..4 {
                acc += a[row][k] * b[k][col];
            }
            out[row][col] = acc;
        }
    }
    out
}

/// The 4x4 identity matrix.
#[must_use]
pub const fn mat4_identity() -> [[f32; 4]; 4] {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Transform a homogeneous point `[x, y, z, w]` by a row-major matrix,
/// using row-vector-on-the-left convention (`p * m`).
#[must_use]
pub fn transform_point(m: &[[f32; 4]; 4], p: [f32; 4]) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    for col in 0..4 {
        let mut acc = 0.0f32;
        for row in 0..4 {
            acc += p[row] * m[row][col];
        }
        out[col] = acc;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_round_trip_is_exact_on_quantized_values() {
        for raw in [0i32, 1, -1, 0x0001_8000, -0x0001_8000, 0x7FFF_FFFF, -0x8000_0000] {
            let q = Q1616::from_raw(raw);
            assert_eq!(q.to_raw(), raw);
        }
    }

    #[test]
    fn f_to_q_to_f_preserves_quantized_float() {
        let val = 12.5_f32;
        let q = Q1616::from_f32(val);
        assert_eq!(q.to_f32(), val);
    }

    #[test]
    fn matrix_encode_decode_round_trips() {
        let mut m = mat4_identity();
        m[0][3] = 100.25;
        m[1][3] = -50.0;
        let buf = encode_matrix(&m);
        let decoded = decode_matrix(&buf);
        assert_eq!(decoded, m);
    }

    #[test]
    fn identity_times_identity_is_identity() {
        let id = mat4_identity();
        let result = mat4_mul(&id, &id);
        assert_eq!(result, id);
    }

    #[test]
    fn transform_point_through_identity_is_unchanged() {
        let id = mat4_identity();
        let p = [1.0, 2.0, 3.0, 1.0];
        assert_eq!(transform_point(&id, p), p);
    }
}
