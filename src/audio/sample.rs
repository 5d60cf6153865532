//! Interleaved client-format sample encoding
//!
//! Samples move between file and client layouts as full-scale `i32`
//! values, so integer-to-integer conversions are exact bit shifts.

use crate::audio::StreamDescription;
use crate::error::{ConvertError, Result};

/// Sample layout of a linear PCM client buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Int16,
    Int32,
    Float32,
}

impl SampleEncoding {
    pub fn for_client(format: &StreamDescription) -> Result<Self> {
        if !format.is_linear_pcm() {
            return Err(ConvertError::setup(format!(
                "Client format must be linear PCM, got '{}'", format.format_id
            )));
        }
        let encoding = match (format.is_float(), format.bits_per_channel) {
            (false, 16) => SampleEncoding::Int16,
            (false, 32) => SampleEncoding::Int32,
            (true, 32) => SampleEncoding::Float32,
            (float, bits) => {
                return Err(ConvertError::setup(format!(
                    "Unsupported client sample layout: {} bits{}",
                    bits,
                    if float { " float" } else { "" }
                )));
            }
        };
        if format.bytes_per_frame != encoding.bytes_per_sample() as u32 * format.channels {
            return Err(ConvertError::setup(format!(
                "Client format is not packed: {} bytes per frame for {} channel(s)",
                format.bytes_per_frame, format.channels
            )));
        }
        Ok(encoding)
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleEncoding::Int16 => 2,
            SampleEncoding::Int32 | SampleEncoding::Float32 => 4,
        }
    }

    /// Writes one full-scale sample into `out` in native byte order.
    pub fn encode(self, full: i32, out: &mut [u8]) {
        match self {
            SampleEncoding::Int16 => out[..2].copy_from_slice(&((full >> 16) as i16).to_ne_bytes()),
            SampleEncoding::Int32 => out[..4].copy_from_slice(&full.to_ne_bytes()),
            SampleEncoding::Float32 => out[..4].copy_from_slice(&full_to_f32(full).to_ne_bytes()),
        }
    }

    /// Reads one sample from `bytes` as a full-scale value.
    pub fn decode(self, bytes: &[u8]) -> i32 {
        match self {
            SampleEncoding::Int16 => (i16::from_ne_bytes([bytes[0], bytes[1]]) as i32) << 16,
            SampleEncoding::Int32 => i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            SampleEncoding::Float32 => {
                f32_to_full(f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
        }
    }

    pub fn decode_all(self, bytes: &[u8], out: &mut Vec<i32>) {
        out.extend(bytes.chunks_exact(self.bytes_per_sample()).map(|b| self.decode(b)));
    }
}

/// Integer sample of `bits` width to full scale.
pub fn int_to_full(value: i32, bits: u16) -> i32 {
    value << (32 - bits as u32)
}

/// Full-scale sample to an integer of `bits` width.
pub fn full_to_int(full: i32, bits: u16) -> i32 {
    full >> (32 - bits as u32)
}

pub fn full_to_f32(full: i32) -> f32 {
    full as f32 / 2_147_483_648.0
}

pub fn f32_to_full(sample: f32) -> i32 {
    if !sample.is_finite() {
        return 0;
    }
    // `as` saturates at the i32 bounds
    (sample.clamp(-1.0, 1.0) as f64 * 2_147_483_648.0) as i32
}
