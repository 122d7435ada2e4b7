//! Interleaved PCM conversion.
//!
//! Helpers for moving audio between byte-oriented capture/playback APIs and
//! the channel-major float frames the pipelines consume. Little-endian
//! throughout.

use crate::error::{Error, Result};
use crate::signal::Hops;

/// Sample encoding of an interleaved PCM stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl SampleFormat {
    /// The format conventionally meant by a bare sample width: 2 bytes is
    /// signed 16-bit, 4 bytes signed 32-bit. Other widths are rejected.
    pub fn from_width(width: usize) -> Result<Self> {
        match width {
            2 => Ok(SampleFormat::I16),
            4 => Ok(SampleFormat::I32),
            _ => Err(Error::SampleWidth(width)),
        }
    }

    /// Bytes per sample.
    pub fn width(self) -> usize {
        match self {
            SampleFormat::I8 | SampleFormat::U8 => 1,
            SampleFormat::I16 | SampleFormat::U16 => 2,
            SampleFormat::I32 | SampleFormat::U32 | SampleFormat::F32 => 4,
            SampleFormat::I64 | SampleFormat::U64 | SampleFormat::F64 => 8,
        }
    }
}

macro_rules! le {
    ($ty:ty, $bytes:expr) => {
        <$ty>::from_le_bytes($bytes.try_into().expect("sliced to the sample width"))
    };
}

fn decode_sample(bytes: &[u8], format: SampleFormat) -> f32 {
    match format {
        SampleFormat::I8 => le!(i8, bytes) as f32 / 128.0,
        SampleFormat::I16 => le!(i16, bytes) as f32 / 32768.0,
        SampleFormat::I32 => (le!(i32, bytes) as f64 / 2147483648.0) as f32,
        SampleFormat::I64 => (le!(i64, bytes) as f64 / 9223372036854775808.0) as f32,
        SampleFormat::U8 => le!(u8, bytes) as f32 / u8::MAX as f32 - 0.5,
        SampleFormat::U16 => le!(u16, bytes) as f32 / u16::MAX as f32 - 0.5,
        SampleFormat::U32 => (le!(u32, bytes) as f64 / u32::MAX as f64 - 0.5) as f32,
        SampleFormat::U64 => (le!(u64, bytes) as f64 / u64::MAX as f64 - 0.5) as f32,
        SampleFormat::F32 => le!(f32, bytes).clamp(-1.0, 1.0),
        SampleFormat::F64 => le!(f64, bytes).clamp(-1.0, 1.0) as f32,
    }
}

fn encode_sample(sample: f32, format: SampleFormat, out: &mut Vec<u8>) {
    let x = sample.clamp(-1.0, 1.0);
    match format {
        SampleFormat::I8 => out.extend_from_slice(&((x * i8::MAX as f32) as i8).to_le_bytes()),
        SampleFormat::I16 => {
            out.extend_from_slice(&((x * i16::MAX as f32) as i16).to_le_bytes())
        }
        SampleFormat::I32 => {
            out.extend_from_slice(&((x as f64 * i32::MAX as f64) as i32).to_le_bytes())
        }
        SampleFormat::I64 => {
            out.extend_from_slice(&((x as f64 * i64::MAX as f64) as i64).to_le_bytes())
        }
        SampleFormat::U8 => {
            out.extend_from_slice(&(((x + 0.5) * u8::MAX as f32) as u8).to_le_bytes())
        }
        SampleFormat::U16 => {
            out.extend_from_slice(&(((x + 0.5) * u16::MAX as f32) as u16).to_le_bytes())
        }
        SampleFormat::U32 => out.extend_from_slice(
            &(((x as f64 + 0.5) * u32::MAX as f64) as u32).to_le_bytes(),
        ),
        SampleFormat::U64 => out.extend_from_slice(
            &(((x as f64 + 0.5) * u64::MAX as f64) as u64).to_le_bytes(),
        ),
        SampleFormat::F32 => out.extend_from_slice(&x.to_le_bytes()),
        SampleFormat::F64 => out.extend_from_slice(&(x as f64).to_le_bytes()),
    }
}

/// Deinterleave PCM bytes into a hop container, normalizing to [-1, 1]:
/// signed integers by the magnitude of their most negative value, unsigned
/// integers as `x / max - 0.5`, floats clipped.
///
/// The byte length must be exactly `channels x shifts x width`.
pub fn decode_interleaved(data: &[u8], format: SampleFormat, hops: &mut Hops) -> Result<()> {
    let width = format.width();
    let channels = hops.num_channels();
    let shifts = hops.num_shifts();
    let stride = width * channels;
    if stride == 0 || data.len() != stride * shifts {
        return Err(Error::PcmLength {
            len: data.len(),
            stride: stride.max(1),
        });
    }
    for frame in 0..shifts {
        for channel in 0..channels {
            let offset = (frame * channels + channel) * width;
            let sample = decode_sample(&data[offset..offset + width], format);
            hops.channel_mut(channel)[frame] = sample;
        }
    }
    Ok(())
}

/// Interleave a hop container into PCM bytes, applying the inverse of the
/// [`decode_interleaved`] scaling. Allocates the returned buffer; intended
/// for the edges of the processing graph, not its hot path.
pub fn encode_interleaved(hops: &Hops, format: SampleFormat) -> Vec<u8> {
    let width = format.width();
    let channels = hops.num_channels();
    let shifts = hops.num_shifts();
    let mut out = Vec::with_capacity(width * channels * shifts);
    for frame in 0..shifts {
        for channel in 0..channels {
            encode_sample(hops.channel(channel)[frame], format, &mut out);
        }
    }
    out
}
