//! Error type shared by every stage and container.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by constructors and `process` calls.
///
/// Configuration errors are reported at construction, dimensional errors at
/// each `process`. Nothing is logged or retried inside the crate; every
/// error is returned synchronously to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A container label exceeds [`crate::signal::MAX_LABEL_LENGTH`] bytes.
    #[error("the label `{0}` is too long, the maximum length is 63")]
    LabelTooLong(String),

    /// A container label contains non-ASCII bytes.
    #[error("the label `{0}` is not ASCII")]
    LabelNotAscii(String),

    /// An FFT length that is not a power of two.
    #[error("the fft length {0} is not a power of two")]
    FftLength(usize),

    /// A bin count that does not correspond to a power-of-two FFT length.
    #[error("the bin count {0} does not match a power-of-two fft length")]
    BinCount(usize),

    /// A hop length larger than the FFT length.
    #[error("the shift count {shift} exceeds the fft length {fft}")]
    ShiftCount { shift: usize, fft: usize },

    /// A count that does not match the stage configuration. `role` names the
    /// argument and `dim` the offending dimension.
    #[error("the number of {dim} of the {role} must be {expected}, got {actual}")]
    Dimension {
        role: &'static str,
        dim: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A value outside its valid range, such as a mixing factor outside
    /// (0, 1] or an empty channel mapping.
    #[error("invalid {what}: {why}")]
    Parameter { what: &'static str, why: &'static str },

    /// A direction vector that is not unit length (or not finite).
    #[error("the direction ({x}, {y}, {z}) is not a unit vector")]
    NotUnit { x: f32, y: f32, z: f32 },

    /// An audio frame slice whose length does not match channels x hop.
    #[error("the audio frame must hold {expected} samples, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    /// An unsupported PCM sample width.
    #[error("the sample width {0} is not supported, use 2 or 4")]
    SampleWidth(usize),

    /// A PCM byte buffer whose length is not a whole number of frames.
    #[error("the pcm buffer length {len} is not a multiple of {stride}")]
    PcmLength { len: usize, stride: usize },
}

/// Compare a container dimension against the stage configuration.
pub(crate) fn check_dim(
    role: &'static str,
    dim: &'static str,
    expected: usize,
    actual: usize,
) -> Result<()> {
    if expected != actual {
        return Err(Error::Dimension {
            role,
            dim,
            expected,
            actual,
        });
    }
    Ok(())
}
