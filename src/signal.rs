//! Labelled signal containers passed between processing stages.
//!
//! Every container carries a short ASCII label used purely for diagnostics;
//! the algorithms never look at it. Dimensions are fixed at construction and
//! all storage is preallocated, so containers can be reused frame after
//! frame without touching the allocator.

use num_complex::Complex32;

use crate::error::{Error, Result};
use crate::math::Xyz;

/// Maximum label length in bytes.
pub const MAX_LABEL_LENGTH: usize = 63;

fn validate_label(label: &str) -> Result<String> {
    if !label.is_ascii() {
        return Err(Error::LabelNotAscii(label.into()));
    }
    if label.len() > MAX_LABEL_LENGTH {
        return Err(Error::LabelTooLong(label.into()));
    }
    Ok(label.into())
}

/// Number of unordered channel pairs `(i, j), i < j`.
#[inline]
pub fn pair_count(channels: usize) -> usize {
    channels * channels.saturating_sub(1) / 2
}

/// Lexicographic index of the pair `(i, j)` with `i < j`.
#[inline]
pub fn pair_index(i: usize, j: usize, channels: usize) -> usize {
    debug_assert!(i < j && j < channels);
    i * channels - i * (i + 1) / 2 + j - i - 1
}

/// One frame of time-domain samples, `channels x shifts`, in [-1, 1].
#[derive(Clone, Debug)]
pub struct Hops {
    label: String,
    num_channels: usize,
    num_shifts: usize,
    data: Vec<f32>,
}

impl Hops {
    pub fn new(label: &str, num_channels: usize, num_shifts: usize) -> Result<Self> {
        Ok(Self {
            label: validate_label(label)?,
            num_channels,
            num_shifts,
            data: vec![0.0; num_channels * num_shifts],
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_shifts(&self) -> usize {
        self.num_shifts
    }

    #[inline]
    pub fn channel(&self, c: usize) -> &[f32] {
        &self.data[c * self.num_shifts..(c + 1) * self.num_shifts]
    }

    #[inline]
    pub fn channel_mut(&mut self, c: usize) -> &mut [f32] {
        &mut self.data[c * self.num_shifts..(c + 1) * self.num_shifts]
    }

    /// All samples, channel-major.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.data.len() {
            return Err(Error::FrameLength {
                expected: self.data.len(),
                actual: len,
            });
        }
        Ok(())
    }

    /// Load channel-major float samples. Samples are expected to follow the
    /// [-1, 1] convention; values are stored verbatim.
    pub fn load_f32(&mut self, samples: &[f32]) -> Result<()> {
        self.check_len(samples.len())?;
        self.data.copy_from_slice(samples);
        Ok(())
    }

    /// Load channel-major double samples.
    pub fn load_f64(&mut self, samples: &[f64]) -> Result<()> {
        self.check_len(samples.len())?;
        for (dst, &src) in self.data.iter_mut().zip(samples) {
            *dst = src as f32;
        }
        Ok(())
    }
}

macro_rules! impl_load_signed {
    ($name:ident, $ty:ty) => {
        impl Hops {
            /// Load channel-major samples, normalized by the magnitude of the
            /// most negative value of the type.
            pub fn $name(&mut self, samples: &[$ty]) -> Result<()> {
                self.check_len(samples.len())?;
                let scale = 1.0 / (<$ty>::MIN as f64).abs();
                for (dst, &src) in self.data.iter_mut().zip(samples) {
                    *dst = (src as f64 * scale) as f32;
                }
                Ok(())
            }
        }
    };
}

macro_rules! impl_load_unsigned {
    ($name:ident, $ty:ty) => {
        impl Hops {
            /// Load channel-major samples, mapped linearly from [0, max]
            /// to [-1, 1].
            pub fn $name(&mut self, samples: &[$ty]) -> Result<()> {
                self.check_len(samples.len())?;
                let scale = 2.0 / (<$ty>::MAX as f64);
                for (dst, &src) in self.data.iter_mut().zip(samples) {
                    *dst = (src as f64 * scale - 1.0) as f32;
                }
                Ok(())
            }
        }
    };
}

impl_load_signed!(load_i8, i8);
impl_load_signed!(load_i16, i16);
impl_load_signed!(load_i32, i32);
impl_load_signed!(load_i64, i64);
impl_load_unsigned!(load_u8, u8);
impl_load_unsigned!(load_u16, u16);
impl_load_unsigned!(load_u32, u32);
impl_load_unsigned!(load_u64, u64);

/// Half-spectra, `channels x bins` complex values.
#[derive(Clone, Debug)]
pub struct Freqs {
    label: String,
    num_channels: usize,
    num_bins: usize,
    data: Vec<Complex32>,
}

impl Freqs {
    pub fn new(label: &str, num_channels: usize, num_bins: usize) -> Result<Self> {
        Ok(Self {
            label: validate_label(label)?,
            num_channels,
            num_bins,
            data: vec![Complex32::default(); num_channels * num_bins],
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    #[inline]
    pub fn channel(&self, c: usize) -> &[Complex32] {
        &self.data[c * self.num_bins..(c + 1) * self.num_bins]
    }

    #[inline]
    pub fn channel_mut(&mut self, c: usize) -> &mut [Complex32] {
        &mut self.data[c * self.num_bins..(c + 1) * self.num_bins]
    }

    pub fn load(&mut self, values: &[Complex32]) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(Error::FrameLength {
                expected: self.data.len(),
                actual: values.len(),
            });
        }
        self.data.copy_from_slice(values);
        Ok(())
    }
}

/// Non-negative weights applied during the covariance update,
/// `channels x bins`.
#[derive(Clone, Debug)]
pub struct Masks {
    label: String,
    num_channels: usize,
    num_bins: usize,
    data: Vec<f32>,
}

impl Masks {
    pub fn new(label: &str, num_channels: usize, num_bins: usize) -> Result<Self> {
        Ok(Self {
            label: validate_label(label)?,
            num_channels,
            num_bins,
            data: vec![0.0; num_channels * num_bins],
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    #[inline]
    pub fn channel(&self, c: usize) -> &[f32] {
        &self.data[c * self.num_bins..(c + 1) * self.num_bins]
    }

    #[inline]
    pub fn channel_mut(&mut self, c: usize) -> &mut [f32] {
        &mut self.data[c * self.num_bins..(c + 1) * self.num_bins]
    }

    pub fn set_ones(&mut self) {
        self.data.fill(1.0);
    }

    pub fn set_zeros(&mut self) {
        self.data.fill(0.0);
    }
}

/// Spatial covariance estimates: complex cross-spectra for every unordered
/// channel pair (`pairs x bins`) and real auto-spectra (`channels x bins`).
///
/// Pair rows are ordered lexicographically: `(0,1), (0,2), ..., (1,2), ...`.
#[derive(Clone, Debug)]
pub struct Covs {
    label: String,
    num_channels: usize,
    num_pairs: usize,
    num_bins: usize,
    xcorrs: Vec<Complex32>,
    acorrs: Vec<f32>,
}

impl Covs {
    pub fn new(label: &str, num_channels: usize, num_bins: usize) -> Result<Self> {
        let num_pairs = pair_count(num_channels);
        Ok(Self {
            label: validate_label(label)?,
            num_channels,
            num_pairs,
            num_bins,
            xcorrs: vec![Complex32::default(); num_pairs * num_bins],
            acorrs: vec![0.0; num_channels * num_bins],
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_pairs(&self) -> usize {
        self.num_pairs
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    #[inline]
    pub fn xcorr(&self, pair: usize) -> &[Complex32] {
        &self.xcorrs[pair * self.num_bins..(pair + 1) * self.num_bins]
    }

    #[inline]
    pub fn xcorr_mut(&mut self, pair: usize) -> &mut [Complex32] {
        &mut self.xcorrs[pair * self.num_bins..(pair + 1) * self.num_bins]
    }

    #[inline]
    pub fn acorr(&self, channel: usize) -> &[f32] {
        &self.acorrs[channel * self.num_bins..(channel + 1) * self.num_bins]
    }

    #[inline]
    pub fn acorr_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.acorrs[channel * self.num_bins..(channel + 1) * self.num_bins]
    }

    pub fn load_xcorrs(&mut self, values: &[Complex32]) -> Result<()> {
        if values.len() != self.xcorrs.len() {
            return Err(Error::FrameLength {
                expected: self.xcorrs.len(),
                actual: values.len(),
            });
        }
        self.xcorrs.copy_from_slice(values);
        Ok(())
    }

    pub fn load_acorrs(&mut self, values: &[f32]) -> Result<()> {
        if values.len() != self.acorrs.len() {
            return Err(Error::FrameLength {
                expected: self.acorrs.len(),
                actual: values.len(),
            });
        }
        self.acorrs.copy_from_slice(values);
        Ok(())
    }

    /// Reset both estimates to zero, restarting the covariance recursion.
    pub fn reset(&mut self) {
        self.xcorrs.fill(Complex32::default());
        self.acorrs.fill(0.0);
    }
}

/// One time difference of arrival: a delay in (fractional) samples and a
/// correlation amplitude in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tdoa {
    pub delay: f32,
    pub amplitude: f32,
}

/// Per-source, per-pair time differences of arrival, `sources x pairs`.
/// Pair ordering matches [`Covs`].
#[derive(Clone, Debug)]
pub struct Tdoas {
    label: String,
    num_channels: usize,
    num_pairs: usize,
    num_sources: usize,
    data: Vec<Tdoa>,
}

impl Tdoas {
    pub fn new(label: &str, num_channels: usize, num_sources: usize) -> Result<Self> {
        let num_pairs = pair_count(num_channels);
        Ok(Self {
            label: validate_label(label)?,
            num_channels,
            num_pairs,
            num_sources,
            data: vec![Tdoa::default(); num_sources * num_pairs],
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_pairs(&self) -> usize {
        self.num_pairs
    }

    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    #[inline]
    pub fn get(&self, source: usize, pair: usize) -> Tdoa {
        self.data[source * self.num_pairs + pair]
    }

    #[inline]
    pub fn set(&mut self, source: usize, pair: usize, tdoa: Tdoa) {
        self.data[source * self.num_pairs + pair] = tdoa;
    }

    /// All pairs of one source.
    #[inline]
    pub fn source(&self, source: usize) -> &[Tdoa] {
        &self.data[source * self.num_pairs..(source + 1) * self.num_pairs]
    }

    #[inline]
    pub fn source_mut(&mut self, source: usize) -> &mut [Tdoa] {
        &mut self.data[source * self.num_pairs..(source + 1) * self.num_pairs]
    }
}

/// What a direction slot currently holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DoaKind {
    /// Empty slot.
    #[default]
    Undefined,
    /// An instantaneous observation produced by the localizer.
    Potential,
    /// A direction maintained by the tracker.
    Tracked,
    /// A direction supplied by the caller.
    Target,
}

/// One direction slot: kind, unit coordinate and energy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Doa {
    pub kind: DoaKind,
    pub coord: Xyz,
    pub energy: f32,
}

impl Doa {
    pub fn new(kind: DoaKind, coord: Xyz, energy: f32) -> Self {
        Self { kind, coord, energy }
    }
}

/// A fixed-length list of direction slots.
#[derive(Clone, Debug)]
pub struct Doas {
    label: String,
    data: Vec<Doa>,
}

impl Doas {
    pub fn new(label: &str, len: usize) -> Result<Self> {
        Ok(Self {
            label: validate_label(label)?,
            data: vec![Doa::default(); len],
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Doa {
        self.data[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, doa: Doa) {
        self.data[index] = doa;
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Doa> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[Doa] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Doa] {
        &mut self.data
    }
}

/// Complex beamforming weights, `sources x channels x bins`.
#[derive(Clone, Debug)]
pub struct Weights {
    label: String,
    num_sources: usize,
    num_channels: usize,
    num_bins: usize,
    data: Vec<Complex32>,
}

impl Weights {
    pub fn new(
        label: &str,
        num_sources: usize,
        num_channels: usize,
        num_bins: usize,
    ) -> Result<Self> {
        Ok(Self {
            label: validate_label(label)?,
            num_sources,
            num_channels,
            num_bins,
            data: vec![Complex32::default(); num_sources * num_channels * num_bins],
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Bins of one source and channel.
    #[inline]
    pub fn at(&self, source: usize, channel: usize) -> &[Complex32] {
        let start = (source * self.num_channels + channel) * self.num_bins;
        &self.data[start..start + self.num_bins]
    }

    #[inline]
    pub fn at_mut(&mut self, source: usize, channel: usize) -> &mut [Complex32] {
        let start = (source * self.num_channels + channel) * self.num_bins;
        &mut self.data[start..start + self.num_bins]
    }
}

/// Tuning parameters of the source tracker.
///
/// The defaults are suitable for speech at typical frame rates
/// (hop 128 at 16 kHz); see the field documentation of [`crate::sst::Sst`]
/// for how each parameter enters the update.
#[derive(Clone, Debug)]
pub struct Dsf {
    label: String,
    /// Center of the angular-distance sigmoid, in radians.
    pub sigmoid_mean: f32,
    /// Slope of the angular-distance sigmoid.
    pub sigmoid_slope: f32,
    /// Observation variance attributed to an existing track.
    pub tracked_source_sigma2: f32,
    /// Minimum association likelihood that counts as a detection.
    pub tracked_source_threshold: f32,
    /// Filter rate of the existence probability update.
    pub tracked_source_rate: f32,
    /// Initial-variance scaling applied to a newborn track.
    pub new_source_sigma2: f32,
    /// Minimum observation energy that can create a track.
    pub new_threshold: f32,
    /// Existence probability under which a track starts decaying.
    pub delete_threshold: f32,
    /// Multiplicative decay applied below the delete threshold.
    pub delete_decay: f32,
}

impl Dsf {
    pub fn new(label: &str) -> Result<Self> {
        Ok(Self {
            label: validate_label(label)?,
            sigmoid_mean: 0.3,
            sigmoid_slope: 40.0,
            tracked_source_sigma2: 0.05,
            tracked_source_threshold: 0.25,
            tracked_source_rate: 0.1,
            new_source_sigma2: 0.01,
            new_threshold: 0.4,
            delete_threshold: 0.2,
            delete_decay: 0.98,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
