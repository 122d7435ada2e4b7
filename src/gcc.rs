//! Generalized cross-correlation with frequency-domain interpolation.

use num_complex::Complex32;

use crate::error::{check_dim, Error, Result};
use crate::fft::Rfft;
use crate::signal::{Covs, Tdoa, Tdoas};

/// Zero-padding factor applied to the half-spectrum before the inverse
/// transform, doubling the time resolution of the correlation.
pub const INTERPOLATION_FACTOR: usize = 2;

/// Turns whitened cross-spectra into per-pair delay estimates.
///
/// Every pair's half-spectrum is zero-padded by [`INTERPOLATION_FACTOR`],
/// transformed back to a time-domain correlation and scanned for the largest
/// local maxima. The inverse transform is scaled by the reciprocal of the
/// unpadded transform length, so a fully coherent unit-magnitude spectrum
/// peaks at 1.0 and amplitudes always land in [0, 1]. Peaks are refined to
/// sub-sample accuracy by parabolic interpolation and reported in unpadded
/// sample units.
pub struct Gcc {
    num_sources: usize,
    num_channels: usize,
    num_pairs: usize,
    num_bins: usize,
    fft_length: usize,
    padded_length: usize,
    /// Peak search bound in unpadded samples.
    max_delay: f32,
    fft: Rfft,
    spectrum: Vec<Complex32>,
    corr: Vec<f32>,
    peaks: Vec<(f32, usize)>,
}

impl Gcc {
    pub fn new(num_sources: usize, num_channels: usize, num_bins: usize) -> Result<Self> {
        if num_bins < 2 || !(num_bins - 1).is_power_of_two() {
            return Err(Error::BinCount(num_bins));
        }
        if num_sources == 0 {
            return Err(Error::Parameter {
                what: "source count",
                why: "must be at least 1",
            });
        }
        if num_channels < 2 {
            return Err(Error::Parameter {
                what: "channel count",
                why: "must be at least 2",
            });
        }
        let fft_length = (num_bins - 1) * 2;
        let padded_length = fft_length * INTERPOLATION_FACTOR;
        let fft = Rfft::new(padded_length);
        Ok(Self {
            num_sources,
            num_channels,
            num_pairs: crate::signal::pair_count(num_channels),
            num_bins,
            fft_length,
            padded_length,
            max_delay: (fft_length / 2) as f32,
            fft,
            spectrum: vec![Complex32::default(); padded_length / 2 + 1],
            corr: vec![0.0; padded_length],
            peaks: Vec::with_capacity(num_sources + 1),
        })
    }

    /// Restrict the peak search to `|delay| <= samples` (unpadded sample
    /// units), typically the array aperture over the speed of sound.
    pub fn with_max_delay(mut self, samples: f32) -> Self {
        self.max_delay = samples.clamp(1.0, (self.fft_length / 2) as f32);
        self
    }

    pub fn num_sources(&self) -> usize {
        self.num_sources
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

    pub fn max_delay(&self) -> f32 {
        self.max_delay
    }

    pub fn process(&mut self, covs: &Covs, tdoas: &mut Tdoas) -> Result<()> {
        check_dim("input", "channels", self.num_channels, covs.num_channels())?;
        check_dim("input", "bins", self.num_bins, covs.num_bins())?;
        check_dim("output", "channels", self.num_channels, tdoas.num_channels())?;
        check_dim("output", "sources", self.num_sources, tdoas.num_sources())?;

        let m = self.padded_length;
        let scale = 1.0 / self.fft_length as f32;
        let bound = (self.max_delay * INTERPOLATION_FACTOR as f32).ceil() as usize;
        let bound = bound.min(m / 2 - 1);

        for pair in 0..self.num_pairs {
            self.spectrum[..self.num_bins].copy_from_slice(covs.xcorr(pair));
            self.spectrum[self.num_bins..].fill(Complex32::default());
            self.fft.inverse(&mut self.spectrum, &mut self.corr);
            for value in self.corr.iter_mut() {
                *value *= scale;
            }

            self.peaks.clear();
            for n in 0..m {
                let signed = if n <= m / 2 {
                    n as isize
                } else {
                    n as isize - m as isize
                };
                if signed.unsigned_abs() > bound {
                    continue;
                }
                let value = self.corr[n];
                if value < self.corr[(n + m - 1) % m] || value < self.corr[(n + 1) % m] {
                    continue;
                }
                // Strictly-greater insertion keeps the earlier peak ahead on
                // equal values.
                let mut position = self.peaks.len();
                for (index, existing) in self.peaks.iter().enumerate() {
                    if value > existing.0 {
                        position = index;
                        break;
                    }
                }
                if position < self.num_sources {
                    self.peaks.insert(position, (value, n));
                    self.peaks.truncate(self.num_sources);
                }
            }

            for source in 0..self.num_sources {
                let tdoa = match self.peaks.get(source) {
                    Some(&(_, n)) => {
                        let y0 = self.corr[n];
                        let ym = self.corr[(n + m - 1) % m];
                        let yp = self.corr[(n + 1) % m];
                        let denom = ym - 2.0 * y0 + yp;
                        let offset = if denom.abs() > 1.0e-12 {
                            (0.5 * (ym - yp) / denom).clamp(-0.5, 0.5)
                        } else {
                            0.0
                        };
                        let signed = if n <= m / 2 {
                            n as f32
                        } else {
                            n as f32 - m as f32
                        };
                        Tdoa {
                            delay: (signed + offset) / INTERPOLATION_FACTOR as f32,
                            amplitude: (y0 - 0.25 * (ym - yp) * offset).clamp(0.0, 1.0),
                        }
                    }
                    None => Tdoa::default(),
                };
                tdoas.set(source, pair, tdoa);
            }
        }
        Ok(())
    }
}
