//! Short-time Fourier analysis and synthesis.

use num_complex::Complex32;

use crate::error::{check_dim, Error, Result};
use crate::fft::Rfft;
use crate::signal::{Freqs, Hops};

/// Analysis/synthesis window shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Window {
    /// Symmetric Hann window, `0.5 (1 - cos(2 pi n / (N - 1)))`.
    #[default]
    Hann,
    /// All ones.
    Rectangular,
}

impl Window {
    fn fill(self, coefficients: &mut [f32]) {
        let len = coefficients.len();
        match self {
            Window::Hann => {
                for (n, w) in coefficients.iter_mut().enumerate() {
                    *w = 0.5
                        * (1.0
                            - (core::f32::consts::TAU * n as f32 / (len - 1) as f32).cos());
                }
            }
            Window::Rectangular => coefficients.fill(1.0),
        }
    }
}

fn validate_sizes(num_samples: usize, num_shifts: usize) -> Result<()> {
    if num_samples < 4 || !num_samples.is_power_of_two() {
        return Err(Error::FftLength(num_samples));
    }
    if num_shifts == 0 || num_shifts > num_samples {
        return Err(Error::ShiftCount {
            shift: num_shifts,
            fft: num_samples,
        });
    }
    Ok(())
}

/// Sliding-window analysis: consumes hops of `num_shifts` fresh samples per
/// channel and emits the half-spectrum of the windowed last `num_samples`.
///
/// The forward transform is unnormalized.
pub struct Stft {
    num_channels: usize,
    num_samples: usize,
    num_shifts: usize,
    num_bins: usize,
    window: Vec<f32>,
    /// Sliding time-domain buffer, `channels x num_samples`.
    buffer: Vec<f32>,
    work: Vec<f32>,
    fft: Rfft,
}

impl Stft {
    pub fn new(
        num_channels: usize,
        num_samples: usize,
        num_shifts: usize,
        window: Window,
    ) -> Result<Self> {
        validate_sizes(num_samples, num_shifts)?;
        if num_channels == 0 {
            return Err(Error::Parameter {
                what: "channel count",
                why: "must be at least 1",
            });
        }
        let fft = Rfft::new(num_samples);
        let num_bins = fft.bins();
        let mut coefficients = vec![0.0; num_samples];
        window.fill(&mut coefficients);
        Ok(Self {
            num_channels,
            num_samples,
            num_shifts,
            num_bins,
            window: coefficients,
            buffer: vec![0.0; num_channels * num_samples],
            work: vec![0.0; num_samples],
            fft,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn num_shifts(&self) -> usize {
        self.num_shifts
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Clear the sliding buffers, forgetting all past input.
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
    }

    pub fn process(&mut self, hops: &Hops, freqs: &mut Freqs) -> Result<()> {
        check_dim("input", "channels", self.num_channels, hops.num_channels())?;
        check_dim("input", "shifts", self.num_shifts, hops.num_shifts())?;
        check_dim("output", "channels", self.num_channels, freqs.num_channels())?;
        check_dim("output", "bins", self.num_bins, freqs.num_bins())?;

        let n = self.num_samples;
        let s = self.num_shifts;
        for c in 0..self.num_channels {
            let buffer = &mut self.buffer[c * n..(c + 1) * n];
            buffer.copy_within(s.., 0);
            buffer[n - s..].copy_from_slice(hops.channel(c));
            for ((w, &x), &coeff) in self
                .work
                .iter_mut()
                .zip(buffer.iter())
                .zip(self.window.iter())
            {
                *w = x * coeff;
            }
            self.fft.forward(&mut self.work, freqs.channel_mut(c));
        }
        Ok(())
    }
}

/// Overlap-add synthesis: consumes half-spectra and emits hops of
/// `num_shifts` samples per channel.
///
/// Each inverse transform is divided by the transform length, multiplied by
/// the synthesis window and overlap-added. Emitted samples are normalized by
/// the accumulated window power of their hop position, so that an analysis
/// and synthesis round trip with the same window has unit gain once the
/// overlap has warmed up.
pub struct Istft {
    num_channels: usize,
    num_samples: usize,
    num_shifts: usize,
    num_bins: usize,
    window: Vec<f32>,
    /// Overlap-add accumulator, `channels x num_samples`.
    overlap: Vec<f32>,
    /// Window power accumulated at each of the `num_shifts` emit positions.
    norm: Vec<f32>,
    spectrum_work: Vec<Complex32>,
    time_work: Vec<f32>,
    fft: Rfft,
}

impl Istft {
    pub fn new(
        num_channels: usize,
        num_samples: usize,
        num_shifts: usize,
        window: Window,
    ) -> Result<Self> {
        validate_sizes(num_samples, num_shifts)?;
        if num_channels == 0 {
            return Err(Error::Parameter {
                what: "channel count",
                why: "must be at least 1",
            });
        }
        let fft = Rfft::new(num_samples);
        let num_bins = fft.bins();
        let mut coefficients = vec![0.0; num_samples];
        window.fill(&mut coefficients);

        let mut norm = vec![0.0; num_shifts];
        for (i, norm) in norm.iter_mut().enumerate() {
            let mut position = i;
            while position < num_samples {
                *norm += coefficients[position] * coefficients[position];
                position += num_shifts;
            }
            *norm = norm.max(1.0e-6);
        }

        Ok(Self {
            num_channels,
            num_samples,
            num_shifts,
            num_bins,
            window: coefficients,
            overlap: vec![0.0; num_channels * num_samples],
            norm,
            spectrum_work: vec![Complex32::default(); num_bins],
            time_work: vec![0.0; num_samples],
            fft,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn num_shifts(&self) -> usize {
        self.num_shifts
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Clear the overlap accumulators.
    pub fn reset(&mut self) {
        self.overlap.fill(0.0);
    }

    pub fn process(&mut self, freqs: &Freqs, hops: &mut Hops) -> Result<()> {
        check_dim("input", "channels", self.num_channels, freqs.num_channels())?;
        check_dim("input", "bins", self.num_bins, freqs.num_bins())?;
        check_dim("output", "channels", self.num_channels, hops.num_channels())?;
        check_dim("output", "shifts", self.num_shifts, hops.num_shifts())?;

        let n = self.num_samples;
        let s = self.num_shifts;
        let scale = 1.0 / n as f32;
        for c in 0..self.num_channels {
            self.spectrum_work.copy_from_slice(freqs.channel(c));
            self.fft.inverse(&mut self.spectrum_work, &mut self.time_work);

            let overlap = &mut self.overlap[c * n..(c + 1) * n];
            for ((accumulator, &x), &coeff) in overlap
                .iter_mut()
                .zip(self.time_work.iter())
                .zip(self.window.iter())
            {
                *accumulator += x * scale * coeff;
            }

            let out = hops.channel_mut(c);
            for i in 0..s {
                out[i] = overlap[i] / self.norm[i];
            }
            overlap.copy_within(s.., 0);
            overlap[n - s..].fill(0.0);
        }
        Ok(())
    }
}
