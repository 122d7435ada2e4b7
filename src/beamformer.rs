//! Frequency-domain weight application.

use num_complex::Complex32;

use crate::error::{check_dim, Result};
use crate::signal::{Freqs, Weights};

/// Applies beamforming weights to an input spectrum, producing one output
/// spectrum per source: `Y[s, b] = sum_c conj(W[s, c, b]) X[c, b]`.
pub struct Beamformer {
    num_sources: usize,
    num_channels: usize,
    num_bins: usize,
}

impl Beamformer {
    pub fn new(num_sources: usize, num_channels: usize, num_bins: usize) -> Self {
        Self {
            num_sources,
            num_channels,
            num_bins,
        }
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

    pub fn process(
        &self,
        freqs_in: &Freqs,
        weights: &Weights,
        freqs_out: &mut Freqs,
    ) -> Result<()> {
        check_dim("input", "channels", self.num_channels, freqs_in.num_channels())?;
        check_dim("input", "bins", self.num_bins, freqs_in.num_bins())?;
        check_dim("weights", "sources", self.num_sources, weights.num_sources())?;
        check_dim("weights", "channels", self.num_channels, weights.num_channels())?;
        check_dim("weights", "bins", self.num_bins, weights.num_bins())?;
        check_dim("output", "channels", self.num_sources, freqs_out.num_channels())?;
        check_dim("output", "bins", self.num_bins, freqs_out.num_bins())?;

        for s in 0..self.num_sources {
            let out = freqs_out.channel_mut(s);
            out.fill(Complex32::default());
            for c in 0..self.num_channels {
                let w = weights.at(s, c);
                for ((y, &wb), &x) in out.iter_mut().zip(w).zip(freqs_in.channel(c)) {
                    *y += wb.conj() * x;
                }
            }
        }
        Ok(())
    }
}
