//! Delay-and-sum weight synthesis.

use num_complex::Complex32;

use crate::error::{check_dim, Error, Result};
use crate::signal::{Tdoas, Weights};

/// Converts per-pair delays into complex beamforming weights.
///
/// Channel 0 is the reference: `delta_0 = 0` and `delta_c` is the delay of
/// pair `(0, c)`. Every weight has magnitude `1 / channels`:
/// `W[s, c, b] = (1/C) exp(j 2 pi b delta_c / (2 (bins - 1)))`.
///
/// Amplitudes in the delay table are ignored; only the localizer uses them.
pub struct DelaySum {
    num_sources: usize,
    num_channels: usize,
    num_bins: usize,
}

impl DelaySum {
    pub fn new(num_sources: usize, num_channels: usize, num_bins: usize) -> Result<Self> {
        if num_channels < 2 {
            return Err(Error::Parameter {
                what: "channel count",
                why: "must be at least 2",
            });
        }
        if num_bins < 2 {
            return Err(Error::Parameter {
                what: "bin count",
                why: "must be at least 2",
            });
        }
        Ok(Self {
            num_sources,
            num_channels,
            num_bins,
        })
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

    pub fn process(&self, tdoas: &Tdoas, weights: &mut Weights) -> Result<()> {
        check_dim("input", "channels", self.num_channels, tdoas.num_channels())?;
        check_dim("input", "sources", self.num_sources, tdoas.num_sources())?;
        check_dim("output", "sources", self.num_sources, weights.num_sources())?;
        check_dim("output", "channels", self.num_channels, weights.num_channels())?;
        check_dim("output", "bins", self.num_bins, weights.num_bins())?;

        let gain = 1.0 / self.num_channels as f32;
        let step = core::f32::consts::PI / (self.num_bins - 1) as f32;
        for s in 0..self.num_sources {
            for c in 0..self.num_channels {
                // Pair (0, c) sits at index c - 1 in lexicographic order.
                let delta = if c == 0 { 0.0 } else { tdoas.get(s, c - 1).delay };
                for (b, w) in weights.at_mut(s, c).iter_mut().enumerate() {
                    let phase = step * b as f32 * delta;
                    *w = Complex32::new(phase.cos(), phase.sin()) * gain;
                }
            }
        }
        Ok(())
    }
}
