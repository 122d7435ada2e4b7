//! Phase-transform whitening of the spatial covariance.

use crate::error::{check_dim, Result};
use crate::signal::Covs;

/// Magnitude floor below which a bin is treated as silent.
const EPSILON: f32 = 1.0e-20;

/// Normalizes every cross-spectrum bin to unit magnitude, keeping only the
/// phase. Auto-spectra are flattened to 1 wherever they carry energy.
///
/// Bins with magnitude below the floor come out as zero; no value is ever
/// non-finite.
pub struct Phat {
    num_channels: usize,
    num_pairs: usize,
    num_bins: usize,
}

impl Phat {
    pub fn new(num_channels: usize, num_bins: usize) -> Self {
        Self {
            num_channels,
            num_pairs: crate::signal::pair_count(num_channels),
            num_bins,
        }
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

    pub fn process(&self, covs_in: &Covs, covs_out: &mut Covs) -> Result<()> {
        check_dim("input", "channels", self.num_channels, covs_in.num_channels())?;
        check_dim("input", "bins", self.num_bins, covs_in.num_bins())?;
        check_dim("output", "channels", self.num_channels, covs_out.num_channels())?;
        check_dim("output", "bins", self.num_bins, covs_out.num_bins())?;

        for pair in 0..self.num_pairs {
            let input = covs_in.xcorr(pair);
            for (out, &x) in covs_out.xcorr_mut(pair).iter_mut().zip(input) {
                *out = x / x.norm().max(EPSILON);
            }
        }
        for c in 0..self.num_channels {
            let input = covs_in.acorr(c);
            for (out, &a) in covs_out.acorr_mut(c).iter_mut().zip(input) {
                *out = if a > EPSILON { 1.0 } else { 0.0 };
            }
        }
        Ok(())
    }
}
