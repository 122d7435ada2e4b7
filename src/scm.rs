//! Recursive spatial covariance estimation.

use crate::error::{check_dim, Error, Result};
use crate::signal::{pair_index, Covs, Freqs, Masks};

/// Exponential estimator of the spatial covariance matrix, split into
/// cross-spectra for every unordered channel pair and real auto-spectra.
///
/// The running estimate lives in the [`Covs`] container handed to
/// [`Scm::process`]; passing the same container every frame realizes the
/// recursion `e <- (1 - alpha) e + alpha x`, starting from zero.
pub struct Scm {
    num_channels: usize,
    num_pairs: usize,
    num_bins: usize,
    alpha: f32,
}

impl Scm {
    /// `alpha` is the mixing factor of the recursion, in (0, 1].
    pub fn new(num_channels: usize, num_bins: usize, alpha: f32) -> Result<Self> {
        if num_channels < 2 {
            return Err(Error::Parameter {
                what: "channel count",
                why: "must be at least 2",
            });
        }
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::Parameter {
                what: "mixing factor",
                why: "must be in (0, 1]",
            });
        }
        Ok(Self {
            num_channels,
            num_pairs: crate::signal::pair_count(num_channels),
            num_bins,
            alpha,
        })
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

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn process(&self, freqs: &Freqs, masks: &Masks, covs: &mut Covs) -> Result<()> {
        check_dim("input", "channels", self.num_channels, freqs.num_channels())?;
        check_dim("input", "bins", self.num_bins, freqs.num_bins())?;
        check_dim("masks", "channels", self.num_channels, masks.num_channels())?;
        check_dim("masks", "bins", self.num_bins, masks.num_bins())?;
        check_dim("output", "channels", self.num_channels, covs.num_channels())?;
        check_dim("output", "bins", self.num_bins, covs.num_bins())?;

        let alpha = self.alpha;
        let keep = 1.0 - alpha;

        for c in 0..self.num_channels {
            let spectrum = freqs.channel(c);
            let mask = masks.channel(c);
            for ((estimate, &x), &m) in covs
                .acorr_mut(c)
                .iter_mut()
                .zip(spectrum.iter())
                .zip(mask.iter())
            {
                *estimate = keep * *estimate + alpha * x.norm_sqr() * m;
            }
        }

        for i in 0..self.num_channels {
            for j in i + 1..self.num_channels {
                let pair = pair_index(i, j, self.num_channels);
                let xi = freqs.channel(i);
                let xj = freqs.channel(j);
                let mi = masks.channel(i);
                let mj = masks.channel(j);
                for (b, estimate) in covs.xcorr_mut(pair).iter_mut().enumerate() {
                    let x = xi[b] * xj[b].conj();
                    let m = mi[b].min(mj[b]);
                    *estimate = keep * *estimate + alpha * x * m;
                }
            }
        }
        Ok(())
    }
}
