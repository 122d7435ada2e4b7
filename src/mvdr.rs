//! Minimum-variance distortionless-response weight solver.

use num_complex::Complex32;

use crate::error::{check_dim, Error, Result};
use crate::signal::{pair_index, Covs, Weights};

/// Relative diagonal loading applied before inversion.
const DIAGONAL_LOADING: f32 = 1.0e-6;

/// Solves `w = R^-1 a / (a^H R^-1 a)` per bin, where `R` is assembled from
/// the covariance estimates (auto-spectra on the diagonal, cross-spectra off
/// it) and `a` is the steering vector read from the incoming weights.
///
/// The weights container is used in-place: on entry it holds the steering
/// vectors (delay-and-sum weights work directly), on return the MVDR
/// solution. A small diagonal loading keeps the solve finite on rank-
/// deficient covariance; no error is raised for ill-conditioned bins.
///
/// This stage is an accessory: none of the prebuilt pipelines wire it in.
pub struct Mvdr {
    num_channels: usize,
    num_bins: usize,
    /// Row-major augmented system, `channels x (channels + 1)`.
    system: Vec<Complex32>,
    solution: Vec<Complex32>,
    steering: Vec<Complex32>,
}

impl Mvdr {
    pub fn new(num_channels: usize, num_bins: usize) -> Result<Self> {
        if num_channels < 2 {
            return Err(Error::Parameter {
                what: "channel count",
                why: "must be at least 2",
            });
        }
        Ok(Self {
            num_channels,
            num_bins,
            system: vec![Complex32::default(); num_channels * (num_channels + 1)],
            solution: vec![Complex32::default(); num_channels],
            steering: vec![Complex32::default(); num_channels],
        })
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn process(&mut self, covs: &Covs, weights: &mut Weights) -> Result<()> {
        check_dim("input", "channels", self.num_channels, covs.num_channels())?;
        check_dim("input", "bins", self.num_bins, covs.num_bins())?;
        check_dim("output", "channels", self.num_channels, weights.num_channels())?;
        check_dim("output", "bins", self.num_bins, weights.num_bins())?;

        let c = self.num_channels;
        for s in 0..weights.num_sources() {
            for b in 0..self.num_bins {
                for channel in 0..c {
                    self.steering[channel] = weights.at(s, channel)[b];
                }

                let mut trace = 0.0;
                for channel in 0..c {
                    trace += covs.acorr(channel)[b];
                }
                let loading = DIAGONAL_LOADING * (trace / c as f32).max(1.0);

                // Augmented matrix [R | a].
                let stride = c + 1;
                for i in 0..c {
                    for j in 0..c {
                        self.system[i * stride + j] = match i.cmp(&j) {
                            core::cmp::Ordering::Less => {
                                covs.xcorr(pair_index(i, j, c))[b]
                            }
                            core::cmp::Ordering::Equal => {
                                Complex32::new(covs.acorr(i)[b] + loading, 0.0)
                            }
                            core::cmp::Ordering::Greater => {
                                covs.xcorr(pair_index(j, i, c))[b].conj()
                            }
                        };
                    }
                    self.system[i * stride + c] = self.steering[i];
                }

                solve_in_place(&mut self.system, c, &mut self.solution);

                let mut denom = Complex32::default();
                for channel in 0..c {
                    denom += self.steering[channel].conj() * self.solution[channel];
                }
                let norm = denom.norm_sqr();
                for channel in 0..c {
                    weights.at_mut(s, channel)[b] = if norm > 1.0e-20 {
                        self.solution[channel] * denom.conj() / norm
                    } else {
                        Complex32::default()
                    };
                }
            }
        }
        Ok(())
    }
}

/// Gaussian elimination with partial pivoting on the augmented system
/// `[A | b]`, writing the solution of `A x = b` into `solution`.
fn solve_in_place(system: &mut [Complex32], n: usize, solution: &mut [Complex32]) {
    let stride = n + 1;
    for column in 0..n {
        let mut pivot = column;
        let mut best = system[column * stride + column].norm_sqr();
        for row in column + 1..n {
            let magnitude = system[row * stride + column].norm_sqr();
            if magnitude > best {
                best = magnitude;
                pivot = row;
            }
        }
        if pivot != column {
            for k in 0..stride {
                system.swap(column * stride + k, pivot * stride + k);
            }
        }
        let diagonal = system[column * stride + column];
        if diagonal.norm_sqr() < 1.0e-30 {
            continue;
        }
        for row in column + 1..n {
            let factor = system[row * stride + column] / diagonal;
            for k in column..stride {
                let value = system[column * stride + k];
                system[row * stride + k] -= factor * value;
            }
        }
    }
    for row in (0..n).rev() {
        let mut accumulator = system[row * stride + n];
        for k in row + 1..n {
            accumulator -= system[row * stride + k] * solution[k];
        }
        let diagonal = system[row * stride + row];
        solution[row] = if diagonal.norm_sqr() > 1.0e-30 {
            accumulator / diagonal
        } else {
            Complex32::default()
        };
    }
}
